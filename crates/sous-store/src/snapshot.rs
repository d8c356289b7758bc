//! Snapshot persistence: profiles and memory as one JSON file.
//!
//! Loading and saving are explicit operations driven by the caller; nothing
//! is written on individual mutations. The file format carries a version tag
//! so future migrations can detect old snapshots.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::memory::MemoryBank;
use crate::profiles::ProfileStore;

/// Current snapshot format version.
pub const FORMAT_VERSION: u32 = 1;

/// Errors from snapshot load/save.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot format error: {0}")]
    Format(#[from] serde_json::Error),

    #[error("unsupported snapshot version {found} (expected {FORMAT_VERSION})")]
    UnsupportedVersion { found: u32 },
}

/// On-disk representation: the two stores plus format metadata.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub profiles: ProfileStore,
    pub memory: MemoryBank,
}

/// Default snapshot location: `$XDG_DATA_HOME/sous/snapshot.json` or
/// `~/.local/share/sous/snapshot.json`.
pub fn default_snapshot_path() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("sous").join("snapshot.json");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("share")
        .join("sous")
        .join("snapshot.json")
}

/// Serialize both stores to `path`, creating parent directories as needed.
pub fn save(path: &Path, profiles: &ProfileStore, memory: &MemoryBank) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let snapshot = SnapshotRef {
        version: FORMAT_VERSION,
        saved_at: Utc::now(),
        profiles,
        memory,
    };
    let contents = serde_json::to_string_pretty(&snapshot)?;
    std::fs::write(path, contents)?;

    tracing::info!(path = %path.display(), households = profiles.len(), "snapshot saved");
    Ok(())
}

/// Borrowing twin of [`Snapshot`] so saving does not clone the stores.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    saved_at: DateTime<Utc>,
    profiles: &'a ProfileStore,
    memory: &'a MemoryBank,
}

/// Load both stores from `path`.
pub fn load(path: &Path) -> Result<(ProfileStore, MemoryBank), SnapshotError> {
    let contents = std::fs::read_to_string(path)?;
    let snapshot: Snapshot = serde_json::from_str(&contents)?;
    if snapshot.version != FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: snapshot.version,
        });
    }

    tracing::info!(path = %path.display(), "snapshot loaded");
    Ok((snapshot.profiles, snapshot.memory))
}

/// Load from `path` if it exists, otherwise return fresh empty stores.
pub fn load_or_default(path: &Path) -> Result<(ProfileStore, MemoryBank), SnapshotError> {
    if path.exists() {
        load(path)
    } else {
        tracing::debug!(path = %path.display(), "no snapshot found, starting empty");
        Ok((ProfileStore::new(), MemoryBank::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HouseholdSpec, MemberSpec};

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("snapshot.json");

        let mut profiles = ProfileStore::new();
        profiles.create_household(HouseholdSpec::new("smith")).unwrap();
        profiles
            .add_member(
                "smith",
                MemberSpec {
                    name: "Alice".to_owned(),
                    allergens: vec!["peanut".to_owned()],
                    ..MemberSpec::default()
                },
            )
            .unwrap();

        let mut memory = MemoryBank::new();
        memory.add_dislike("smith", "cilantro");

        save(&path, &profiles, &memory).unwrap();
        let (loaded_profiles, loaded_memory) = load(&path).unwrap();

        let alice = loaded_profiles.get("smith").unwrap().member("Alice").unwrap();
        assert_eq!(alice.allergens, vec!["peanut"]);
        assert_eq!(
            loaded_memory.household("smith").unwrap().dislikes,
            vec!["cilantro"]
        );
    }

    #[test]
    fn load_missing_file_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let result = load(&tmp.path().join("absent.json"));
        assert!(matches!(result, Err(SnapshotError::Io(_))));
    }

    #[test]
    fn load_or_default_returns_empty_for_missing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let (profiles, _memory) = load_or_default(&tmp.path().join("absent.json")).unwrap();
        assert!(profiles.is_empty());
    }

    #[test]
    fn load_rejects_unknown_version() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("snapshot.json");
        save(&path, &ProfileStore::new(), &MemoryBank::new()).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let bumped = contents.replacen("\"version\": 1", "\"version\": 99", 1);
        std::fs::write(&path, bumped).unwrap();

        let result = load(&path);
        assert!(matches!(
            result,
            Err(SnapshotError::UnsupportedVersion { found: 99 })
        ));
    }

    #[test]
    fn load_rejects_malformed_json() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("snapshot.json");
        std::fs::write(&path, "not json {{{").unwrap();
        assert!(matches!(load(&path), Err(SnapshotError::Format(_))));
    }
}
