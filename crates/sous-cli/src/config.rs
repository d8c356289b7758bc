//! Configuration file management for sous.
//!
//! Provides a TOML-based config file at `~/.config/sous/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default. The API
//! key for the live synthesis backend is read from `SOUS_API_KEY` only --
//! never from the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use sous_core::orchestrator::PlannerConfig;
use sous_store::snapshot;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub snapshot: SnapshotSection,
    #[serde(default)]
    pub synthesis: SynthesisSection,
    #[serde(default)]
    pub planner: PlannerSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SnapshotSection {
    /// Snapshot file location; defaults to the XDG data directory.
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SynthesisSection {
    /// Backend name: "template" or "openai".
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for SynthesisSection {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            api_base_url: default_api_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlannerSection {
    #[serde(default = "default_days")]
    pub days: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_max_concurrent_slots")]
    pub max_concurrent_slots: usize,
}

impl Default for PlannerSection {
    fn default() -> Self {
        Self {
            days: default_days(),
            max_retries: default_max_retries(),
            max_concurrent_slots: default_max_concurrent_slots(),
        }
    }
}

fn default_backend() -> String {
    "template".to_owned()
}

fn default_api_base_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_owned()
}

fn default_model() -> String {
    "gpt-4o-mini".to_owned()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_days() -> u32 {
    7
}

fn default_max_retries() -> u32 {
    3
}

fn default_max_concurrent_slots() -> usize {
    4
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the sous config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/sous` or `~/.config/sous`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("sous");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("sous")
}

/// Return the path to the sous config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct SousConfig {
    pub snapshot_path: PathBuf,
    pub synthesis: SynthesisSection,
    pub planner: PlannerSection,
    /// From `SOUS_API_KEY`, when set.
    pub api_key: Option<String>,
}

impl SousConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config
    /// file > default.
    ///
    /// - Snapshot path: `cli_snapshot` > `SOUS_SNAPSHOT` env >
    ///   `config_file.snapshot.path` > the XDG data default.
    /// - Synthesis and planner sections come from the config file when
    ///   present, otherwise defaults.
    pub fn resolve(cli_snapshot: Option<&Path>) -> Result<Self> {
        let file_config = load_config().ok();

        let snapshot_path = if let Some(path) = cli_snapshot {
            path.to_path_buf()
        } else if let Ok(path) = std::env::var("SOUS_SNAPSHOT") {
            PathBuf::from(path)
        } else if let Some(path) = file_config
            .as_ref()
            .and_then(|c| c.snapshot.path.clone())
        {
            PathBuf::from(path)
        } else {
            snapshot::default_snapshot_path()
        };

        let (synthesis, planner) = match file_config {
            Some(cfg) => (cfg.synthesis, cfg.planner),
            None => (SynthesisSection::default(), PlannerSection::default()),
        };

        Ok(Self {
            snapshot_path,
            synthesis,
            planner,
            api_key: std::env::var("SOUS_API_KEY").ok().filter(|k| !k.is_empty()),
        })
    }

    /// Planner config seeded from the file sections, with per-invocation
    /// overrides applied by the plan command.
    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            days: self.planner.days,
            max_retries: self.planner.max_retries,
            max_concurrent_slots: self.planner.max_concurrent_slots,
            synthesis_timeout: Duration::from_secs(self.synthesis.timeout_seconds),
            ..PlannerConfig::default()
        }
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
