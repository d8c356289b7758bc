//! Synthesizer registry -- a named collection of available backends.
//!
//! The registry lets the orchestrator and CLI select a backend by name at
//! runtime (e.g. `--backend openai`) without knowing any concrete type.

use std::collections::HashMap;
use std::sync::Arc;

use super::Synthesizer;

/// A collection of registered [`Synthesizer`] implementations, keyed by
/// name.
///
/// Backends are stored as `Arc` so a lookup can be handed to spawned slot
/// tasks without borrowing the registry.
#[derive(Default)]
pub struct SynthesizerRegistry {
    backends: HashMap<String, Arc<dyn Synthesizer>>,
}

impl SynthesizerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under the name returned by [`Synthesizer::name`].
    ///
    /// If a backend with the same name is already registered, it is
    /// replaced and the old one is returned.
    pub fn register(&mut self, backend: impl Synthesizer + 'static) -> Option<Arc<dyn Synthesizer>> {
        let name = backend.name().to_string();
        self.backends.insert(name, Arc::new(backend))
    }

    /// Look up a backend by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Synthesizer>> {
        self.backends.get(name).cloned()
    }

    /// List the names of all registered backends.
    ///
    /// The order is not guaranteed (HashMap iteration order).
    pub fn list(&self) -> Vec<&str> {
        self.backends.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl std::fmt::Debug for SynthesizerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesizerRegistry")
            .field("backends", &self.backends.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sous_store::models::Recipe;

    use crate::synthesis::{RecipeRequest, SynthesisError};

    /// Minimal named backend for registry tests.
    struct NamedBackend {
        backend_name: String,
    }

    impl NamedBackend {
        fn new(name: &str) -> Self {
            Self {
                backend_name: name.to_string(),
            }
        }
    }

    #[async_trait]
    impl Synthesizer for NamedBackend {
        fn name(&self) -> &str {
            &self.backend_name
        }

        async fn synthesize(&self, _request: &RecipeRequest) -> Result<Recipe, SynthesisError> {
            Err(SynthesisError::Backend("not implemented".to_owned()))
        }
    }

    #[test]
    fn registry_starts_empty() {
        let registry = SynthesizerRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.list().is_empty());
    }

    #[test]
    fn register_and_get() {
        let mut registry = SynthesizerRegistry::new();
        let old = registry.register(NamedBackend::new("template"));
        assert!(old.is_none());

        let backend = registry.get("template");
        assert!(backend.is_some());
        assert_eq!(backend.unwrap().name(), "template");
    }

    #[test]
    fn register_replaces_existing() {
        let mut registry = SynthesizerRegistry::new();
        registry.register(NamedBackend::new("template"));
        let old = registry.register(NamedBackend::new("template"));
        assert!(old.is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn get_missing_returns_none() {
        let registry = SynthesizerRegistry::new();
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn list_returns_all_names() {
        let mut registry = SynthesizerRegistry::new();
        registry.register(NamedBackend::new("template"));
        registry.register(NamedBackend::new("openai"));

        let mut names = registry.list();
        names.sort();
        assert_eq!(names, vec!["openai", "template"]);
    }

    #[test]
    fn registry_debug_shows_names() {
        let mut registry = SynthesizerRegistry::new();
        registry.register(NamedBackend::new("template"));
        let debug = format!("{registry:?}");
        assert!(debug.contains("template"));
    }
}
