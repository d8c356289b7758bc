//! The `Synthesizer` trait -- the adapter interface for recipe backends.
//!
//! Each concrete backend (template, OpenAI-compatible) implements this
//! trait. The trait is intentionally object-safe so it can be stored as
//! `Box<dyn Synthesizer>` in the [`super::SynthesizerRegistry`] and shared
//! as `Arc<dyn Synthesizer>` across slot tasks.

use async_trait::async_trait;

use sous_store::models::Recipe;

use super::{RecipeRequest, SynthesisError};

/// Adapter interface for recipe synthesis backends.
///
/// Implementations must be stateless with respect to shared planner state:
/// the retry loop may call `synthesize` concurrently for independent slots.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Backend name used for registry lookup (e.g. "template", "openai").
    fn name(&self) -> &str;

    /// Propose one candidate recipe for the request's slot.
    ///
    /// When `request.feedback` is present the previous candidate was
    /// rejected; the backend should bias the new candidate away from the
    /// listed problems. Every call must return a fresh `Recipe` instance.
    async fn synthesize(&self, request: &RecipeRequest) -> Result<Recipe, SynthesisError>;
}

// Compile-time assertion: Synthesizer must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Synthesizer) {}
};
