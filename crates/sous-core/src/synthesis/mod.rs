//! Recipe synthesis: the pluggable backend that proposes candidate recipes.
//!
//! The retry loop only ever talks to the [`Synthesizer`] trait, so the
//! template backend and the OpenAI-compatible backend are interchangeable
//! without touching the loop. Backends are registered by name in a
//! [`SynthesizerRegistry`].

pub mod openai;
pub mod registry;
pub mod template;
mod trait_def;

pub use registry::SynthesizerRegistry;
pub use trait_def::Synthesizer;

use thiserror::Error;

use sous_store::models::MealSlot;

use crate::constraints::{Constraints, PlanningContext};

/// Errors a synthesis backend can produce.
///
/// All of these are retryable from the loop's point of view: each failure
/// consumes one attempt and the loop moves on.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("synthesis backend error: {0}")]
    Backend(String),

    #[error("synthesis call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("backend returned an unusable recipe: {0}")]
    InvalidRecipe(String),
}

/// One synthesis request: everything a backend may consider when proposing
/// a candidate for a single slot.
#[derive(Debug, Clone)]
pub struct RecipeRequest {
    /// 1-based day within the plan horizon.
    pub day: u32,
    pub slot: MealSlot,
    pub constraints: Constraints,
    pub context: PlanningContext,
    /// Feedback from the previous rejected attempt, if any.
    pub feedback: Option<String>,
    /// Seed for reproducible backend randomness.
    pub seed: u64,
}

impl RecipeRequest {
    /// Copy of this request carrying new feedback for the next attempt.
    pub fn with_feedback(&self, feedback: Option<String>) -> Self {
        Self {
            feedback,
            ..self.clone()
        }
    }
}

/// Ingredient names mentioned in quotes in a feedback text.
///
/// Violation details quote the offending ingredient, so this recovers the
/// concrete ingredients the next candidate should steer away from.
pub fn quoted_ingredients(feedback: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut rest = feedback;
    while let Some(start) = rest.find('"') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('"') else { break };
        let name = after[..end].trim().to_lowercase();
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
        rest = &after[end + 1..];
    }
    out
}
