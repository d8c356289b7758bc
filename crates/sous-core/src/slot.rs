//! Per-slot retry loop: the bounded generate -> validate -> feedback cycle.
//!
//! Each meal slot runs its own instance of this state machine,
//! independently of every other slot:
//!
//! ```text
//! generate -> validate -> accepted
//!                      -> feedback -> generate   (attempt < max_retries)
//!                      -> exhausted              (attempt == max_retries)
//! ```
//!
//! The synthesis backend is invoked at most `max_retries` times. A backend
//! failure (error or timeout) consumes the attempt like a rejected
//! candidate would, with the error text fed forward as feedback.

use std::time::Duration;

use sous_store::models::Recipe;

use crate::synthesis::{RecipeRequest, SynthesisError, Synthesizer};
use crate::validate::feedback::feedback;
use crate::validate::{ComplianceValidator, ValidationResult, Violation, Warning};

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

/// Phase of a slot's retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPhase {
    /// Invoking the synthesis backend.
    Generate,
    /// Checking the candidate against household constraints.
    Validate,
    /// Terminal: a compliant recipe was produced.
    Accepted,
    /// Terminal: the attempt budget ran out.
    Exhausted,
}

impl SlotPhase {
    /// Whether `from -> to` is an edge of the retry loop graph.
    pub fn is_valid_transition(from: SlotPhase, to: SlotPhase) -> bool {
        matches!(
            (from, to),
            (SlotPhase::Generate, SlotPhase::Validate)
                // Backend failure skips validation and re-enters generate.
                | (SlotPhase::Generate, SlotPhase::Generate)
                | (SlotPhase::Generate, SlotPhase::Exhausted)
                | (SlotPhase::Validate, SlotPhase::Accepted)
                | (SlotPhase::Validate, SlotPhase::Generate)
                | (SlotPhase::Validate, SlotPhase::Exhausted)
        )
    }

    /// True for phases with no outgoing edges.
    pub fn is_terminal(self) -> bool {
        matches!(self, SlotPhase::Accepted | SlotPhase::Exhausted)
    }
}

/// Configuration for one slot's retry loop.
#[derive(Debug, Clone)]
pub struct SlotConfig {
    /// Maximum synthesis attempts before the slot is declared exhausted.
    pub max_retries: u32,
    /// Timeout applied around each synthesis call.
    pub synthesis_timeout: Duration,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            synthesis_timeout: Duration::from_secs(30),
        }
    }
}

/// Terminal result of a slot's retry loop.
#[derive(Debug, Clone)]
pub enum SlotOutcome {
    /// A compliant recipe, with the attempts it took and any soft warnings
    /// from its final validation.
    Accepted {
        recipe: Recipe,
        attempts: u32,
        warnings: Vec<Warning>,
    },
    /// The attempt budget ran out. The last candidate (if synthesis ever
    /// produced one) is surfaced with its violation trail so the caller can
    /// decide whether to accept-with-warning or abort.
    Exhausted {
        last_candidate: Option<Recipe>,
        violations: Vec<Violation>,
        attempts: u32,
    },
}

impl SlotOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SlotOutcome::Accepted { .. })
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Run the retry loop for one slot to a terminal phase.
///
/// `request.feedback` is ignored on entry; the loop owns feedback for its
/// whole lifetime.
pub async fn run_slot(
    synthesizer: &dyn Synthesizer,
    validator: &ComplianceValidator,
    request: &RecipeRequest,
    config: &SlotConfig,
) -> SlotOutcome {
    let mut phase = SlotPhase::Generate;
    let mut attempt: u32 = 0;
    let mut current_feedback: Option<String> = None;
    let mut candidate: Option<Recipe> = None;
    let mut candidate_violations: Vec<Violation> = Vec::new();

    loop {
        // Generate: one synthesis attempt, bounded by the timeout.
        let attempt_request = request.with_feedback(current_feedback.clone());
        let synthesized = tokio::time::timeout(
            config.synthesis_timeout,
            synthesizer.synthesize(&attempt_request),
        )
        .await
        .unwrap_or(Err(SynthesisError::Timeout {
            seconds: config.synthesis_timeout.as_secs(),
        }));
        attempt += 1;

        let fresh = match synthesized {
            Ok(recipe) => recipe,
            Err(e) => {
                // A failed synthesis consumes the attempt; the error text
                // becomes feedback for the next one.
                tracing::warn!(
                    day = request.day,
                    slot = %request.slot,
                    attempt,
                    error = %e,
                    "synthesis attempt failed"
                );
                if attempt >= config.max_retries {
                    advance(phase, SlotPhase::Exhausted);
                    return exhausted(request, candidate, candidate_violations, attempt);
                }
                current_feedback = Some(format!("previous attempt failed: {e}"));
                phase = advance(phase, SlotPhase::Generate);
                continue;
            }
        };

        // Validate: every check runs, every violation is recorded.
        phase = advance(phase, SlotPhase::Validate);
        let result: ValidationResult = validator.validate(&fresh, &request.constraints);

        if result.compliant {
            let terminal = advance(phase, SlotPhase::Accepted);
            debug_assert!(terminal.is_terminal());
            let mut recipe = fresh;
            recipe.nutrition = Some(result.nutrition);
            tracing::info!(
                day = request.day,
                slot = %request.slot,
                recipe = %recipe.name,
                attempts = attempt,
                "slot accepted"
            );
            return SlotOutcome::Accepted {
                recipe,
                attempts: attempt,
                warnings: result.warnings,
            };
        }

        if attempt >= config.max_retries {
            advance(phase, SlotPhase::Exhausted);
            return exhausted(request, Some(fresh), result.violations, attempt);
        }

        current_feedback = Some(feedback(&result));
        candidate = Some(fresh);
        candidate_violations = result.violations;
        phase = advance(phase, SlotPhase::Generate);
    }
}

fn exhausted(
    request: &RecipeRequest,
    last_candidate: Option<Recipe>,
    violations: Vec<Violation>,
    attempts: u32,
) -> SlotOutcome {
    tracing::warn!(
        day = request.day,
        slot = %request.slot,
        attempts,
        violations = violations.len(),
        "slot exhausted"
    );
    SlotOutcome::Exhausted {
        last_candidate,
        violations,
        attempts,
    }
}

/// Assert-and-advance helper for the phase graph.
fn advance(from: SlotPhase, to: SlotPhase) -> SlotPhase {
    debug_assert!(
        SlotPhase::is_valid_transition(from, to),
        "invalid slot transition: {from:?} -> {to:?}"
    );
    to
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_phases_have_no_outgoing_edges() {
        for to in [
            SlotPhase::Generate,
            SlotPhase::Validate,
            SlotPhase::Accepted,
            SlotPhase::Exhausted,
        ] {
            assert!(!SlotPhase::is_valid_transition(SlotPhase::Accepted, to));
            assert!(!SlotPhase::is_valid_transition(SlotPhase::Exhausted, to));
        }
    }

    #[test]
    fn generate_cannot_jump_to_accepted() {
        assert!(!SlotPhase::is_valid_transition(
            SlotPhase::Generate,
            SlotPhase::Accepted
        ));
    }

    #[test]
    fn validate_edges_cover_all_outcomes() {
        assert!(SlotPhase::is_valid_transition(
            SlotPhase::Validate,
            SlotPhase::Accepted
        ));
        assert!(SlotPhase::is_valid_transition(
            SlotPhase::Validate,
            SlotPhase::Generate
        ));
        assert!(SlotPhase::is_valid_transition(
            SlotPhase::Validate,
            SlotPhase::Exhausted
        ));
    }

    #[test]
    fn terminal_flags() {
        assert!(SlotPhase::Accepted.is_terminal());
        assert!(SlotPhase::Exhausted.is_terminal());
        assert!(!SlotPhase::Generate.is_terminal());
        assert!(!SlotPhase::Validate.is_terminal());
    }

    #[test]
    fn default_config_matches_documented_bounds() {
        let config = SlotConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.synthesis_timeout, Duration::from_secs(30));
    }
}
