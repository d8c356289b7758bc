//! Feedback rendering: turn a [`ValidationResult`] into the structured text
//! handed back to the synthesis backend before the next attempt.
//!
//! The output is deterministic and itemized, one line per violation in
//! validation order, so regeneration is reproducible given the same
//! upstream randomness seed.

use super::ValidationResult;

/// Render regeneration feedback for a rejected candidate.
///
/// Violations are listed first (these must be fixed), then warnings (worth
/// improving but non-blocking).
pub fn feedback(result: &ValidationResult) -> String {
    if result.compliant {
        return "recipe satisfies all household constraints".to_owned();
    }

    let mut out = String::from("previous recipe was rejected; fix every item below:\n");
    for violation in &result.violations {
        out.push_str(&format!("- {}: {}\n", violation.kind, violation.detail));
    }

    if !result.warnings.is_empty() {
        out.push_str("non-blocking warnings:\n");
        for warning in &result.warnings {
            out.push_str(&format!("- {}: {}\n", warning.kind, warning.detail));
        }
    }

    out
}
