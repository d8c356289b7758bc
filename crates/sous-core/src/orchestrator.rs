//! Plan orchestrator: runs the whole pipeline for one household.
//!
//! Derives constraints fresh from the live profile, builds the planning
//! context once, fans a retry loop out per (day, slot) over tokio tasks
//! bounded by a semaphore, and assembles the results in plan order. Memory
//! writes are deferred until every slot has settled, then applied as one
//! `record_plan` batch, so a partially-run plan never leaks into history.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Semaphore, mpsc};

use sous_store::memory::MemoryBank;
use sous_store::models::{MealPlan, MealSlot, PlannedMeal};
use sous_store::profiles::{ProfileError, ProfileStore};

use crate::constraints::{derive_constraints, ensure_plannable, planning_context};
use crate::nutrition::NutritionLookup;
use crate::slot::{SlotConfig, SlotOutcome, run_slot};
use crate::synthesis::{RecipeRequest, Synthesizer};
use crate::validate::{ComplianceValidator, ValidatorConfig, Violation};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Configuration for one plan-generation run.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Plan horizon in days.
    pub days: u32,
    /// Synthesis attempts per slot before it is declared exhausted.
    pub max_retries: u32,
    /// Maximum slot loops running concurrently.
    pub max_concurrent_slots: usize,
    /// Timeout around each synthesis call.
    pub synthesis_timeout: Duration,
    /// All-or-nothing mode: any exhausted slot fails the whole call and
    /// nothing is recorded.
    pub strict: bool,
    /// Base seed; each slot derives its own seed from this.
    pub seed: u64,
    /// Calorie tolerance bands for the validator.
    pub validator: ValidatorConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            days: 7,
            max_retries: 3,
            max_concurrent_slots: 4,
            synthesis_timeout: Duration::from_secs(30),
            strict: false,
            seed: 0,
            validator: ValidatorConfig::default(),
        }
    }
}

/// A slot whose retry loop ran out of attempts.
#[derive(Debug, Clone)]
pub struct SlotFailure {
    pub day: u32,
    pub slot: MealSlot,
    pub attempts: u32,
    pub violations: Vec<Violation>,
}

/// Result of a plan-generation run: the plan plus any per-slot failures.
///
/// In the default (non-strict) mode, exhausted slots are reported here and
/// the plan simply has no meal in those positions; the caller decides
/// whether that is acceptable.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plan: MealPlan,
    pub failures: Vec<SlotFailure>,
}

/// Errors surfaced by plan generation.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error("{} slot(s) exhausted their retry budget in strict mode", .failures.len())]
    Exhausted { failures: Vec<SlotFailure> },
}

/// Message sent from a spawned slot task back to the collection loop.
struct SlotDone {
    day: u32,
    slot: MealSlot,
    outcome: SlotOutcome,
}

// ---------------------------------------------------------------------------
// Orchestration
// ---------------------------------------------------------------------------

/// Generate a meal plan for a household.
///
/// Steps:
/// 1. Load the profile and check it is plannable.
/// 2. Derive constraints and the planning context (fresh, never cached).
/// 3. Build a validator with a point-in-time copy of the guideline map.
/// 4. Fan out one retry loop per (day, slot), bounded by the semaphore.
/// 5. Collect outcomes, assemble the plan in (day, slot) order.
/// 6. Strict mode: fail without recording if any slot exhausted.
/// 7. Record the plan into memory as a single deferred batch.
pub async fn generate_plan(
    profiles: &ProfileStore,
    memory: &mut MemoryBank,
    synthesizer: Arc<dyn Synthesizer>,
    lookup: Arc<dyn NutritionLookup>,
    household_id: &str,
    config: &PlannerConfig,
) -> Result<PlanOutcome, PlanError> {
    let profile = profiles.get(household_id)?;
    ensure_plannable(profile)?;

    let constraints = derive_constraints(profile);
    let context = planning_context(profile, memory);
    let validator = Arc::new(ComplianceValidator::new(
        config.validator,
        lookup,
        memory.guidelines().clone(),
    ));
    let slot_config = SlotConfig {
        max_retries: config.max_retries,
        synthesis_timeout: config.synthesis_timeout,
    };

    tracing::info!(
        household = %household_id,
        days = config.days,
        backend = synthesizer.name(),
        max_retries = config.max_retries,
        "starting plan generation"
    );

    // Fan out the independent slot loops.
    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_slots.max(1)));
    let total_slots = config.days as usize * MealSlot::ALL.len();
    let (tx, mut rx) = mpsc::channel::<SlotDone>(total_slots.max(1));

    for day in 1..=config.days {
        for (slot_index, slot) in MealSlot::ALL.into_iter().enumerate() {
            let request = RecipeRequest {
                day,
                slot,
                constraints: constraints.clone(),
                context: context.clone(),
                feedback: None,
                // Distinct, reproducible seed per slot position.
                seed: config
                    .seed
                    .wrapping_add(day as u64 * MealSlot::ALL.len() as u64 + slot_index as u64),
            };

            let semaphore = Arc::clone(&semaphore);
            let synthesizer = Arc::clone(&synthesizer);
            let validator = Arc::clone(&validator);
            let slot_config = slot_config.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return;
                };
                let outcome =
                    run_slot(synthesizer.as_ref(), validator.as_ref(), &request, &slot_config)
                        .await;
                let _ = tx.send(SlotDone { day, slot, outcome }).await;
            });
        }
    }
    drop(tx);

    // Collect every slot's terminal outcome.
    let mut done: Vec<SlotDone> = Vec::with_capacity(total_slots);
    while let Some(msg) = rx.recv().await {
        done.push(msg);
    }
    done.sort_by_key(|d| (d.day, d.slot));

    // Assemble the plan and the failure list.
    let mut plan = MealPlan::new(household_id, config.days);
    let mut failures = Vec::new();
    for SlotDone { day, slot, outcome } in done {
        match outcome {
            SlotOutcome::Accepted { recipe, .. } => {
                plan.meals.push(PlannedMeal { day, slot, recipe });
            }
            SlotOutcome::Exhausted {
                violations,
                attempts,
                ..
            } => {
                failures.push(SlotFailure {
                    day,
                    slot,
                    attempts,
                    violations,
                });
            }
        }
    }

    if config.strict && !failures.is_empty() {
        tracing::warn!(
            household = %household_id,
            failed_slots = failures.len(),
            "strict mode: aborting plan, nothing recorded"
        );
        return Err(PlanError::Exhausted { failures });
    }

    // Deferred memory write: one batch for the whole plan.
    memory.record_plan(&plan);

    tracing::info!(
        household = %household_id,
        plan = %plan.id,
        meals = plan.meals.len(),
        failed_slots = failures.len(),
        "plan generation completed"
    );
    Ok(PlanOutcome { plan, failures })
}
