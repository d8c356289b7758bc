//! `sous plan` commands plus the analysis commands that read the latest
//! recorded plan (`sous optimize`, `sous grocery`, `sous memory`).

use std::sync::Arc;

use anyhow::{Context, Result, bail};

use sous_core::cost::PriceBook;
use sous_core::grocery::aggregate_grocery_list;
use sous_core::nutrition::ReferenceTable;
use sous_core::optimizer::optimize;
use sous_core::orchestrator::{PlannerConfig, generate_plan};
use sous_core::synthesis::openai::OpenAiSynthesizer;
use sous_core::synthesis::template::TemplateSynthesizer;
use sous_core::synthesis::{Synthesizer, SynthesizerRegistry};
use sous_store::models::MealPlan;
use sous_store::snapshot;

use crate::config::SousConfig;

/// Per-invocation overrides for `sous plan generate`.
pub struct GenerateOptions {
    pub household_id: String,
    pub days: Option<u32>,
    pub strict: bool,
    pub backend: Option<String>,
    pub seed: Option<u64>,
}

/// Build the backend registry from config: the template backend is always
/// available, the OpenAI-compatible one whenever configured.
fn build_registry(config: &SousConfig) -> Result<SynthesizerRegistry> {
    let mut registry = SynthesizerRegistry::new();
    registry.register(TemplateSynthesizer::new());

    let synthesis = &config.synthesis;
    let openai = OpenAiSynthesizer::new(
        synthesis.api_base_url.clone(),
        synthesis.model.clone(),
        synthesis.temperature,
        synthesis.timeout_seconds,
        config.api_key.clone(),
    )
    .context("failed to build the openai synthesis backend")?;
    registry.register(openai);

    Ok(registry)
}

/// Select a backend by name, falling back to the template backend when the
/// requested one is not registered.
fn select_backend(
    registry: &SynthesizerRegistry,
    requested: &str,
) -> Result<Arc<dyn Synthesizer>> {
    if let Some(backend) = registry.get(requested) {
        return Ok(backend);
    }
    let mut available = registry.list();
    available.sort();
    tracing::warn!(
        requested,
        available = ?available,
        "requested backend not registered, falling back to template"
    );
    registry
        .get("template")
        .with_context(|| format!("backend {requested:?} not found and no template fallback"))
}

/// Run `sous plan generate`.
pub async fn run_generate(config: &SousConfig, options: GenerateOptions) -> Result<()> {
    let (profiles, mut memory) = snapshot::load_or_default(&config.snapshot_path)
        .context("failed to load snapshot")?;

    let registry = build_registry(config)?;
    let backend_name = options
        .backend
        .unwrap_or_else(|| config.synthesis.backend.clone());
    let backend = select_backend(&registry, &backend_name)?;

    let mut planner = config.planner_config();
    if let Some(days) = options.days {
        planner.days = days;
    }
    planner.strict = options.strict;
    planner.seed = options.seed.unwrap_or_else(rand::random);

    println!(
        "Generating a {}-day plan for {:?} with the {} backend...",
        planner.days,
        options.household_id,
        backend.name()
    );

    let outcome = generate_plan(
        &profiles,
        &mut memory,
        backend,
        Arc::new(ReferenceTable::new()),
        &options.household_id,
        &planner,
    )
    .await?;

    snapshot::save(&config.snapshot_path, &profiles, &memory)?;

    print_plan(&outcome.plan);

    if !outcome.failures.is_empty() {
        println!("\nSlots that exhausted their retry budget:");
        for failure in &outcome.failures {
            println!(
                "  day {} {} ({} attempts):",
                failure.day, failure.slot, failure.attempts
            );
            for violation in &failure.violations {
                println!("    - {}: {}", violation.kind, violation.detail);
            }
        }
        println!("\nRe-run with different settings, or relax the household profile.");
    }

    Ok(())
}

/// Run `sous plan show`: print the most recently recorded plan.
pub fn run_show(config: &SousConfig, household_id: &str) -> Result<()> {
    let (_profiles, memory) = snapshot::load_or_default(&config.snapshot_path)
        .context("failed to load snapshot")?;
    let plan = latest_plan(&memory, household_id)?;
    print_plan(plan);
    Ok(())
}

/// Run `sous optimize`: analyze the most recently recorded plan.
pub fn run_optimize(config: &SousConfig, household_id: &str) -> Result<()> {
    let (profiles, memory) = snapshot::load_or_default(&config.snapshot_path)
        .context("failed to load snapshot")?;
    let budget = profiles.get(household_id)?.cooking_time_max_minutes;
    let plan = latest_plan(&memory, household_id)?;

    let report = optimize(plan, budget);
    println!("Optimization score: {:.1}/100", report.score);
    println!(
        "  Ingredient reuse: {:.0}%  |  Time adherence: {:.0}%",
        report.ingredient_reuse_pct, report.time_adherence_pct
    );
    println!(
        "  Cooking time: {} min total, {:.0} min/day average",
        report.total_minutes, report.average_minutes_per_day
    );
    for day in &report.daily_times {
        println!("    day {}: {} min", day.day, day.total_minutes);
    }
    if !report.suggestions.is_empty() {
        println!("Suggestions:");
        for suggestion in &report.suggestions {
            println!("  - {suggestion}");
        }
    }
    Ok(())
}

/// Run `sous grocery`: aggregate the most recent plan's shopping list.
pub fn run_grocery(config: &SousConfig, household_id: &str) -> Result<()> {
    let (profiles, memory) = snapshot::load_or_default(&config.snapshot_path)
        .context("failed to load snapshot")?;
    let budget = profiles.get(household_id)?.budget_weekly;
    let plan = latest_plan(&memory, household_id)?;

    let list = aggregate_grocery_list(plan, &PriceBook::new(), budget)?;

    let mut current_category = "";
    for item in &list.items {
        if item.category != current_category {
            println!("\n{}", item.category.to_uppercase());
            current_category = &item.category;
        }
        println!(
            "  {:<24} {:>8.1} {:<6} ${:>6.2}",
            item.name, item.total_amount, item.unit, item.estimated_cost
        );
    }
    println!("\n{} unique items, estimated ${:.2}", list.unique_items, list.total_estimated_cost);
    match (list.budget, list.over_budget_by()) {
        (Some(budget), Some(over)) => {
            println!("Over the ${budget:.2} weekly budget by ${over:.2}.");
        }
        (Some(budget), None) => {
            println!("Within the ${budget:.2} weekly budget.");
        }
        _ => {}
    }
    Ok(())
}

/// Run `sous memory`: show the compacted context for a household.
pub fn run_memory(config: &SousConfig, household_id: &str) -> Result<()> {
    let (profiles, memory) = snapshot::load_or_default(&config.snapshot_path)
        .context("failed to load snapshot")?;
    let conditions: Vec<String> = profiles
        .get(household_id)?
        .members
        .iter()
        .flat_map(|m| m.health_conditions.iter().cloned())
        .collect();

    let summary = memory.compact_context(household_id, &conditions);
    println!("Plans recorded: {}", summary.plans_recorded);
    if !summary.frequent_ingredients.is_empty() {
        println!("Frequent ingredients: {}", summary.frequent_ingredients.join(", "));
    }
    if !summary.recent_meal_names.is_empty() {
        println!("Most recent plan: {}", summary.recent_meal_names.join(", "));
    }
    if !summary.disliked_ingredients.is_empty() {
        println!("Disliked: {}", summary.disliked_ingredients.join(", "));
    }
    for fact in &summary.guideline_facts {
        println!("Guideline {fact}");
    }
    Ok(())
}

fn latest_plan<'a>(
    memory: &'a sous_store::memory::MemoryBank,
    household_id: &str,
) -> Result<&'a MealPlan> {
    let Some(entry) = memory.household(household_id) else {
        bail!("no plans recorded for household {household_id:?}; run `sous plan generate` first");
    };
    match entry.history.back() {
        Some(plan) => Ok(plan),
        None => bail!("no plans recorded for household {household_id:?}"),
    }
}

fn print_plan(plan: &MealPlan) {
    println!(
        "\nPlan {} for {:?} ({} meals over {} days):",
        plan.id,
        plan.household_id,
        plan.meals.len(),
        plan.days
    );
    let mut current_day = 0;
    for meal in &plan.meals {
        if meal.day != current_day {
            println!("  Day {}", meal.day);
            current_day = meal.day;
        }
        let nutrition = meal
            .recipe
            .nutrition
            .map(|n| format!(" ({:.0} kcal/serving)", n.calories))
            .unwrap_or_default();
        println!(
            "    {:<10} {} -- {} min{}",
            meal.slot.to_string(),
            meal.recipe.name,
            meal.recipe.cooking_time_minutes,
            nutrition
        );
    }
}
