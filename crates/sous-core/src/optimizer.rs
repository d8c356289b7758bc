//! Schedule optimizer: post-hoc analysis of a completed plan.
//!
//! Reads time and ingredient-reuse statistics out of the plan and produces
//! ranked suggestions. Never mutates the plan.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use sous_store::models::MealPlan;

/// Weight of the ingredient-reuse component in the 0-100 score.
pub const REUSE_WEIGHT: f64 = 0.6;
/// Weight of the time-adherence component in the 0-100 score.
pub const TIME_WEIGHT: f64 = 0.4;

/// Ingredients worth preparing ahead when they recur across days.
const PREP_AHEAD_STAPLES: &[&str] = &[
    "rice", "quinoa", "pasta", "onion", "carrot", "bell pepper", "broccoli", "chicken",
];

/// How many suggestions a report carries at most.
const MAX_SUGGESTIONS: usize = 5;

/// Per-day cooking time totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayTime {
    pub day: u32,
    pub total_minutes: u32,
}

/// The optimizer's read-only report over a completed plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub daily_times: Vec<DayTime>,
    pub total_minutes: u32,
    pub average_minutes_per_day: f64,
    /// Share of distinct ingredients appearing in two or more recipes,
    /// as a percentage.
    pub ingredient_reuse_pct: f64,
    /// Share of days whose total cooking time fits the household budget,
    /// as a percentage.
    pub time_adherence_pct: f64,
    /// 0-100, a fixed linear combination:
    /// `REUSE_WEIGHT * reuse + TIME_WEIGHT * adherence`.
    pub score: f64,
    /// Ranked, human-readable suggestions (batch-cook first, then
    /// prep-ahead, then budget warnings).
    pub suggestions: Vec<String>,
}

/// Analyze a completed plan against a per-day cooking time budget.
pub fn optimize(plan: &MealPlan, daily_time_budget_minutes: u32) -> OptimizationReport {
    // Per-day totals, including days with no accepted meals.
    let mut per_day: BTreeMap<u32, u32> = (1..=plan.days).map(|d| (d, 0)).collect();
    for meal in &plan.meals {
        *per_day.entry(meal.day).or_insert(0) += meal.recipe.cooking_time_minutes;
    }
    let daily_times: Vec<DayTime> = per_day
        .iter()
        .map(|(&day, &total_minutes)| DayTime { day, total_minutes })
        .collect();

    let total_minutes: u32 = daily_times.iter().map(|d| d.total_minutes).sum();
    let day_count = daily_times.len().max(1);
    let average_minutes_per_day = total_minutes as f64 / day_count as f64;

    // Ingredient usage: how many recipes each distinct ingredient shows up in.
    let mut usage: BTreeMap<String, Vec<u32>> = BTreeMap::new();
    for meal in &plan.meals {
        for ingredient in &meal.recipe.ingredients {
            let days = usage.entry(ingredient.normalized_name()).or_default();
            if !days.contains(&meal.day) {
                days.push(meal.day);
            }
        }
    }
    let mut recipe_counts: BTreeMap<String, u32> = BTreeMap::new();
    for meal in &plan.meals {
        let mut seen_in_this_recipe = std::collections::BTreeSet::new();
        for ingredient in &meal.recipe.ingredients {
            if seen_in_this_recipe.insert(ingredient.normalized_name()) {
                *recipe_counts.entry(ingredient.normalized_name()).or_insert(0) += 1;
            }
        }
    }

    let distinct = recipe_counts.len();
    let reused = recipe_counts.values().filter(|&&c| c >= 2).count();
    let ingredient_reuse_pct = if distinct == 0 {
        0.0
    } else {
        reused as f64 / distinct as f64 * 100.0
    };

    let days_within_budget = daily_times
        .iter()
        .filter(|d| d.total_minutes <= daily_time_budget_minutes)
        .count();
    let time_adherence_pct = days_within_budget as f64 / day_count as f64 * 100.0;

    let score = (REUSE_WEIGHT * ingredient_reuse_pct + TIME_WEIGHT * time_adherence_pct)
        .clamp(0.0, 100.0);

    let suggestions = build_suggestions(
        &recipe_counts,
        &usage,
        &daily_times,
        daily_time_budget_minutes,
    );

    tracing::debug!(
        plan = %plan.id,
        score,
        reuse_pct = ingredient_reuse_pct,
        adherence_pct = time_adherence_pct,
        "plan analyzed"
    );

    OptimizationReport {
        daily_times,
        total_minutes,
        average_minutes_per_day,
        ingredient_reuse_pct,
        time_adherence_pct,
        score,
        suggestions,
    }
}

fn build_suggestions(
    recipe_counts: &BTreeMap<String, u32>,
    usage: &BTreeMap<String, Vec<u32>>,
    daily_times: &[DayTime],
    budget: u32,
) -> Vec<String> {
    let mut suggestions = Vec::new();

    // Batch-cook candidates: ingredients used in three or more recipes,
    // heaviest users first.
    let mut batch: Vec<(&String, &u32)> = recipe_counts.iter().filter(|&(_, &c)| c >= 3).collect();
    batch.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (name, count) in batch {
        suggestions.push(format!("batch-cook {name}: used in {count} meals this week"));
    }

    // Prep-ahead flags: staples recurring across at least two days.
    for staple in PREP_AHEAD_STAPLES {
        let recurring = usage
            .iter()
            .find(|(name, days)| name.contains(*staple) && days.len() >= 2);
        if let Some((name, days)) = recurring {
            let mut sorted_days = days.clone();
            sorted_days.sort_unstable();
            let day_list: Vec<String> = sorted_days.iter().map(|d| d.to_string()).collect();
            suggestions.push(format!(
                "prep {name} ahead for days {}",
                day_list.join(", ")
            ));
        }
    }

    // Over-budget days.
    for day in daily_times.iter().filter(|d| d.total_minutes > budget) {
        suggestions.push(format!(
            "day {} needs {} min of cooking, over the {budget} min budget",
            day.day, day.total_minutes
        ));
    }

    suggestions.truncate(MAX_SUGGESTIONS);
    suggestions
}
