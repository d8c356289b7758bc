//! Long-term memory bank: per-household planning history and learned facts.
//!
//! Process-wide state, initialized empty or loaded from a snapshot. Every
//! mutation goes through an explicit record/update call; nothing here writes
//! to disk on its own (persistence is an explicit snapshot save by the
//! caller).

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::models::{MealPlan, Recipe};

/// Maximum number of historical plans retained per household. Oldest plans
/// are evicted first.
pub const HISTORY_LIMIT: usize = 10;

/// Number of frequent ingredients included in a compacted context.
pub const COMPACT_TOP_INGREDIENTS: usize = 8;

/// Maximum disliked ingredients carried into a compacted context.
pub const COMPACT_MAX_DISLIKES: usize = 12;

/// Dietary guideline for a health condition: ingredients to avoid and to
/// favor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Guideline {
    #[serde(default)]
    pub avoid: Vec<String>,
    #[serde(default)]
    pub prefer: Vec<String>,
}

/// Container for deserializing the embedded guideline presets.
#[derive(Debug, Deserialize)]
struct GuidelineLibrary {
    guidelines: Vec<GuidelinePreset>,
}

#[derive(Debug, Deserialize)]
struct GuidelinePreset {
    condition: String,
    #[serde(default)]
    avoid: Vec<String>,
    #[serde(default)]
    prefer: Vec<String>,
}

/// The embedded guideline presets TOML.
static GUIDELINES_TOML: &str = include_str!("guidelines.toml");

/// Load the built-in condition-to-guideline mapping.
///
/// # Panics
///
/// Panics if the embedded TOML is malformed. If the binary was built, the
/// TOML is valid.
fn builtin_guidelines() -> BTreeMap<String, Guideline> {
    let lib: GuidelineLibrary =
        toml::from_str(GUIDELINES_TOML).expect("embedded guidelines.toml is invalid");
    lib.guidelines
        .into_iter()
        .map(|p| {
            (
                p.condition.to_lowercase(),
                Guideline {
                    avoid: p.avoid,
                    prefer: p.prefer,
                },
            )
        })
        .collect()
}

/// Everything the bank remembers about one household.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HouseholdMemory {
    /// Recipes the household explicitly marked as favorites.
    pub favorites: Vec<Recipe>,
    /// Ingredients learned or declared as disliked, lowercased, insertion
    /// order preserved.
    pub dislikes: Vec<String>,
    /// Retained plans, oldest first. Length never exceeds [`HISTORY_LIMIT`].
    pub history: VecDeque<MealPlan>,
    /// Affinity counters keyed by recipe tag or cuisine, bumped whenever a
    /// plan containing them is recorded.
    pub preference_weights: BTreeMap<String, u32>,
}

/// Deterministic reduction of a household's history into a bounded summary.
///
/// Consumed by the synthesis backend so its input stays small no matter how
/// much history exists.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompactSummary {
    /// Most frequent ingredients across retained history, most frequent
    /// first, ties alphabetical. At most [`COMPACT_TOP_INGREDIENTS`].
    pub frequent_ingredients: Vec<String>,
    /// Meal names from the most recent plan only.
    pub recent_meal_names: Vec<String>,
    /// Disliked ingredients, capped at [`COMPACT_MAX_DISLIKES`].
    pub disliked_ingredients: Vec<String>,
    /// Guideline facts for the conditions the caller supplied, one line per
    /// condition, sorted by condition name.
    pub guideline_facts: Vec<String>,
    /// How many plans are currently retained.
    pub plans_recorded: usize,
}

/// Long-term memory for all households, plus the condition-to-guideline
/// mapping (seeded from the embedded presets, extensible at runtime).
#[derive(Debug, Serialize, Deserialize)]
pub struct MemoryBank {
    entries: BTreeMap<String, HouseholdMemory>,
    guidelines: BTreeMap<String, Guideline>,
}

impl Default for MemoryBank {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBank {
    /// Create a bank with no household entries and the built-in guidelines.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            guidelines: builtin_guidelines(),
        }
    }

    /// Record a completed plan for its household.
    ///
    /// Appends to the history (evicting the oldest entry beyond
    /// [`HISTORY_LIMIT`]) and bumps preference weights for every tag and
    /// cuisine seen in the plan's accepted recipes.
    pub fn record_plan(&mut self, plan: &MealPlan) {
        let entry = self.entries.entry(plan.household_id.clone()).or_default();

        for recipe in plan.recipes() {
            for tag in &recipe.tags {
                *entry.preference_weights.entry(tag.to_lowercase()).or_insert(0) += 1;
            }
            if let Some(cuisine) = &recipe.cuisine {
                *entry.preference_weights.entry(cuisine.to_lowercase()).or_insert(0) += 1;
            }
        }

        entry.history.push_back(plan.clone());
        while entry.history.len() > HISTORY_LIMIT {
            entry.history.pop_front();
        }

        tracing::info!(
            household = %plan.household_id,
            plan = %plan.id,
            meals = plan.meals.len(),
            retained = entry.history.len(),
            "plan recorded"
        );
    }

    /// Mark a recipe as a household favorite.
    pub fn add_favorite(&mut self, household_id: &str, recipe: Recipe) {
        let entry = self.entries.entry(household_id.to_owned()).or_default();
        if !entry.favorites.iter().any(|r| r.name == recipe.name) {
            tracing::info!(household = %household_id, recipe = %recipe.name, "favorite added");
            entry.favorites.push(recipe);
        }
    }

    /// Remember a disliked ingredient for a household.
    pub fn add_dislike(&mut self, household_id: &str, ingredient: &str) {
        let normalized = ingredient.trim().to_lowercase();
        if normalized.is_empty() {
            return;
        }
        let entry = self.entries.entry(household_id.to_owned()).or_default();
        if !entry.dislikes.contains(&normalized) {
            tracing::info!(household = %household_id, ingredient = %normalized, "dislike recorded");
            entry.dislikes.push(normalized);
        }
    }

    /// Guideline for a health condition, matched case-insensitively.
    pub fn guideline_for(&self, condition: &str) -> Option<&Guideline> {
        self.guidelines.get(&condition.trim().to_lowercase())
    }

    /// Install or replace a guideline at runtime.
    pub fn set_guideline(&mut self, condition: &str, guideline: Guideline) {
        self.guidelines
            .insert(condition.trim().to_lowercase(), guideline);
    }

    /// Full condition-to-guideline mapping (used to build a validator).
    pub fn guidelines(&self) -> &BTreeMap<String, Guideline> {
        &self.guidelines
    }

    /// Memory for one household, if any has been recorded.
    pub fn household(&self, household_id: &str) -> Option<&HouseholdMemory> {
        self.entries.get(household_id)
    }

    /// Compact a household's memory into a bounded, deterministic summary.
    ///
    /// `conditions` is the household's current health-condition set (the
    /// profile lives in a different store, so the caller passes it in).
    /// Compacting twice without an intervening `record_plan` yields an
    /// identical summary.
    pub fn compact_context(&self, household_id: &str, conditions: &[String]) -> CompactSummary {
        let Some(entry) = self.entries.get(household_id) else {
            return CompactSummary {
                guideline_facts: self.guideline_facts(conditions),
                ..CompactSummary::default()
            };
        };

        // Ingredient frequency across retained history.
        let mut frequency: BTreeMap<String, u32> = BTreeMap::new();
        for plan in &entry.history {
            for recipe in plan.recipes() {
                for ingredient in &recipe.ingredients {
                    *frequency.entry(ingredient.normalized_name()).or_insert(0) += 1;
                }
            }
        }
        let mut ranked: Vec<(String, u32)> = frequency.into_iter().collect();
        // Count descending, then name ascending: deterministic top-K.
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let frequent_ingredients = ranked
            .into_iter()
            .take(COMPACT_TOP_INGREDIENTS)
            .map(|(name, _)| name)
            .collect();

        let recent_meal_names = entry
            .history
            .back()
            .map(|plan| plan.recipes().map(|r| r.name.clone()).collect())
            .unwrap_or_default();

        CompactSummary {
            frequent_ingredients,
            recent_meal_names,
            disliked_ingredients: entry
                .dislikes
                .iter()
                .take(COMPACT_MAX_DISLIKES)
                .cloned()
                .collect(),
            guideline_facts: self.guideline_facts(conditions),
            plans_recorded: entry.history.len(),
        }
    }

    /// One fact line per known condition, sorted for determinism.
    fn guideline_facts(&self, conditions: &[String]) -> Vec<String> {
        let mut sorted: Vec<String> = conditions.iter().map(|c| c.trim().to_lowercase()).collect();
        sorted.sort();
        sorted.dedup();

        sorted
            .iter()
            .filter_map(|condition| {
                self.guidelines.get(condition).map(|g| {
                    format!(
                        "{condition}: avoid {}; prefer {}",
                        g.avoid.join(", "),
                        g.prefer.join(", ")
                    )
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ingredient, MealPlan, MealSlot, PlannedMeal, Recipe, Unit};

    fn recipe(name: &str, ingredients: &[&str]) -> Recipe {
        Recipe {
            name: name.to_owned(),
            slot: MealSlot::Dinner,
            cuisine: Some("american".to_owned()),
            cooking_time_minutes: 30,
            servings: 4,
            ingredients: ingredients
                .iter()
                .map(|n| Ingredient::new(*n, 100.0, Unit::Grams))
                .collect(),
            instructions: Vec::new(),
            tags: vec!["weeknight".to_owned()],
            nutrition: None,
        }
    }

    fn plan_with(household: &str, recipes: Vec<Recipe>) -> MealPlan {
        let mut plan = MealPlan::new(household, 1);
        for (i, r) in recipes.into_iter().enumerate() {
            plan.meals.push(PlannedMeal {
                day: 1,
                slot: MealSlot::ALL[i % 3],
                recipe: r,
            });
        }
        plan
    }

    #[test]
    fn history_is_capped_fifo() {
        let mut bank = MemoryBank::new();
        for i in 0..15 {
            let plan = plan_with("smith", vec![recipe(&format!("meal-{i}"), &["rice"])]);
            bank.record_plan(&plan);
        }
        let entry = bank.household("smith").unwrap();
        assert_eq!(entry.history.len(), HISTORY_LIMIT);
        // Oldest plans evicted: the first retained plan is meal-5.
        assert_eq!(entry.history.front().unwrap().meals[0].recipe.name, "meal-5");
        assert_eq!(entry.history.back().unwrap().meals[0].recipe.name, "meal-14");
    }

    #[test]
    fn record_plan_bumps_preference_weights() {
        let mut bank = MemoryBank::new();
        let plan = plan_with(
            "smith",
            vec![recipe("stir fry", &["tofu"]), recipe("curry", &["rice"])],
        );
        bank.record_plan(&plan);

        let entry = bank.household("smith").unwrap();
        assert_eq!(entry.preference_weights.get("weeknight"), Some(&2));
        assert_eq!(entry.preference_weights.get("american"), Some(&2));
    }

    #[test]
    fn compact_context_is_idempotent() {
        let mut bank = MemoryBank::new();
        bank.record_plan(&plan_with(
            "smith",
            vec![recipe("soup", &["onion", "carrot"]), recipe("salad", &["onion"])],
        ));
        bank.add_dislike("smith", "cilantro");

        let conditions = vec!["diabetes".to_owned()];
        let first = bank.compact_context("smith", &conditions);
        let second = bank.compact_context("smith", &conditions);
        assert_eq!(first, second);
    }

    #[test]
    fn compact_context_ranks_frequent_ingredients() {
        let mut bank = MemoryBank::new();
        bank.record_plan(&plan_with(
            "smith",
            vec![
                recipe("a", &["onion", "rice"]),
                recipe("b", &["onion", "beans"]),
                recipe("c", &["onion", "rice"]),
            ],
        ));

        let summary = bank.compact_context("smith", &[]);
        assert_eq!(summary.frequent_ingredients[0], "onion");
        assert_eq!(summary.frequent_ingredients[1], "rice");
        assert_eq!(summary.plans_recorded, 1);
    }

    #[test]
    fn compact_context_bounds_output() {
        let mut bank = MemoryBank::new();
        // One recipe with far more distinct ingredients than the cap.
        let names: Vec<String> = (0..30).map(|i| format!("ingredient-{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        bank.record_plan(&plan_with("smith", vec![recipe("big", &refs)]));

        let summary = bank.compact_context("smith", &[]);
        assert_eq!(summary.frequent_ingredients.len(), COMPACT_TOP_INGREDIENTS);
    }

    #[test]
    fn compact_context_uses_latest_plan_meal_names() {
        let mut bank = MemoryBank::new();
        bank.record_plan(&plan_with("smith", vec![recipe("old dinner", &["rice"])]));
        bank.record_plan(&plan_with("smith", vec![recipe("new dinner", &["beans"])]));

        let summary = bank.compact_context("smith", &[]);
        assert_eq!(summary.recent_meal_names, vec!["new dinner"]);
    }

    #[test]
    fn compact_context_includes_guideline_facts() {
        let bank = MemoryBank::new();
        let summary = bank.compact_context("unknown", &["Diabetes".to_owned()]);
        assert_eq!(summary.guideline_facts.len(), 1);
        assert!(summary.guideline_facts[0].starts_with("diabetes: avoid"));
    }

    #[test]
    fn builtin_guidelines_are_present() {
        let bank = MemoryBank::new();
        let g = bank.guideline_for("DIABETES").expect("builtin guideline");
        assert!(g.avoid.iter().any(|a| a == "sugar"));
    }

    #[test]
    fn set_guideline_overrides() {
        let mut bank = MemoryBank::new();
        bank.set_guideline(
            "keto flu",
            Guideline {
                avoid: vec!["sugar".to_owned()],
                prefer: vec!["electrolytes".to_owned()],
            },
        );
        assert!(bank.guideline_for("keto flu").is_some());
    }

    #[test]
    fn dislikes_are_deduplicated() {
        let mut bank = MemoryBank::new();
        bank.add_dislike("smith", "Cilantro");
        bank.add_dislike("smith", "cilantro ");
        assert_eq!(bank.household("smith").unwrap().dislikes, vec!["cilantro"]);
    }

    #[test]
    fn add_favorite_ignores_duplicates() {
        let mut bank = MemoryBank::new();
        bank.add_favorite("smith", recipe("soup", &["onion"]));
        bank.add_favorite("smith", recipe("soup", &["onion"]));
        assert_eq!(bank.household("smith").unwrap().favorites.len(), 1);
    }
}
