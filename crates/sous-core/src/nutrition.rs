//! Nutrition lookup: the collaborator contract behind the validator's
//! calorie check, plus a reference-table implementation backed by data
//! embedded at compile time.

use serde::Deserialize;
use thiserror::Error;

use sous_store::models::{NutritionSummary, Recipe};

/// Errors from a nutrition lookup.
#[derive(Debug, Error)]
pub enum NutritionError {
    #[error("no nutrition data for ingredient {0:?}")]
    NotFound(String),
}

/// Nutrition facts for a specific amount of one ingredient.
#[derive(Debug, Clone, PartialEq)]
pub struct NutritionFacts {
    pub ingredient: String,
    pub amount_grams: f64,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

/// Collaborator contract for nutrition data.
///
/// Implementations must be cheap to call repeatedly; the validator looks up
/// every ingredient of every candidate recipe.
pub trait NutritionLookup: Send + Sync {
    /// Facts for `amount_grams` of the named ingredient.
    fn lookup(&self, ingredient: &str, amount_grams: f64) -> Result<NutritionFacts, NutritionError>;
}

// ---------------------------------------------------------------------------
// Embedded reference table
// ---------------------------------------------------------------------------

/// Per-100 g reference entry from the embedded table.
#[derive(Debug, Clone, Deserialize)]
struct FoodEntry {
    name: String,
    calories: f64,
    protein_g: f64,
    carbs_g: f64,
    fat_g: f64,
}

#[derive(Debug, Deserialize)]
struct FoodTable {
    foods: Vec<FoodEntry>,
}

static NUTRITION_TOML: &str = include_str!("nutrition.toml");

/// Nutrition lookup over the embedded per-100 g reference table.
///
/// Ingredient names are matched by substring in both directions, so
/// "chicken breast" resolves through the "chicken" entry.
#[derive(Debug)]
pub struct ReferenceTable {
    foods: Vec<FoodEntry>,
}

impl Default for ReferenceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceTable {
    /// Load the embedded table.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed. If the binary was built,
    /// the TOML is valid.
    pub fn new() -> Self {
        let table: FoodTable =
            toml::from_str(NUTRITION_TOML).expect("embedded nutrition.toml is invalid");
        Self { foods: table.foods }
    }

    fn find(&self, ingredient: &str) -> Option<&FoodEntry> {
        let needle = ingredient.trim().to_lowercase();
        // Prefer the longest matching entry so "sweet potato" beats "potato".
        self.foods
            .iter()
            .filter(|f| needle.contains(&f.name) || f.name.contains(&needle))
            .max_by_key(|f| f.name.len())
    }
}

impl NutritionLookup for ReferenceTable {
    fn lookup(&self, ingredient: &str, amount_grams: f64) -> Result<NutritionFacts, NutritionError> {
        let entry = self
            .find(ingredient)
            .ok_or_else(|| NutritionError::NotFound(ingredient.to_owned()))?;

        let scale = amount_grams / 100.0;
        Ok(NutritionFacts {
            ingredient: ingredient.to_owned(),
            amount_grams,
            calories: entry.calories * scale,
            protein_g: entry.protein_g * scale,
            carbs_g: entry.carbs_g * scale,
            fat_g: entry.fat_g * scale,
        })
    }
}

// ---------------------------------------------------------------------------
// Recipe totals
// ---------------------------------------------------------------------------

/// Estimate a recipe's per-serving nutrition.
///
/// Count units (pieces, cloves) carry no mass and are skipped; unknown
/// ingredients are skipped with a warning rather than failing the recipe,
/// so a missing table entry never blocks validation.
pub fn recipe_nutrition(recipe: &Recipe, lookup: &dyn NutritionLookup) -> NutritionSummary {
    let mut total = NutritionSummary::default();

    for ingredient in &recipe.ingredients {
        let Some(grams) = ingredient.approx_grams() else {
            continue;
        };
        match lookup.lookup(&ingredient.name, grams) {
            Ok(facts) => {
                total.calories += facts.calories;
                total.protein_g += facts.protein_g;
                total.carbs_g += facts.carbs_g;
                total.fat_g += facts.fat_g;
            }
            Err(e) => {
                tracing::warn!(
                    recipe = %recipe.name,
                    ingredient = %ingredient.name,
                    error = %e,
                    "skipping ingredient in nutrition estimate"
                );
            }
        }
    }

    let servings = recipe.servings.max(1) as f64;
    NutritionSummary {
        calories: total.calories / servings,
        protein_g: total.protein_g / servings,
        carbs_g: total.carbs_g / servings,
        fat_g: total.fat_g / servings,
    }
}
