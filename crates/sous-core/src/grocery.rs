//! Grocery list aggregation: collapse a plan's ingredient occurrences into
//! a deduplicated, categorized, priced shopping list.
//!
//! Occurrences are grouped by normalized name; amounts are summed after
//! converting compatible units through a fixed conversion table. Two
//! occurrences of the same ingredient whose units cannot be reconciled are
//! an error, not a silent guess.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sous_store::models::{MealPlan, Unit};

use crate::cost::{CostEstimator, Quantity};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Errors from grocery aggregation.
#[derive(Debug, Error)]
pub enum GroceryError {
    #[error(
        "cannot reconcile units for {ingredient:?}: {left} vs {right} with no conversion entry"
    )]
    UnitMismatch {
        ingredient: String,
        left: Unit,
        right: Unit,
    },
}

/// Dimension an ingredient's total is tracked in.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Measure {
    /// Grams; all mass and volume units fold into this (1 ml = 1 g).
    Grams,
    /// A count of discrete items in one specific unit.
    Count(Unit),
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grams => f.write_str("g"),
            Self::Count(unit) => write!(f, "{unit}"),
        }
    }
}

/// One deduplicated line of the shopping list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryItem {
    pub name: String,
    pub total_amount: f64,
    /// Display unit: "g" for mass/volume totals, the count unit otherwise.
    pub unit: String,
    /// Aisle category for shopping order.
    pub category: String,
    pub estimated_cost: f64,
    /// Labels of the meals this ingredient appears in.
    pub used_in: Vec<String>,
}

/// The aggregated shopping list for a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryList {
    /// Items sorted by category, then name.
    pub items: Vec<GroceryItem>,
    pub unique_items: usize,
    pub total_estimated_cost: f64,
    /// The household's weekly budget, when one is set.
    pub budget: Option<f64>,
}

impl GroceryList {
    /// Amount the estimate exceeds the budget by, if it does.
    pub fn over_budget_by(&self) -> Option<f64> {
        let budget = self.budget?;
        (self.total_estimated_cost > budget).then(|| self.total_estimated_cost - budget)
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

struct Accumulator {
    measure: Measure,
    amount: f64,
    used_in: Vec<String>,
    /// Unit of the first occurrence, kept for mismatch reporting.
    first_unit: Unit,
}

/// Build the shopping list for a completed plan.
pub fn aggregate_grocery_list(
    plan: &MealPlan,
    estimator: &dyn CostEstimator,
    budget: Option<f64>,
) -> Result<GroceryList, GroceryError> {
    let mut totals: BTreeMap<String, Accumulator> = BTreeMap::new();

    for meal in &plan.meals {
        let label = MealPlan::meal_label(meal);
        for ingredient in &meal.recipe.ingredients {
            let name = ingredient.normalized_name();
            let (measure, amount) = match ingredient.approx_grams() {
                Some(grams) => (Measure::Grams, grams),
                None => (Measure::Count(ingredient.unit), ingredient.amount),
            };

            match totals.entry(name) {
                Entry::Vacant(entry) => {
                    entry.insert(Accumulator {
                        measure,
                        amount,
                        used_in: vec![label.clone()],
                        first_unit: ingredient.unit,
                    });
                }
                Entry::Occupied(mut entry) => {
                    let acc = entry.get_mut();
                    if acc.measure != measure {
                        return Err(GroceryError::UnitMismatch {
                            ingredient: ingredient.name.clone(),
                            left: acc.first_unit,
                            right: ingredient.unit,
                        });
                    }
                    acc.amount += amount;
                    acc.used_in.push(label.clone());
                }
            }
        }
    }

    let mut items: Vec<GroceryItem> = totals
        .into_iter()
        .map(|(name, acc)| {
            let quantity = match acc.measure {
                Measure::Grams => Quantity::Grams(acc.amount),
                Measure::Count(_) => Quantity::Count(acc.amount),
            };
            let estimated_cost = estimator.estimate(&name, quantity);
            GroceryItem {
                category: categorize(&name).to_owned(),
                unit: acc.measure.to_string(),
                total_amount: (acc.amount * 10.0).round() / 10.0,
                estimated_cost,
                used_in: acc.used_in,
                name,
            }
        })
        .collect();

    items.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));

    let total_estimated_cost =
        (items.iter().map(|i| i.estimated_cost).sum::<f64>() * 100.0).round() / 100.0;

    let list = GroceryList {
        unique_items: items.len(),
        items,
        total_estimated_cost,
        budget,
    };

    tracing::info!(
        plan = %plan.id,
        unique_items = list.unique_items,
        total_cost = list.total_estimated_cost,
        "grocery list aggregated"
    );
    Ok(list)
}

/// Aisle category for an ingredient name.
fn categorize(name: &str) -> &'static str {
    const TABLE: &[(&str, &str)] = &[
        ("chicken", "meat & seafood"),
        ("beef", "meat & seafood"),
        ("pork", "meat & seafood"),
        ("salmon", "meat & seafood"),
        ("fish", "meat & seafood"),
        ("shrimp", "meat & seafood"),
        ("tofu", "meat & seafood"),
        ("egg", "dairy & eggs"),
        ("milk", "dairy & eggs"),
        ("cheese", "dairy & eggs"),
        ("feta", "dairy & eggs"),
        ("yogurt", "dairy & eggs"),
        ("butter", "dairy & eggs"),
        ("broccoli", "produce"),
        ("spinach", "produce"),
        ("carrot", "produce"),
        ("tomato", "produce"),
        ("onion", "produce"),
        ("garlic", "produce"),
        ("pepper", "produce"),
        ("cucumber", "produce"),
        ("zucchini", "produce"),
        ("mushroom", "produce"),
        ("greens", "produce"),
        ("peas", "produce"),
        ("avocado", "produce"),
        ("lemon", "produce"),
        ("banana", "produce"),
        ("blueberr", "produce"),
        ("apple", "produce"),
        ("potato", "produce"),
        ("ginger", "produce"),
        ("rice", "grains & pasta"),
        ("quinoa", "grains & pasta"),
        ("pasta", "grains & pasta"),
        ("oats", "grains & pasta"),
        ("bread", "bakery"),
        ("tortilla", "bakery"),
        ("lentil", "pantry"),
        ("bean", "pantry"),
        ("chickpea", "pantry"),
        ("walnut", "pantry"),
        ("almond", "pantry"),
        ("peanut", "pantry"),
        ("oil", "oils & condiments"),
        ("soy sauce", "oils & condiments"),
        ("vinegar", "oils & condiments"),
        ("honey", "oils & condiments"),
        ("salt", "spices"),
        ("cumin", "spices"),
        ("cinnamon", "spices"),
        ("paprika", "spices"),
    ];

    TABLE
        .iter()
        .find(|(key, _)| name.contains(key))
        .map(|(_, category)| *category)
        .unwrap_or("other")
}

#[cfg(test)]
mod tests {
    use super::*;
    use sous_store::models::{Ingredient, MealSlot, PlannedMeal, Recipe};

    use crate::cost::PriceBook;

    fn meal(day: u32, name: &str, ingredients: Vec<Ingredient>) -> PlannedMeal {
        PlannedMeal {
            day,
            slot: MealSlot::Dinner,
            recipe: Recipe {
                name: name.to_owned(),
                slot: MealSlot::Dinner,
                cuisine: None,
                cooking_time_minutes: 30,
                servings: 4,
                ingredients,
                instructions: Vec::new(),
                tags: Vec::new(),
                nutrition: None,
            },
        }
    }

    fn plan(meals: Vec<PlannedMeal>) -> MealPlan {
        let mut plan = MealPlan::new("smith", 7);
        plan.meals = meals;
        plan
    }

    #[test]
    fn same_ingredient_merges_across_recipes() {
        let p = plan(vec![
            meal(1, "soup", vec![Ingredient::new("onion", 100.0, Unit::Grams)]),
            meal(2, "salad", vec![Ingredient::new("Onion", 50.0, Unit::Grams)]),
        ]);
        let list = aggregate_grocery_list(&p, &PriceBook::new(), None).unwrap();

        assert_eq!(list.unique_items, 1);
        let onion = &list.items[0];
        assert_eq!(onion.name, "onion");
        assert!((onion.total_amount - 150.0).abs() < 1e-9);
        assert_eq!(onion.used_in.len(), 2);
    }

    #[test]
    fn compatible_units_convert_before_summing() {
        let p = plan(vec![
            meal(1, "a", vec![Ingredient::new("rice", 1.0, Unit::Kilograms)]),
            meal(2, "b", vec![Ingredient::new("rice", 500.0, Unit::Grams)]),
        ]);
        let list = aggregate_grocery_list(&p, &PriceBook::new(), None).unwrap();
        assert!((list.items[0].total_amount - 1500.0).abs() < 1e-9);
        assert_eq!(list.items[0].unit, "g");
    }

    #[test]
    fn volume_units_fold_into_grams() {
        let p = plan(vec![
            meal(1, "a", vec![Ingredient::new("olive oil", 2.0, Unit::Tablespoons)]),
            meal(2, "b", vec![Ingredient::new("olive oil", 20.0, Unit::Milliliters)]),
        ]);
        let list = aggregate_grocery_list(&p, &PriceBook::new(), None).unwrap();
        assert!((list.items[0].total_amount - 50.0).abs() < 1e-9);
    }

    #[test]
    fn incompatible_units_error() {
        let p = plan(vec![
            meal(1, "a", vec![Ingredient::new("garlic", 2.0, Unit::Cloves)]),
            meal(2, "b", vec![Ingredient::new("garlic", 50.0, Unit::Grams)]),
        ]);
        let err = aggregate_grocery_list(&p, &PriceBook::new(), None).unwrap_err();
        match err {
            GroceryError::UnitMismatch {
                ingredient,
                left,
                right,
            } => {
                assert_eq!(ingredient, "garlic");
                assert_eq!(left, Unit::Cloves);
                assert_eq!(right, Unit::Grams);
            }
        }
    }

    #[test]
    fn count_units_sum_as_counts() {
        let p = plan(vec![
            meal(1, "a", vec![Ingredient::new("lemon", 2.0, Unit::Pieces)]),
            meal(2, "b", vec![Ingredient::new("lemon", 1.0, Unit::Pieces)]),
        ]);
        let list = aggregate_grocery_list(&p, &PriceBook::new(), None).unwrap();
        assert!((list.items[0].total_amount - 3.0).abs() < 1e-9);
        assert_eq!(list.items[0].unit, "piece");
    }

    #[test]
    fn items_sorted_by_category_then_name() {
        let p = plan(vec![meal(
            1,
            "mixed",
            vec![
                Ingredient::new("rice", 100.0, Unit::Grams),
                Ingredient::new("chicken breast", 100.0, Unit::Grams),
                Ingredient::new("carrot", 100.0, Unit::Grams),
            ],
        )]);
        let list = aggregate_grocery_list(&p, &PriceBook::new(), None).unwrap();
        let categories: Vec<&str> = list.items.iter().map(|i| i.category.as_str()).collect();
        let mut sorted = categories.clone();
        sorted.sort();
        assert_eq!(categories, sorted);
    }

    #[test]
    fn total_cost_sums_items() {
        let p = plan(vec![meal(
            1,
            "a",
            vec![
                Ingredient::new("rice", 1000.0, Unit::Grams),
                Ingredient::new("onion", 1000.0, Unit::Grams),
            ],
        )]);
        let list = aggregate_grocery_list(&p, &PriceBook::new(), None).unwrap();
        // 3.00 for a kilogram of rice + 3.00 for a kilogram of onion.
        assert!((list.total_estimated_cost - 6.0).abs() < 1e-9);
    }

    #[test]
    fn over_budget_is_reported() {
        let p = plan(vec![meal(
            1,
            "a",
            vec![Ingredient::new("salmon", 2000.0, Unit::Grams)],
        )]);
        let list = aggregate_grocery_list(&p, &PriceBook::new(), Some(10.0)).unwrap();
        let over = list.over_budget_by().expect("should exceed budget");
        assert!(over > 0.0);
    }

    #[test]
    fn within_budget_reports_none() {
        let p = plan(vec![meal(
            1,
            "a",
            vec![Ingredient::new("rice", 100.0, Unit::Grams)],
        )]);
        let list = aggregate_grocery_list(&p, &PriceBook::new(), Some(100.0)).unwrap();
        assert!(list.over_budget_by().is_none());
    }
}
