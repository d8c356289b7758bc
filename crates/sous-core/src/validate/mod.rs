//! Compliance validator: checks a candidate recipe against a household's
//! aggregated constraints and records every violation it finds.
//!
//! Checks run in a fixed priority order (allergen, restriction, health,
//! calorie, time) and never short-circuit: a recipe that trips the allergen
//! check is still checked for everything else, so the feedback handed back
//! to the synthesis backend lists the complete set of problems at once.

pub mod feedback;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use sous_store::memory::Guideline;
use sous_store::models::{NutritionSummary, Recipe};

use crate::constraints::Constraints;
use crate::nutrition::{NutritionLookup, recipe_nutrition};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Category of a compliance finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Allergen,
    Restriction,
    Health,
    Calorie,
    Time,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Allergen => "allergen",
            Self::Restriction => "restriction",
            Self::Health => "health",
            Self::Calorie => "calorie",
            Self::Time => "time",
        };
        f.write_str(s)
    }
}

impl FromStr for ViolationKind {
    type Err = ViolationKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allergen" => Ok(Self::Allergen),
            "restriction" => Ok(Self::Restriction),
            "health" => Ok(Self::Health),
            "calorie" => Ok(Self::Calorie),
            "time" => Ok(Self::Time),
            other => Err(ViolationKindParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`ViolationKind`] string.
#[derive(Debug, Clone)]
pub struct ViolationKindParseError(pub String);

impl fmt::Display for ViolationKindParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid violation kind: {:?}", self.0)
    }
}

impl std::error::Error for ViolationKindParseError {}

/// A hard constraint breach. Any violation blocks acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub detail: String,
    /// The ingredient or field that triggered the finding, when one exists.
    pub offender: Option<String>,
}

/// A soft deviation. Warnings are reported but never block acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: ViolationKind,
    pub detail: String,
}

/// The outcome of validating one candidate recipe.
///
/// One instance per validation attempt; consumed immediately to either
/// accept the recipe or build feedback for the next attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True iff there are zero hard violations.
    pub compliant: bool,
    pub violations: Vec<Violation>,
    pub warnings: Vec<Warning>,
    /// Per-serving nutrition computed during the calorie check.
    pub nutrition: NutritionSummary,
}

/// Calorie tolerance bands, as fractions of the slot's expected calories.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorConfig {
    /// Deviations beyond this fraction produce a warning.
    pub soft_calorie_tolerance: f64,
    /// Deviations beyond this fraction produce a hard violation.
    pub hard_calorie_tolerance: f64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            soft_calorie_tolerance: 0.15,
            hard_calorie_tolerance: 0.40,
        }
    }
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Validates candidate recipes against aggregated household constraints.
///
/// Holds its own copy of the condition-to-guideline mapping so validation
/// can run inside spawned slot tasks without touching the memory bank.
pub struct ComplianceValidator {
    config: ValidatorConfig,
    lookup: Arc<dyn NutritionLookup>,
    guidelines: BTreeMap<String, Guideline>,
}

impl ComplianceValidator {
    pub fn new(
        config: ValidatorConfig,
        lookup: Arc<dyn NutritionLookup>,
        guidelines: BTreeMap<String, Guideline>,
    ) -> Self {
        Self {
            config,
            lookup,
            guidelines,
        }
    }

    /// Run every check against `recipe` and collect all findings.
    pub fn validate(&self, recipe: &Recipe, constraints: &Constraints) -> ValidationResult {
        let mut violations = Vec::new();
        let mut warnings = Vec::new();

        self.check_allergens(recipe, constraints, &mut violations);
        self.check_restrictions(recipe, constraints, &mut violations);
        self.check_health_conditions(recipe, constraints, &mut violations, &mut warnings);
        let nutrition = self.check_calories(recipe, constraints, &mut violations, &mut warnings);
        self.check_cooking_time(recipe, constraints, &mut violations);

        let compliant = violations.is_empty();
        tracing::debug!(
            recipe = %recipe.name,
            compliant,
            violations = violations.len(),
            warnings = warnings.len(),
            "recipe validated"
        );

        ValidationResult {
            compliant,
            violations,
            warnings,
            nutrition,
        }
    }

    /// Check 1: no ingredient may match a declared allergen.
    fn check_allergens(
        &self,
        recipe: &Recipe,
        constraints: &Constraints,
        violations: &mut Vec<Violation>,
    ) {
        for ingredient in &recipe.ingredients {
            let name = ingredient.normalized_name();
            if constraints.allergens.iter().any(|a| name.contains(a.as_str())) {
                violations.push(Violation {
                    kind: ViolationKind::Allergen,
                    detail: format!("ingredient {:?} is a declared allergen", ingredient.name),
                    offender: Some(ingredient.name.clone()),
                });
            }
        }
    }

    /// Check 2: no ingredient may conflict with a dietary restriction.
    fn check_restrictions(
        &self,
        recipe: &Recipe,
        constraints: &Constraints,
        violations: &mut Vec<Violation>,
    ) {
        for restriction in &constraints.dietary_restrictions {
            let forbidden = forbidden_ingredients(restriction);
            for ingredient in &recipe.ingredients {
                let name = ingredient.normalized_name();
                if forbidden.iter().any(|f| name.contains(f)) {
                    violations.push(Violation {
                        kind: ViolationKind::Restriction,
                        detail: format!(
                            "{restriction} meal cannot include {:?}",
                            ingredient.name
                        ),
                        offender: Some(ingredient.name.clone()),
                    });
                }
            }
        }
    }

    /// Check 3: health-condition guidelines (avoid lists are hard, missing
    /// preferred ingredients only warn).
    fn check_health_conditions(
        &self,
        recipe: &Recipe,
        constraints: &Constraints,
        violations: &mut Vec<Violation>,
        warnings: &mut Vec<Warning>,
    ) {
        for condition in &constraints.health_conditions {
            let Some(guideline) = self.guidelines.get(condition) else {
                continue;
            };

            for ingredient in &recipe.ingredients {
                let name = ingredient.normalized_name();
                if guideline.avoid.iter().any(|a| name.contains(a.as_str())) {
                    violations.push(Violation {
                        kind: ViolationKind::Health,
                        detail: format!(
                            "{condition} guideline says avoid {:?}",
                            ingredient.name
                        ),
                        offender: Some(ingredient.name.clone()),
                    });
                }
            }

            let has_preferred = recipe.ingredients.iter().any(|i| {
                let name = i.normalized_name();
                guideline.prefer.iter().any(|p| name.contains(p.as_str()))
            });
            if !has_preferred && !guideline.prefer.is_empty() {
                warnings.push(Warning {
                    kind: ViolationKind::Health,
                    detail: format!(
                        "{condition}: consider including {}",
                        guideline.prefer.join(" or ")
                    ),
                });
            }
        }
    }

    /// Check 4: per-serving calories against the slot's share of the daily
    /// target. Soft band deviation warns; hard band deviation violates.
    fn check_calories(
        &self,
        recipe: &Recipe,
        constraints: &Constraints,
        violations: &mut Vec<Violation>,
        warnings: &mut Vec<Warning>,
    ) -> NutritionSummary {
        let nutrition = recipe_nutrition(recipe, self.lookup.as_ref());

        let Some(daily_target) = constraints.daily_calorie_target else {
            return nutrition;
        };
        let expected = daily_target as f64 * recipe.slot.share_of_day();
        if expected <= 0.0 {
            return nutrition;
        }

        let deviation = (nutrition.calories - expected).abs() / expected;
        let direction = if nutrition.calories > expected { "over" } else { "under" };
        if deviation > self.config.hard_calorie_tolerance {
            violations.push(Violation {
                kind: ViolationKind::Calorie,
                detail: format!(
                    "{:.0} kcal per serving is {:.0}% {direction} the {:.0} kcal slot target",
                    nutrition.calories,
                    deviation * 100.0,
                    expected
                ),
                offender: None,
            });
        } else if deviation > self.config.soft_calorie_tolerance {
            warnings.push(Warning {
                kind: ViolationKind::Calorie,
                detail: format!(
                    "{:.0} kcal per serving is {:.0}% {direction} the {:.0} kcal slot target",
                    nutrition.calories,
                    deviation * 100.0,
                    expected
                ),
            });
        }

        nutrition
    }

    /// Check 5: cooking time within the household budget.
    fn check_cooking_time(
        &self,
        recipe: &Recipe,
        constraints: &Constraints,
        violations: &mut Vec<Violation>,
    ) {
        if recipe.cooking_time_minutes > constraints.max_cooking_time_minutes {
            violations.push(Violation {
                kind: ViolationKind::Time,
                detail: format!(
                    "cooking time {} min exceeds the {} min budget",
                    recipe.cooking_time_minutes, constraints.max_cooking_time_minutes
                ),
                offender: Some("cooking_time_minutes".to_owned()),
            });
        }
    }
}

/// Ingredients that conflict with a named dietary restriction.
pub fn forbidden_ingredients(restriction: &str) -> &'static [&'static str] {
    match restriction {
        "vegan" => &[
            "meat", "chicken", "beef", "pork", "fish", "salmon", "shrimp", "egg", "milk",
            "cheese", "feta", "butter", "cream", "yogurt", "honey",
        ],
        "vegetarian" => &[
            "meat", "chicken", "beef", "pork", "fish", "salmon", "shrimp", "bacon",
        ],
        "gluten-free" => &["wheat", "bread", "pasta", "flour", "barley", "rye"],
        "dairy-free" => &["milk", "cheese", "feta", "butter", "cream", "yogurt"],
        "keto" => &["rice", "pasta", "bread", "potato", "sugar", "honey"],
        "low-carb" => &["rice", "pasta", "bread", "potato"],
        _ => &[],
    }
}
