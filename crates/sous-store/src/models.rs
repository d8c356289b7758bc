use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// One meal position within a day.
///
/// The share each slot takes of a member's daily calorie target follows the
/// conventional 25/35/40 split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealSlot {
    /// All slots in day order.
    pub const ALL: [MealSlot; 3] = [MealSlot::Breakfast, MealSlot::Lunch, MealSlot::Dinner];

    /// Fraction of the daily calorie target expected from this slot.
    pub fn share_of_day(self) -> f64 {
        match self {
            Self::Breakfast => 0.25,
            Self::Lunch => 0.35,
            Self::Dinner => 0.40,
        }
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
        };
        f.write_str(s)
    }
}

impl FromStr for MealSlot {
    type Err = MealSlotParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            other => Err(MealSlotParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`MealSlot`] string.
#[derive(Debug, Clone)]
pub struct MealSlotParseError(pub String);

impl fmt::Display for MealSlotParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid meal slot: {:?}", self.0)
    }
}

impl std::error::Error for MealSlotParseError {}

// ---------------------------------------------------------------------------

/// Measurement unit for a recipe ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Grams,
    Kilograms,
    Milliliters,
    Liters,
    Tablespoons,
    Teaspoons,
    Cups,
    Pieces,
    Cloves,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Grams => "g",
            Self::Kilograms => "kg",
            Self::Milliliters => "ml",
            Self::Liters => "l",
            Self::Tablespoons => "tbsp",
            Self::Teaspoons => "tsp",
            Self::Cups => "cup",
            Self::Pieces => "piece",
            Self::Cloves => "clove",
        };
        f.write_str(s)
    }
}

impl FromStr for Unit {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "g" | "gram" | "grams" => Ok(Self::Grams),
            "kg" | "kilogram" | "kilograms" => Ok(Self::Kilograms),
            "ml" | "milliliter" | "milliliters" => Ok(Self::Milliliters),
            "l" | "liter" | "liters" => Ok(Self::Liters),
            "tbsp" | "tablespoon" | "tablespoons" => Ok(Self::Tablespoons),
            "tsp" | "teaspoon" | "teaspoons" => Ok(Self::Teaspoons),
            "cup" | "cups" => Ok(Self::Cups),
            "piece" | "pieces" => Ok(Self::Pieces),
            "clove" | "cloves" => Ok(Self::Cloves),
            other => Err(UnitParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Unit`] string.
#[derive(Debug, Clone)]
pub struct UnitParseError(pub String);

impl fmt::Display for UnitParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid unit: {:?}", self.0)
    }
}

impl std::error::Error for UnitParseError {}

// ---------------------------------------------------------------------------
// Recipe types
// ---------------------------------------------------------------------------

/// A single ingredient line in a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub amount: f64,
    pub unit: Unit,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, amount: f64, unit: Unit) -> Self {
        Self {
            name: name.into(),
            amount,
            unit,
        }
    }

    /// Lowercased, trimmed name used for matching and aggregation.
    pub fn normalized_name(&self) -> String {
        self.name.trim().to_lowercase()
    }

    /// Approximate mass in grams, `None` for count units.
    ///
    /// Volumes are treated as water-dense (1 ml = 1 g), the same
    /// approximation the nutrition reference data uses.
    pub fn approx_grams(&self) -> Option<f64> {
        let factor = match self.unit {
            Unit::Grams | Unit::Milliliters => 1.0,
            Unit::Kilograms | Unit::Liters => 1000.0,
            Unit::Tablespoons => 15.0,
            Unit::Teaspoons => 5.0,
            Unit::Cups => 240.0,
            Unit::Pieces | Unit::Cloves => return None,
        };
        Some(self.amount * factor)
    }
}

/// Estimated per-serving nutrition for a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NutritionSummary {
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

/// A candidate or accepted recipe.
///
/// Recipes are immutable once validated: every retry attempt produces a new
/// instance rather than mutating the rejected one, so the audit trail of a
/// slot's attempts stays intact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub slot: MealSlot,
    #[serde(default)]
    pub cuisine: Option<String>,
    pub cooking_time_minutes: u32,
    pub servings: u32,
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub nutrition: Option<NutritionSummary>,
}

// ---------------------------------------------------------------------------
// Plan types
// ---------------------------------------------------------------------------

/// One accepted meal within a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedMeal {
    /// 1-based day index within the plan horizon.
    pub day: u32,
    pub slot: MealSlot,
    pub recipe: Recipe,
}

/// A completed meal plan for a household.
///
/// Meals are kept in `(day, slot)` order. The plan grows only during
/// generation; once handed to the caller it is read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: Uuid,
    pub household_id: String,
    pub created_at: DateTime<Utc>,
    /// Number of days the caller requested, even if some slots failed.
    pub days: u32,
    pub meals: Vec<PlannedMeal>,
}

impl MealPlan {
    pub fn new(household_id: impl Into<String>, days: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            household_id: household_id.into(),
            created_at: Utc::now(),
            days,
            meals: Vec::new(),
        }
    }

    /// Iterate over every recipe in plan order.
    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.meals.iter().map(|m| &m.recipe)
    }

    /// Label for a meal, used by grocery and optimizer reports.
    pub fn meal_label(meal: &PlannedMeal) -> String {
        format!("day {} {} - {}", meal.day, meal.slot, meal.recipe.name)
    }
}

// ---------------------------------------------------------------------------
// Household types
// ---------------------------------------------------------------------------

/// Input for creating or updating a household member.
///
/// Validated by the profile store before it becomes a [`Member`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemberSpec {
    pub name: String,
    #[serde(default)]
    pub health_conditions: Vec<String>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub allergens: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
    #[serde(default)]
    pub calorie_target: Option<u32>,
}

/// A household member with their dietary profile.
///
/// Only the profile store constructs these, from a validated [`MemberSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub health_conditions: Vec<String>,
    pub dietary_restrictions: Vec<String>,
    pub allergens: Vec<String>,
    pub dislikes: Vec<String>,
    pub calorie_target: Option<u32>,
}

/// Input for creating a household.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseholdSpec {
    pub id: String,
    #[serde(default = "default_cooking_time")]
    pub cooking_time_max_minutes: u32,
    #[serde(default)]
    pub appliances: Vec<String>,
    #[serde(default)]
    pub budget_weekly: Option<f64>,
    #[serde(default)]
    pub cuisine_preferences: Vec<String>,
}

fn default_cooking_time() -> u32 {
    45
}

impl HouseholdSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cooking_time_max_minutes: default_cooking_time(),
            appliances: Vec::new(),
            budget_weekly: None,
            cuisine_preferences: Vec::new(),
        }
    }
}

/// A household profile: shared constraints plus an ordered member list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HouseholdProfile {
    pub id: String,
    pub members: Vec<Member>,
    /// Total cooking-time budget per day, in minutes.
    pub cooking_time_max_minutes: u32,
    pub appliances: Vec<String>,
    pub budget_weekly: Option<f64>,
    pub cuisine_preferences: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl HouseholdProfile {
    /// Look up a member by name.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meal_slot_display_roundtrip() {
        for slot in MealSlot::ALL {
            let s = slot.to_string();
            let parsed: MealSlot = s.parse().expect("should parse");
            assert_eq!(slot, parsed);
        }
    }

    #[test]
    fn meal_slot_invalid() {
        assert!("brunch".parse::<MealSlot>().is_err());
    }

    #[test]
    fn meal_slot_shares_sum_to_one() {
        let total: f64 = MealSlot::ALL.iter().map(|s| s.share_of_day()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unit_display_roundtrip() {
        let variants = [
            Unit::Grams,
            Unit::Kilograms,
            Unit::Milliliters,
            Unit::Liters,
            Unit::Tablespoons,
            Unit::Teaspoons,
            Unit::Cups,
            Unit::Pieces,
            Unit::Cloves,
        ];
        for v in &variants {
            let s = v.to_string();
            let parsed: Unit = s.parse().expect("should parse");
            assert_eq!(*v, parsed);
        }
    }

    #[test]
    fn unit_accepts_long_forms() {
        assert_eq!("grams".parse::<Unit>().unwrap(), Unit::Grams);
        assert_eq!("tablespoons".parse::<Unit>().unwrap(), Unit::Tablespoons);
        assert_eq!("cloves".parse::<Unit>().unwrap(), Unit::Cloves);
    }

    #[test]
    fn unit_invalid() {
        assert!("handful".parse::<Unit>().is_err());
    }

    #[test]
    fn ingredient_grams_conversion() {
        assert_eq!(
            Ingredient::new("rice", 2.0, Unit::Kilograms).approx_grams(),
            Some(2000.0)
        );
        assert_eq!(
            Ingredient::new("oil", 2.0, Unit::Tablespoons).approx_grams(),
            Some(30.0)
        );
        assert_eq!(
            Ingredient::new("garlic", 2.0, Unit::Cloves).approx_grams(),
            None
        );
    }

    #[test]
    fn ingredient_normalized_name() {
        let ing = Ingredient::new("  Bell Pepper ", 100.0, Unit::Grams);
        assert_eq!(ing.normalized_name(), "bell pepper");
    }

    #[test]
    fn meal_plan_starts_empty() {
        let plan = MealPlan::new("smith", 7);
        assert_eq!(plan.days, 7);
        assert!(plan.meals.is_empty());
        assert_eq!(plan.household_id, "smith");
    }
}
