//! Constraint aggregation: collapse a household's member profiles into the
//! constraint set one shared meal must satisfy.
//!
//! Derivation is a pure function over the live profile. There is no cache to
//! invalidate: adding an allergen to a member is reflected in the very next
//! call.

use serde::{Deserialize, Serialize};

use sous_store::memory::{CompactSummary, MemoryBank};
use sous_store::models::{HouseholdProfile, Member};
use sous_store::profiles::ProfileError;

/// The aggregated constraint set for one household meal.
///
/// Allergens, restrictions, conditions and dislikes are unions over all
/// members; the calorie target is the most restrictive bound. All sets are
/// sorted and deduplicated so derived values compare stably.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Constraints {
    pub allergens: Vec<String>,
    pub dietary_restrictions: Vec<String>,
    pub health_conditions: Vec<String>,
    pub disliked_ingredients: Vec<String>,
    /// Lowest daily calorie target across members, if any member has one.
    ///
    /// When members' targets conflict for a shared meal, the policy is to
    /// satisfy the most restrictive bound; members wanting more can add
    /// sides, but an over-target meal cannot be un-eaten.
    pub daily_calorie_target: Option<u32>,
    /// Per-day cooking time budget in minutes.
    pub max_cooking_time_minutes: u32,
}

/// Derive the aggregated constraints from a household's current members.
pub fn derive_constraints(profile: &HouseholdProfile) -> Constraints {
    let mut constraints = Constraints {
        max_cooking_time_minutes: profile.cooking_time_max_minutes,
        ..Constraints::default()
    };

    for member in &profile.members {
        constraints.allergens.extend(member.allergens.iter().cloned());
        constraints
            .dietary_restrictions
            .extend(member.dietary_restrictions.iter().cloned());
        constraints
            .health_conditions
            .extend(member.health_conditions.iter().cloned());
        constraints
            .disliked_ingredients
            .extend(member.dislikes.iter().cloned());

        constraints.daily_calorie_target = match (constraints.daily_calorie_target, member.calorie_target)
        {
            (Some(current), Some(target)) => Some(current.min(target)),
            (None, target) => target,
            (current, None) => current,
        };
    }

    sort_dedup(&mut constraints.allergens);
    sort_dedup(&mut constraints.dietary_restrictions);
    sort_dedup(&mut constraints.health_conditions);
    sort_dedup(&mut constraints.disliked_ingredients);

    tracing::debug!(
        household = %profile.id,
        allergens = constraints.allergens.len(),
        restrictions = constraints.dietary_restrictions.len(),
        calorie_target = ?constraints.daily_calorie_target,
        "constraints derived"
    );
    constraints
}

fn sort_dedup(values: &mut Vec<String>) {
    values.sort();
    values.dedup();
}

/// Check that a profile is complete enough to plan for.
pub fn ensure_plannable(profile: &HouseholdProfile) -> Result<(), ProfileError> {
    if profile.members.is_empty() {
        return Err(ProfileError::InvalidConfig(format!(
            "household {:?} has no members to plan for",
            profile.id
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Planning context
// ---------------------------------------------------------------------------

/// Per-member digest carried into the synthesis backend's context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub name: String,
    pub health_conditions: Vec<String>,
    pub dietary_restrictions: Vec<String>,
    pub allergens: Vec<String>,
    pub calorie_target: Option<u32>,
}

impl From<&Member> for MemberSummary {
    fn from(member: &Member) -> Self {
        Self {
            name: member.name.clone(),
            health_conditions: member.health_conditions.clone(),
            dietary_restrictions: member.dietary_restrictions.clone(),
            allergens: member.allergens.clone(),
            calorie_target: member.calorie_target,
        }
    }
}

/// Everything the synthesis backend may know about a household: member
/// digests, shared preferences, and the compacted memory summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningContext {
    pub household_id: String,
    pub members: Vec<MemberSummary>,
    pub cooking_time_max_minutes: u32,
    pub appliances: Vec<String>,
    pub budget_weekly: Option<f64>,
    pub cuisine_preferences: Vec<String>,
    pub memory: CompactSummary,
}

/// Build the planning context for a household, including compacted memory.
pub fn planning_context(profile: &HouseholdProfile, memory: &MemoryBank) -> PlanningContext {
    let constraints = derive_constraints(profile);
    PlanningContext {
        household_id: profile.id.clone(),
        members: profile.members.iter().map(MemberSummary::from).collect(),
        cooking_time_max_minutes: profile.cooking_time_max_minutes,
        appliances: profile.appliances.clone(),
        budget_weekly: profile.budget_weekly,
        cuisine_preferences: profile.cuisine_preferences.clone(),
        memory: memory.compact_context(&profile.id, &constraints.health_conditions),
    }
}
