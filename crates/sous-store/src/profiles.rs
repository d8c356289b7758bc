//! Household profile store.
//!
//! Owns every [`HouseholdProfile`] in the process. Profiles are mutated only
//! through the explicit operations here; constraint derivation (in
//! `sous-core`) always reads the live profile, so a member change is visible
//! to the very next derivation.

use std::collections::BTreeMap;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{HouseholdProfile, HouseholdSpec, Member, MemberSpec};

/// Errors from profile store operations.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("household {0:?} not found")]
    HouseholdNotFound(String),

    #[error("member {member:?} not found in household {household:?}")]
    MemberNotFound { household: String, member: String },

    #[error("household {0:?} already exists")]
    DuplicateHousehold(String),

    #[error("member {member:?} already exists in household {household:?}")]
    DuplicateMember { household: String, member: String },

    #[error("invalid profile config: {0}")]
    InvalidConfig(String),
}

/// In-process store of household profiles, keyed by household id.
///
/// A `BTreeMap` keeps iteration and snapshot serialization deterministic.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ProfileStore {
    households: BTreeMap<String, HouseholdProfile>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a household from a validated spec.
    pub fn create_household(&mut self, spec: HouseholdSpec) -> Result<&HouseholdProfile, ProfileError> {
        if spec.id.trim().is_empty() {
            return Err(ProfileError::InvalidConfig(
                "household id must not be blank".to_owned(),
            ));
        }
        if spec.cooking_time_max_minutes == 0 {
            return Err(ProfileError::InvalidConfig(
                "cooking time budget must be greater than zero".to_owned(),
            ));
        }
        if self.households.contains_key(&spec.id) {
            return Err(ProfileError::DuplicateHousehold(spec.id));
        }

        let id = spec.id.clone();
        let profile = HouseholdProfile {
            id: id.clone(),
            members: Vec::new(),
            cooking_time_max_minutes: spec.cooking_time_max_minutes,
            appliances: spec.appliances,
            budget_weekly: spec.budget_weekly,
            cuisine_preferences: spec.cuisine_preferences,
            created_at: Utc::now(),
        };

        tracing::info!(household = %id, "household created");
        Ok(self.households.entry(id).or_insert(profile))
    }

    /// Add a member to an existing household.
    pub fn add_member(&mut self, household_id: &str, spec: MemberSpec) -> Result<&Member, ProfileError> {
        let member = validate_member_spec(household_id, spec)?;

        let profile = self
            .households
            .get_mut(household_id)
            .ok_or_else(|| ProfileError::HouseholdNotFound(household_id.to_owned()))?;

        if profile.member(&member.name).is_some() {
            return Err(ProfileError::DuplicateMember {
                household: household_id.to_owned(),
                member: member.name,
            });
        }

        tracing::info!(
            household = %household_id,
            member = %member.name,
            allergens = member.allergens.len(),
            restrictions = member.dietary_restrictions.len(),
            "member added"
        );
        let idx = profile.members.len();
        profile.members.push(member);
        Ok(&profile.members[idx])
    }

    /// Replace an existing member's profile with a new spec.
    ///
    /// The spec's name must match the member being updated; renaming is not
    /// supported (remove and re-add instead).
    pub fn update_member(&mut self, household_id: &str, spec: MemberSpec) -> Result<&Member, ProfileError> {
        let member = validate_member_spec(household_id, spec)?;

        let profile = self
            .households
            .get_mut(household_id)
            .ok_or_else(|| ProfileError::HouseholdNotFound(household_id.to_owned()))?;

        let slot = profile
            .members
            .iter_mut()
            .find(|m| m.name == member.name)
            .ok_or_else(|| ProfileError::MemberNotFound {
                household: household_id.to_owned(),
                member: member.name.clone(),
            })?;

        tracing::info!(household = %household_id, member = %member.name, "member updated");
        *slot = member;
        Ok(slot)
    }

    /// Fetch a household profile.
    pub fn get(&self, household_id: &str) -> Result<&HouseholdProfile, ProfileError> {
        self.households
            .get(household_id)
            .ok_or_else(|| ProfileError::HouseholdNotFound(household_id.to_owned()))
    }

    /// Delete a household, returning its profile.
    pub fn remove(&mut self, household_id: &str) -> Result<HouseholdProfile, ProfileError> {
        let profile = self
            .households
            .remove(household_id)
            .ok_or_else(|| ProfileError::HouseholdNotFound(household_id.to_owned()))?;
        tracing::info!(household = %household_id, "household removed");
        Ok(profile)
    }

    /// List all household ids in deterministic order.
    pub fn list(&self) -> Vec<&str> {
        self.households.keys().map(|k| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.households.len()
    }

    pub fn is_empty(&self) -> bool {
        self.households.is_empty()
    }
}

/// Validate a member spec and normalize it into a [`Member`].
fn validate_member_spec(household_id: &str, spec: MemberSpec) -> Result<Member, ProfileError> {
    if spec.name.trim().is_empty() {
        return Err(ProfileError::InvalidConfig(format!(
            "member name must not be blank (household {household_id:?})"
        )));
    }
    if spec.calorie_target == Some(0) {
        return Err(ProfileError::InvalidConfig(format!(
            "calorie target for member {:?} must be greater than zero",
            spec.name
        )));
    }

    Ok(Member {
        name: spec.name.trim().to_owned(),
        health_conditions: normalize_set(spec.health_conditions),
        dietary_restrictions: normalize_set(spec.dietary_restrictions),
        allergens: normalize_set(spec.allergens),
        dislikes: normalize_set(spec.dislikes),
        calorie_target: spec.calorie_target,
    })
}

/// Lowercase, trim, dedup, and sort a string set for stable comparisons.
fn normalize_set(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = values
        .into_iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str) -> MemberSpec {
        MemberSpec {
            name: name.to_owned(),
            ..MemberSpec::default()
        }
    }

    #[test]
    fn create_and_get_household() {
        let mut store = ProfileStore::new();
        store.create_household(HouseholdSpec::new("smith")).unwrap();
        let profile = store.get("smith").unwrap();
        assert_eq!(profile.id, "smith");
        assert_eq!(profile.cooking_time_max_minutes, 45);
    }

    #[test]
    fn get_unknown_household_errors() {
        let store = ProfileStore::new();
        let err = store.get("nobody").unwrap_err();
        assert!(matches!(err, ProfileError::HouseholdNotFound(ref id) if id == "nobody"));
    }

    #[test]
    fn rejects_blank_household_id() {
        let mut store = ProfileStore::new();
        let err = store.create_household(HouseholdSpec::new("  ")).unwrap_err();
        assert!(matches!(err, ProfileError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_zero_cooking_time() {
        let mut store = ProfileStore::new();
        let mut spec = HouseholdSpec::new("smith");
        spec.cooking_time_max_minutes = 0;
        let err = store.create_household(spec).unwrap_err();
        assert!(matches!(err, ProfileError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_duplicate_household() {
        let mut store = ProfileStore::new();
        store.create_household(HouseholdSpec::new("smith")).unwrap();
        let err = store.create_household(HouseholdSpec::new("smith")).unwrap_err();
        assert!(matches!(err, ProfileError::DuplicateHousehold(_)));
    }

    #[test]
    fn add_member_and_look_up() {
        let mut store = ProfileStore::new();
        store.create_household(HouseholdSpec::new("smith")).unwrap();
        store
            .add_member(
                "smith",
                MemberSpec {
                    name: "Alice".to_owned(),
                    allergens: vec!["Peanut".to_owned(), "peanut".to_owned()],
                    calorie_target: Some(2000),
                    ..MemberSpec::default()
                },
            )
            .unwrap();

        let profile = store.get("smith").unwrap();
        let alice = profile.member("Alice").expect("member should exist");
        // Allergens are lowercased and deduplicated.
        assert_eq!(alice.allergens, vec!["peanut"]);
        assert_eq!(alice.calorie_target, Some(2000));
    }

    #[test]
    fn rejects_blank_member_name() {
        let mut store = ProfileStore::new();
        store.create_household(HouseholdSpec::new("smith")).unwrap();
        let err = store.add_member("smith", member("   ")).unwrap_err();
        assert!(matches!(err, ProfileError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_zero_calorie_target() {
        let mut store = ProfileStore::new();
        store.create_household(HouseholdSpec::new("smith")).unwrap();
        let mut spec = member("Alice");
        spec.calorie_target = Some(0);
        let err = store.add_member("smith", spec).unwrap_err();
        assert!(matches!(err, ProfileError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_duplicate_member() {
        let mut store = ProfileStore::new();
        store.create_household(HouseholdSpec::new("smith")).unwrap();
        store.add_member("smith", member("Alice")).unwrap();
        let err = store.add_member("smith", member("Alice")).unwrap_err();
        assert!(matches!(err, ProfileError::DuplicateMember { .. }));
    }

    #[test]
    fn add_member_to_unknown_household_errors() {
        let mut store = ProfileStore::new();
        let err = store.add_member("ghost", member("Alice")).unwrap_err();
        assert!(matches!(err, ProfileError::HouseholdNotFound(_)));
    }

    #[test]
    fn update_member_replaces_profile() {
        let mut store = ProfileStore::new();
        store.create_household(HouseholdSpec::new("smith")).unwrap();
        store.add_member("smith", member("Alice")).unwrap();

        let updated = MemberSpec {
            name: "Alice".to_owned(),
            allergens: vec!["shellfish".to_owned()],
            ..MemberSpec::default()
        };
        store.update_member("smith", updated).unwrap();

        let alice = store.get("smith").unwrap().member("Alice").unwrap();
        assert_eq!(alice.allergens, vec!["shellfish"]);
    }

    #[test]
    fn update_unknown_member_errors() {
        let mut store = ProfileStore::new();
        store.create_household(HouseholdSpec::new("smith")).unwrap();
        let err = store.update_member("smith", member("Bob")).unwrap_err();
        assert!(matches!(err, ProfileError::MemberNotFound { .. }));
    }

    #[test]
    fn remove_household() {
        let mut store = ProfileStore::new();
        store.create_household(HouseholdSpec::new("smith")).unwrap();
        store.remove("smith").unwrap();
        assert!(store.is_empty());
        assert!(store.get("smith").is_err());
    }

    #[test]
    fn list_is_sorted() {
        let mut store = ProfileStore::new();
        store.create_household(HouseholdSpec::new("zhang")).unwrap();
        store.create_household(HouseholdSpec::new("abel")).unwrap();
        assert_eq!(store.list(), vec!["abel", "zhang"]);
    }
}
