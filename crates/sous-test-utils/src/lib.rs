//! Shared fixtures for sous integration tests.
//!
//! Provides a scripted synthesis backend whose outputs the test controls
//! attempt by attempt, plus household and recipe builders used across the
//! core and CLI test suites.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use sous_core::synthesis::{RecipeRequest, SynthesisError, Synthesizer};
use sous_store::models::{
    HouseholdSpec, Ingredient, MealSlot, MemberSpec, Recipe, Unit,
};
use sous_store::profiles::ProfileStore;

/// One scripted response for the synthesizer.
pub enum Scripted {
    Recipe(Recipe),
    Failure(String),
}

/// A synthesis backend that replays a fixed script of responses.
///
/// Responses are consumed in order; when the script runs out, the last
/// recipe in the script is repeated (or an error is returned if the script
/// never produced one). The backend records every call's feedback so tests
/// can assert on what the retry loop sent.
pub struct ScriptedSynthesizer {
    script: Mutex<Vec<Scripted>>,
    cursor: AtomicU32,
    calls: AtomicU32,
    feedback_log: Mutex<Vec<Option<String>>>,
}

impl ScriptedSynthesizer {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self {
            script: Mutex::new(script),
            cursor: AtomicU32::new(0),
            calls: AtomicU32::new(0),
            feedback_log: Mutex::new(Vec::new()),
        }
    }

    /// Backend that returns the same recipe on every call.
    pub fn always(recipe: Recipe) -> Self {
        Self::new(vec![Scripted::Recipe(recipe)])
    }

    /// Total number of synthesize calls made so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// The feedback string of every call, in call order.
    pub fn feedback_log(&self) -> Vec<Option<String>> {
        self.feedback_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl Synthesizer for ScriptedSynthesizer {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn synthesize(&self, request: &RecipeRequest) -> Result<Recipe, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.feedback_log
            .lock()
            .unwrap()
            .push(request.feedback.clone());

        let index = self.cursor.fetch_add(1, Ordering::SeqCst) as usize;
        let script = self.script.lock().unwrap();

        let entry = if index < script.len() {
            &script[index]
        } else {
            // Past the end: repeat the last scripted recipe if there is one.
            match script.iter().rev().find(|s| matches!(s, Scripted::Recipe(_))) {
                Some(entry) => entry,
                None => {
                    return Err(SynthesisError::Backend(
                        "script exhausted with no recipe to repeat".to_owned(),
                    ));
                }
            }
        };

        match entry {
            Scripted::Recipe(recipe) => {
                let mut recipe = recipe.clone();
                recipe.slot = request.slot;
                Ok(recipe)
            }
            Scripted::Failure(message) => Err(SynthesisError::Backend(message.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// A minimal recipe with gram-based ingredients.
pub fn recipe(name: &str, minutes: u32, ingredients: &[(&str, f64)]) -> Recipe {
    Recipe {
        name: name.to_owned(),
        slot: MealSlot::Dinner,
        cuisine: Some("test kitchen".to_owned()),
        cooking_time_minutes: minutes,
        servings: 4,
        ingredients: ingredients
            .iter()
            .map(|(n, amount)| Ingredient::new(*n, *amount, Unit::Grams))
            .collect(),
        instructions: vec!["combine and cook".to_owned()],
        tags: vec!["test".to_owned()],
        nutrition: None,
    }
}

/// A profile store holding one household with the given members.
pub fn household(id: &str, members: Vec<MemberSpec>) -> ProfileStore {
    let mut store = ProfileStore::new();
    store
        .create_household(HouseholdSpec::new(id))
        .expect("household fixture");
    for spec in members {
        store.add_member(id, spec).expect("member fixture");
    }
    store
}

/// A member spec with a peanut allergy.
pub fn peanut_allergic(name: &str) -> MemberSpec {
    MemberSpec {
        name: name.to_owned(),
        allergens: vec!["peanut".to_owned()],
        ..MemberSpec::default()
    }
}

/// A member spec with no constraints at all.
pub fn unconstrained(name: &str) -> MemberSpec {
    MemberSpec {
        name: name.to_owned(),
        ..MemberSpec::default()
    }
}
