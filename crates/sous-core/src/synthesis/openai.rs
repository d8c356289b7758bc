//! OpenAI-compatible synthesis backend (`/v1/chat/completions`).
//!
//! Speaks to any endpoint implementing the OpenAI chat completions shape:
//! hosted APIs or local servers. All wire types are private to this module;
//! the rest of the pipeline only sees [`Synthesizer`]. The model is asked
//! for strict JSON; fenced code blocks are tolerated and stripped.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use sous_store::models::{Ingredient, Recipe, Unit};

use super::{RecipeRequest, SynthesisError, Synthesizer};

/// Backend for OpenAI-compatible chat completion endpoints.
///
/// Constructed once at startup, then cheaply cloned: `reqwest::Client` is
/// an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiSynthesizer {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    timeout_seconds: u64,
    api_key: Option<String>,
}

impl OpenAiSynthesizer {
    /// Build a backend from config values and an optional API key.
    ///
    /// `api_key` is `None` for keyless local servers. When present it is
    /// sent as `Authorization: Bearer <key>` on every request.
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| SynthesisError::Backend(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base_url,
            model,
            temperature,
            timeout_seconds,
            api_key,
        })
    }

    /// Assemble the user prompt from constraints, context, and feedback.
    fn build_prompt(request: &RecipeRequest) -> String {
        let c = &request.constraints;
        let ctx = &request.context;

        let mut prompt = format!(
            "Generate a {} recipe for a household of {} people.\n",
            request.slot,
            ctx.members.len().max(1)
        );

        for member in &ctx.members {
            prompt.push_str(&format!("- {}", member.name));
            if !member.health_conditions.is_empty() {
                prompt.push_str(&format!(" (health: {})", member.health_conditions.join(", ")));
            }
            if !member.dietary_restrictions.is_empty() {
                prompt.push_str(&format!(" (diet: {})", member.dietary_restrictions.join(", ")));
            }
            prompt.push('\n');
        }

        if !c.allergens.is_empty() {
            prompt.push_str(&format!("MUST NOT contain: {}\n", c.allergens.join(", ")));
        }
        if !c.dietary_restrictions.is_empty() {
            prompt.push_str(&format!("Restrictions: {}\n", c.dietary_restrictions.join(", ")));
        }
        if !c.disliked_ingredients.is_empty() {
            prompt.push_str(&format!("Disliked: {}\n", c.disliked_ingredients.join(", ")));
        }
        for fact in &ctx.memory.guideline_facts {
            prompt.push_str(&format!("Guideline {fact}\n"));
        }
        prompt.push_str(&format!(
            "Cooking time limit: {} minutes.\n",
            c.max_cooking_time_minutes
        ));
        if !ctx.cuisine_preferences.is_empty() {
            prompt.push_str(&format!(
                "Preferred cuisines: {}\n",
                ctx.cuisine_preferences.join(", ")
            ));
        }
        if !ctx.memory.frequent_ingredients.is_empty() {
            prompt.push_str(&format!(
                "Pantry staples to favor: {}\n",
                ctx.memory.frequent_ingredients.join(", ")
            ));
        }

        if let Some(feedback) = &request.feedback {
            prompt.push_str("\nThe previous attempt failed validation:\n");
            prompt.push_str(feedback);
            prompt.push_str("Generate a NEW recipe that fixes every listed item.\n");
        }

        prompt.push_str(
            "\nRespond with ONLY a JSON object, no prose, in this shape:\n\
             {\"name\": \"...\", \"cuisine\": \"...\", \"cooking_time_minutes\": 30,\n\
              \"servings\": 4, \"ingredients\": [{\"name\": \"...\", \"amount\": 100, \"unit\": \"grams\"}],\n\
              \"instructions\": [\"...\"], \"tags\": [\"...\"]}\n\
             Use units: grams, milliliters, pieces, cloves.\n",
        );
        prompt
    }

    /// Strip a Markdown code fence if the model wrapped its JSON in one.
    fn strip_fences(text: &str) -> &str {
        let trimmed = text.trim();
        let Some(inner) = trimmed.strip_prefix("```") else {
            return trimmed;
        };
        // Drop an optional language tag on the opening fence line.
        let inner = inner.strip_prefix("json").unwrap_or(inner);
        let inner = inner.strip_suffix("```").unwrap_or(inner);
        inner.trim()
    }

    fn parse_recipe(text: &str, request: &RecipeRequest) -> Result<Recipe, SynthesisError> {
        let cleaned = Self::strip_fences(text);
        let wire: RecipeJson = serde_json::from_str(cleaned)
            .map_err(|e| SynthesisError::InvalidRecipe(format!("bad JSON: {e}")))?;

        if wire.name.trim().is_empty() {
            return Err(SynthesisError::InvalidRecipe("recipe name is empty".to_owned()));
        }
        if wire.ingredients.is_empty() {
            return Err(SynthesisError::InvalidRecipe(
                "recipe has no ingredients".to_owned(),
            ));
        }

        let mut ingredients = Vec::with_capacity(wire.ingredients.len());
        for ing in wire.ingredients {
            let unit: Unit = ing
                .unit
                .parse()
                .map_err(|_| SynthesisError::InvalidRecipe(format!("unknown unit {:?}", ing.unit)))?;
            if !ing.amount.is_finite() || ing.amount <= 0.0 {
                return Err(SynthesisError::InvalidRecipe(format!(
                    "bad amount for ingredient {:?}",
                    ing.name
                )));
            }
            ingredients.push(Ingredient::new(ing.name, ing.amount, unit));
        }

        Ok(Recipe {
            name: wire.name,
            slot: request.slot,
            cuisine: wire.cuisine,
            cooking_time_minutes: wire.cooking_time_minutes,
            servings: wire.servings.max(1),
            ingredients,
            instructions: wire.instructions,
            tags: wire.tags,
            nutrition: None,
        })
    }
}

#[async_trait]
impl Synthesizer for OpenAiSynthesizer {
    fn name(&self) -> &str {
        "openai"
    }

    async fn synthesize(&self, request: &RecipeRequest) -> Result<Recipe, SynthesisError> {
        let payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_owned(),
                    content: "You are a meal-planning assistant. You respond with strict JSON only."
                        .to_owned(),
                },
                Message {
                    role: "user".to_owned(),
                    content: Self::build_prompt(request),
                },
            ],
            temperature: self.temperature,
        };

        tracing::debug!(
            model = %payload.model,
            slot = %request.slot,
            day = request.day,
            retrying = request.feedback.is_some(),
            "sending synthesis request"
        );

        let mut req = self.client.post(&self.api_base_url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                SynthesisError::Timeout {
                    seconds: self.timeout_seconds,
                }
            } else {
                SynthesisError::Backend(format!("transport error: {e}"))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read error body>".to_owned());
            tracing::warn!(%status, "synthesis endpoint returned an error");
            return Err(SynthesisError::Backend(format!("HTTP {status}: {body}")));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::Backend(format!("failed to parse response body: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| SynthesisError::Backend("empty completion".to_owned()))?;

        Self::parse_recipe(&text, request)
    }
}

// ---------------------------------------------------------------------------
// Private wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Recipe shape the model is asked to return.
#[derive(Debug, Deserialize)]
struct RecipeJson {
    name: String,
    #[serde(default)]
    cuisine: Option<String>,
    cooking_time_minutes: u32,
    #[serde(default = "default_servings")]
    servings: u32,
    ingredients: Vec<IngredientJson>,
    #[serde(default)]
    instructions: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

fn default_servings() -> u32 {
    4
}

#[derive(Debug, Deserialize)]
struct IngredientJson {
    name: String,
    amount: f64,
    unit: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use sous_store::models::MealSlot;

    use crate::constraints::{Constraints, PlanningContext};

    fn request() -> RecipeRequest {
        RecipeRequest {
            day: 1,
            slot: MealSlot::Dinner,
            constraints: Constraints {
                allergens: vec!["peanut".to_owned()],
                max_cooking_time_minutes: 45,
                ..Constraints::default()
            },
            context: PlanningContext {
                household_id: "smith".to_owned(),
                members: Vec::new(),
                cooking_time_max_minutes: 45,
                appliances: Vec::new(),
                budget_weekly: None,
                cuisine_preferences: vec!["asian".to_owned()],
                memory: Default::default(),
            },
            feedback: None,
            seed: 0,
        }
    }

    const VALID_JSON: &str = r#"{
        "name": "Tofu Stir-Fry",
        "cuisine": "asian",
        "cooking_time_minutes": 30,
        "servings": 4,
        "ingredients": [
            {"name": "tofu", "amount": 400, "unit": "grams"},
            {"name": "garlic", "amount": 2, "unit": "cloves"}
        ],
        "instructions": ["Fry the tofu."],
        "tags": ["vegan"]
    }"#;

    #[test]
    fn parses_valid_recipe_json() {
        let recipe = OpenAiSynthesizer::parse_recipe(VALID_JSON, &request()).unwrap();
        assert_eq!(recipe.name, "Tofu Stir-Fry");
        assert_eq!(recipe.slot, MealSlot::Dinner);
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.ingredients[1].unit, Unit::Cloves);
    }

    #[test]
    fn parses_fenced_json() {
        let fenced = format!("```json\n{VALID_JSON}\n```");
        let recipe = OpenAiSynthesizer::parse_recipe(&fenced, &request()).unwrap();
        assert_eq!(recipe.name, "Tofu Stir-Fry");
    }

    #[test]
    fn rejects_unknown_unit() {
        let bad = VALID_JSON.replace("cloves", "handfuls");
        let err = OpenAiSynthesizer::parse_recipe(&bad, &request()).unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidRecipe(_)));
    }

    #[test]
    fn rejects_empty_ingredients() {
        let bad = r#"{"name": "Nothing", "cooking_time_minutes": 5, "ingredients": []}"#;
        let err = OpenAiSynthesizer::parse_recipe(bad, &request()).unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidRecipe(_)));
    }

    #[test]
    fn rejects_non_positive_amount() {
        let bad = VALID_JSON.replace("\"amount\": 400", "\"amount\": 0");
        let err = OpenAiSynthesizer::parse_recipe(&bad, &request()).unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidRecipe(_)));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = OpenAiSynthesizer::parse_recipe("not json {{{", &request()).unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidRecipe(_)));
    }

    #[test]
    fn prompt_names_allergens_and_feedback() {
        let mut req = request();
        req.feedback = Some("- allergen: ingredient \"peanut butter\" is a declared allergen\n".to_owned());
        let prompt = OpenAiSynthesizer::build_prompt(&req);
        assert!(prompt.contains("MUST NOT contain: peanut"));
        assert!(prompt.contains("previous attempt failed validation"));
        assert!(prompt.contains("dinner"));
    }
}
