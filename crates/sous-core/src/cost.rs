//! Cost estimation: the collaborator contract the grocery aggregator prices
//! items through, plus a price-book implementation over embedded reference
//! prices.

use serde::Deserialize;
use std::collections::BTreeMap;

/// An aggregated quantity of one grocery item, as produced by the list
/// aggregator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quantity {
    /// Total mass in grams (volumes are folded in at 1 ml = 1 g).
    Grams(f64),
    /// A count of discrete items (pieces, cloves).
    Count(f64),
}

/// Collaborator contract for pricing grocery items.
pub trait CostEstimator: Send + Sync {
    /// Estimated cost for the given quantity of one ingredient.
    fn estimate(&self, ingredient: &str, quantity: Quantity) -> f64;
}

// ---------------------------------------------------------------------------
// Embedded price book
// ---------------------------------------------------------------------------

/// Nominal mass assumed for one counted item (a piece of fruit, an egg)
/// when pricing count quantities against per-kilogram prices.
const GRAMS_PER_PIECE: f64 = 100.0;

#[derive(Debug, Clone, Deserialize)]
struct PriceEntry {
    name: String,
    per_kg: f64,
    category: String,
}

#[derive(Debug, Deserialize)]
struct PriceFile {
    defaults: BTreeMap<String, f64>,
    prices: Vec<PriceEntry>,
}

static PRICES_TOML: &str = include_str!("prices.toml");

/// Price book over the embedded per-kilogram reference prices.
///
/// Unlisted ingredients fall back to their category default (guessed from
/// keywords), and ultimately to the `other` default.
#[derive(Debug)]
pub struct PriceBook {
    defaults: BTreeMap<String, f64>,
    prices: Vec<PriceEntry>,
}

impl Default for PriceBook {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceBook {
    /// Load the embedded price book.
    ///
    /// # Panics
    ///
    /// Panics if the embedded TOML is malformed. If the binary was built,
    /// the TOML is valid.
    pub fn new() -> Self {
        let file: PriceFile = toml::from_str(PRICES_TOML).expect("embedded prices.toml is invalid");
        Self {
            defaults: file.defaults,
            prices: file.prices,
        }
    }

    /// Price per kilogram for an ingredient.
    pub fn per_kg(&self, ingredient: &str) -> f64 {
        let needle = ingredient.trim().to_lowercase();

        let entry = self
            .prices
            .iter()
            .filter(|p| needle.contains(&p.name) || p.name.contains(&needle))
            .max_by_key(|p| p.name.len());
        if let Some(entry) = entry {
            return entry.per_kg;
        }

        let category = guess_category(&needle);
        self.defaults
            .get(category)
            .or_else(|| self.defaults.get("other"))
            .copied()
            .unwrap_or(0.0)
    }
}

impl CostEstimator for PriceBook {
    fn estimate(&self, ingredient: &str, quantity: Quantity) -> f64 {
        let grams = match quantity {
            Quantity::Grams(g) => g,
            Quantity::Count(n) => n * GRAMS_PER_PIECE,
        };
        let cost = self.per_kg(ingredient) * grams / 1000.0;
        (cost * 100.0).round() / 100.0
    }
}

/// Keyword guess for an unlisted ingredient's price category.
fn guess_category(name: &str) -> &'static str {
    const PROTEIN: &[&str] = &["meat", "chicken", "beef", "pork", "fish", "turkey"];
    const VEGETABLE: &[&str] = &["vegetable", "greens", "pepper", "squash", "cabbage"];
    const GRAIN: &[&str] = &["rice", "grain", "flour", "noodle"];
    const DAIRY: &[&str] = &["milk", "cheese", "cream", "dairy"];

    if PROTEIN.iter().any(|w| name.contains(w)) {
        "protein"
    } else if VEGETABLE.iter().any(|w| name.contains(w)) {
        "vegetable"
    } else if GRAIN.iter().any(|w| name.contains(w)) {
        "grain"
    } else if DAIRY.iter().any(|w| name.contains(w)) {
        "dairy"
    } else {
        "other"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_ingredient_priced_by_mass() {
        let book = PriceBook::new();
        // 500 g of rice at 3.00/kg.
        assert!((book.estimate("rice", Quantity::Grams(500.0)) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn longest_match_wins() {
        let book = PriceBook::new();
        // "sweet potato" (4.00/kg) must not price through "potato" (2.50/kg).
        assert!((book.per_kg("sweet potato") - 4.0).abs() < 1e-9);
    }

    #[test]
    fn count_quantities_use_nominal_piece_mass() {
        let book = PriceBook::new();
        let cost = book.estimate("lemon", Quantity::Count(2.0));
        // 2 pieces at 100 g nominal, 5.00/kg.
        assert!((cost - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unlisted_ingredient_uses_category_default() {
        let book = PriceBook::new();
        // "ground turkey" is unlisted but keyword-matches protein (15.00/kg).
        assert!((book.per_kg("ground turkey") - 15.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_ingredient_uses_other_default() {
        let book = PriceBook::new();
        assert!((book.per_kg("star fruit chutney") - 5.0).abs() < 1e-9);
    }

    #[test]
    fn estimates_round_to_cents() {
        let book = PriceBook::new();
        let cost = book.estimate("rice", Quantity::Grams(333.0));
        assert_eq!(cost, (cost * 100.0).round() / 100.0);
    }
}
