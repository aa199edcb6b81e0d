//! Biting animal normalizer.
//!
//! Handles:
//! - Case and whitespace folding ("DOG", "Dog " → Dog)
//! - Alias expansion (puppy→Dog, pusa→Cat, aso→Dog)
//! - Fallback capitalization for animals outside the vocabulary

use std::collections::HashMap;

/// Bucket name for blank entries.
pub const UNKNOWN_ANIMAL: &str = "Unknown";

/// Normalizer for free-text biting animal entries.
pub struct AnimalNormalizer {
    /// Alias map: lowercase spoken/typed name → canonical display name
    aliases: HashMap<String, String>,
}

impl Default for AnimalNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimalNormalizer {
    /// Create a new normalizer with the default vocabulary.
    pub fn new() -> Self {
        Self {
            aliases: Self::default_aliases(),
        }
    }

    /// Normalize an animal name to its bucket.
    pub fn normalize(&self, animal: &str) -> String {
        let folded = fold(animal);
        if folded.is_empty() {
            return UNKNOWN_ANIMAL.to_string();
        }

        self.aliases
            .get(&folded)
            .cloned()
            .unwrap_or_else(|| capitalize(&folded))
    }

    /// Add a custom alias mapping.
    pub fn add_alias(&mut self, alias: &str, canonical: &str) {
        self.aliases
            .insert(fold(alias), canonical.trim().to_string());
    }

    /// Default animal vocabulary.
    fn default_aliases() -> HashMap<String, String> {
        let mut map = HashMap::new();

        // Dogs
        for alias in ["dog", "dogs", "puppy", "pup", "canine", "aso", "tuta", "stray dog"] {
            map.insert(alias.into(), "Dog".into());
        }

        // Cats
        for alias in ["cat", "cats", "kitten", "kitty", "feline", "pusa", "stray cat"] {
            map.insert(alias.into(), "Cat".into());
        }

        // Other mammals seen at the clinic
        for alias in ["rat", "rats", "mouse", "daga"] {
            map.insert(alias.into(), "Rat".into());
        }
        for alias in ["monkey", "unggoy", "matsing"] {
            map.insert(alias.into(), "Monkey".into());
        }
        for alias in ["bat", "bats", "paniki"] {
            map.insert(alias.into(), "Bat".into());
        }
        for alias in ["pig", "swine", "baboy"] {
            map.insert(alias.into(), "Pig".into());
        }
        for alias in ["cow", "cattle", "carabao", "kalabaw", "baka"] {
            map.insert(alias.into(), "Cattle".into());
        }
        for alias in ["goat", "kambing"] {
            map.insert(alias.into(), "Goat".into());
        }
        for alias in ["horse", "kabayo"] {
            map.insert(alias.into(), "Horse".into());
        }
        for alias in ["hamster", "hamsters"] {
            map.insert(alias.into(), "Hamster".into());
        }
        map.insert("human".into(), "Human".into());

        map
    }
}

/// Lowercase with runs of whitespace collapsed to one space.
fn fold(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// First letter upper, the rest lower.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
