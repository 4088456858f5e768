//! User settings persisted in the key-value store.
//!
//! Resolution order for each value: command-line flag, environment,
//! stored value, built-in default.

use crate::storage::{load_or, save, KeyValueStore, KEY_API_KEY, KEY_MODEL, KEY_SYSTEM_PROMPT};

/// Environment variables checked for an API key, in order.
pub const API_KEY_ENV: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Default model.
pub const DEFAULT_MODEL: &str = "googleai/gemini-2.0-flash";

/// Default tutor persona.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly and encouraging AI Tutor. \
Your goal is to help users learn programming concepts. Explain topics clearly, provide \
simple code examples, and guide them through their learning journey. Your tone should be \
supportive and patient. Format your responses in Markdown.";

/// Models offered for chat.
pub const KNOWN_MODELS: &[(&str, &str)] = &[
    ("googleai/gemini-2.0-flash", "Gemini 2.0 Flash"),
    ("googleai/gemini-1.5-pro-latest", "Gemini 1.5 Pro"),
    ("googleai/gemini-1.0-pro", "Gemini 1.0 Pro"),
];

/// Resolved user settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub model: String,
    pub api_key: String,
    pub system_prompt: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Settings {
    /// Load stored settings, falling back to defaults per key.
    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Self {
        let defaults = Self::default();
        Self {
            model: non_blank(load_or(store, KEY_MODEL, String::new())).unwrap_or(defaults.model),
            api_key: load_or(store, KEY_API_KEY, defaults.api_key),
            system_prompt: non_blank(load_or(store, KEY_SYSTEM_PROMPT, String::new()))
                .unwrap_or(defaults.system_prompt),
        }
    }

    /// Take the API key from the environment when one is set there.
    #[must_use]
    pub fn with_env(mut self) -> Self {
        if let Some(key) = API_KEY_ENV
            .iter()
            .find_map(|var| std::env::var(var).ok().and_then(non_blank))
        {
            self.api_key = key;
        }
        self
    }

    /// Apply command-line overrides for this run only.
    #[must_use]
    pub fn with_overrides(
        mut self,
        model: Option<&str>,
        system_prompt: Option<&str>,
        api_key: Option<&str>,
    ) -> Self {
        if let Some(key) = api_key.and_then(|k| non_blank(k.trim().to_string())) {
            self.api_key = key;
        }
        if let Some(model) = model.and_then(|m| non_blank(m.to_string())) {
            self.model = model;
        }
        if let Some(prompt) = system_prompt.and_then(|p| non_blank(p.to_string())) {
            self.system_prompt = prompt;
        }
        self
    }

    /// API key with all but the last four characters hidden.
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.is_empty() {
            return "(not set)".to_string();
        }
        let visible: String = chars[chars.len().saturating_sub(4)..].iter().collect();
        format!("{}{visible}", "*".repeat(chars.len().saturating_sub(4).min(8)))
    }
}

/// Persist the model. Unknown models are allowed but logged.
pub fn set_model<S: KeyValueStore + ?Sized>(store: &mut S, model: &str) -> bool {
    if !is_known_model(model) {
        tracing::warn!(model, "Model is not in the list of known models");
    }
    save(store, KEY_MODEL, model.trim())
}

pub fn set_api_key<S: KeyValueStore + ?Sized>(store: &mut S, api_key: &str) -> bool {
    save(store, KEY_API_KEY, api_key.trim())
}

pub fn set_system_prompt<S: KeyValueStore + ?Sized>(store: &mut S, prompt: &str) -> bool {
    save(store, KEY_SYSTEM_PROMPT, prompt)
}

pub fn is_known_model(model: &str) -> bool {
    KNOWN_MODELS.iter().any(|(id, _)| *id == model.trim())
}

fn non_blank(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn defaults_when_nothing_stored() {
        let settings = Settings::load(&MemoryStore::new());
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.model, DEFAULT_MODEL);
    }

    #[test]
    fn stored_values_are_loaded() {
        let mut store = MemoryStore::new();
        assert!(set_model(&mut store, "googleai/gemini-1.0-pro"));
        assert!(set_api_key(&mut store, " abc123 "));
        assert!(set_system_prompt(&mut store, "Be terse."));

        let settings = Settings::load(&store);
        assert_eq!(settings.model, "googleai/gemini-1.0-pro");
        assert_eq!(settings.api_key, "abc123");
        assert_eq!(settings.system_prompt, "Be terse.");
    }

    #[test]
    fn blank_stored_prompt_falls_back_to_default() {
        let mut store = MemoryStore::new();
        set_system_prompt(&mut store, "   ");
        assert_eq!(Settings::load(&store).system_prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn overrides_win_over_stored_values() {
        let settings = Settings::default().with_overrides(
            Some("googleai/gemini-1.5-pro-latest"),
            Some(""),
            Some(" key-from-flag "),
        );
        assert_eq!(settings.model, "googleai/gemini-1.5-pro-latest");
        assert_eq!(settings.api_key, "key-from-flag");
        assert_eq!(settings.system_prompt, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn masks_api_key() {
        let mut settings = Settings::default();
        assert_eq!(settings.masked_api_key(), "(not set)");
        settings.api_key = "AIzaSyExample1234".to_string();
        assert_eq!(settings.masked_api_key(), "********1234");
        settings.api_key = "abc".to_string();
        assert_eq!(settings.masked_api_key(), "abc");
    }

    #[test]
    fn recognizes_known_models() {
        assert!(is_known_model("googleai/gemini-2.0-flash"));
        assert!(!is_known_model("gpt-4"));
    }
}
