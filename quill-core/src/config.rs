//! Runtime configuration.
//!
//! Everything comes from the environment. The binary loads `.env` with
//! dotenvy before calling [`QuillConfig::from_env`].

use crate::agents::{AgentModels, Agents};
use crate::persist::StoryStore;
use crate::studio::{AgentService, Studio};
use gemini::Gemini;
use std::path::PathBuf;

/// Variables checked for the API key, in order.
pub const API_KEY_VARS: [&str; 3] = ["GEMINI_API_KEY", "API_KEY", "VITE_GEMINI_API_KEY"];

/// Configuration for a studio session.
#[derive(Debug, Clone)]
pub struct QuillConfig {
    /// Gemini API key. `None` leaves the agents unavailable.
    pub api_key: Option<String>,

    /// Where the bible, scenes, exports and log live.
    pub data_dir: PathBuf,

    /// Model ids and voice.
    pub models: AgentModels,
}

impl Default for QuillConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            data_dir: default_data_dir(),
            models: AgentModels::default(),
        }
    }
}

impl QuillConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = API_KEY_VARS.iter().find_map(|key| non_empty(*key));

        let data_dir = non_empty("QUILL_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let defaults = AgentModels::default();
        let models = AgentModels {
            text: non_empty("QUILL_TEXT_MODEL").unwrap_or(defaults.text),
            image: non_empty("QUILL_IMAGE_MODEL").unwrap_or(defaults.image),
            speech: non_empty("QUILL_SPEECH_MODEL").unwrap_or(defaults.speech),
            voice: non_empty("QUILL_VOICE").unwrap_or(defaults.voice),
        };

        Self {
            api_key,
            data_dir,
            models,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.api_key = if key.trim().is_empty() { None } else { Some(key) };
        self
    }

    pub fn without_api_key(mut self) -> Self {
        self.api_key = None;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_models(mut self, models: AgentModels) -> Self {
        self.models = models;
        self
    }

    /// Log file used by the terminal front end.
    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join("quill.log")
    }

    /// Directory for exported images and audio.
    pub fn export_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }

    /// Build the agent service from the configured key.
    pub fn service(&self) -> AgentService<Gemini> {
        match &self.api_key {
            Some(key) => AgentService::Available(
                Agents::new(Gemini::new(key.clone()).with_model(self.models.text.clone()))
                    .with_models(self.models.clone()),
            ),
            None => AgentService::unavailable(format!(
                "no API key; set {} in the environment or .env",
                API_KEY_VARS[0]
            )),
        }
    }

    /// Build an unloaded studio backed by files in the data directory.
    pub fn studio(&self) -> Studio<Gemini> {
        Studio::new(StoryStore::in_dir(&self.data_dir), self.service())
    }
}

/// Platform data directory, falling back to `./.quill`.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("quill"))
        .unwrap_or_else(|| PathBuf::from(".quill"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = QuillConfig::from_lookup(lookup(&[]));
        assert!(config.api_key.is_none());
        assert_eq!(config.models, AgentModels::default());
        assert!(!config.service().is_available());
    }

    #[test]
    fn test_key_fallbacks() {
        let config = QuillConfig::from_lookup(lookup(&[
            ("GEMINI_API_KEY", "  "),
            ("VITE_GEMINI_API_KEY", "from-vite"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("from-vite"));
        assert!(config.service().is_available());
    }

    #[test]
    fn test_overrides() {
        let config = QuillConfig::from_lookup(lookup(&[
            ("QUILL_DATA_DIR", "/tmp/quill-test"),
            ("QUILL_VOICE", "Puck"),
        ]));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/quill-test"));
        assert_eq!(config.log_path(), PathBuf::from("/tmp/quill-test/quill.log"));
        assert_eq!(config.models.voice, "Puck");
        assert_eq!(config.models.text, "gemini-3-flash-preview");
    }

    #[test]
    fn test_builder() {
        let config = QuillConfig::default().with_api_key("");
        assert!(config.api_key.is_none());
        let config = config.with_api_key("k").without_api_key();
        assert!(config.api_key.is_none());
    }
}
