use serde::{Deserialize, Serialize};
use std::env;

const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Fallback chain, highest priority first.
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_history_depth")]
    pub max_history_depth: usize,
    /// Used when a rate-limit error carries no parsable retry hint.
    #[serde(default = "default_retry_delay_secs")]
    pub default_retry_delay_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_models() -> Vec<String> {
    vec![
        "gemini-2.5-flash".to_string(),
        "gemini-2.0-flash".to_string(),
        "gemini-2.0-flash-lite".to_string(),
    ]
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_max_history_depth() -> usize {
    10
}

fn default_retry_delay_secs() -> u64 {
    3600
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            api_key: None,
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            max_history_depth: default_max_history_depth(),
            default_retry_delay_secs: default_retry_delay_secs(),
            system_prompt: None,
        }
    }
}

impl LlmConfig {
    /// The configured key, or `$GEMINI_API_KEY` when the file leaves it out.
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_correct() {
        let llm = LlmConfig::default();
        assert_eq!(llm.models.len(), 3);
        assert_eq!(llm.models[0], "gemini-2.5-flash");
        assert_eq!(llm.request_timeout_secs, 60);
        assert_eq!(llm.max_history_depth, 10);
        assert_eq!(llm.default_retry_delay_secs, 3600);
        assert!(llm.system_prompt.is_none());
    }

    #[test]
    fn explicit_api_key_wins() {
        let llm = LlmConfig {
            api_key: Some("from-file".to_string()),
            ..LlmConfig::default()
        };
        assert_eq!(llm.resolved_api_key().as_deref(), Some("from-file"));
    }

    #[test]
    fn api_key_is_never_serialized() {
        let llm = LlmConfig {
            api_key: Some("secret".to_string()),
            ..LlmConfig::default()
        };
        let serialized = toml::to_string(&llm).unwrap();
        assert!(!serialized.contains("secret"));
    }

    #[test]
    fn serde_missing_fields_uses_defaults() {
        let llm: LlmConfig = toml::from_str("models = [\"only-one\"]\n").unwrap();
        assert_eq!(llm.models, vec!["only-one"]);
        assert_eq!(llm.max_history_depth, 10);
    }
}
