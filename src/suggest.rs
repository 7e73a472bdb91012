//! Gemini-backed milestone and reward suggestions.
//!
//! Suggestions are proposals only: callers feed them into the creation form
//! and nothing here touches stored state. Calls are never retried.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, warn};

use crate::prompts::{parse_reward_ideas, parse_suggestion, reward_ideas_prompt, suggestions_prompt};
use crate::settings::Settings;
use crate::types::AiSuggestion;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Shown when reward ideas cannot be fetched.
pub const FALLBACK_REWARD_IDEAS: [&str; 4] = [
    "去附近的公园发呆 🌳",
    "整理手机相册回忆 📱",
    "给自己泡一杯热茶 🍵",
    "读两页喜欢的书 📖",
];

#[derive(Debug, Error)]
pub enum SuggestError {
    #[error("API key is missing")]
    MissingApiKey,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Suggestion service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Malformed suggestion response: {0}")]
    Malformed(String),
}

pub trait SuggestionService {
    fn generate_suggestions(
        &self,
        project_name: &str,
        city: Option<&str>,
    ) -> Result<AiSuggestion, SuggestError>;

    fn generate_reward_ideas(&self, city: &str) -> Result<Vec<String>, SuggestError>;
}

/// Reward ideas for `city`, or the local defaults when the service fails or
/// comes back empty.
pub fn reward_ideas_or_default(service: &dyn SuggestionService, city: &str) -> Vec<String> {
    match service.generate_reward_ideas(city) {
        Ok(ideas) if !ideas.is_empty() => ideas,
        Ok(_) => default_reward_ideas(),
        Err(e) => {
            warn!(error = %e, "failed to generate reward ideas");
            default_reward_ideas()
        }
    }
}

pub fn default_reward_ideas() -> Vec<String> {
    FALLBACK_REWARD_IDEAS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.api_base_url.clone(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct GeminiClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    agent: ureq::Agent,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.filter(|k| !k.trim().is_empty()),
            model: config.model,
            agent,
        }
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// Send one prompt and return the concatenated text of the first candidate.
    fn generate(&self, prompt: &str, schema: Value) -> Result<String, SuggestError> {
        let api_key = self.api_key.as_deref().ok_or(SuggestError::MissingApiKey)?;
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema,
            },
        });

        debug!(model = %self.model, "requesting suggestion");
        let response = self
            .agent
            .post(&self.endpoint())
            .set("x-goog-api-key", api_key)
            .send_json(body)
            .map_err(|e| match e {
                ureq::Error::Status(status, resp) => SuggestError::Http {
                    status,
                    body: resp.into_string().unwrap_or_default(),
                },
                ureq::Error::Transport(t) => SuggestError::Network(t.to_string()),
            })?;

        let parsed: GenerateResponse = response
            .into_json()
            .map_err(|e| SuggestError::Malformed(e.to_string()))?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(SuggestError::Malformed("no response text".to_string()));
        }
        Ok(text)
    }
}

impl SuggestionService for GeminiClient {
    fn generate_suggestions(
        &self,
        project_name: &str,
        city: Option<&str>,
    ) -> Result<AiSuggestion, SuggestError> {
        let schema = json!({
            "type": "OBJECT",
            "properties": {
                "milestones": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "title": { "type": "STRING", "description": "可执行的里程碑名称" },
                            "reward": { "type": "STRING", "description": "感官体验类、低成本的奖励" },
                        },
                        "required": ["title", "reward"],
                    },
                },
            },
        });
        let text = self.generate(&suggestions_prompt(project_name, city), schema)?;
        parse_suggestion(&text)
    }

    fn generate_reward_ideas(&self, city: &str) -> Result<Vec<String>, SuggestError> {
        let schema = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
        let text = self.generate(&reward_ideas_prompt(city), schema)?;
        parse_reward_ideas(&text)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::SuggestedMilestone;

    /// Canned responses for exercising callers without a network.
    pub(crate) struct FakeService {
        pub suggestion: Option<AiSuggestion>,
        pub ideas: Option<Vec<String>>,
    }

    impl SuggestionService for FakeService {
        fn generate_suggestions(
            &self,
            _project_name: &str,
            _city: Option<&str>,
        ) -> Result<AiSuggestion, SuggestError> {
            self.suggestion
                .clone()
                .ok_or_else(|| SuggestError::Network("offline".to_string()))
        }

        fn generate_reward_ideas(&self, _city: &str) -> Result<Vec<String>, SuggestError> {
            self.ideas.clone().ok_or(SuggestError::MissingApiKey)
        }
    }

    fn client(api_key: Option<&str>) -> GeminiClient {
        GeminiClient::new(GeminiConfig {
            base_url: "http://127.0.0.1:9/".to_string(),
            api_key: api_key.map(str::to_string),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_millis(200),
        })
    }

    #[test]
    fn missing_key_fails_before_any_request() {
        let gemini = client(None);
        assert!(!gemini.has_credentials());
        assert!(matches!(
            gemini.generate_suggestions("写作", None),
            Err(SuggestError::MissingApiKey)
        ));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        assert!(!client(Some("  ")).has_credentials());
    }

    #[test]
    fn endpoint_joins_base_and_model() {
        assert_eq!(
            client(Some("k")).endpoint(),
            "http://127.0.0.1:9/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn unreachable_service_is_a_network_error() {
        let result = client(Some("k")).generate_reward_ideas("上海");
        assert!(matches!(result, Err(SuggestError::Network(_))));
    }

    #[test]
    fn failed_ideas_fall_back_to_defaults() {
        let service = FakeService { suggestion: None, ideas: None };
        assert_eq!(reward_ideas_or_default(&service, "上海"), default_reward_ideas());

        let empty = FakeService { suggestion: None, ideas: Some(vec![]) };
        assert_eq!(reward_ideas_or_default(&empty, "上海").len(), 4);
    }

    #[test]
    fn successful_ideas_pass_through() {
        let service = FakeService {
            suggestion: Some(AiSuggestion {
                milestones: vec![SuggestedMilestone {
                    title: "a".to_string(),
                    reward: "b".to_string(),
                }],
            }),
            ideas: Some(vec!["去外滩吹吹晚风 🌊".to_string()]),
        };
        assert_eq!(reward_ideas_or_default(&service, "上海"), vec!["去外滩吹吹晚风 🌊"]);
    }
}
