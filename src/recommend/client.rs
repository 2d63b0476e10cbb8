use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{Completion, LlmError, RecommendationClient, RecommendationContext};
use crate::config::LlmConfig;

const SYSTEM_PROMPT: &str = "You are a nutrition assistant for people with diabetes. \
You receive a JSON object with the patient's medications, diabetes type, meal bolus \
(grams of carbohydrate per insulin unit), correction bolus (mg/dL per insulin unit), \
target glucose, current glucose (may be null) and a free-text meal description. \
Estimate the meal and answer ONLY with a JSON object with the keys: \
\"foods\" (list of food names), \"total_carbs\" (integer grams), \
\"total_calories\" (integer kcal), \"insulin_units\" (integer units of rapid insulin \
to cover the meal and correct the current glucose) and \"insulin_name\" (the rapid \
insulin from the medication list, or \"unavailable\" if none).";

/// Chat-completions client for an OpenAI-compatible endpoint.
pub struct HttpRecommender {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpRecommender {
    pub fn new(cfg: &LlmConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_url: cfg.api_url.clone(),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    total_tokens: u64,
}

impl ChatResponse {
    fn into_completion(self) -> Completion {
        let text = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        let usage = self
            .usage
            .map(|u| format!("total_tokens: {}", u.total_tokens))
            .unwrap_or_default();
        Completion { text, usage }
    }
}

#[async_trait]
impl RecommendationClient for HttpRecommender {
    #[instrument(skip(self, ctx), fields(model = %self.model))]
    async fn generate(&self, ctx: &RecommendationContext) -> Result<Completion, LlmError> {
        let payload = ctx.to_json().to_string();
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &payload,
                },
            ],
            temperature: 0.2,
        };

        let mut req = self.client.post(&self.api_url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Transport(format!("timed out: {e}"))
            } else {
                LlmError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Response(e.to_string()))?;
        let completion = parsed.into_completion();
        debug!(chars = completion.text.len(), usage = %completion.usage, "recommendation received");
        Ok(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_from_chat_response() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"foods\": []}"}}],
            "usage": {"prompt_tokens": 100, "completion_tokens": 20, "total_tokens": 120}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let c = parsed.into_completion();
        assert_eq!(c.text, "{\"foods\": []}");
        assert_eq!(c.usage, "total_tokens: 120");
        assert_eq!(super::super::parse_token_usage(&c.usage), 120);
    }

    #[test]
    fn completion_without_choices_or_usage_is_empty() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        let c = parsed.into_completion();
        assert!(c.text.is_empty());
        assert!(c.usage.is_empty());
    }

    #[test]
    fn request_carries_context_as_user_message() {
        let ctx = RecommendationContext {
            medications: vec![],
            diabetes_type: "none".into(),
            meal_bolus: 1,
            correction_bolus: 1,
            target_glucose: 100,
            current_glucose: None,
            meal_description: "apple".into(),
        };
        let payload = ctx.to_json().to_string();
        let body = ChatRequest {
            model: "m",
            messages: [
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &payload },
            ],
            temperature: 0.2,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "m");
        assert_eq!(json["messages"][1]["role"], "user");
        assert!(json["messages"][1]["content"].as_str().unwrap().contains("apple"));
    }

    #[test]
    fn builds_from_config() {
        let cfg = LlmConfig {
            api_url: "http://localhost:9/v1/chat/completions".into(),
            api_key: None,
            model: "test-model".into(),
            timeout_secs: 1,
        };
        let client = HttpRecommender::new(&cfg).expect("client");
        assert_eq!(client.model, "test-model");
    }
}
