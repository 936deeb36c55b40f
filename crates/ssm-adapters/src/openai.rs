use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ssm_storage::HttpFetcher;

use crate::{GenerationError, TextGenerator};

pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const SYSTEM_PROMPT: &str = "You are a helpful assistant that creates concise, actionable project titles for defense contracting opportunities.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat-completions client. One attempt per title; failures are returned to the
/// caller, which decides on the fallback.
pub struct OpenAiTextGenerator {
    http: HttpFetcher,
    api_url: String,
    authorization: String,
    model: String,
}

impl OpenAiTextGenerator {
    pub fn new(http: HttpFetcher, api_key: &str, model: Option<&str>) -> Self {
        Self {
            http,
            api_url: DEFAULT_API_URL.to_string(),
            authorization: format!("Bearer {api_key}"),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
        }
    }

    fn request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: 100,
            temperature: 0.3,
        }
    }
}

fn first_choice_text(response: ChatResponse) -> Result<String, GenerationError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or(GenerationError::EmptyResponse)
}

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = self.request(prompt);
        let response: ChatResponse = self
            .http
            .post_json("openai", &self.api_url, Some(&self.authorization), &request)
            .await?;
        first_choice_text(response)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use ssm_storage::HttpClientConfig;

    fn generator() -> OpenAiTextGenerator {
        let http = HttpFetcher::new(HttpClientConfig::default()).expect("client");
        OpenAiTextGenerator::new(http, "sk-test", None)
    }

    #[test]
    fn request_pins_model_and_sampling() {
        let gen = generator();
        let value = serde_json::to_value(gen.request("Original Title: X")).expect("json");
        assert_eq!(value["model"], DEFAULT_MODEL);
        assert_eq!(value["max_tokens"], 100);
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "Original Title: X");
        assert_eq!(gen.authorization, "Bearer sk-test");
    }

    #[test]
    fn first_choice_content_is_returned() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"role": "assistant", "content": "Review Army Ammo RFI"}}]
        }))
        .expect("decode");
        assert_eq!(first_choice_text(response).unwrap(), "Review Army Ammo RFI");
    }

    #[test]
    fn empty_or_missing_choices_are_errors() {
        let response: ChatResponse = serde_json::from_value(json!({"choices": []})).expect("decode");
        assert!(matches!(
            first_choice_text(response),
            Err(GenerationError::EmptyResponse)
        ));

        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "   "}}]
        }))
        .expect("decode");
        assert!(first_choice_text(response).is_err());
    }
}
