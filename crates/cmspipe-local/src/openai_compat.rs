use cmspipe_core::{ChatBackend, ChatMessage, Error, Result};
use serde::{Deserialize, Serialize};

use crate::config::{env, env_u64};

pub const DEFAULT_LLM_TIMEOUT_MS: u64 = 30_000;
pub const VISION_MAX_TOKENS: u64 = 300;
pub const VISION_TEMPERATURE: f64 = 0.3;

pub(crate) fn openai_compat_base_url_from_env() -> Option<String> {
    env("CMSPIPE_OPENAI_COMPAT_BASE_URL")
}

pub(crate) fn openai_compat_api_key_from_env() -> Option<String> {
    env("CMSPIPE_OPENAI_COMPAT_API_KEY")
}

pub(crate) fn openai_compat_model_from_env() -> Option<String> {
    env("CMSPIPE_OPENAI_COMPAT_MODEL")
}

pub(crate) fn vision_model_from_env() -> Option<String> {
    env("CMSPIPE_VISION_MODEL")
}

pub(crate) fn llm_timeout_ms_from_env() -> Option<u64> {
    env_u64("CMSPIPE_LLM_TIMEOUT_MS").map(clamp_timeout_ms)
}

fn clamp_timeout_ms(ms: u64) -> u64 {
    ms.clamp(200, 300_000)
}

/// Client for any server speaking the OpenAI `chat/completions` dialect.
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    timeout_ms: u64,
    max_tokens: Option<u64>,
    temperature: Option<f64>,
}

impl OpenAiCompatClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: None,
            model: model.into(),
            timeout_ms: DEFAULT_LLM_TIMEOUT_MS,
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn from_env(client: reqwest::Client, model_override: Option<String>) -> Result<Self> {
        let base_url = openai_compat_base_url_from_env().ok_or_else(|| {
            Error::NotConfigured("missing CMSPIPE_OPENAI_COMPAT_BASE_URL".to_string())
        })?;
        let model = model_override
            .or_else(openai_compat_model_from_env)
            .ok_or_else(|| {
                Error::NotConfigured("missing CMSPIPE_OPENAI_COMPAT_MODEL".to_string())
            })?;

        let mut out = Self::new(client, base_url, model);
        out.api_key = openai_compat_api_key_from_env();
        out.timeout_ms = llm_timeout_ms_from_env().unwrap_or(DEFAULT_LLM_TIMEOUT_MS);
        Ok(out)
    }

    /// Same endpoint, but with `CMSPIPE_VISION_MODEL` (if set) and the short-answer settings
    /// used for alt text.
    pub fn vision_from_env(client: reqwest::Client) -> Result<Self> {
        Ok(Self::from_env(client, vision_model_from_env())?
            .with_max_tokens(VISION_MAX_TOKENS)
            .with_temperature(VISION_TEMPERATURE))
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = clamp_timeout_ms(timeout_ms);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint_chat_completions(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }

    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let req = ChatCompletionsRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: Some(false),
        };

        let mut rb = self
            .client
            .post(self.endpoint_chat_completions())
            .timeout(std::time::Duration::from_millis(self.timeout_ms))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(k) = &self.api_key {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {k}"));
        }

        let resp = rb
            .json(&req)
            .send()
            .await
            .map_err(|e| Error::Llm(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Llm(format!(
                "openai_compat chat.completions HTTP {status}"
            )));
        }

        let parsed: ChatCompletionsResponse =
            resp.json().await.map_err(|e| Error::Llm(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Llm("openai_compat reply had no message content".to_string()))
    }
}

#[async_trait::async_trait]
impl ChatBackend for OpenAiCompatClient {
    fn name(&self) -> &'static str {
        "openai_compat"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        tracing::debug!(model = %self.model, turns = messages.len(), "chat completion");
        self.chat(messages).await
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_clamped() {
        assert_eq!(clamp_timeout_ms(0), 200);
        assert_eq!(clamp_timeout_ms(5_000), 5_000);
        assert_eq!(clamp_timeout_ms(u64::MAX), 300_000);
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let c = OpenAiCompatClient::new(reqwest::Client::new(), "http://h:1/", "m");
        assert_eq!(c.endpoint_chat_completions(), "http://h:1/v1/chat/completions");
    }

    #[test]
    fn request_body_carries_multimodal_parts_and_options() {
        let msgs = [ChatMessage::user_with_image("beschrijf", "https://x/a.png")];
        let req = ChatCompletionsRequest {
            model: "m",
            messages: &msgs,
            max_tokens: Some(300),
            temperature: None,
            stream: Some(false),
        };
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["max_tokens"], 300);
        assert!(v.get("temperature").is_none());
        assert_eq!(v["messages"][0]["content"][1]["type"], "image_url");
        assert_eq!(
            v["messages"][0]["content"][1]["image_url"]["url"],
            "https://x/a.png"
        );
    }
}
