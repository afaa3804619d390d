//! OpenAI-compatible chat completions generator.
//!
//! One synchronous (non-streaming) completion per turn. Also works against
//! OpenRouter, Ollama, and other OpenAI-compatible endpoints via `base_url`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use murmur_core::config::{Config, GenerationConfig};

use crate::{Prompt, PromptRole, TextGenerator};

const OPENAI_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiGenerator {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: Option<f64>,
    client: reqwest::Client,
}

impl OpenAiGenerator {
    pub fn new(
        base_url: Option<&str>,
        api_key: String,
        model: String,
        max_tokens: u32,
        temperature: Option<f64>,
    ) -> Self {
        Self {
            base_url: base_url
                .unwrap_or(OPENAI_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model,
            max_tokens,
            temperature,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let gen: Option<&GenerationConfig> = config.generation.as_ref();
        let api_key = gen
            .and_then(|g| g.resolve_api_key())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|v| !v.is_empty()))
            .ok_or_else(|| anyhow::anyhow!("No generation API key configured"))?;
        Ok(Self::new(
            gen.and_then(|g| g.base_url.as_deref()),
            api_key,
            config.generation_model(),
            config.max_tokens(),
            config.temperature(),
        ))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<serde_json::Value>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
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
    #[serde(default)]
    content: Option<String>,
}

/// Map an assembled prompt to OpenAI chat messages.
pub fn chat_messages(prompt: &Prompt) -> Vec<serde_json::Value> {
    prompt
        .segments
        .iter()
        .map(|seg| {
            let role = match seg.role {
                PromptRole::System => "system",
                PromptRole::User => "user",
                PromptRole::Agent => "assistant",
            };
            json!({ "role": role, "content": seg.content })
        })
        .collect()
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn complete(&self, prompt: &Prompt) -> anyhow::Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: chat_messages(prompt),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        debug!(
            model = %self.model,
            segments = prompt.segments.len(),
            "Requesting chat completion"
        );

        let resp = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Chat completions API error {status}: {body}");
        }

        let parsed: ChatResponse = resp.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if text.is_empty() {
            anyhow::bail!("Chat completions API returned an empty completion");
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_messages_role_mapping_and_order() {
        let mut prompt = Prompt::default();
        prompt.push(PromptRole::System, "You are Geography Expert");
        prompt.push(PromptRole::User, "hi");
        prompt.push(PromptRole::Agent, "hello!");
        prompt.push(PromptRole::User, "capital of France?");

        let messages = chat_messages(&prompt);
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[3]["role"], "user");
        assert_eq!(messages[3]["content"], "capital of France?");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let generator = OpenAiGenerator::new(
            Some("http://localhost:11434/"),
            "key".into(),
            "llama3".into(),
            256,
            None,
        );
        assert_eq!(generator.base_url, "http://localhost:11434");
    }
}
