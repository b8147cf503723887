//! OpenRouter chat-completions client (<https://openrouter.ai/>).

use super::AIProvider;
use super::http::{ProviderSettings, send_json};
use anyhow::{Result, anyhow};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

const ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
const MODEL: &str = "deepseek/deepseek-chat";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    choices: Vec<ReplyChoice>,
}

#[derive(Debug, Deserialize)]
struct ReplyChoice {
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

impl ChatReply {
    fn first_content(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| anyhow!("OpenRouter reply has no message content"))
    }
}

/// Generates routines through any model OpenRouter fronts.
///
/// ```rust,ignore
/// use lex_cleaner::ai::OpenRouterProvider;
///
/// let provider = OpenRouterProvider::new(api_key)?;
/// let provider = OpenRouterProvider::with_settings(
///     api_key,
///     OpenRouterProvider::settings().model("openai/gpt-4o"),
/// )?;
/// ```
pub struct OpenRouterProvider {
    api_key: String,
    settings: ProviderSettings,
    client: Client,
}

impl OpenRouterProvider {
    /// Default settings: `deepseek/deepseek-chat` on the public endpoint.
    pub fn settings() -> ProviderSettings {
        ProviderSettings::new(MODEL, ENDPOINT)
    }

    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_settings(api_key, Self::settings())
    }

    pub fn with_settings(api_key: impl Into<String>, settings: ProviderSettings) -> Result<Self> {
        Ok(Self {
            client: settings.client()?,
            api_key: api_key.into(),
            settings,
        })
    }

    fn body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.settings.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }
}

impl AIProvider for OpenRouterProvider {
    fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            model = %self.settings.model,
            prompt_chars = prompt.len(),
            "Requesting routine from OpenRouter"
        );

        let request = self
            .client
            .post(&self.settings.base_url)
            .bearer_auth(&self.api_key)
            .header("X-Title", "lex-cleaner")
            .json(&self.body(prompt));

        send_json::<ChatReply>(self.name(), request)?.first_content()
    }

    fn name(&self) -> &str {
        "OpenRouter"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.settings.model)
    }
}
