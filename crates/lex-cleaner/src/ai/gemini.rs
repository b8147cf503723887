//! Google Gemini `generateContent` client (<https://ai.google.dev/>).

use super::AIProvider;
use super::http::{ProviderSettings, send_json};
use anyhow::{Result, anyhow, bail};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models/";
const MODEL: &str = "gemini-flash-latest";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Turn<'a>; 1],
    generation_config: Sampling,
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'static str,
    parts: [TextPart<'a>; 1],
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Sampling {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateReply {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateBody>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateBody {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Deserialize)]
struct ReplyPart {
    #[serde(default)]
    text: String,
}

impl GenerateReply {
    /// Joined text of the first candidate.
    ///
    /// A candidate stopped by the safety filters is an error even when it
    /// carries partial text.
    fn first_text(self) -> Result<String> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            bail!("Gemini reply has no candidates");
        };

        match candidate.finish_reason.as_deref() {
            Some(reason @ ("SAFETY" | "BLOCKED")) => bail!("Gemini reply blocked ({})", reason),
            Some("MAX_TOKENS") => warn!("Gemini reply truncated at the token limit"),
            _ => {}
        }

        let parts = candidate.content.map(|body| body.parts).unwrap_or_default();
        if parts.is_empty() {
            return Err(anyhow!("Gemini reply has no text"));
        }
        Ok(parts.into_iter().map(|part| part.text).collect())
    }
}

/// Generates routines with a Gemini model.
///
/// The key travels in the query string, as the public API expects.
pub struct GeminiProvider {
    api_key: String,
    settings: ProviderSettings,
    client: Client,
}

impl GeminiProvider {
    /// Default settings: `gemini-flash-latest` on the v1beta endpoint.
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

    fn body<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: [Turn {
                role: "user",
                parts: [TextPart { text: prompt }],
            }],
            generation_config: Sampling {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_tokens,
            },
        }
    }

    fn url(&self) -> String {
        format!(
            "{}{}:generateContent",
            self.settings.base_url, self.settings.model
        )
    }
}

impl AIProvider for GeminiProvider {
    fn generate(&self, prompt: &str) -> Result<String> {
        debug!(
            model = %self.settings.model,
            prompt_chars = prompt.len(),
            "Requesting routine from Gemini"
        );

        let request = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&self.body(prompt));

        send_json::<GenerateReply>(self.name(), request)?.first_text()
    }

    fn name(&self) -> &str {
        "Gemini"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.settings.model)
    }
}
