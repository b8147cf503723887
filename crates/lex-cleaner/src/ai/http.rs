//! Settings and transport shared by the HTTP providers.

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Sampling and transport settings for one HTTP provider.
///
/// Temperature defaults to zero so a given profile tends to produce the same
/// routine; 4096 output tokens leave room for a full routine.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Endpoint root. Override it to go through a proxy.
    pub base_url: String,
}

impl ProviderSettings {
    pub(crate) fn new(model: &str, base_url: &str) -> Self {
        Self {
            model: model.to_string(),
            temperature: 0.0,
            max_tokens: 4096,
            timeout: Duration::from_secs(120),
            base_url: base_url.to_string(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(crate) fn client(&self) -> Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client")
    }
}

/// Send `request` and decode a JSON body, turning non-2xx replies into errors
/// that carry the status and body text.
pub(crate) fn send_json<T: DeserializeOwned>(provider: &str, request: RequestBuilder) -> Result<T> {
    let response = request
        .send()
        .with_context(|| format!("{} request failed", provider))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(anyhow!("{} API Error {}: {}", provider, status, body));
    }

    response
        .json()
        .with_context(|| format!("Malformed {} response", provider))
}
