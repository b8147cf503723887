//! Generation providers.
//!
//! The agent only ever talks to the [`AIProvider`] trait. Concrete HTTP
//! clients live behind the `ai` feature flag:
//!
//! ```toml
//! # Enable the HTTP providers (default)
//! lex-cleaner = { version = "0.1", features = ["ai"] }
//!
//! # Bring your own provider
//! lex-cleaner = { version = "0.1", default-features = false }
//! ```
//!
//! - [`GeminiProvider`] - Google Gemini API (requires `ai` feature)
//! - [`OpenRouterProvider`] - OpenRouter API (requires `ai` feature)
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_cleaner::ai::OpenRouterProvider;
//! use lex_cleaner::CleaningAgent;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(OpenRouterProvider::new("your-api-key")?);
//! let agent = CleaningAgent::builder().provider(provider).build()?;
//! ```

// Provider trait is always available (for custom implementations)
mod provider;
pub use provider::AIProvider;

#[cfg(feature = "ai")]
mod gemini;
#[cfg(feature = "ai")]
mod http;
#[cfg(feature = "ai")]
mod openrouter;

#[cfg(feature = "ai")]
pub use gemini::GeminiProvider;

#[cfg(feature = "ai")]
pub use http::ProviderSettings;

#[cfg(feature = "ai")]
pub use openrouter::OpenRouterProvider;
