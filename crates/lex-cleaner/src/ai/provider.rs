//! Generation capability trait.
//!
//! The agent treats text generation as an opaque collaborator: a prompt goes
//! in, text comes out, and any error is fatal for the current invocation.
//!
//! # Implementing a New Provider
//!
//! 1. Create a new file in `src/ai/` (e.g., `ollama.rs`)
//! 2. Implement the [`AIProvider`] trait for your provider struct
//! 3. Export the provider in `src/ai/mod.rs`

use anyhow::Result;

/// Trait for services that turn a prompt into generated text.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so one agent can serve
/// invocations from several threads.
///
/// # Error Handling
///
/// Errors are not retried by the agent. They surface to the caller as
/// [`CleaningError::GenerationFailed`](crate::CleaningError::GenerationFailed)
/// and consume no repair budget.
pub trait AIProvider: Send + Sync {
    /// Send `prompt` to the model and return its raw reply.
    fn generate(&self, prompt: &str) -> Result<String>;

    /// Get the provider name for logging and debugging.
    fn name(&self) -> &str;

    /// Get the model being used by this provider.
    ///
    /// Returns `None` if the model is not applicable or unknown.
    fn model(&self) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    impl AIProvider for EchoProvider {
        fn generate(&self, prompt: &str) -> Result<String> {
            Ok(prompt.to_uppercase())
        }

        fn name(&self) -> &str {
            "Echo"
        }
    }

    #[test]
    fn test_default_model_is_none() {
        let provider = EchoProvider;
        assert_eq!(provider.model(), None);
        assert_eq!(provider.name(), "Echo");
        assert_eq!(provider.generate("abc").unwrap(), "ABC");
    }

    #[test]
    fn test_provider_is_object_safe() {
        let provider: Box<dyn AIProvider> = Box::new(EchoProvider);
        assert_eq!(provider.generate("x").unwrap(), "X");
    }
}
