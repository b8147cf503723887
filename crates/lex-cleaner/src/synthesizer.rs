//! Builds the generation prompt and asks the provider for a cleaning routine.

use crate::ai::AIProvider;
use crate::error::{CleaningError, Result};
use crate::parser::{extract_code_block, has_code_block};
use crate::script::REFERENCE;
use tracing::debug;

/// Instructions used when the caller gives none.
pub const DEFAULT_INSTRUCTIONS: &str = "Follow the basic cleaning steps.";

/// Render the prompt for the first generation.
pub fn build_generation_prompt(
    instructions: Option<&str>,
    summary: &str,
    function_name: &str,
) -> String {
    let instructions = instructions
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_INSTRUCTIONS);

    format!(
        "You are a Data Cleaning Agent. Write a routine named {name} that cleans the dataset \
        described below.\n\n\
        Unless the user instructions say otherwise, follow these default cleaning steps:\n\
        1. Drop columns with more than 40% missing values.\n\
        2. Impute missing numeric values with the column mean.\n\
        3. Impute missing text values with the most frequent value.\n\
        4. Drop duplicate rows.\n\
        5. Clip numeric outliers to the 5th and 95th percentiles.\n\
        6. Normalize text columns: trim, collapse whitespace and lowercase.\n\n\
        USER INSTRUCTIONS:\n{instructions}\n\n\
        DATASET SUMMARY:\n{summary}\n\n\
        {reference}\n\n\
        Return the complete program in ```clean``` format. It must define \
        fn {name}(df) and end with `return df`. Only use the operations listed above.",
        name = function_name,
        instructions = instructions,
        summary = summary.trim_end(),
        reference = REFERENCE,
    )
}

/// Send `prompt` to the provider and unwrap the fenced routine.
///
/// Provider errors and empty replies are fatal.
pub(crate) fn request_source(provider: &dyn AIProvider, prompt: &str) -> Result<String> {
    let response = provider
        .generate(prompt)
        .map_err(|e| CleaningError::generation(provider.name(), e))?;

    if !has_code_block(&response) {
        debug!("No code fence in {} reply; using it as-is", provider.name());
    }
    let source = extract_code_block(&response);
    if source.trim().is_empty() {
        return Err(CleaningError::generation(
            provider.name(),
            "model returned no code",
        ));
    }
    Ok(source)
}

/// Generate the first candidate routine.
pub fn synthesize(
    provider: &dyn AIProvider,
    instructions: Option<&str>,
    summary: &str,
    function_name: &str,
) -> Result<String> {
    let prompt = build_generation_prompt(instructions, summary, function_name);
    request_source(provider, &prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Canned {
        reply: std::result::Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl Canned {
        fn new(reply: std::result::Result<&str, &str>) -> Self {
            Self {
                reply: reply.map(String::from).map_err(String::from),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl AIProvider for Canned {
        fn generate(&self, prompt: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(|e| anyhow::anyhow!(e))
        }

        fn name(&self) -> &str {
            "Canned"
        }
    }

    #[test]
    fn test_prompt_uses_default_instructions() {
        let prompt = build_generation_prompt(None, "Dataset Summary:", "data_cleaner");
        assert!(prompt.contains(DEFAULT_INSTRUCTIONS));
        assert!(prompt.contains("fn data_cleaner(df)"));
        assert!(prompt.contains("Dataset Summary:"));
        assert!(prompt.contains("drop_missing_columns(df, threshold)"));
        assert!(prompt.contains("40%"));
    }

    #[test]
    fn test_prompt_blank_instructions_fall_back_to_default() {
        let prompt = build_generation_prompt(Some("   "), "", "data_cleaner");
        assert!(prompt.contains(DEFAULT_INSTRUCTIONS));
    }

    #[test]
    fn test_prompt_keeps_user_instructions() {
        let prompt = build_generation_prompt(Some("Keep the age column."), "", "tidy");
        assert!(prompt.contains("Keep the age column."));
        assert!(!prompt.contains(DEFAULT_INSTRUCTIONS));
        assert!(prompt.contains("fn tidy(df)"));
    }

    #[test]
    fn test_synthesize_extracts_fenced_code() {
        let provider = Canned::new(Ok(
            "Here you go:\n```clean\nfn data_cleaner(df) {\n  return df\n}\n```\nDone.",
        ));
        let source = synthesize(&provider, None, "summary", "data_cleaner").unwrap();
        assert_eq!(source, "fn data_cleaner(df) {\n  return df\n}");
        assert_eq!(provider.prompts.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_synthesize_propagates_provider_error() {
        let provider = Canned::new(Err("quota exceeded"));
        let err = synthesize(&provider, None, "summary", "data_cleaner").unwrap_err();
        assert_eq!(err.error_code(), "GENERATION_FAILED");
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_synthesize_rejects_empty_reply() {
        let provider = Canned::new(Ok("```\n\n```"));
        let err = synthesize(&provider, None, "summary", "data_cleaner").unwrap_err();
        assert!(err.to_string().contains("no code"));
    }
}
