//! Asks the provider to fix a routine that failed to run.

use crate::ai::AIProvider;
use crate::error::Result;
use crate::script::REFERENCE;
use crate::synthesizer::request_source;

/// Render the fix prompt for a broken routine.
pub fn build_repair_prompt(function_source: &str, error: &str, function_name: &str) -> String {
    format!(
        "You are a Data Cleaning Agent. Fix the broken {name}() function.\n\n\
        Return the code in ```clean``` format with the corrected function definition.\n\n\
        {reference}\n\n\
        Broken code:\n{source}\n\n\
        Error:\n{error}\n",
        name = function_name,
        reference = REFERENCE,
        source = function_source,
        error = error,
    )
}

/// Request a corrected routine. Provider errors and empty replies are fatal.
pub fn repair(
    provider: &dyn AIProvider,
    function_source: &str,
    error: &str,
    function_name: &str,
) -> Result<String> {
    let prompt = build_repair_prompt(function_source, error, function_name);
    request_source(provider, &prompt)
}
