//! LLM-driven data cleaning agent.
//!
//! A language model writes a cleaning routine for a dataset; the agent runs
//! it, and when it fails, feeds the error back to the model for a fix, up to
//! a retry budget.
//!
//! # Overview
//!
//! - **Profiling**: a deterministic text summary of the dataset (types,
//!   missing values, outlier bounds, sample values) that goes into the prompt
//! - **Generation**: the model returns a routine in a small cleaning-script
//!   language built on Polars operations
//! - **Execution**: every attempt runs in a fresh, isolated interpreter scope
//!   against the original dataset; failures (panics included) are captured
//! - **Repair**: failed routines are sent back with their error until they
//!   run or the budget is spent
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_cleaner::{CleaningAgent, CleaningRequest};
//! use lex_cleaner::ai::OpenRouterProvider;
//! use std::sync::Arc;
//!
//! let agent = CleaningAgent::builder()
//!     .provider(Arc::new(OpenRouterProvider::new(api_key)?))
//!     .on_transition(|event| println!("{} -> {}", event.from, event.to))
//!     .build()?;
//!
//! let state = agent.invoke(
//!     CleaningRequest::new(df)
//!         .instructions("Keep the id column untouched.")
//!         .max_retries(3),
//! )?;
//!
//! let cleaned = state.into_cleaned()?;
//! ```
//!
//! # AI Providers
//!
//! Generation goes through the [`ai::AIProvider`] trait. With the `ai`
//! feature (on by default) two HTTP providers are available:
//!
//! - [`ai::OpenRouterProvider`] - OpenRouter chat completions
//! - [`ai::GeminiProvider`] - Google Gemini `generateContent`

pub mod ai;
pub mod config;
pub mod error;
pub mod executor;
pub mod parser;
pub mod profiler;
pub mod report;
pub mod repairer;
pub mod script;
pub mod synthesizer;
pub mod utils;
pub mod workflow;

// Re-exports for convenient access
pub use config::{AgentConfig, AgentConfigBuilder, ConfigValidationError};
pub use error::{CleaningError, ExecutionFailure, Result, ResultExt};
pub use executor::{CompiledScript, Executable, ScriptExecutor};
pub use parser::extract_code_block;
pub use profiler::{DataProfiler, DatasetSummary};
pub use report::{CleaningReport, DatasetMetrics};
pub use workflow::{
    CleaningAgent, CleaningAgentBuilder, CleaningRequest, ClosureObserver, FileSourceSink,
    SourceSink, TransitionEvent, WorkflowObserver, WorkflowStage, WorkflowState,
};
