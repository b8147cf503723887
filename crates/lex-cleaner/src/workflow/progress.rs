//! Observing stage transitions of a running workflow.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_cleaner::CleaningAgent;
//!
//! let agent = CleaningAgent::builder()
//!     .provider(provider)
//!     .on_transition(|event| {
//!         println!("{} -> {} ({})", event.from, event.to, event.message);
//!     })
//!     .build()?;
//! ```

use super::state::WorkflowStage;
use serde::{Deserialize, Serialize};

/// One stage change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub from: WorkflowStage,
    pub to: WorkflowStage,
    /// Repairs spent when the transition happened.
    pub retry_count: usize,
    pub max_retries: usize,
    pub message: String,
}

impl TransitionEvent {
    pub fn new(
        from: WorkflowStage,
        to: WorkflowStage,
        retry_count: usize,
        max_retries: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            from,
            to,
            retry_count,
            max_retries,
            message: message.into(),
        }
    }
}

/// Receives every [`TransitionEvent`] of an invocation, terminal ones included.
pub trait WorkflowObserver: Send + Sync {
    /// Called synchronously by the agent; keep it cheap.
    fn on_transition(&self, event: &TransitionEvent);
}

/// Wrapper that implements [`WorkflowObserver`] using a closure.
pub struct ClosureObserver<F>
where
    F: Fn(&TransitionEvent) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureObserver<F>
where
    F: Fn(&TransitionEvent) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> WorkflowObserver for ClosureObserver<F>
where
    F: Fn(&TransitionEvent) + Send + Sync,
{
    fn on_transition(&self, event: &TransitionEvent) {
        (self.callback)(event);
    }
}

static_assertions::assert_impl_all!(TransitionEvent: Send, Sync);
