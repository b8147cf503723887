//! The generate, execute, repair workflow.
//!
//! [`CleaningAgent`] owns a provider, a configuration and optional
//! persistence and observation hooks. Each call to
//! [`CleaningAgent::invoke`] builds a fresh [`WorkflowState`] and advances it
//! with [`WorkflowStage::next`] until `Success` or `Failure`.

mod agent;
mod progress;
mod sink;
mod state;

pub use agent::{CleaningAgent, CleaningAgentBuilder, CleaningRequest};
pub use progress::{ClosureObserver, TransitionEvent, WorkflowObserver};
pub use sink::{FileSourceSink, SourceSink};
pub use state::{WorkflowStage, WorkflowState};
