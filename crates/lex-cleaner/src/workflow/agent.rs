//! The cleaning agent: drives one dataset through generate, execute and repair.

use super::progress::{ClosureObserver, TransitionEvent, WorkflowObserver};
use super::sink::{FileSourceSink, SourceSink};
use super::state::{WorkflowStage, WorkflowState};
use crate::ai::AIProvider;
use crate::config::AgentConfig;
use crate::error::{CleaningError, Result, ResultExt};
use crate::executor::ScriptExecutor;
use crate::profiler::DataProfiler;
use crate::{repairer, synthesizer};
use polars::prelude::DataFrame;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Entry contract for one invocation.
#[derive(Debug, Clone)]
pub struct CleaningRequest {
    dataset: DataFrame,
    instructions: Option<String>,
    max_retries: Option<usize>,
}

impl CleaningRequest {
    pub fn new(dataset: DataFrame) -> Self {
        Self {
            dataset,
            instructions: None,
            max_retries: None,
        }
    }

    /// Free-form user instructions; the default cleaning policy applies otherwise.
    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    /// Repair budget for this invocation; the agent's config value otherwise.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

/// LLM-driven cleaning agent.
///
/// Use [`CleaningAgent::builder()`] to construct one.
///
/// # Example
///
/// ```rust,ignore
/// use lex_cleaner::{CleaningAgent, CleaningRequest};
/// use lex_cleaner::ai::OpenRouterProvider;
/// use std::sync::Arc;
///
/// let agent = CleaningAgent::builder()
///     .provider(Arc::new(OpenRouterProvider::new(api_key)?))
///     .build()?;
///
/// let state = agent.invoke(CleaningRequest::new(df).max_retries(3))?;
/// if state.is_success() {
///     println!("{}", state.cleaned_dataset().unwrap());
/// }
/// ```
pub struct CleaningAgent {
    config: AgentConfig,
    provider: Arc<dyn AIProvider>,
    sink: Option<Arc<dyn SourceSink>>,
    observer: Option<Arc<dyn WorkflowObserver>>,
}

// Independent invocations may run on separate threads.
static_assertions::assert_impl_all!(CleaningAgent: Send, Sync);

impl CleaningAgent {
    pub fn builder() -> CleaningAgentBuilder {
        CleaningAgentBuilder::default()
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn provider(&self) -> &dyn AIProvider {
        self.provider.as_ref()
    }

    /// Run the workflow to a terminal stage.
    ///
    /// Returns `Err` only for fatal conditions (generation failures,
    /// profiling errors). Exhausting the repair budget is reported as a
    /// state in [`WorkflowStage::Failure`].
    pub fn invoke(&self, request: CleaningRequest) -> Result<WorkflowState> {
        let max_retries = request.max_retries.unwrap_or(self.config.max_retries);
        let mut state = WorkflowState::new(
            request.dataset,
            request.instructions,
            self.config.function_name.clone(),
            max_retries,
        );

        while let Some(next) =
            state
                .stage()
                .next(state.has_error(), state.retry_count(), state.max_retries())
        {
            self.transition(&mut state, next);
            match next {
                WorkflowStage::Generate => self.generate(&mut state)?,
                WorkflowStage::Execute => self.execute(&mut state),
                WorkflowStage::Repair => self.repair(&mut state)?,
                WorkflowStage::Success | WorkflowStage::Failure | WorkflowStage::Init => {}
            }
        }

        Ok(state)
    }

    fn transition(&self, state: &mut WorkflowState, to: WorkflowStage) {
        let from = state.stage();
        state.enter(to);

        let message = match to {
            WorkflowStage::Init => "Initializing".to_string(),
            WorkflowStage::Generate => "Creating data cleaner code".to_string(),
            WorkflowStage::Execute => "Executing data cleaner code".to_string(),
            WorkflowStage::Repair => "Fixing data cleaner code".to_string(),
            WorkflowStage::Success => "Data cleaning succeeded".to_string(),
            WorkflowStage::Failure => format!(
                "Data cleaning failed after {} repair(s)",
                state.retry_count()
            ),
        };

        match to {
            WorkflowStage::Failure => error!("{}", message),
            _ => info!("{}", message),
        }

        if let Some(observer) = &self.observer {
            observer.on_transition(&TransitionEvent::new(
                from,
                to,
                state.retry_count(),
                state.max_retries(),
                message,
            ));
        }
    }

    fn generate(&self, state: &mut WorkflowState) -> Result<()> {
        let summary = DataProfiler::summary_text(state.raw_dataset())
            .context("Failed to summarize dataset")?;

        let source = synthesizer::synthesize(
            self.provider.as_ref(),
            state.instructions(),
            &summary,
            state.function_name(),
        )?;
        state.set_source(source);
        self.persist(state);
        Ok(())
    }

    fn execute(&self, state: &mut WorkflowState) {
        match ScriptExecutor::execute(
            state.function_source(),
            state.function_name(),
            state.raw_dataset(),
        ) {
            Ok(cleaned) => {
                debug!(
                    "Cleaned dataset shape: {:?}",
                    (cleaned.height(), cleaned.width())
                );
                state.record_success(cleaned);
            }
            Err(failure) => {
                warn!("Generated routine failed ({}): {}", failure.kind(), failure);
                state.record_failure(failure);
            }
        }
    }

    fn repair(&self, state: &mut WorkflowState) -> Result<()> {
        debug!("Retry count: {}/{}", state.retry_count(), state.max_retries());

        let error = state.last_error().unwrap_or_default().to_string();
        let source = repairer::repair(
            self.provider.as_ref(),
            state.function_source(),
            &error,
            state.function_name(),
        )
        .context(format!("Repair {} failed", state.retry_count() + 1))?;

        state.record_repair(source);
        self.persist(state);
        Ok(())
    }

    // Sink failures are logged and never abort the workflow.
    fn persist(&self, state: &mut WorkflowState) {
        if self.config.log_source {
            debug!("Generated source:\n{}", state.function_source());
        }
        let Some(sink) = &self.sink else {
            return;
        };
        match sink.save(state.function_source(), &self.config.file_name) {
            Ok(path) => state.set_source_path(path),
            Err(e) => warn!("Failed to persist generated source: {}", e),
        }
    }
}

/// Builder for [`CleaningAgent`].
#[derive(Default)]
pub struct CleaningAgentBuilder {
    config: Option<AgentConfig>,
    provider: Option<Arc<dyn AIProvider>>,
    sink: Option<Arc<dyn SourceSink>>,
    observer: Option<Arc<dyn WorkflowObserver>>,
}

impl CleaningAgentBuilder {
    /// Set the agent configuration.
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the generation provider (required).
    pub fn provider(mut self, provider: Arc<dyn AIProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Persist generated source through `sink`.
    ///
    /// Without one, a [`FileSourceSink`] on `log_path` is used when the
    /// config enables `log_source`.
    pub fn sink(mut self, sink: Arc<dyn SourceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Set a custom transition observer.
    pub fn observer(mut self, observer: Arc<dyn WorkflowObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Set a transition callback closure.
    pub fn on_transition<F>(mut self, callback: F) -> Self
    where
        F: Fn(&TransitionEvent) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(ClosureObserver::new(callback)));
        self
    }

    /// Build the agent.
    ///
    /// Fails if no provider was set or the configuration is invalid.
    pub fn build(self) -> Result<CleaningAgent> {
        let config = self.config.unwrap_or_default();
        config
            .validate()
            .map_err(|e| CleaningError::InvalidConfig(e.to_string()))?;

        let provider = self
            .provider
            .ok_or_else(|| CleaningError::InvalidConfig("a generation provider is required".into()))?;

        let sink = match self.sink {
            Some(sink) => Some(sink),
            None if config.log_source => Some(
                Arc::new(FileSourceSink::new(config.log_path.clone())) as Arc<dyn SourceSink>
            ),
            None => None,
        };

        Ok(CleaningAgent {
            config,
            provider,
            sink,
            observer: self.observer,
        })
    }
}
