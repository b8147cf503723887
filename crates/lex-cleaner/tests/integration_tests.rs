//! Integration tests for the cleaning agent.
//!
//! A scripted provider stands in for the language model so every run is
//! deterministic.

use lex_cleaner::ai::AIProvider;
use lex_cleaner::{
    AgentConfig, CleaningAgent, CleaningError, CleaningRequest, DataProfiler, FileSourceSink,
    TransitionEvent, WorkflowStage, extract_code_block,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_csv(filename: &str) -> DataFrame {
    let path = fixtures_path().join(filename);
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read CSV file")
}

/// Replays canned replies in order and records every prompt it receives.
struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl AIProvider for ScriptedProvider {
    fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("429 Too Many Requests"))
    }

    fn name(&self) -> &str {
        "Scripted"
    }
}

fn fenced(source: &str) -> String {
    format!("Here is the routine:\n```clean\n{}\n```\n", source)
}

const DEFAULT_POLICY: &str = r#"fn data_cleaner(df) {
    df = drop_missing_columns(df, 0.4)
    df = impute_mean(df)
    df = impute_mode(df)
    df = drop_duplicates(df)
    df = clip_outliers(df, 0.05, 0.95)
    df = normalize_strings(df)
    return df
}"#;

const WRONG_NAME: &str = "fn clean(df) {\n    return drop_duplicates(df)\n}";

fn agent_with(provider: Arc<ScriptedProvider>) -> CleaningAgent {
    CleaningAgent::builder()
        .provider(provider)
        .build()
        .expect("agent should build")
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[test]
fn test_default_policy_drops_sparse_column_and_duplicates() {
    let df = load_csv("people.csv");
    assert_eq!(df.height(), 10);

    let provider = ScriptedProvider::new(&[&fenced(DEFAULT_POLICY)]);
    let state = agent_with(provider.clone())
        .invoke(CleaningRequest::new(df.clone()).max_retries(3))
        .unwrap();

    assert!(state.is_success());
    assert_eq!(state.retry_count(), 0);
    assert!(state.last_error().is_none());

    let cleaned = state.cleaned_dataset().unwrap();
    assert!(cleaned.column("age").is_err());
    assert_eq!(cleaned.height(), 7);
    assert_eq!(cleaned.column("score").unwrap().null_count(), 0);
    assert_eq!(cleaned.column("city").unwrap().str().unwrap().get(0), Some("paris"));

    // the raw dataset is untouched
    assert!(state.raw_dataset().equals_missing(&df));

    // exactly one generation call, carrying the profile and default policy
    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Follow the basic cleaning steps."));
    assert!(prompts[0].contains("age: 50.00%"));
    assert!(prompts[0].contains("fn data_cleaner(df)"));
}

#[test]
fn test_single_repair_then_success() {
    let provider = ScriptedProvider::new(&[&fenced(WRONG_NAME), &fenced(DEFAULT_POLICY)]);
    let state = agent_with(provider.clone())
        .invoke(CleaningRequest::new(load_csv("people.csv")))
        .unwrap();

    assert_eq!(state.stage(), WorkflowStage::Success);
    assert_eq!(state.retry_count(), 1);
    assert!(state.last_error().is_none());
    assert_eq!(state.function_source(), DEFAULT_POLICY);

    let prompts = provider.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].contains("Fix the broken data_cleaner() function"));
    assert!(prompts[1].contains(WRONG_NAME));
    assert!(prompts[1].contains("Function 'data_cleaner' not found in generated code"));
}

#[test]
fn test_budget_exhausted_keeps_last_source_and_error() {
    let last = "fn data_cleaner(df) {\n    return drop_columns(df, [\"height\"])\n}";
    let provider = ScriptedProvider::new(&[
        &fenced(WRONG_NAME),
        &fenced("fn data_cleaner(df) {\n    return 1\n}"),
        &fenced(last),
    ]);
    let state = agent_with(provider.clone())
        .invoke(CleaningRequest::new(load_csv("people.csv")).max_retries(2))
        .unwrap();

    assert_eq!(state.stage(), WorkflowStage::Failure);
    assert_eq!(state.retry_count(), 2);
    assert!(state.cleaned_dataset().is_none());
    assert_eq!(state.function_source(), last);

    let error = state.last_error().unwrap();
    assert!(error.starts_with("An error occurred during data cleaning:"));
    assert!(error.contains("column 'height' not found"));

    // one generation plus exactly two repairs
    assert_eq!(provider.prompts().len(), 3);

    match state.into_cleaned().unwrap_err() {
        CleaningError::RetryBudgetExhausted {
            retries,
            function_source,
            ..
        } => {
            assert_eq!(retries, 2);
            assert_eq!(function_source, last);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_zero_budget_fails_without_repair() {
    let provider = ScriptedProvider::new(&[&fenced(WRONG_NAME)]);
    let state = agent_with(provider.clone())
        .invoke(CleaningRequest::new(load_csv("people.csv")).max_retries(0))
        .unwrap();

    assert_eq!(state.stage(), WorkflowStage::Failure);
    assert_eq!(state.retry_count(), 0);
    assert_eq!(provider.prompts().len(), 1);
}

#[test]
fn test_syntax_error_is_repaired() {
    let provider = ScriptedProvider::new(&[
        "```python\ndef data_cleaner(df):\n    return df.dropna()\n```",
        &fenced(DEFAULT_POLICY),
    ]);
    let state = agent_with(provider.clone())
        .invoke(CleaningRequest::new(load_csv("people.csv")))
        .unwrap();

    assert!(state.is_success());
    assert_eq!(state.retry_count(), 1);
    assert!(provider.prompts()[1].contains("syntax error on line 1"));
}

// ============================================================================
// Fatal Generation Failures
// ============================================================================

#[test]
fn test_generation_failure_propagates() {
    let provider = ScriptedProvider::new(&[]);
    let err = agent_with(provider)
        .invoke(CleaningRequest::new(load_csv("people.csv")))
        .unwrap_err();

    assert_eq!(err.error_code(), "GENERATION_FAILED");
    assert!(err.is_fatal());
    assert!(err.to_string().contains("429"));
}

#[test]
fn test_generation_failure_during_repair_propagates() {
    let provider = ScriptedProvider::new(&[&fenced(WRONG_NAME)]);
    let err = agent_with(provider.clone())
        .invoke(CleaningRequest::new(load_csv("people.csv")))
        .unwrap_err();

    assert_eq!(err.error_code(), "GENERATION_FAILED");
    assert_eq!(provider.prompts().len(), 2);
}

// ============================================================================
// Observer, Sink and Config
// ============================================================================

#[test]
fn test_observer_sees_every_transition() {
    let events: Arc<Mutex<Vec<TransitionEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let recorded = events.clone();

    let provider = ScriptedProvider::new(&[&fenced(WRONG_NAME), &fenced(DEFAULT_POLICY)]);
    let agent = CleaningAgent::builder()
        .provider(provider)
        .on_transition(move |event| recorded.lock().unwrap().push(event.clone()))
        .build()
        .unwrap();
    agent
        .invoke(CleaningRequest::new(load_csv("people.csv")))
        .unwrap();

    let events = events.lock().unwrap();
    let path: Vec<(WorkflowStage, WorkflowStage)> =
        events.iter().map(|e| (e.from, e.to)).collect();
    assert_eq!(
        path,
        vec![
            (WorkflowStage::Init, WorkflowStage::Generate),
            (WorkflowStage::Generate, WorkflowStage::Execute),
            (WorkflowStage::Execute, WorkflowStage::Repair),
            (WorkflowStage::Repair, WorkflowStage::Execute),
            (WorkflowStage::Execute, WorkflowStage::Success),
        ]
    );
    assert!(events.iter().all(|e| e.retry_count <= e.max_retries));
    assert_eq!(events[0].message, "Creating data cleaner code");
    assert_eq!(events[2].message, "Fixing data cleaner code");
}

#[test]
fn test_sink_holds_latest_candidate() {
    let tmp = tempfile::tempdir().unwrap();
    let provider = ScriptedProvider::new(&[&fenced(WRONG_NAME), &fenced(DEFAULT_POLICY)]);
    let agent = CleaningAgent::builder()
        .provider(provider)
        .sink(Arc::new(FileSourceSink::new(tmp.path())))
        .build()
        .unwrap();

    let state = agent
        .invoke(CleaningRequest::new(load_csv("people.csv")))
        .unwrap();
    let path = state.source_path().unwrap();
    assert_eq!(path, tmp.path().join("data_cleaner.clean"));
    assert_eq!(std::fs::read_to_string(path).unwrap(), DEFAULT_POLICY);
}

#[test]
fn test_log_source_config_installs_file_sink() {
    let tmp = tempfile::tempdir().unwrap();
    let config = AgentConfig::builder()
        .log_source(true)
        .log_path(tmp.path().join("logs"))
        .file_name("routine.clean")
        .build()
        .unwrap();
    let agent = CleaningAgent::builder()
        .provider(ScriptedProvider::new(&[&fenced(DEFAULT_POLICY)]))
        .config(config)
        .build()
        .unwrap();

    agent
        .invoke(CleaningRequest::new(load_csv("people.csv")))
        .unwrap();
    assert!(tmp.path().join("logs/routine.clean").exists());
}

#[test]
fn test_custom_function_name_and_instructions() {
    let source = "fn tidy(df) {\n    return drop_columns(df, [\"age\"])\n}";
    let provider = ScriptedProvider::new(&[&fenced(source)]);
    let agent = CleaningAgent::builder()
        .provider(provider.clone())
        .config(AgentConfig::builder().function_name("tidy").build().unwrap())
        .build()
        .unwrap();

    let state = agent
        .invoke(CleaningRequest::new(load_csv("people.csv")).instructions("Only drop the age column."))
        .unwrap();
    assert!(state.is_success());
    assert_eq!(state.function_name(), "tidy");
    assert_eq!(state.cleaned_dataset().unwrap().width(), 2);
    assert!(provider.prompts()[0].contains("Only drop the age column."));
}

#[test]
fn test_independent_invocations_across_threads() {
    let replies: Vec<String> = (0..4).map(|_| fenced(DEFAULT_POLICY)).collect();
    let replies: Vec<&str> = replies.iter().map(String::as_str).collect();
    let agent = Arc::new(agent_with(ScriptedProvider::new(&replies)));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let agent = agent.clone();
            std::thread::spawn(move || {
                agent
                    .invoke(CleaningRequest::new(load_csv("people.csv")))
                    .unwrap()
                    .into_cleaned()
                    .unwrap()
                    .height()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 7);
    }
}

// ============================================================================
// Parser and Profiler Properties
// ============================================================================

#[test]
fn test_parser_passes_unfenced_text_through() {
    let text = "fn data_cleaner(df) {\n  return df\n}\n";
    assert_eq!(extract_code_block(text), text);
}

#[test]
fn test_profile_is_deterministic_and_non_mutating() {
    let df = load_csv("people.csv");
    let before = df.clone();

    let first = DataProfiler::summary_text(&df).unwrap();
    let second = DataProfiler::summary_text(&df).unwrap();

    assert_eq!(first, second);
    assert!(df.equals_missing(&before));
    // age is listed first: it has the most missing values
    let missing_section = first.split("Missing Value Percentage:").nth(1).unwrap();
    assert!(missing_section.trim_start().starts_with("age: 50.00%"));
}
