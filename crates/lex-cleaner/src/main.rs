//! CLI entry point for the data cleaning agent.

use anyhow::{Result, anyhow};
use chrono::Local;
use clap::{Parser, ValueEnum};
use dotenv::dotenv;
use lex_cleaner::profiler::DataProfiler;
use lex_cleaner::synthesizer::build_generation_prompt;
use lex_cleaner::{
    AgentConfig, CleaningAgent, CleaningReport, CleaningRequest, DatasetMetrics, WorkflowState,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[cfg(feature = "ai")]
use lex_cleaner::ai::{AIProvider, GeminiProvider, OpenRouterProvider};
#[cfg(feature = "ai")]
use std::env;
#[cfg(feature = "ai")]
use std::sync::Arc;
#[cfg(feature = "ai")]
use tracing::debug;

/// Generation backends selectable from the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliProvider {
    /// OpenRouter chat completions (OPENROUTER_API_KEY)
    Openrouter,
    /// Google Gemini (GEMINI_API_KEY)
    Gemini,
}

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "LLM-driven data cleaning agent",
    long_about = "Asks a language model to write a cleaning routine for a CSV file, runs it, \
                  and repairs it on failure.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  OPENROUTER_API_KEY    API key for OpenRouter\n  \
                  GEMINI_API_KEY        API key for Google Gemini\n\n\
                  EXAMPLES:\n  \
                  # Default cleaning policy\n  \
                  lex-cleaner -i data.csv\n\n  \
                  # Custom instructions and output\n  \
                  lex-cleaner -i data.csv -o clean.csv --instructions \"Do not drop rows\"\n\n  \
                  # Preview the profile and prompt without calling a model\n  \
                  lex-cleaner -i data.csv --dry-run"
)]
struct Args {
    /// Path to the CSV file to clean
    #[arg(short, long)]
    input: String,

    /// Output CSV path
    ///
    /// Defaults to <input_stem>_cleaned.csv next to the input
    #[arg(short, long)]
    output: Option<String>,

    /// Instructions for the model; the default cleaning policy otherwise
    #[arg(long)]
    instructions: Option<String>,

    /// Number of repair attempts after the first execution
    #[arg(long)]
    max_retries: Option<usize>,

    /// Generation provider
    #[arg(long, value_enum, default_value = "openrouter")]
    provider: CliProvider,

    /// Model identifier for the provider
    #[arg(long)]
    model: Option<String>,

    /// Name of the routine the model must define
    #[arg(long, default_value = "data_cleaner")]
    function_name: String,

    /// Persist every generated routine to disk
    #[arg(long)]
    log_source: bool,

    /// Directory for persisted routines
    #[arg(long, default_value = "logs")]
    log_path: String,

    /// Print the dataset profile and generation prompt without calling a model
    #[arg(long)]
    dry_run: bool,

    /// Output the JSON run report to stdout instead of a summary
    ///
    /// Disables all progress logs.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and the final result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is disabled so stdout only carries
/// the report.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let mut config_builder = AgentConfig::builder()
        .function_name(&args.function_name)
        .log_source(args.log_source)
        .log_path(&args.log_path);
    if let Some(max_retries) = args.max_retries {
        config_builder = config_builder.max_retries(max_retries);
    }
    let config = config_builder.build()?;

    info!("Loading dataset from: {}", args.input);
    let data = load_csv(&args.input)?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    if args.dry_run {
        return run_dry_run(&args, &config, &data);
    }

    let agent = build_agent(&args, config)?;
    run_agent(&agent, &args, data)
}

/// Show the profile and the prompt that would be sent.
///
/// Uses `println!` on purpose: this is the command's output, not a log.
fn run_dry_run(args: &Args, config: &AgentConfig, data: &DataFrame) -> Result<()> {
    let summary = DataProfiler::summary_text(data)?;
    let metrics = DatasetMetrics::compute(data)?;

    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Preview of the generation request");
    println!("{}\n", "=".repeat(80));

    println!("DATASET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", args.input);
    println!("  Rows: {}", metrics.rows);
    println!("  Columns: {}", metrics.columns);
    println!("  Missing cells: {}", metrics.missing_cells);
    println!("  Duplicate rows: {}", metrics.duplicate_rows);
    println!();

    println!("PROFILE");
    println!("{}", "-".repeat(40));
    println!("{}", summary);

    println!("PROMPT");
    println!("{}", "-".repeat(40));
    println!(
        "{}",
        build_generation_prompt(args.instructions.as_deref(), &summary, &config.function_name)
    );
    println!();

    println!("{}", "=".repeat(80));
    println!("Output would be written to: {}", output_path(args).display());
    println!("{}", "=".repeat(80));
    Ok(())
}

#[cfg(feature = "ai")]
fn build_agent(args: &Args, config: AgentConfig) -> Result<CleaningAgent> {
    let provider: Arc<dyn AIProvider> = match args.provider {
        CliProvider::Openrouter => {
            let api_key = env::var("OPENROUTER_API_KEY")
                .map_err(|_| anyhow!("OPENROUTER_API_KEY is not set"))?;
            let mut settings = OpenRouterProvider::settings();
            if let Some(ref model) = args.model {
                settings = settings.model(model);
            }
            Arc::new(OpenRouterProvider::with_settings(api_key, settings)?)
        }
        CliProvider::Gemini => {
            let api_key =
                env::var("GEMINI_API_KEY").map_err(|_| anyhow!("GEMINI_API_KEY is not set"))?;
            let mut settings = GeminiProvider::settings();
            if let Some(ref model) = args.model {
                settings = settings.model(model);
            }
            Arc::new(GeminiProvider::with_settings(api_key, settings)?)
        }
    };
    info!(
        "Using {} ({})",
        provider.name(),
        provider.model().unwrap_or("default model")
    );

    let mut builder = CleaningAgent::builder().config(config).provider(provider);
    if !args.quiet {
        builder = builder.on_transition(|event| {
            debug!(
                "[{}/{}] {} -> {}",
                event.retry_count, event.max_retries, event.from, event.to
            );
        });
    }
    Ok(builder.build()?)
}

/// Without the "ai" feature there is no provider to generate code with.
#[cfg(not(feature = "ai"))]
fn build_agent(args: &Args, _config: AgentConfig) -> Result<CleaningAgent> {
    Err(anyhow!(
        "AI support not compiled in; cannot use {:?}. Rebuild with --features ai or use --dry-run.",
        args.provider
    ))
}

fn run_agent(agent: &CleaningAgent, args: &Args, data: DataFrame) -> Result<()> {
    let started_at = Local::now();
    let mut request = CleaningRequest::new(data);
    if let Some(ref instructions) = args.instructions {
        request = request.instructions(instructions);
    }
    if let Some(max_retries) = args.max_retries {
        request = request.max_retries(max_retries);
    }

    let state = agent.invoke(request).map_err(|e| {
        error!("Cleaning aborted: {}", e);
        anyhow!("Cleaning aborted: {}", e)
    })?;
    let report = CleaningReport::from_state(&state, started_at, Local::now())?;

    if state.is_success() {
        let path = output_path(args);
        if let Some(cleaned) = state.cleaned_dataset() {
            write_csv(&mut cleaned.clone(), &path)?;
            info!("Cleaned dataset saved: {}", path.display());
        }
    }

    if args.json {
        println!("{}", report.to_json()?);
    } else {
        print_summary(&report, &state, args);
    }

    if !state.is_success() {
        return Err(anyhow!(
            "Data cleaning failed after {} repair(s)",
            state.retry_count()
        ));
    }
    Ok(())
}

fn print_summary(report: &CleaningReport, state: &WorkflowState, args: &Args) {
    println!();
    println!("{}", "=".repeat(80));
    println!(
        "{}",
        if report.success {
            "CLEANING COMPLETE"
        } else {
            "CLEANING FAILED"
        }
    );
    println!("{}", "=".repeat(80));
    println!();
    println!(
        "Input:  {} ({} rows x {} columns)",
        args.input, report.before.rows, report.before.columns
    );
    if let Some(after) = report.after {
        println!(
            "Output: {} ({} rows x {} columns)",
            output_path(args).display(),
            after.rows,
            after.columns
        );
        println!(
            "  Missing cells: {} -> {}",
            report.before.missing_cells, after.missing_cells
        );
        println!(
            "  Duplicate rows: {} -> {}",
            report.before.duplicate_rows, after.duplicate_rows
        );
    }
    println!(
        "Repairs: {}/{}  Duration: {}ms",
        report.retry_count, report.max_retries, report.duration_ms
    );
    if let Some(ref path) = report.source_path {
        println!("Routine saved to: {}", path);
    }

    if !report.success {
        println!();
        println!("Last routine:");
        println!("{}", state.function_source());
        println!();
        println!("Last error:");
        println!("{}", state.last_error().unwrap_or("unknown"));
    }
    println!();
}

/// `--output`, or `<input_stem>_cleaned.csv` next to the input.
fn output_path(args: &Args) -> PathBuf {
    if let Some(ref output) = args.output {
        return PathBuf::from(output);
    }
    let input = Path::new(&args.input);
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{}_cleaned.csv", stem))
}

fn load_csv(path: &str) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
        .map_err(|e| anyhow!("Failed to read {}: {}", path, e))
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)?;
    Ok(())
}
