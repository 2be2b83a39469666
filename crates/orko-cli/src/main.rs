//! CLI entry point for ORKO.
//!
//! This binary provides the `orko` command with subcommands for parsing
//! single commands, running labeled evaluations, and mining error exports
//! for guardrail and few-shot suggestions.

mod cli;
mod settings;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use orko_eval::{
    categorize_failures, detect_weak_domains, export_errors, render_report, run_coverage,
    suggest_few_shots, suggest_guardrails, EvalDataset, EvalSummary, Evaluator, MetricsWriter,
    PatternMiner,
};
use orko_intent::config::DOMAINS_FILE;
use orko_intent::{
    CompletionConfig, DomainRegistry, HttpCompletionClient, KeywordIndex, ParserConfig,
    ParserEngine, TelemetrySink,
};
use orko_store::{Database, MetricsStore, ParseLogStore};

use cli::{Cli, Commands, EvalAction};
use settings::{Settings, SETTINGS_FILE};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("info");

    let args = Cli::parse();

    match &args.command {
        Commands::Parse {
            command,
            domain,
            workflow,
        } => cmd_parse(&args, command, domain.as_deref(), *workflow).await,
        Commands::Eval { action } => match action {
            EvalAction::Run {
                dataset,
                version,
                run_id,
                errors_out,
            } => cmd_eval_run(&args, dataset, version, run_id.as_deref(), errors_out).await,
            EvalAction::Weaknesses { run_id } => cmd_eval_weaknesses(&args, run_id).await,
            EvalAction::Coverage { dataset } => cmd_eval_coverage(&args, dataset).await,
        },
        Commands::Mine { errors } => cmd_mine(errors),
        Commands::Suggest { errors } => cmd_suggest(errors),
    }
}

// ---------------------------------------------------------------------------
// Subcommand: parse
// ---------------------------------------------------------------------------

async fn cmd_parse(
    args: &Cli,
    command: &str,
    domain: Option<&str>,
    workflow: bool,
) -> Result<()> {
    let engine = build_engine(args).await?;

    let parsed = engine
        .parse_command(command, &serde_json::Map::new(), domain)
        .await;
    println!("{}", serde_json::to_string_pretty(&parsed)?);

    if workflow {
        let binding = engine
            .map_to_workflow(&parsed)
            .context("no workflow template matches the parsed intent")?;
        println!("{}", serde_json::to_string_pretty(&binding)?);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: eval run
// ---------------------------------------------------------------------------

async fn cmd_eval_run(
    args: &Cli,
    dataset_path: &Path,
    version: &str,
    run_id: Option<&str>,
    errors_out: &Path,
) -> Result<()> {
    // 1. Assemble the engine and the labeled dataset.
    let engine = build_engine(args).await?;
    let dataset = EvalDataset::load(dataset_path)
        .with_context(|| format!("failed to load dataset {}", dataset_path.display()))?;
    info!(items = dataset.len(), "dataset loaded");

    // 2. Run the evaluation.
    let evaluator = Evaluator::new(&engine);
    let (results, summary) = evaluator.run(&dataset, version).await;

    // 3. Persist the metrics row.
    let db = open_database(args).await?;
    let writer = MetricsWriter::new(MetricsStore::new(db));
    let record = writer
        .save(&summary, run_id)
        .await
        .context("failed to persist metrics row")?;

    // 4. Export the mismatches for offline mining.
    let exported = export_errors(&results, errors_out)
        .with_context(|| format!("failed to export errors to {}", errors_out.display()))?;

    // 5. Print the console report.
    print!("{}", render_report(&record.run_id, &summary));
    println!("Errors exported: {} -> {}", exported, errors_out.display());

    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: eval weaknesses
// ---------------------------------------------------------------------------

async fn cmd_eval_weaknesses(args: &Cli, run_id: &str) -> Result<()> {
    let db = open_database(args).await?;
    let store = MetricsStore::new(db);

    let record = store
        .get_by_run(run_id)
        .await?
        .with_context(|| format!("no metrics row for run {run_id}"))?;
    let summary = EvalSummary::from_metrics(&record)?;

    let weaknesses = detect_weak_domains(&summary);
    println!("{}", serde_json::to_string_pretty(&weaknesses)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: eval coverage
// ---------------------------------------------------------------------------

async fn cmd_eval_coverage(args: &Cli, dataset_path: &Path) -> Result<()> {
    let engine = build_engine(args).await?;
    let dataset = EvalDataset::load(dataset_path)
        .with_context(|| format!("failed to load dataset {}", dataset_path.display()))?;

    let report = run_coverage(&engine, dataset.commands()).await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: mine
// ---------------------------------------------------------------------------

fn cmd_mine(errors: &Path) -> Result<()> {
    let miner = PatternMiner::from_path(errors)?;

    let patterns = miner.summarize();
    let failures = categorize_failures(miner.records());

    let output = serde_json::json!({
        "patterns": patterns,
        "failure_categories": failures,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: suggest
// ---------------------------------------------------------------------------

fn cmd_suggest(errors: &Path) -> Result<()> {
    let miner = PatternMiner::from_path(errors)?;
    let patterns = miner.summarize();

    let guardrails = suggest_guardrails(&patterns);
    let few_shots = suggest_few_shots(&guardrails);

    let output = serde_json::json!({
        "guardrail_suggestions": guardrails,
        "fewshot_suggestions": few_shots,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Build the full parser engine from the config directory, the database, and
/// the completion environment.
async fn build_engine(args: &Cli) -> Result<ParserEngine> {
    // 1. Pipeline config and domain catalog.
    let config = ParserConfig::load(&args.config_dir)
        .with_context(|| format!("failed to load config from {}", args.config_dir.display()))?;
    let index = Arc::new(KeywordIndex::new());
    let registry = Arc::new(
        DomainRegistry::load(args.config_dir.join(DOMAINS_FILE), index)
            .context("failed to load domain catalog")?,
    );

    // 2. Stores.
    let db = open_database(args).await?;
    let parse_logs = ParseLogStore::new(db);

    // 3. Completion client from settings.toml merged with the environment.
    let settings = Settings::load(&args.config_dir.join(SETTINGS_FILE))?.merge_env();
    let api_key = settings.api_key.context(
        "no api key configured (set OPENAI_API_KEY, use a .env file, or add api_key to settings.toml)",
    )?;
    let completion = match (settings.model, settings.base_url) {
        (Some(model), Some(base_url)) => {
            CompletionConfig::openai_compatible(api_key, model, base_url)
        }
        _ => CompletionConfig::openai(api_key),
    };
    let client = Arc::new(HttpCompletionClient::new(completion)?);

    // 4. Telemetry sink.
    let telemetry = Arc::new(TelemetrySink::new(&args.logs_dir));

    let engine = ParserEngine::new(registry, &config, client, parse_logs, telemetry)?;
    info!("parser engine ready");
    Ok(engine)
}

/// Open (or create) the SQLite database and apply migrations.
async fn open_database(args: &Cli) -> Result<Database> {
    if let Some(parent) = args.db.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).context("failed to create data directory")?;
        }
    }
    let db = Database::open_and_migrate(args.db.clone())
        .await
        .with_context(|| format!("failed to open database {}", args.db.display()))?;
    Ok(db)
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
