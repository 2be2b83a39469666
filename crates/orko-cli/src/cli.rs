//! CLI argument definitions for ORKO.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ORKO -- natural-language command parsing and evaluation.
#[derive(Parser)]
#[command(
    name = "orko",
    version,
    about = "ORKO -- natural-language command parsing core",
    long_about = "Parses free-form operator commands into canonical intents and \
                  evaluates the parser against labeled datasets."
)]
pub struct Cli {
    /// Directory holding the pipeline config files (domains.yml,
    /// guardrails.json, risk_policy.json, prompt_versions.json,
    /// workflows.json).
    #[arg(long, global = true, default_value = "config")]
    pub config_dir: PathBuf,

    /// SQLite database path for parse logs and metrics.
    #[arg(long, global = true, default_value = "data/orko.db")]
    pub db: PathBuf,

    /// Directory for JSONL telemetry logs.
    #[arg(long, global = true, default_value = "logs")]
    pub logs_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse one command and print the intent as JSON.
    Parse {
        /// The natural-language command to parse.
        command: String,

        /// Domain hint passed into the parse context.
        #[arg(long, short)]
        domain: Option<String>,

        /// Also resolve the parsed intent to its workflow binding.
        #[arg(long)]
        workflow: bool,
    },

    /// Evaluate the parser against labeled or unlabeled datasets.
    Eval {
        #[command(subcommand)]
        action: EvalAction,
    },

    /// Mine an exported error file for systematic patterns.
    Mine {
        /// Path to the error export (JSONL).
        #[arg(long, default_value = "results/parser_eval_errors.jsonl")]
        errors: PathBuf,
    },

    /// Generate guardrail and few-shot suggestions from an error export.
    Suggest {
        /// Path to the error export (JSONL).
        #[arg(long, default_value = "results/parser_eval_errors.jsonl")]
        errors: PathBuf,
    },
}

/// Evaluation subcommands.
#[derive(Subcommand)]
pub enum EvalAction {
    /// Run the full labeled evaluation: report, metrics row, error export.
    Run {
        /// Labeled dataset (YAML with a `commands` list).
        #[arg(long, default_value = "config/eval_commands.yml")]
        dataset: PathBuf,

        /// Engine version tag recorded with the run.
        #[arg(long, short, default_value = "v7")]
        version: String,

        /// Run identifier; a fresh UUID is minted when omitted.
        #[arg(long)]
        run_id: Option<String>,

        /// Where to write the mismatch export.
        #[arg(long, default_value = "results/parser_eval_errors.jsonl")]
        errors_out: PathBuf,
    },

    /// Analyze a stored run for weak domains.
    Weaknesses {
        /// The run to analyze.
        run_id: String,
    },

    /// Label-free coverage check over a dataset's commands.
    Coverage {
        /// Dataset whose commands are replayed.
        #[arg(long, default_value = "config/eval_commands.yml")]
        dataset: PathBuf,
    },
}
