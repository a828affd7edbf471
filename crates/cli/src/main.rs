//! CLI tool for SimpleTOD corpus preparation and evaluation.
//!
//! `prepare` linearizes schema-guided dialogue files into CSV corpora.
//! `evaluate` scores a `target,prediction` CSV produced by inference.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use simpletod_serializer_core::{
    evaluate_predictions, read_prediction_rows, run_pipeline, DomainSetting, LinearizerConfig,
    PipelineConfig, PipelineResult, Step, DEFAULT_CONTEXT_MAX_LENGTH,
};

/// Prepare SimpleTOD corpora and score generated targets.
#[derive(Parser, Debug)]
#[command(name = "simpletod-serialize")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Linearize raw dialogues into (context, target) CSV files
    Prepare(PrepareArgs),

    /// Score a predictions CSV against its reference targets
    Evaluate {
        /// CSV file with `target` and `prediction` columns
        #[arg(long)]
        predictions: PathBuf,

        /// Write the metric report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct PrepareArgs {
    /// Root directory containing train/dev/test dialogue folders
    #[arg(long)]
    raw_data_root: PathBuf,

    /// Output directory for CSV files
    #[arg(long)]
    out_root: PathBuf,

    /// Steps to prepare
    #[arg(long, value_delimiter = ',', default_value = "train,dev,test")]
    steps: Vec<String>,

    /// Dialogue limit per step, in the order of --steps
    #[arg(long, value_delimiter = ',')]
    num_dialogs: Vec<usize>,

    /// Past utterances kept per speaker in each context
    #[arg(long, default_value_t = DEFAULT_CONTEXT_MAX_LENGTH)]
    num_turns: usize,

    /// Domain subset: all, seen, unseen or custom
    #[arg(long, default_value = "all")]
    domain_setting: String,

    /// Domains used with --domain-setting custom
    #[arg(long, value_delimiter = ',')]
    domains: Vec<String>,

    /// Replace annotated slot values in responses with placeholders
    #[arg(long)]
    delexicalize: bool,

    /// Emit one prompted row per target section
    #[arg(long)]
    multi_task: bool,

    /// Include the active intent in targets
    #[arg(long)]
    with_intent: bool,

    /// Include requested slots in targets
    #[arg(long)]
    with_requested_slots: bool,

    /// Rewrite existing output files
    #[arg(long)]
    overwrite: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Prepare(args) => prepare(args),
        Commands::Evaluate {
            predictions,
            report,
        } => evaluate(predictions, report),
    }
}

fn default_log_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// RUST_LOG overrides the level chosen by `--verbose`.
fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_log_directive(verbose)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn prepare(args: PrepareArgs) -> Result<()> {
    let steps = args
        .steps
        .iter()
        .map(|s| s.parse::<Step>())
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid --steps")?;
    let domain_setting: DomainSetting = args
        .domain_setting
        .parse()
        .context("Invalid --domain-setting")?;

    let config = PipelineConfig {
        raw_data_root: args.raw_data_root.clone(),
        out_root: args.out_root.clone(),
        steps,
        num_dialogs: args.num_dialogs.clone(),
        domain_setting,
        custom_domains: args.domains.clone(),
        multi_task: args.multi_task,
        overwrite: args.overwrite,
        linearizer: LinearizerConfig {
            context_max_length: args.num_turns,
            delexicalize: args.delexicalize,
            with_active_intent: args.with_intent,
            with_requested_slots: args.with_requested_slots,
        },
    };

    info!("Processing dialogues from {:?}...", config.raw_data_root);
    let result: PipelineResult = run_pipeline(&config).context("Corpus preparation failed")?;

    std::fs::create_dir_all(&args.out_root)
        .with_context(|| format!("Failed to create {:?}", args.out_root))?;
    let metadata_path = args.out_root.join("metadata.json");
    let metadata = serde_json::json!({
        "config": {
            "raw_data_root": args.raw_data_root.to_string_lossy(),
            "out_root": args.out_root.to_string_lossy(),
            "steps": args.steps,
            "num_dialogs": args.num_dialogs,
            "num_turns": args.num_turns,
            "domain_setting": domain_setting.as_str(),
            "domains": domain_setting.domains(&args.domains),
            "delexicalize": args.delexicalize,
            "multi_task": args.multi_task,
            "with_intent": args.with_intent,
            "with_requested_slots": args.with_requested_slots,
        },
        "counts": {
            "total_dialogues": result.total_dialogues,
            "total_rows": result.total_rows,
        },
        "steps": result.steps,
    });
    std::fs::write(&metadata_path, serde_json::to_string_pretty(&metadata)?)
        .with_context(|| format!("Failed to write {:?}", metadata_path))?;

    info!("[summary]");
    for step in &result.steps {
        if step.skipped {
            info!("  {}: skipped (exists) {:?}", step.step, step.path);
        } else {
            info!(
                "  {}: {} rows from {} dialogues -> {:?}",
                step.step, step.rows, step.dialogues, step.path
            );
        }
    }
    info!("  Metadata: {:?}", metadata_path);
    Ok(())
}

fn evaluate(predictions: PathBuf, report_path: Option<PathBuf>) -> Result<()> {
    info!("Scoring predictions from {:?}...", predictions);
    let rows = read_prediction_rows(&predictions)
        .with_context(|| format!("Failed to read predictions from {:?}", predictions))?;
    let report = evaluate_predictions(&rows);

    for (name, score) in &report.scores {
        info!("  {}: {:.4}", name, score);
    }
    info!("  Turns scored: {}", report.turns);

    if let Some(path) = report_path {
        std::fs::write(&path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("Failed to write {:?}", path))?;
        info!("  Report: {:?}", path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_directive_parses() {
        for verbose in [false, true] {
            let directive = default_log_directive(verbose);
            assert!(EnvFilter::try_new(directive).is_ok());
        }
        assert_eq!(default_log_directive(true), "debug");
    }

    #[test]
    fn test_verbose_flag_is_global() {
        let cli = Cli::try_parse_from([
            "simpletod-serialize",
            "evaluate",
            "--predictions",
            "p.csv",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
    }
}
