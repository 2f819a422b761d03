//! NeoGuard CLI
//!
//! Runs the neonatal risk pipeline over JSON input files and checks that a
//! deployment's settings and artifacts load.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use tracing::info;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "neoguard")]
#[command(about = "NeoGuard neonatal risk inference", long_about = None)]
struct Cli {
    /// Configuration file path (YAML); NEOGUARD_* variables override it
    #[arg(short, long, env = "NEOGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Predict condition risks for a JSON record or array of records
    Predict(PredictArgs),

    /// Load settings and artifacts and print a summary
    Check,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Input file: a JSON object (single) or array (bulk)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Write results here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Reject records with missing or out-of-range values
    #[arg(long)]
    pub strict: bool,

    /// Emit one row per (name, condition) instead of nested results
    #[arg(long)]
    pub flat: bool,

    /// Print Prometheus metrics to stderr when done
    #[arg(long)]
    pub metrics: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Predict(args) => {
            let metrics_handle = if args.metrics {
                Some(init_metrics()?)
            } else {
                None
            };
            commands::predict(cli.config.as_deref(), args)?;

            if let Some(handle) = metrics_handle {
                eprintln!("{}", handle.render());
            }
        }
        Command::Check => commands::check(cli.config.as_deref())?,
    }

    Ok(())
}

/// Initialize tracing/logging
///
/// Logs go to stderr so stdout carries only prediction output.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("neoguard=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("neoguard=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize metrics recorder and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "neoguard_predictions_total",
        "Total number of records scored by mode"
    );
    metrics::describe_counter!(
        "neoguard_risk_levels_total",
        "Risk levels assigned by condition and level"
    );
    metrics::describe_counter!(
        "neoguard_inference_errors_total",
        "Total number of failed classifier calls"
    );
    metrics::describe_histogram!(
        "neoguard_inference_latency_us",
        metrics::Unit::Microseconds,
        "Prediction latency in microseconds by mode"
    );

    info!("Metrics recorder initialized");
    Ok(handle)
}
