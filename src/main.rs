//! Caseprice command-line binary

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use caseprice::casebase::CaseBase;
use caseprice::config::{AppConfig, LogFormat};
use caseprice::evaluation::Evaluator;
use caseprice::types::Query;
use caseprice::Estimator;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Configuration file (defaults to $CASEPRICE_CONFIG or caseprice.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON array of historical cases
    #[arg(long, global = true, default_value = "cases.json")]
    cases: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate the unit price of one query
    Estimate {
        /// Query as JSON, e.g. '{"location":"Cenon","rooms":3,"surface":96,"lot":264}'
        query: String,
    },
    /// Measure leave-one-out error with the configured weights
    Evaluate {
        #[arg(long)]
        epochs: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Grid-search the adaptation weights
    Tune {
        /// Number of ranked combinations to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("failed to load configuration")?;

    init_tracing(&config)?;

    let base = CaseBase::from_path(&cli.cases)
        .with_context(|| format!("failed to load cases from {}", cli.cases.display()))?;

    match cli.command {
        Command::Estimate { query } => {
            let query: Query = serde_json::from_str(&query).context("malformed query")?;
            let estimator = Estimator::build(&base, config.profile()?)?;
            let estimate = estimator.estimate(&query)?;
            tracing::info!(price = estimate.price, "Estimate ready");
            print_json(&estimate)?;
        }
        Command::Evaluate { epochs, seed } => {
            let profile = config.profile()?;
            let epochs = epochs.unwrap_or(config.evaluation.epochs);
            let seed = seed.unwrap_or(config.evaluation.seed);

            let report = Evaluator::new(&base, &profile, seed).run(epochs)?;
            tracing::info!(mape = report.mape_rounded(), epochs, seed, "Evaluation finished");
            print_json(&serde_json::json!({
                "epochs": report.epochs,
                "mape": report.mape_rounded(),
                "samples": report.samples,
            }))?;
        }
        Command::Tune { top } => {
            let tuner = config.tuner()?;
            let mut results = tuner.run(&base)?;
            results.truncate(top);
            print_json(&results)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.logging.level.clone()))
        .unwrap_or_else(|_| EnvFilter::new("caseprice=info"));

    // Logs go to stderr so stdout stays machine-readable.
    let registry = tracing_subscriber::registry().with(env_filter);

    match config.logging.format {
        LogFormat::Json => {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        LogFormat::Text => {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
