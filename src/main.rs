//! # autoprod-forecast
//!
//! Command-line front end for the monthly production analysis.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use autoprod_forecast::config::PipelineConfig;
use autoprod_forecast::io::{load_csv, LoadOptions};
use autoprod_forecast::models::sarima::{AutoSarimaConfig, SarimaConfig, SarimaForecaster, SarimaOrder};
use autoprod_forecast::models::Forecaster;
use autoprod_forecast::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "autoprod-forecast")]
#[command(about = "Seasonal ARIMA analysis of monthly production data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit, forecast, compare with a later vintage and run the sensitivity analysis
    Analyze {
        /// CSV of the vintage used for fitting
        #[arg(long)]
        original: PathBuf,

        /// CSV of the later vintage used for comparison
        #[arg(long)]
        updated: PathBuf,

        /// TOML configuration (defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Fit one series and print the model summary and forecast
    Fit {
        /// Input CSV
        #[arg(short, long)]
        input: PathBuf,

        /// Order as p,d,q or p,d,q,P,D,Q,s
        #[arg(short, long, default_value = "0,1,2,0,1,1,12")]
        order: String,

        /// Search orders automatically instead of using --order
        #[arg(long)]
        auto: bool,

        /// Months to forecast
        #[arg(long, default_value = "12")]
        horizon: usize,

        /// Interval confidence level
        #[arg(long, default_value = "0.95")]
        level: f64,

        /// Fit the raw values instead of their log
        #[arg(long)]
        no_log: bool,

        /// Value column header (default: second column)
        #[arg(long)]
        column: Option<String>,
    },

    /// Print the default configuration as TOML
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autoprod_forecast=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            original,
            updated,
            config,
        } => analyze(original, updated, config),
        Commands::Fit {
            input,
            order,
            auto,
            horizon,
            level,
            no_log,
            column,
        } => fit(input, &order, auto, horizon, level, !no_log, column),
        Commands::Config => {
            print!("{}", PipelineConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

fn analyze(original: PathBuf, updated: PathBuf, config: Option<PathBuf>) -> Result<()> {
    let config = match config {
        Some(path) => PipelineConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let report = Pipeline::new(config)
        .run(&original, &updated)
        .with_context(|| format!("analysing {} against {}", original.display(), updated.display()))?;
    println!("{}", report);
    Ok(())
}

fn fit(
    input: PathBuf,
    order: &str,
    auto: bool,
    horizon: usize,
    level: f64,
    log: bool,
    column: Option<String>,
) -> Result<()> {
    let mut options = LoadOptions::default();
    if let Some(column) = column {
        options = options.with_value_column(column);
    }
    let series = load_csv(&input, &options)
        .and_then(|loaded| loaded.require_complete())
        .with_context(|| format!("loading {}", input.display()))?;
    let series = if log { series.log()? } else { series };

    let mut model = if auto {
        SarimaForecaster::automatic(AutoSarimaConfig::default())
    } else {
        let order: SarimaOrder = order.parse().context("parsing --order")?;
        SarimaForecaster::fixed(SarimaConfig::default().with_order(order))
    };
    model
        .fit(&series)
        .with_context(|| format!("fitting {}", model.name()))?;

    for candidate in model.candidates() {
        match candidate.score {
            Some(score) => println!("{:<28} {:>12.3}", candidate.order.to_string(), score),
            None => println!("{:<28} {:>12}", candidate.order.to_string(), "failed"),
        }
    }
    if !model.candidates().is_empty() {
        println!();
    }

    let fitted = model.fitted().context("model was not fitted")?;
    println!("{}", fitted);
    println!("{}", fitted.residual_diagnostics(24));
    println!();

    let forecast = model.predict_with_intervals(horizon, level)?.to_raw_scale()?;
    println!("{:<8} {:>12} {:>12} {:>12}", "month", "forecast", "lower", "upper");
    for p in forecast.points() {
        println!(
            "{:<8} {:>12.4} {:>12.4} {:>12.4}",
            p.month.to_string(),
            p.mean,
            p.lower,
            p.upper
        );
    }
    Ok(())
}
