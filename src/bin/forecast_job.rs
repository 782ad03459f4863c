//! End-to-end forecast job: load models, read recent history, emit a batch
//! of forecasts and replace the stored predictions.

use anyhow::Context;
use btc_oil_forecast::{
    EngineConfig, ForecastEngine, ForecastSink, ModelBundle, SqliteForecastDb,
};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "forecast_job", about = "Generate and persist BTC/oil price forecasts")]
struct Cli {
    /// SQLite database holding btc_daily/oil_daily history and predictions
    #[arg(short, long)]
    db: PathBuf,

    /// Directory containing btc_model.onnx, oil_model.onnx, correlation_model.onnx
    #[arg(short, long)]
    models: PathBuf,

    /// Number of forecast steps to emit
    #[arg(long, default_value = "50")]
    horizon: usize,

    /// Model input window length
    #[arg(long, default_value = "5")]
    sequence_length: usize,

    /// Maximum per-step fractional deviation from the previous value
    #[arg(long, default_value = "0.05")]
    clip_fraction: f64,

    /// RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let models = ModelBundle::load(&cli.models)
        .with_context(|| format!("loading models from {}", cli.models.display()))?;
    let mut db = SqliteForecastDb::open(&cli.db)
        .with_context(|| format!("opening database {}", cli.db.display()))?;

    let config = EngineConfig {
        sequence_length: cli.sequence_length,
        horizon: cli.horizon,
        clip_fraction: cli.clip_fraction,
        rng_seed: cli.seed,
    };
    let mut engine = ForecastEngine::new(models, config);

    // Single-connection job: the db serves as both observation store and
    // forecast sink. Engine errors abort before anything is written.
    let batch = engine.forecast(&db).context("forecast run failed")?;
    db.replace_batch(&batch).context("persisting batch failed")?;

    for step in batch.iter().take(15) {
        tracing::info!(
            date = %step.date,
            btc = step.predicted_btc,
            oil = step.predicted_oil,
            "forecast"
        );
    }
    tracing::info!("stored {} predictions", batch.len());

    Ok(())
}
