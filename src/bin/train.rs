//! Offline training entry point: fit a model from a CSV of daily
//! observations and persist the artifact for the inference registry.

use std::fs::File;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use clap::Parser;

use reservoir_thermal::config::{Horizon, ModelConfig, ModelFamily};
use reservoir_thermal::data_handling::ObservationSeries;
use reservoir_thermal::training::train_and_save;

#[derive(Parser)]
#[command(
    name = "train",
    version,
    about = "Train a reservoir outflow temperature model"
)]
struct Cli {
    /// CSV of daily observations (date plus the raw hydrology columns).
    #[arg(long)]
    data: PathBuf,

    /// Forecast horizon in days (1, 3 or 7). Omit to train all three.
    #[arg(long)]
    horizon: Option<u32>,

    /// Model family: gam, gbm or rf.
    #[arg(long, default_value = "gbm")]
    model_type: String,

    /// Directory for the model artifact and importance export.
    #[arg(long, default_value = "models/saved")]
    out_dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let family = ModelFamily::from_str(&cli.model_type).map_err(anyhow::Error::msg)?;
    let file = File::open(&cli.data)
        .with_context(|| format!("opening {}", cli.data.display()))?;
    let mut series = ObservationSeries::from_csv_reader(file)?;
    series.forward_fill();

    std::fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("creating {}", cli.out_dir.display()))?;

    let horizons = match cli.horizon {
        Some(days) => vec![Horizon::new(days)?],
        None => Horizon::all().collect(),
    };

    for horizon in horizons {
        let config = ModelConfig::new(horizon, family.clone());
        let outcome = train_and_save(&config, &series, &cli.out_dir)?;
        println!(
            "h{}: MAE {:.3} ± {:.3}, R2 {:.3} ± {:.3} -> {}",
            horizon,
            outcome.report.mae_mean,
            outcome.report.mae_std,
            outcome.report.r2_mean,
            outcome.report.r2_std,
            outcome.artifact_path.display()
        );
    }
    Ok(())
}
