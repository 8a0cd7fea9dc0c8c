use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use energy_forecast::export::export_all;
use energy_forecast::{Cadence, ForecastConfig, OutlookPipeline};
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "energy-outlook")]
#[command(about = "Describe and forecast energy production per region and technology")]
struct Args {
    /// Production CSV with date, region, technology and production_mwh columns
    #[arg(short, long)]
    input: PathBuf,

    /// Periods to forecast per group (defaults to the configured horizon)
    #[arg(long)]
    horizon: Option<usize>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for predictions, metrics and the report
    #[arg(short, long, default_value = "outlook")]
    output_dir: PathBuf,

    /// Period length of the horizon
    #[arg(long, value_enum)]
    cadence: Option<CadenceArg>,

    /// Run the additive seasonal model even if the configuration disables it
    #[arg(long, overrides_with = "no_additive")]
    additive: bool,

    /// Skip the additive seasonal model
    #[arg(long, overrides_with = "additive")]
    no_additive: bool,
}

#[derive(Clone, ValueEnum)]
enum CadenceArg {
    Daily,
    Weekly,
}

/// The last of `--additive` / `--no-additive` wins; neither keeps the config
fn apply_additive_flags(config: &mut ForecastConfig, additive: bool, no_additive: bool) {
    if additive {
        config.additive.enabled = true;
    } else if no_additive {
        config.additive.enabled = false;
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ForecastConfig::from_json_file(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?,
        None => ForecastConfig::default(),
    };
    if let Some(cadence) = args.cadence {
        config.cadence = match cadence {
            CadenceArg::Daily => Cadence::Daily,
            CadenceArg::Weekly => Cadence::Weekly,
        };
    }
    apply_additive_flags(&mut config, args.additive, args.no_additive);
    let horizon = args.horizon.unwrap_or(config.default_horizon);

    info!("Starting energy outlook for {}", args.input.display());
    let pipeline = OutlookPipeline::new(config)?;
    let report = pipeline
        .run_csv(&args.input, horizon)
        .with_context(|| format!("Outlook failed for {}", args.input.display()))?;

    if let Some(ensemble) = &report.ensemble {
        println!("{}", ensemble.report());
    } else {
        println!("Not enough data to train; wrote the descriptive report only.");
    }
    println!("{}", report.insights);

    let written = export_all(&args.output_dir, &report)?;
    for path in written {
        println!("Wrote {}", path.display());
    }

    Ok(())
}
