use chrono::{Duration, NaiveDate};
use energy_forecast::config::Cadence;
use energy_forecast::data::{Observation, ProductionTable, TimeSeriesData};
use energy_forecast::models::additive::AdditiveSeasonal;
use energy_forecast::models::{ForecastModel, TrainedForecastModel};
use energy_forecast::{ForecastConfig, GroupKey, OutlookPipeline};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Energy Forecast: Basic Forecasting Example");
    println!("==========================================\n");

    println!("Creating sample data...");
    let table = create_sample_table(104)?;
    println!("Sample data created: {} weekly records\n", table.len());

    // Single series through the additive seasonal model
    let series = table
        .group_series()
        .into_iter()
        .find(|s| s.key() == &GroupKey::new("North", "Solar"))
        .ok_or("missing sample group")?;
    print_additive_forecast(&series)?;

    // Whole table through the ensemble pipeline
    let config = ForecastConfig {
        n_estimators: 50,
        ..ForecastConfig::default()
    };
    let pipeline = OutlookPipeline::new(config)?;
    let report = pipeline.run(&table, 8)?;

    if let Some(ensemble) = &report.ensemble {
        println!("{}", ensemble.report());
    }
    println!("First predictions:");
    for p in report.predictions().iter().take(8) {
        println!("  {} {:<6} {:<6} {:>8.2} MWh", p.date, p.region, p.technology, p.value);
    }

    println!("\n{}", report.executive_summary());
    Ok(())
}

fn print_additive_forecast(series: &TimeSeriesData) -> Result<(), Box<dyn std::error::Error>> {
    let model = AdditiveSeasonal::new(3, 0.8, Cadence::Weekly)?;
    let trained = model.train(series)?;
    let forecast = trained.forecast(6)?;

    println!("Additive forecast for {} (80% interval):", series.key());
    let dates = forecast.dates().unwrap_or_default();
    let intervals = forecast.intervals().unwrap_or_default();
    for ((date, value), (lower, upper)) in dates.iter().zip(forecast.values()).zip(intervals) {
        println!("  {}: {:.2} ({:.2}, {:.2})", date, value, lower, upper);
    }
    println!();
    Ok(())
}

fn create_sample_table(weeks: usize) -> Result<ProductionTable, Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).ok_or("invalid start date")?;
    let mut observations = Vec::new();

    for (region, scale) in [("North", 1.4), ("South", 0.8)] {
        for (technology, base, phase) in [("Solar", 120.0, 0.0), ("Wind", 90.0, 2.0)] {
            for week in 0..weeks {
                let angle = 2.0 * std::f64::consts::PI * week as f64 / 52.0 + phase;
                observations.push(Observation {
                    date: start + Duration::weeks(week as i64),
                    region: region.to_string(),
                    technology: technology.to_string(),
                    production: scale * (base + 30.0 * angle.sin()) + 0.2 * week as f64,
                    source_row: 0,
                });
            }
        }
    }

    Ok(ProductionTable::from_observations(observations)?)
}
