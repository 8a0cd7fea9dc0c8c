//! Descriptive analysis of the historical table
//!
//! Each function reduces a [`ProductionTable`] to its own immutable result;
//! the pipeline gathers them into the final report.

use crate::data::{Observation, ProductionTable};
use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use production_math::forecasting::LinearTrend;
use production_math::statistics::{
    excess_kurtosis, iqr_outliers, jarque_bera, mean, median, pearson_correlation, quantile,
    skewness, zscore_outliers, NormalityTest, OutlierScreen,
};
use production_math::volatility::{coefficient_of_variation, standard_deviation};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Rows needed before the first-half/second-half growth comparison is made
const GROWTH_MIN_ROWS: usize = 50;
const ZSCORE_THRESHOLD: f64 = 3.0;

/// Distribution of the production column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionStats {
    pub total: f64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub p25: f64,
    pub p75: f64,
    pub coefficient_of_variation: Option<f64>,
    pub skewness: f64,
    pub excess_kurtosis: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveSummary {
    pub rows: usize,
    pub columns: usize,
    pub dropped_rows: usize,
    pub duplicate_rows: usize,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub span_days: i64,
    pub production: ProductionStats,
    pub iqr_outliers: OutlierScreen,
    pub zscore_outliers: usize,
    /// Jarque-Bera test; absent for fewer than three rows
    pub normality: Option<NormalityTest>,
}

fn require_rows(table: &ProductionTable) -> Result<()> {
    if table.is_empty() {
        return Err(ForecastError::InsufficientData {
            required: 1,
            available: 0,
        });
    }
    Ok(())
}

/// Summary statistics and distribution diagnostics
pub fn describe(table: &ProductionTable) -> Result<DescriptiveSummary> {
    require_rows(table)?;
    let values = table.production_values();

    let (period_start, period_end) = table.date_range().ok_or_else(|| {
        ForecastError::DataError("Table has no dates".to_string())
    })?;

    let mut seen = HashSet::new();
    let duplicate_rows = table
        .observations()
        .iter()
        .filter(|o| {
            !seen.insert((
                o.date,
                o.region.as_str(),
                o.technology.as_str(),
                o.production.to_bits(),
            ))
        })
        .count();

    let std_dev = if values.len() > 1 {
        standard_deviation(&values, true)?
    } else {
        0.0
    };

    let production = ProductionStats {
        total: values.iter().sum(),
        mean: mean(&values)?,
        median: median(&values)?,
        std_dev,
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        p25: quantile(&values, 0.25)?,
        p75: quantile(&values, 0.75)?,
        coefficient_of_variation: coefficient_of_variation(&values).ok(),
        skewness: skewness(&values)?,
        excess_kurtosis: excess_kurtosis(&values)?,
    };

    Ok(DescriptiveSummary {
        rows: table.len(),
        columns: table.source().width(),
        dropped_rows: table.dropped_rows(),
        duplicate_rows,
        period_start,
        period_end,
        span_days: (period_end - period_start).num_days(),
        production,
        iqr_outliers: iqr_outliers(&values)?,
        zscore_outliers: zscore_outliers(&values, ZSCORE_THRESHOLD)?,
        normality: jarque_bera(&values).ok(),
    })
}

/// Production aggregated over one category value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub name: String,
    pub total: f64,
    pub mean: f64,
    pub count: usize,
    /// Percentage of all production
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    /// Sorted by total, largest first
    pub by_region: Vec<CategoryTotal>,
    pub by_technology: Vec<CategoryTotal>,
    pub leading_region: Option<CategoryTotal>,
    pub leading_technology: Option<CategoryTotal>,
    /// Region with the highest mean production per record
    pub most_efficient_region: Option<CategoryTotal>,
}

/// Totals per category value, largest first; ties keep name order
pub fn category_totals<'a, I>(items: I) -> Vec<CategoryTotal>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for (name, value) in items {
        let entry = sums.entry(name).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    let grand: f64 = sums.values().map(|(total, _)| total).sum();

    let mut totals: Vec<CategoryTotal> = sums
        .into_iter()
        .map(|(name, (total, count))| CategoryTotal {
            name: name.to_string(),
            total,
            mean: total / count as f64,
            count,
            share: if grand > 0.0 { total / grand * 100.0 } else { 0.0 },
        })
        .collect();
    totals.sort_by(|a, b| b.total.total_cmp(&a.total));
    totals
}

fn region_of(o: &Observation) -> (&str, f64) {
    (o.region.as_str(), o.production)
}

fn technology_of(o: &Observation) -> (&str, f64) {
    (o.technology.as_str(), o.production)
}

/// Totals, means and shares per region and per technology
pub fn breakdown(table: &ProductionTable) -> Result<Breakdown> {
    require_rows(table)?;
    let by_region = category_totals(table.observations().iter().map(region_of));
    let by_technology = category_totals(table.observations().iter().map(technology_of));

    let most_efficient_region = by_region
        .iter()
        .fold(None::<&CategoryTotal>, |best, c| match best {
            Some(b) if b.mean >= c.mean => Some(b),
            _ => Some(c),
        })
        .cloned();

    Ok(Breakdown {
        leading_region: by_region.first().cloned(),
        leading_technology: by_technology.first().cloned(),
        most_efficient_region,
        by_region,
        by_technology,
    })
}

/// Correlation of two technologies' regional totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyCorrelation {
    pub first: String,
    pub second: String,
    pub correlation: f64,
    /// "strong" above 0.7 in magnitude, otherwise "moderate"
    pub strength: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complementarity {
    pub technologies: (String, String),
    /// One minus the absolute correlation
    pub score: f64,
    pub level: String,
}

/// Region by technology production totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crosstab {
    pub regions: Vec<String>,
    pub technologies: Vec<String>,
    /// `totals[region][technology]`, zero where a pair never occurs
    pub totals: Vec<Vec<f64>>,
    /// Pairs whose correlation exceeds 0.5 in magnitude
    pub correlations: Vec<TechnologyCorrelation>,
    /// Only computed when exactly two technologies exist
    pub complementarity: Option<Complementarity>,
}

impl Crosstab {
    pub fn total(&self, region: &str, technology: &str) -> Option<f64> {
        let r = self.regions.iter().position(|x| x == region)?;
        let t = self.technologies.iter().position(|x| x == technology)?;
        Some(self.totals[r][t])
    }

    fn technology_column(&self, t: usize) -> Vec<f64> {
        self.totals.iter().map(|row| row[t]).collect()
    }
}

pub fn crosstab(table: &ProductionTable) -> Result<Crosstab> {
    require_rows(table)?;
    let mut cells: BTreeMap<(&str, &str), f64> = BTreeMap::new();
    for o in table.observations() {
        *cells
            .entry((o.region.as_str(), o.technology.as_str()))
            .or_insert(0.0) += o.production;
    }

    let regions: Vec<String> = cells
        .keys()
        .map(|(r, _)| *r)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();
    let technologies: Vec<String> = cells
        .keys()
        .map(|(_, t)| *t)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();

    let totals = regions
        .iter()
        .map(|r| {
            technologies
                .iter()
                .map(|t| cells.get(&(r.as_str(), t.as_str())).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();

    let mut tab = Crosstab {
        regions,
        technologies,
        totals,
        correlations: Vec::new(),
        complementarity: None,
    };

    if tab.regions.len() >= 2 {
        for a in 0..tab.technologies.len() {
            for b in a + 1..tab.technologies.len() {
                let r = pearson_correlation(&tab.technology_column(a), &tab.technology_column(b))?;
                let Some(r) = r else { continue };

                if tab.technologies.len() == 2 {
                    let score = 1.0 - r.abs();
                    tab.complementarity = Some(Complementarity {
                        technologies: (tab.technologies[a].clone(), tab.technologies[b].clone()),
                        score,
                        level: if score > 0.7 {
                            "high"
                        } else if score > 0.4 {
                            "medium"
                        } else {
                            "low"
                        }
                        .to_string(),
                    });
                }
                if r.abs() > 0.5 {
                    tab.correlations.push(TechnologyCorrelation {
                        first: tab.technologies[a].clone(),
                        second: tab.technologies[b].clone(),
                        correlation: r,
                        strength: if r.abs() > 0.7 { "strong" } else { "moderate" }.to_string(),
                    });
                }
            }
        }
    }

    Ok(tab)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    /// Change in period total per period
    pub slope: f64,
    pub r_squared: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthSummary {
    pub first_half_mean: f64,
    pub second_half_mean: f64,
    /// Percentage change between the halves
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalPatterns {
    /// `(month, total)` for every month present
    pub monthly_totals: Vec<(u32, f64)>,
    pub best_month: u32,
    pub worst_month: u32,
    /// Best month total minus worst month total
    pub seasonal_spread: f64,
    /// Linear trend of per-date totals
    pub trend: Option<TrendSummary>,
    /// Coefficient of variation of per-date totals
    pub volatility: Option<f64>,
    pub growth: Option<GrowthSummary>,
}

/// Seasonality, trend, volatility and growth of the whole table
pub fn temporal_patterns(table: &ProductionTable) -> Result<TemporalPatterns> {
    require_rows(table)?;

    let mut monthly: BTreeMap<u32, f64> = BTreeMap::new();
    let mut per_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for o in table.observations() {
        *monthly.entry(o.date.month()).or_insert(0.0) += o.production;
        *per_date.entry(o.date).or_insert(0.0) += o.production;
    }

    let monthly_totals: Vec<(u32, f64)> = monthly.into_iter().collect();
    // First month wins ties in both directions
    let best = monthly_totals
        .iter()
        .fold(monthly_totals[0], |b, &m| if m.1 > b.1 { m } else { b });
    let worst = monthly_totals
        .iter()
        .fold(monthly_totals[0], |w, &m| if m.1 < w.1 { m } else { w });

    let period_totals: Vec<f64> = per_date.into_values().collect();
    let trend = LinearTrend::fit(&period_totals).ok().map(|t| TrendSummary {
        slope: t.slope(),
        r_squared: t.r_squared(),
    });
    let volatility = coefficient_of_variation(&period_totals).ok();

    let growth = if table.len() > GROWTH_MIN_ROWS {
        let mut ordered: Vec<&Observation> = table.observations().iter().collect();
        ordered.sort_by_key(|o| o.date);
        let mid = ordered.len() / 2;
        let first: Vec<f64> = ordered[..mid].iter().map(|o| o.production).collect();
        let second: Vec<f64> = ordered[mid..].iter().map(|o| o.production).collect();
        let first_half_mean = mean(&first)?;
        let second_half_mean = mean(&second)?;
        (first_half_mean > 0.0).then(|| GrowthSummary {
            first_half_mean,
            second_half_mean,
            rate: (second_half_mean - first_half_mean) / first_half_mean * 100.0,
        })
    } else {
        None
    };

    Ok(TemporalPatterns {
        best_month: best.0,
        worst_month: worst.0,
        seasonal_spread: best.1 - worst.1,
        monthly_totals,
        trend,
        volatility,
        growth,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcentrationRisk {
    pub region: String,
    pub share: f64,
    pub level: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    /// Regions holding more than 40% of production
    pub concentration: Vec<ConcentrationRisk>,
    pub active_technologies: usize,
    /// `(technology, share)` in name order
    pub technology_shares: Vec<(String, f64)>,
    pub diversification: Level,
}

/// Geographic concentration and technology diversification
pub fn risk_profile(breakdown: &Breakdown) -> RiskProfile {
    let concentration = breakdown
        .by_region
        .iter()
        .filter(|r| r.share > 40.0)
        .map(|r| ConcentrationRisk {
            region: r.name.clone(),
            share: r.share,
            level: if r.share > 60.0 {
                Level::High
            } else {
                Level::Medium
            },
        })
        .collect();

    let active_technologies = breakdown.by_technology.len();
    let mut technology_shares: Vec<(String, f64)> = breakdown
        .by_technology
        .iter()
        .map(|t| (t.name.clone(), t.share))
        .collect();
    technology_shares.sort_by(|a, b| a.0.cmp(&b.0));

    RiskProfile {
        concentration,
        active_technologies,
        technology_shares,
        diversification: match active_technologies {
            n if n >= 3 => Level::High,
            2 => Level::Medium,
            _ => Level::Low,
        },
    }
}

/// Every descriptive result, computed together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveAnalysis {
    pub summary: DescriptiveSummary,
    pub breakdown: Breakdown,
    pub crosstab: Crosstab,
    pub temporal: TemporalPatterns,
    pub risk: RiskProfile,
}

pub fn analyze(table: &ProductionTable) -> Result<DescriptiveAnalysis> {
    let breakdown = breakdown(table)?;
    Ok(DescriptiveAnalysis {
        summary: describe(table)?,
        risk: risk_profile(&breakdown),
        crosstab: crosstab(table)?,
        temporal: temporal_patterns(table)?,
        breakdown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn obs(month: u32, region: &str, technology: &str, production: f64) -> Observation {
        Observation {
            date: NaiveDate::from_ymd_opt(2024, month, 1).unwrap(),
            region: region.to_string(),
            technology: technology.to_string(),
            production,
            source_row: 0,
        }
    }

    fn table() -> ProductionTable {
        ProductionTable::from_observations(vec![
            obs(1, "North", "Solar", 70.0),
            obs(2, "North", "Wind", 10.0),
            obs(1, "South", "Solar", 10.0),
            obs(2, "South", "Wind", 10.0),
            obs(2, "South", "Wind", 10.0),
        ])
        .unwrap()
    }

    #[test]
    fn summary_statistics() {
        let summary = describe(&table()).unwrap();

        assert_eq!(summary.rows, 5);
        assert_eq!(summary.columns, 4);
        assert_eq!(summary.duplicate_rows, 1);
        assert_eq!(summary.span_days, 31);
        assert_abs_diff_eq!(summary.production.total, 110.0);
        assert_abs_diff_eq!(summary.production.median, 10.0);
        assert_eq!(summary.production.max, 70.0);
        assert_eq!(summary.iqr_outliers.count, 1);
        assert!(summary.normality.is_some());
    }

    #[test]
    fn breakdown_and_risk() {
        let breakdown = breakdown(&table()).unwrap();
        let leader = breakdown.leading_region.clone().unwrap();
        assert_eq!(leader.name, "North");
        assert_abs_diff_eq!(leader.share, 80.0 / 110.0 * 100.0, epsilon = 1e-9);
        assert_eq!(breakdown.leading_technology.as_ref().unwrap().name, "Solar");
        assert_eq!(breakdown.most_efficient_region.as_ref().unwrap().name, "North");

        let risk = risk_profile(&breakdown);
        assert_eq!(risk.concentration.len(), 1);
        assert_eq!(risk.concentration[0].level, Level::High);
        assert_eq!(risk.diversification, Level::Medium);
    }

    #[test]
    fn crosstab_fills_missing_pairs() {
        let table = ProductionTable::from_observations(vec![
            obs(1, "North", "Solar", 5.0),
            obs(1, "South", "Wind", 7.0),
        ])
        .unwrap();
        let tab = crosstab(&table).unwrap();

        assert_eq!(tab.total("North", "Solar"), Some(5.0));
        assert_eq!(tab.total("North", "Wind"), Some(0.0));
        assert_eq!(tab.total("East", "Wind"), None);
        // Perfectly opposed columns
        assert_eq!(tab.correlations.len(), 1);
        let complement = tab.complementarity.unwrap();
        assert_abs_diff_eq!(complement.score, 0.0, epsilon = 1e-12);
        assert_eq!(complement.level, "low");
    }

    #[test]
    fn temporal_patterns_pick_best_and_worst_month() {
        let patterns = temporal_patterns(&table()).unwrap();
        assert_eq!(patterns.best_month, 1);
        assert_eq!(patterns.worst_month, 2);
        assert_abs_diff_eq!(patterns.seasonal_spread, 50.0);
        // Two period totals: 80 then 30
        let trend = patterns.trend.unwrap();
        assert_abs_diff_eq!(trend.slope, -50.0, epsilon = 1e-9);
        assert!(patterns.growth.is_none());
    }

    #[test]
    fn empty_table_is_rejected() {
        let empty = ProductionTable::from_observations(Vec::new()).unwrap();
        assert!(describe(&empty).is_err());
        assert!(analyze(&empty).is_err());
    }
}
