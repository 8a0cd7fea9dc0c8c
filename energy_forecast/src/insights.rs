//! Historical versus projected comparison and the executive summary

use crate::analysis::{category_totals, Breakdown, DescriptiveAnalysis, Level};
use crate::data::ProductionTable;
use crate::forecast::{IntervalPrediction, PredictionRecord};
use crate::metrics::EvaluationMetrics;
use crate::utils::percent_change;
use chrono::Month;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// Percentage change in mean production beyond which growth or decline is called
const CHANGE_THRESHOLD: f64 = 5.0;

/// One model's projection against the historical record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionComparison {
    pub model: String,
    pub projected_mean: f64,
    pub projected_total: f64,
    /// Percentage change of the mean; `None` when the historical mean is zero
    pub change: Option<f64>,
}

impl ProjectionComparison {
    fn from_values(model: &str, values: &[f64], historical_mean: f64) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let projected_total: f64 = values.iter().sum();
        let projected_mean = projected_total / values.len() as f64;
        Some(Self {
            model: model.to_string(),
            projected_mean,
            projected_total,
            change: percent_change(historical_mean, projected_mean),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadershipConsistency {
    pub historical_leader: String,
    pub historical_share: f64,
    pub projected_leader: String,
    pub projected_share: f64,
    pub consistent: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyGrowth {
    pub technology: String,
    /// Change of mean production per record, in percent
    pub growth: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnologyOutlook {
    pub historical_leader: String,
    pub projected_leader: String,
    pub consistent: bool,
    /// Technologies present in both tables, in name order
    pub growth: Vec<TechnologyGrowth>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelConfidence {
    pub r2: f64,
    /// High above 0.8, medium above 0.6
    pub level: Level,
}

impl ModelConfidence {
    pub fn from_r2(r2: f64) -> Self {
        let level = if r2 > 0.8 {
            Level::High
        } else if r2 > 0.6 {
            Level::Medium
        } else {
            Level::Low
        };
        Self { r2, level }
    }
}

/// Immutable comparison of the historical table with the forecasts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparativeInsights {
    pub historical_mean: f64,
    pub historical_total: f64,
    pub ensemble: Option<ProjectionComparison>,
    pub additive: Option<ProjectionComparison>,
    pub leadership: Option<LeadershipConsistency>,
    pub technology: Option<TechnologyOutlook>,
    pub confidence: Option<ModelConfidence>,
    pub recommendations: Vec<String>,
}

impl ComparativeInsights {
    /// Reduce the historical table and whichever forecasts exist
    pub fn build(
        table: &ProductionTable,
        breakdown: &Breakdown,
        predictions: Option<&[PredictionRecord]>,
        additive: Option<&[IntervalPrediction]>,
        metrics: Option<&EvaluationMetrics>,
    ) -> Self {
        let historical_total: f64 = table.production_values().iter().sum();
        let historical_mean = if table.is_empty() {
            0.0
        } else {
            historical_total / table.len() as f64
        };

        let predictions = predictions.filter(|p| !p.is_empty());

        let ensemble = predictions.and_then(|p| {
            let values: Vec<f64> = p.iter().map(|r| r.value).collect();
            ProjectionComparison::from_values("random_forest", &values, historical_mean)
        });
        let additive = additive.and_then(|p| {
            let values: Vec<f64> = p.iter().map(|r| r.yhat).collect();
            ProjectionComparison::from_values("additive_seasonal", &values, historical_mean)
        });

        let leadership = predictions.and_then(|p| leadership(breakdown, p));
        let technology = predictions.and_then(|p| technology_outlook(breakdown, p));
        let confidence = metrics.map(|m| ModelConfidence::from_r2(m.r2));

        let mut insights = Self {
            historical_mean,
            historical_total,
            ensemble,
            additive,
            leadership,
            technology,
            confidence,
            recommendations: Vec::new(),
        };
        insights.recommendations = insights.recommend(breakdown);
        insights
    }

    fn recommend(&self, breakdown: &Breakdown) -> Vec<String> {
        let mut recommendations = Vec::new();

        match &self.leadership {
            Some(l) if !l.consistent => recommendations.push(format!(
                "Consider increasing investment in {} as the emerging leader",
                l.projected_leader
            )),
            Some(l) => recommendations.push(format!(
                "Maintain investment in {}, which keeps its leadership",
                l.historical_leader
            )),
            None => {
                if let Some(leader) = &breakdown.leading_region {
                    recommendations.push(format!(
                        "Maintain investment in {}, the historical leader",
                        leader.name
                    ));
                }
            }
        }

        if let Some(technology) = &self.technology {
            recommendations.push(format!(
                "Prioritise development of {} technology",
                technology.projected_leader
            ));
        }

        if let Some(change) = self.ensemble.as_ref().and_then(|e| e.change) {
            recommendations.push(if change > CHANGE_THRESHOLD {
                format!(
                    "Prepare infrastructure for projected growth ({:+.1}%)",
                    change
                )
            } else if change < -CHANGE_THRESHOLD {
                format!(
                    "Review strategy in light of projected decline ({:+.1}%)",
                    change
                )
            } else {
                format!("Keep the current strategy, output is stable ({:+.1}%)", change)
            });
        }

        recommendations.push("Implement continuous predictive monitoring".to_string());
        recommendations
    }
}

fn leadership(breakdown: &Breakdown, predictions: &[PredictionRecord]) -> Option<LeadershipConsistency> {
    let historical = breakdown.leading_region.as_ref()?;
    let projected = category_totals(predictions.iter().map(|p| (p.region.as_str(), p.value)));
    let projected = projected.first()?;

    Some(LeadershipConsistency {
        historical_leader: historical.name.clone(),
        historical_share: historical.share,
        projected_leader: projected.name.clone(),
        projected_share: projected.share,
        consistent: historical.name == projected.name,
    })
}

fn technology_outlook(
    breakdown: &Breakdown,
    predictions: &[PredictionRecord],
) -> Option<TechnologyOutlook> {
    let historical_leader = breakdown.leading_technology.as_ref()?;
    let projected = category_totals(predictions.iter().map(|p| (p.technology.as_str(), p.value)));
    let projected_leader = projected.first()?;

    let mut growth: Vec<TechnologyGrowth> = breakdown
        .by_technology
        .iter()
        .filter_map(|past| {
            let future = projected.iter().find(|f| f.name == past.name)?;
            Some(TechnologyGrowth {
                technology: past.name.clone(),
                growth: percent_change(past.mean, future.mean)?,
            })
        })
        .collect();
    growth.sort_by(|a, b| a.technology.cmp(&b.technology));

    Some(TechnologyOutlook {
        historical_leader: historical_leader.name.clone(),
        projected_leader: projected_leader.name.clone(),
        consistent: historical_leader.name == projected_leader.name,
        growth,
    })
}

impl fmt::Display for ComparativeInsights {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Historical vs Projected:")?;
        writeln!(f, "  Historical mean:  {:.2} MWh", self.historical_mean)?;
        writeln!(f, "  Historical total: {:.2} MWh", self.historical_total)?;
        for projection in self.ensemble.iter().chain(self.additive.iter()) {
            write!(
                f,
                "  {}: mean {:.2} MWh, total {:.2} MWh",
                projection.model, projection.projected_mean, projection.projected_total
            )?;
            match projection.change {
                Some(change) => writeln!(f, ", change {:+.1}%", change)?,
                None => writeln!(f)?,
            }
        }

        if let Some(l) = &self.leadership {
            writeln!(f, "Leadership:")?;
            writeln!(
                f,
                "  Historical: {} ({:.1}%), projected: {} ({:.1}%), {}",
                l.historical_leader,
                l.historical_share,
                l.projected_leader,
                l.projected_share,
                if l.consistent { "consistent" } else { "leadership change" }
            )?;
        }

        if let Some(t) = &self.technology {
            writeln!(f, "Technology:")?;
            writeln!(
                f,
                "  Historical leader: {}, projected leader: {}",
                t.historical_leader, t.projected_leader
            )?;
            for g in &t.growth {
                writeln!(f, "  {}: {:+.1}%", g.technology, g.growth)?;
            }
        }

        if let Some(c) = &self.confidence {
            writeln!(f, "Model confidence: {:?} (R² {:.3})", c.level, c.r2)?;
        }

        writeln!(f, "Recommendations:")?;
        for (i, r) in self.recommendations.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, r)?;
        }
        Ok(())
    }
}

fn month_name(month: u32) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name().to_string())
        .unwrap_or_else(|| month.to_string())
}

/// Plain-text executive summary of the whole run
pub fn executive_summary(analysis: &DescriptiveAnalysis, insights: &ComparativeInsights) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_summary(&mut out, analysis, insights);
    out
}

fn write_summary(
    out: &mut String,
    analysis: &DescriptiveAnalysis,
    insights: &ComparativeInsights,
) -> fmt::Result {
    let summary = &analysis.summary;
    writeln!(out, "ENERGY PRODUCTION OUTLOOK")?;
    writeln!(out, "=========================")?;
    writeln!(
        out,
        "Period: {} to {} ({} records)",
        summary.period_start, summary.period_end, summary.rows
    )?;
    writeln!(out)?;

    writeln!(out, "Current situation:")?;
    if let Some(region) = &analysis.breakdown.leading_region {
        writeln!(
            out,
            "  - {} leads with {:.1}% of production",
            region.name, region.share
        )?;
    }
    if let Some(technology) = &analysis.breakdown.leading_technology {
        writeln!(out, "  - Dominant technology: {}", technology.name)?;
    }
    writeln!(
        out,
        "  - Best historical month: {}",
        month_name(analysis.temporal.best_month)
    )?;
    writeln!(out, "  - Diversification: {:?}", analysis.risk.diversification)?;
    for risk in &analysis.risk.concentration {
        writeln!(
            out,
            "  - Concentration risk ({:?}): {} holds {:.1}%",
            risk.level, risk.region, risk.share
        )?;
    }
    writeln!(out)?;

    writeln!(out, "Projections:")?;
    match &insights.ensemble {
        Some(e) => {
            if let Some(change) = e.change {
                writeln!(out, "  - Mean production change: {:+.1}%", change)?;
            }
            if let Some(l) = &insights.leadership {
                writeln!(
                    out,
                    "  - Leadership {} {}",
                    if l.consistent { "stays with" } else { "moves to" },
                    l.projected_leader
                )?;
            }
            if let Some(t) = &insights.technology {
                writeln!(out, "  - Projected leading technology: {}", t.projected_leader)?;
            }
            if let Some(c) = &insights.confidence {
                writeln!(out, "  - Model confidence: {:?} (R² {:.3})", c.level, c.r2)?;
            }
        }
        None => writeln!(out, "  - No forecast available")?,
    }
    writeln!(out)?;

    writeln!(out, "Recommendations:")?;
    for (i, r) in insights.recommendations.iter().enumerate() {
        writeln!(out, "  {}. {}", i + 1, r)?;
    }
    Ok(())
}
