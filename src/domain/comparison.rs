//! Portfolio vs. benchmark comparison: returns, alpha and drawdown.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::error::PaperTradeError;
use super::marks::{BenchmarkMark, DailyMark, latest_per_day};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Portfolio equity curve, one point per day (latest mark wins).
pub fn equity_curve(marks: &[DailyMark]) -> Vec<EquityPoint> {
    latest_per_day(marks)
        .into_iter()
        .map(|m| EquityPoint {
            date: m.marked_on,
            equity: m.equity,
        })
        .collect()
}

/// Benchmark curve, one point per day (latest mark wins).
pub fn benchmark_curve(marks: &[BenchmarkMark]) -> Vec<EquityPoint> {
    latest_per_day(marks)
        .into_iter()
        .map(|m| EquityPoint {
            date: m.marked_on,
            equity: m.value,
        })
        .collect()
}

pub fn values(curve: &[EquityPoint]) -> Vec<f64> {
    curve.iter().map(|p| p.equity).collect()
}

/// last / first - 1; 0 for fewer than two points.
pub fn total_return(series: &[f64]) -> f64 {
    match series {
        [first, .., last] => last / first - 1.0,
        _ => 0.0,
    }
}

/// value / running_peak - 1 at every point.
pub fn drawdown_series(series: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    series
        .iter()
        .map(|&v| {
            peak = peak.max(v);
            v / peak - 1.0
        })
        .collect()
}

/// The most negative drawdown as a fraction (e.g. -0.5); 0 when the series
/// never dips below its running peak or is empty.
pub fn max_drawdown(series: &[f64]) -> f64 {
    drawdown_series(series).into_iter().fold(0.0, f64::min)
}

/// Rebase a curve so its first value is 100.
pub fn normalize_to_100(curve: &[EquityPoint]) -> Vec<EquityPoint> {
    let Some(base) = curve.first().map(|p| p.equity) else {
        return Vec::new();
    };
    curve
        .iter()
        .map(|p| EquityPoint {
            date: p.date,
            equity: p.equity / base * 100.0,
        })
        .collect()
}

/// Restrict `curve` to the dates of `anchor`, dropping dates it lacks.
pub fn align_to(anchor: &[EquityPoint], curve: &[EquityPoint]) -> Vec<EquityPoint> {
    let by_date: HashMap<NaiveDate, f64> = curve.iter().map(|p| (p.date, p.equity)).collect();
    anchor
        .iter()
        .filter_map(|a| {
            by_date.get(&a.date).map(|&equity| EquityPoint {
                date: a.date,
                equity,
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub portfolio_return: f64,
    pub benchmark_return: f64,
    pub alpha: f64,
    pub portfolio_max_dd: f64,
    pub benchmark_max_dd: f64,
}

impl Summary {
    pub fn compute(portfolio: &[f64], benchmark: &[f64]) -> Result<Self, PaperTradeError> {
        if portfolio.is_empty() {
            return Err(PaperTradeError::EmptySeries {
                series: "portfolio".into(),
            });
        }
        if benchmark.is_empty() {
            return Err(PaperTradeError::EmptySeries {
                series: "benchmark".into(),
            });
        }

        let portfolio_return = total_return(portfolio);
        let benchmark_return = total_return(benchmark);

        Ok(Summary {
            portfolio_return,
            benchmark_return,
            alpha: portfolio_return - benchmark_return,
            portfolio_max_dd: max_drawdown(portfolio),
            benchmark_max_dd: max_drawdown(benchmark),
        })
    }
}

/// One row of the dashboard stats table.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesStats {
    pub series: String,
    pub total_return: f64,
    pub max_drawdown: f64,
}

impl SeriesStats {
    pub fn from_curve(series: &str, curve: &[EquityPoint]) -> Option<Self> {
        if curve.is_empty() {
            return None;
        }
        let values = values(curve);
        Some(SeriesStats {
            series: series.to_string(),
            total_return: total_return(&values),
            max_drawdown: max_drawdown(&values),
        })
    }
}
