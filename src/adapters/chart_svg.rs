//! Inline SVG charts for the dashboard.
//!
//! Series are placed on a shared date axis, so curves with missing dates
//! still line up.

use crate::domain::comparison::{EquityPoint, drawdown_series, values};
use chrono::NaiveDate;

const CHART_WIDTH: f64 = 800.0;
const CHART_HEIGHT: f64 = 300.0;
const MARGIN_LEFT: f64 = 60.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 40.0;

const PALETTE: [&str; 6] = ["#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b"];

pub struct ChartSeries<'a> {
    pub label: &'a str,
    pub points: &'a [EquityPoint],
}

/// Normalized equity lines, one per series, with a legend.
pub fn generate_comparison_svg(series: &[ChartSeries<'_>]) -> String {
    render_lines(series, "Growth of 100", |v| format!("{v:.1}"))
}

/// Drawdown (%) of each series from its running peak.
pub fn generate_drawdown_svg(series: &[ChartSeries<'_>]) -> String {
    let drawdowns: Vec<Vec<EquityPoint>> = series
        .iter()
        .map(|s| {
            s.points
                .iter()
                .zip(drawdown_series(&values(s.points)))
                .map(|(p, dd)| EquityPoint {
                    date: p.date,
                    equity: dd * 100.0,
                })
                .collect()
        })
        .collect();
    let converted: Vec<ChartSeries<'_>> = series
        .iter()
        .zip(&drawdowns)
        .map(|(s, points)| ChartSeries {
            label: s.label,
            points,
        })
        .collect();
    render_lines(&converted, "Drawdown (%)", |v| format!("{v:.1}%"))
}

fn render_lines(
    series: &[ChartSeries<'_>],
    title: &str,
    label_fmt: impl Fn(f64) -> String,
) -> String {
    let all: Vec<&EquityPoint> = series
        .iter()
        .flat_map(|s| s.points.iter())
        .filter(|p| p.equity.is_finite())
        .collect();
    if all.is_empty() {
        return String::new();
    }

    let first_date = all.iter().map(|p| p.date).min().unwrap_or_default();
    let last_date = all.iter().map(|p| p.date).max().unwrap_or_default();
    let min_value = all.iter().map(|p| p.equity).fold(f64::INFINITY, f64::min);
    let max_value = all.iter().map(|p| p.equity).fold(f64::NEG_INFINITY, f64::max);
    let range = (max_value - min_value).max(1.0);
    let span_days = (last_date - first_date).num_days().max(1) as f64;

    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let x_scale = |d: NaiveDate| -> f64 {
        MARGIN_LEFT + ((d - first_date).num_days() as f64 / span_days) * plot_width
    };
    let y_scale =
        |v: f64| -> f64 { MARGIN_TOP + plot_height - ((v - min_value) / range) * plot_height };

    let mut svg = String::new();
    svg.push_str(&format!(
        r##"<svg width="{}" height="{}" viewBox="0 0 {} {}" xmlns="http://www.w3.org/2000/svg">"##,
        CHART_WIDTH, CHART_HEIGHT, CHART_WIDTH, CHART_HEIGHT
    ));
    svg.push_str("\n  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    svg.push_str(&format!(
        "  <text x=\"{}\" y=\"15\" text-anchor=\"end\" font-size=\"12\" fill=\"#666\">{}</text>\n",
        CHART_WIDTH - MARGIN_RIGHT,
        title
    ));
    svg.push_str(&format!(
        "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
        MARGIN_LEFT,
        MARGIN_TOP,
        MARGIN_LEFT,
        CHART_HEIGHT - MARGIN_BOTTOM
    ));
    svg.push_str(&format!(
        "  <line x1=\"{}\" y1=\"{}\" x2=\"{}\" y2=\"{}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
        MARGIN_LEFT,
        CHART_HEIGHT - MARGIN_BOTTOM,
        CHART_WIDTH - MARGIN_RIGHT,
        CHART_HEIGHT - MARGIN_BOTTOM
    ));
    for value in [max_value, (max_value + min_value) / 2.0, min_value] {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{:.1}\" text-anchor=\"end\" font-size=\"10\" fill=\"#666\">{}</text>\n",
            MARGIN_LEFT - 5.0,
            y_scale(value) + 4.0,
            label_fmt(value)
        ));
    }
    for (date, anchor) in [(first_date, "start"), (last_date, "end")] {
        svg.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{}\" text-anchor=\"{}\" font-size=\"10\" fill=\"#666\">{}</text>\n",
            x_scale(date),
            CHART_HEIGHT - MARGIN_BOTTOM + 15.0,
            anchor,
            date
        ));
    }

    for (idx, s) in series.iter().enumerate() {
        let color = PALETTE[idx % PALETTE.len()];
        let mut path_data = String::new();
        for point in s.points.iter().filter(|p| p.equity.is_finite()) {
            let cmd = if path_data.is_empty() { "M" } else { " L" };
            path_data.push_str(&format!(
                "{} {:.1} {:.1}",
                cmd,
                x_scale(point.date),
                y_scale(point.equity)
            ));
        }
        if path_data.is_empty() {
            continue;
        }
        svg.push_str(&format!(
            "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"2\"/>\n",
            path_data, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"11\" fill=\"{}\">{}</text>\n",
            MARGIN_LEFT + 10.0 + idx as f64 * 110.0,
            MARGIN_TOP - 10.0,
            color,
            escape(s.label)
        ));
    }

    svg.push_str("</svg>");
    svg
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
