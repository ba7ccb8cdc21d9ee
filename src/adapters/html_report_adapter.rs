//! HTML dashboard adapter implementing ReportPort.
//!
//! Renders an Askama template with inline SVG charts into one static file.

use std::fs;
use std::path::Path;

use askama::Template;
use tracing::info;

use crate::adapters::chart_svg::{ChartSeries, generate_comparison_svg, generate_drawdown_svg};
use crate::domain::error::PaperTradeError;
use crate::domain::reports::{Dashboard, PositionRow};
use crate::domain::trade::Trade;
use crate::ports::report_port::ReportPort;

struct StatsView {
    series: String,
    total_return: String,
    max_drawdown: String,
}

struct PositionView {
    symbol: String,
    quantity: String,
    avg_cost: String,
    last: String,
    market_value: String,
    pnl: String,
    pnl_class: &'static str,
}

struct TradeView {
    filled_at: String,
    symbol: String,
    side: &'static str,
    quantity: String,
    requested_price: String,
    fill_price: String,
    commission: String,
    note: String,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    account: String,
    generated_on: String,
    equity: String,
    cash: String,
    comparison_svg: String,
    drawdown_svg: String,
    stats: Vec<StatsView>,
    positions: Vec<PositionView>,
    trades: Vec<TradeView>,
}

fn money(value: f64) -> String {
    format!("{value:.2}")
}

fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

fn optional_money(value: Option<f64>) -> String {
    value.map(money).unwrap_or_else(|| "-".to_string())
}

fn position_view(row: &PositionRow) -> PositionView {
    PositionView {
        symbol: row.symbol.clone(),
        quantity: format!("{}", row.quantity),
        avg_cost: money(row.avg_cost),
        last: optional_money(row.last),
        market_value: optional_money(row.market_value),
        pnl: optional_money(row.pnl),
        pnl_class: match row.pnl {
            Some(p) if p < 0.0 => "neg",
            Some(p) if p > 0.0 => "pos",
            _ => "",
        },
    }
}

fn trade_view(trade: &Trade) -> TradeView {
    TradeView {
        filled_at: trade.filled_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        symbol: trade.symbol.clone(),
        side: trade.side.as_str(),
        quantity: format!("{}", trade.quantity),
        requested_price: money(trade.requested_price),
        fill_price: money(trade.fill_price),
        commission: money(trade.commission),
        note: trade.note.clone(),
    }
}

/// Render the dashboard to an HTML string.
pub fn render_dashboard(dashboard: &Dashboard) -> Result<String, PaperTradeError> {
    let mut series = vec![ChartSeries {
        label: "Portfolio",
        points: &dashboard.portfolio,
    }];
    series.extend(dashboard.benchmarks.iter().map(|b| ChartSeries {
        label: &b.symbol,
        points: &b.curve,
    }));

    let template = DashboardTemplate {
        account: dashboard.account.name.clone(),
        generated_on: dashboard.generated_on.to_string(),
        equity: money(dashboard.equity),
        cash: money(dashboard.account.cash),
        comparison_svg: generate_comparison_svg(&series),
        drawdown_svg: generate_drawdown_svg(&series),
        stats: dashboard
            .stats
            .iter()
            .map(|s| StatsView {
                series: s.series.clone(),
                total_return: percent(s.total_return),
                max_drawdown: percent(s.max_drawdown),
            })
            .collect(),
        positions: dashboard.positions.iter().map(position_view).collect(),
        trades: dashboard.trades.iter().map(trade_view).collect(),
    };

    template
        .render()
        .map_err(|e| PaperTradeError::Io(std::io::Error::other(e.to_string())))
}

pub struct HtmlReportAdapter;

impl HtmlReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HtmlReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for HtmlReportAdapter {
    fn write_dashboard(
        &self,
        dashboard: &Dashboard,
        output_path: &str,
    ) -> Result<(), PaperTradeError> {
        let html = render_dashboard(dashboard)?;

        let path = Path::new(output_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, html)?;

        info!(path = output_path, account = %dashboard.account.name, "wrote dashboard");
        Ok(())
    }
}
