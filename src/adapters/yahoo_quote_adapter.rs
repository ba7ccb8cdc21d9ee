//! Yahoo Finance quote adapter.
//!
//! Daily bars come from the v8 chart API (`range=<window>&interval=1d`).
//! The latest price prefers `meta.regularMarketPrice` and falls back to the
//! last close of a five-day window.

use crate::domain::error::PaperTradeError;
use crate::domain::price::{HistoryWindow, PriceBar};
use crate::ports::quote_port::QuotePort;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const LAST_PRICE_WINDOW: HistoryWindow = HistoryWindow::Days(5);

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}

/// One parsed chart response.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub regular_market_price: Option<f64>,
    pub bars: Vec<PriceBar>,
}

pub struct YahooQuoteAdapter {
    client: reqwest::blocking::Client,
    max_retries: u32,
    base_delay: Duration,
}

fn provider_error(symbol: &str, reason: impl Into<String>) -> PaperTradeError {
    PaperTradeError::QuoteProvider {
        symbol: symbol.to_string(),
        reason: reason.into(),
    }
}

impl YahooQuoteAdapter {
    pub fn new() -> Result<Self, PaperTradeError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| provider_error("*", format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        })
    }

    fn chart_url(symbol: &str, window: HistoryWindow) -> String {
        format!("{CHART_URL}/{symbol}?range={window}&interval=1d")
    }

    fn fetch_chart(&self, symbol: &str, window: HistoryWindow) -> Result<Chart, PaperTradeError> {
        let url = Self::chart_url(symbol, window);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                std::thread::sleep(self.base_delay * 2u32.pow(attempt - 1));
            }
            debug!(symbol, %window, attempt, "requesting chart");

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(PaperTradeError::NoPriceData {
                            symbol: symbol.to_string(),
                        });
                    }
                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS
                        || status.is_server_error()
                    {
                        warn!(symbol, %status, "chart request failed, retrying");
                        last_error = Some(provider_error(symbol, format!("HTTP {status}")));
                        continue;
                    }
                    if !status.is_success() {
                        return Err(provider_error(symbol, format!("HTTP {status}")));
                    }

                    let body = resp
                        .text()
                        .map_err(|e| provider_error(symbol, e.to_string()))?;
                    return parse_chart(symbol, &body);
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    last_error = Some(provider_error(symbol, e.to_string()));
                }
                Err(e) => return Err(provider_error(symbol, e.to_string())),
            }
        }

        Err(last_error.unwrap_or_else(|| provider_error(symbol, "max retries exceeded")))
    }
}

/// Parse a v8 chart body. Rows where every field is null (holidays) are
/// skipped; a response without any bar or market price is `NoPriceData`.
pub fn parse_chart(symbol: &str, body: &str) -> Result<Chart, PaperTradeError> {
    let resp: ChartResponse = serde_json::from_str(body)
        .map_err(|e| provider_error(symbol, format!("failed to parse response: {e}")))?;

    let result = match (resp.chart.result, resp.chart.error) {
        (Some(result), _) => result,
        (None, Some(err)) if err.code == "Not Found" => {
            return Err(PaperTradeError::NoPriceData {
                symbol: symbol.to_string(),
            });
        }
        (None, Some(err)) => {
            return Err(provider_error(symbol, format!("{}: {}", err.code, err.description)));
        }
        (None, None) => return Err(provider_error(symbol, "empty result with no error")),
    };

    let data = result.into_iter().next().ok_or_else(|| PaperTradeError::NoPriceData {
        symbol: symbol.to_string(),
    })?;

    let regular_market_price = data
        .meta
        .and_then(|m| m.regular_market_price)
        .filter(|p| p.is_finite() && *p > 0.0);

    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data.indicators.quote.into_iter().next();

    let mut bars = Vec::with_capacity(timestamps.len());
    if let Some(quote) = quote {
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| provider_error(symbol, format!("invalid timestamp: {ts}")))?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();

            if open.is_none() && high.is_none() && low.is_none() && close.is_none() {
                continue;
            }

            bars.push(PriceBar {
                date,
                open: open.unwrap_or(f64::NAN),
                high: high.unwrap_or(f64::NAN),
                low: low.unwrap_or(f64::NAN),
                close: close.unwrap_or(f64::NAN),
                volume: volume.unwrap_or(0),
            });
        }
    }

    Ok(Chart {
        regular_market_price,
        bars,
    })
}

impl QuotePort for YahooQuoteAdapter {
    fn last_price(&self, symbol: &str) -> Result<f64, PaperTradeError> {
        let chart = self.fetch_chart(symbol, LAST_PRICE_WINDOW)?;
        if let Some(price) = chart.regular_market_price {
            return Ok(price);
        }
        chart
            .bars
            .iter()
            .rev()
            .map(|b| b.close)
            .find(|c| c.is_finite())
            .ok_or_else(|| PaperTradeError::NoPriceData {
                symbol: symbol.to_string(),
            })
    }

    fn history(
        &self,
        symbol: &str,
        window: HistoryWindow,
    ) -> Result<Vec<PriceBar>, PaperTradeError> {
        let chart = self.fetch_chart(symbol, window)?;
        if chart.bars.is_empty() {
            return Err(PaperTradeError::NoPriceData {
                symbol: symbol.to_string(),
            });
        }
        Ok(chart.bars)
    }
}
