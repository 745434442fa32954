//! Yahoo Finance market data adapter.
//!
//! Uses the unofficial v8 chart API: one month of daily closes for the
//! price series, and the quote metadata (or latest close) for the current
//! price. Failures are reported per ticker and never abort a cycle.

use crate::domain::error::SimtraderError;
use crate::ports::market_data_port::MarketDataPort;
use serde::Deserialize;
use std::time::Duration;

const CHART_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

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
    close: Vec<Option<f64>>,
}

/// Parsed chart payload: valid closes oldest first, plus the quoted price if present.
#[derive(Debug, Clone, PartialEq)]
struct Chart {
    closes: Vec<f64>,
    market_price: Option<f64>,
}

pub struct YahooMarketAdapter {
    client: reqwest::blocking::Client,
    request_pause: Duration,
}

impl YahooMarketAdapter {
    pub fn new(timeout: Duration, request_pause: Duration) -> Result<Self, SimtraderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SimtraderError::DataFetch {
                ticker: String::new(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            request_pause,
        })
    }

    fn chart_url(ticker: &str, range: &str) -> String {
        format!("{CHART_BASE_URL}/{ticker}?range={range}&interval=1d")
    }

    fn fetch_chart(&self, ticker: &str, range: &str) -> Result<Chart, SimtraderError> {
        if !self.request_pause.is_zero() {
            std::thread::sleep(self.request_pause);
        }

        let fetch_error = |reason: String| SimtraderError::DataFetch {
            ticker: ticker.to_string(),
            reason,
        };

        let url = Self::chart_url(ticker, range);
        tracing::debug!(ticker, %url, "requesting chart");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| fetch_error(format!("request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SimtraderError::NoData {
                ticker: ticker.to_string(),
            });
        }
        if !status.is_success() {
            return Err(fetch_error(format!("HTTP {}", status)));
        }

        let body: ChartResponse = response
            .json()
            .map_err(|e| fetch_error(format!("unexpected response: {}", e)))?;

        parse_chart(ticker, body)
    }
}

fn parse_chart(ticker: &str, resp: ChartResponse) -> Result<Chart, SimtraderError> {
    let no_data = || SimtraderError::NoData {
        ticker: ticker.to_string(),
    };

    let result = match resp.chart.result {
        Some(result) => result,
        None => {
            return Err(match resp.chart.error {
                Some(err) if err.code == "Not Found" => no_data(),
                Some(err) => SimtraderError::DataFetch {
                    ticker: ticker.to_string(),
                    reason: format!("{}: {}", err.code, err.description),
                },
                None => no_data(),
            });
        }
    };

    let data = result.into_iter().next().ok_or_else(no_data)?;
    let market_price = data
        .meta
        .and_then(|m| m.regular_market_price)
        .filter(|p| p.is_finite() && *p > 0.0);

    // Holidays and halted sessions come back as nulls.
    let closes: Vec<f64> = data
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close.into_iter().flatten().filter(|c| c.is_finite()).collect())
        .unwrap_or_default();

    if closes.is_empty() && market_price.is_none() {
        return Err(no_data());
    }

    Ok(Chart {
        closes,
        market_price,
    })
}

impl MarketDataPort for YahooMarketAdapter {
    fn price_series(&self, ticker: &str) -> Result<Vec<f64>, SimtraderError> {
        let chart = self.fetch_chart(ticker, "1mo")?;
        if chart.closes.is_empty() {
            return Err(SimtraderError::NoData {
                ticker: ticker.to_string(),
            });
        }
        Ok(chart.closes)
    }

    fn current_price(&self, ticker: &str) -> Result<f64, SimtraderError> {
        let chart = self.fetch_chart(ticker, "5d")?;
        chart
            .market_price
            .or_else(|| chart.closes.last().copied())
            .ok_or_else(|| SimtraderError::NoData {
                ticker: ticker.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Chart, SimtraderError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        parse_chart("AAPL", resp)
    }

    #[test]
    fn chart_url_format() {
        assert_eq!(
            YahooMarketAdapter::chart_url("BRK-B", "1mo"),
            "https://query2.finance.yahoo.com/v8/finance/chart/BRK-B?range=1mo&interval=1d"
        );
    }

    #[test]
    fn parses_closes_and_skips_nulls() {
        let chart = parse(
            r#"{"chart":{"result":[{
                "meta":{"regularMarketPrice":187.5},
                "timestamp":[1,2,3,4],
                "indicators":{"quote":[{"close":[180.0,null,185.25,187.0]}]}
            }],"error":null}}"#,
        )
        .unwrap();

        assert_eq!(chart.closes, vec![180.0, 185.25, 187.0]);
        assert_eq!(chart.market_price, Some(187.5));
    }

    #[test]
    fn missing_meta_price_is_none() {
        let chart = parse(
            r#"{"chart":{"result":[{
                "meta":{},
                "indicators":{"quote":[{"close":[10.0]}]}
            }],"error":null}}"#,
        )
        .unwrap();
        assert_eq!(chart.market_price, None);
        assert_eq!(chart.closes, vec![10.0]);
    }

    #[test]
    fn not_found_error_is_no_data() {
        let err = parse(
            r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SimtraderError::NoData { .. }));
    }

    #[test]
    fn other_api_error_is_fetch_error() {
        let err = parse(
            r#"{"chart":{"result":null,"error":{"code":"Bad Request","description":"Invalid range"}}}"#,
        )
        .unwrap_err();
        match err {
            SimtraderError::DataFetch { ticker, reason } => {
                assert_eq!(ticker, "AAPL");
                assert!(reason.contains("Invalid range"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn all_null_closes_is_no_data() {
        let err = parse(
            r#"{"chart":{"result":[{
                "indicators":{"quote":[{"close":[null,null]}]}
            }],"error":null}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SimtraderError::NoData { .. }));
    }
}
