//! Ticker list parsing and normalization.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),
}

/// Parse a comma-separated ticker list from configuration.
///
/// Tokens are trimmed and normalized; empty tokens and duplicates are errors.
pub fn parse_tickers(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let ticker = normalize_ticker(trimmed);
        if !seen.insert(ticker.clone()) {
            return Err(UniverseError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

/// Upper-case and use the quote-feed form for share classes (`BRK.B` -> `BRK-B`).
pub fn normalize_ticker(raw: &str) -> String {
    raw.trim().to_uppercase().replace('.', "-")
}

/// Drop repeated tickers, keeping the first occurrence.
pub fn dedup_tickers<I, S>(tickers: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    tickers
        .into_iter()
        .map(Into::into)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
