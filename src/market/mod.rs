//! Yahoo Finance adapters: adjusted-close history for the benchmark
//! tickers and search-based fund metadata.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use time::OffsetDateTime;
use tracing::{info, warn};
use yahoo_finance_api as yahoo;

use crate::analysis::performance::SeriesTable;
use crate::error::{AdvError, Result};
use crate::models::fund::FundSummary;

/// Result of a price-history download.
#[derive(Debug)]
pub struct PriceDownload {
    /// Wide table of adjusted closes, one column per resolved ticker.
    pub prices: SeriesTable,
    /// Tickers that returned no data.
    pub missing: Vec<String>,
}

/// Download adjusted-close history for each ticker over `[start, end]`.
///
/// Tickers with no data are reported, not fatal; the batch mirrors the
/// per-document resilience of the extraction side.
pub async fn download_price_history(
    tickers: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceDownload> {
    let connector = yahoo::YahooConnector::new().map_err(|e| AdvError::MarketData {
        symbol: "-".into(),
        detail: format!("failed to initialize Yahoo connector: {e}"),
    })?;

    let start_time = to_offset(start);
    // Include the end date's trading session.
    let end_time = to_offset(end.succ_opt().unwrap_or(end));

    let mut series: Vec<(String, BTreeMap<NaiveDate, f64>)> = Vec::new();
    let mut missing = Vec::new();

    for ticker in tickers {
        info!(%ticker, "downloading price history");
        let response = match connector.get_quote_history(ticker, start_time, end_time).await {
            Ok(r) => r,
            Err(e) => {
                warn!(%ticker, error = %e, "no price history");
                missing.push(ticker.clone());
                continue;
            }
        };
        let quotes = match response.quotes() {
            Ok(q) if !q.is_empty() => q,
            Ok(_) | Err(_) => {
                warn!(%ticker, "empty quote response");
                missing.push(ticker.clone());
                continue;
            }
        };

        let mut column = BTreeMap::new();
        for quote in quotes {
            if let Some(date) = quote_date(quote.timestamp as i64) {
                column.insert(date, quote.adjclose);
            }
        }
        series.push((ticker.clone(), column));
    }

    if series.is_empty() {
        return Err(AdvError::MarketData {
            symbol: tickers.join(","),
            detail: "no valid data downloaded".into(),
        });
    }

    // Union of observation dates across tickers, in order.
    let mut dates: Vec<NaiveDate> = series
        .iter()
        .flat_map(|(_, column)| column.keys().copied())
        .collect();
    dates.sort_unstable();
    dates.dedup();

    let mut prices = SeriesTable::new(series.iter().map(|(t, _)| t.clone()).collect());
    for date in dates {
        let values = series
            .iter()
            .map(|(_, column)| column.get(&date).copied())
            .collect();
        prices.push_row(date, values);
    }

    Ok(PriceDownload { prices, missing })
}

/// Resolve fund names and types for each ticker via Yahoo search.
///
/// Unresolved tickers still produce a row so the table records the
/// attempt; only the metadata stays blank.
pub async fn fetch_fund_summaries(tickers: &[String]) -> Result<Vec<FundSummary>> {
    let connector = yahoo::YahooConnector::new().map_err(|e| AdvError::MarketData {
        symbol: "-".into(),
        detail: format!("failed to initialize Yahoo connector: {e}"),
    })?;

    let mut summaries = Vec::new();
    for ticker in tickers {
        info!(%ticker, "fetching fund summary");
        let mut summary = FundSummary::new(ticker.clone());

        match connector.search_ticker(ticker).await {
            Ok(result) => {
                if let Some(item) = result.quotes.iter().find(|q| &q.symbol == ticker) {
                    summary.name = non_empty(&item.long_name);
                    summary.asset_class = non_empty(&item.quote_type);
                } else if let Some(item) = result.quotes.first() {
                    summary.name = non_empty(&item.long_name);
                    summary.asset_class = non_empty(&item.quote_type);
                }
            }
            Err(e) => {
                warn!(%ticker, error = %e, "fund lookup failed");
            }
        }
        summaries.push(summary);
    }
    Ok(summaries)
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Midnight UTC of a calendar date as an `OffsetDateTime`.
fn to_offset(date: NaiveDate) -> OffsetDateTime {
    let timestamp = date
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default();
    OffsetDateTime::from_unix_timestamp(timestamp).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

/// Calendar date of a quote timestamp.
fn quote_date(timestamp: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_conversion_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let offset = to_offset(date);
        assert_eq!(offset.unix_timestamp() % 86_400, 0);
        assert_eq!(quote_date(offset.unix_timestamp()), Some(date));
    }

    #[test]
    fn quote_date_rejects_out_of_range() {
        assert!(quote_date(i64::MAX).is_none());
    }

    #[test]
    fn non_empty_trims() {
        assert_eq!(non_empty("  "), None);
        assert_eq!(non_empty(" PRWCX "), Some("PRWCX".into()));
    }
}
