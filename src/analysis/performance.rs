use std::collections::BTreeMap;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::analysis::stats::{self, welch_t_test};
use crate::config::Config;
use crate::error::{AdvError, Result};

/// Threshold below which a group difference is reported as significant.
const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Metrics compared between advisor groups, with report labels.
const COMPARED_METRICS: &[(&str, &str)] = &[
    ("1y_return", "1-Year Return (%)"),
    ("3y_return", "3-Year Return (%)"),
    ("7y_return", "7-Year Return (%)"),
    ("1y_volatility", "1-Year Volatility (%)"),
    ("3y_volatility", "3-Year Volatility (%)"),
    ("7y_volatility", "7-Year Volatility (%)"),
    ("1y_sharpe", "1-Year Sharpe Ratio"),
    ("3y_sharpe", "3-Year Sharpe Ratio"),
    ("7y_sharpe", "7-Year Sharpe Ratio"),
];

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// A wide time series table: one date column plus one value column per
/// ticker. Cells are `None` where a ticker has no observation.
#[derive(Debug, Clone)]
pub struct SeriesTable {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    /// One column per ticker, each aligned with `dates`.
    pub columns: Vec<Vec<Option<f64>>>,
}

impl SeriesTable {
    #[must_use]
    pub fn new(tickers: Vec<String>) -> Self {
        let columns = vec![Vec::new(); tickers.len()];
        Self {
            dates: Vec::new(),
            tickers,
            columns,
        }
    }

    /// Append one row; `values` must align with `tickers`.
    pub fn push_row(&mut self, date: NaiveDate, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.tickers.len());
        self.dates.push(date);
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.push(value);
        }
    }

    /// Read a wide CSV with a leading `Date` column.
    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        if headers.is_empty() || !headers[0].eq_ignore_ascii_case("date") {
            return Err(AdvError::MissingColumns("Date".into()));
        }
        let tickers: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
        let mut table = Self::new(tickers);

        for record in reader.records() {
            let record = record?;
            let date = record
                .get(0)
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                .ok_or_else(|| {
                    AdvError::Other(format!(
                        "unparseable date in {}: {:?}",
                        path.display(),
                        record.get(0)
                    ))
                })?;
            let values = (1..=table.tickers.len())
                .map(|i| record.get(i).and_then(|s| s.trim().parse::<f64>().ok()))
                .collect();
            table.push_row(date, values);
        }

        table.sort_by_date();
        Ok(table)
    }

    /// Write the table as a wide CSV; `None` cells are empty.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut headers = vec!["Date".to_string()];
        headers.extend(self.tickers.iter().cloned());
        writer.write_record(&headers)?;

        for (row, date) in self.dates.iter().enumerate() {
            let mut record = vec![date.to_string()];
            for column in &self.columns {
                record.push(column[row].map(|v| v.to_string()).unwrap_or_default());
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn sort_by_date(&mut self) {
        let mut order: Vec<usize> = (0..self.dates.len()).collect();
        order.sort_by_key(|&i| self.dates[i]);
        self.dates = order.iter().map(|&i| self.dates[i]).collect();
        for column in &mut self.columns {
            let sorted: Vec<Option<f64>> = order.iter().map(|&i| column[i]).collect();
            *column = sorted;
        }
    }

    fn column_index(&self, ticker: &str) -> Option<usize> {
        self.tickers.iter().position(|t| t == ticker)
    }

    /// Last observation for a ticker at or before the cutoff date.
    #[must_use]
    pub fn last_at_or_before(&self, ticker: &str, cutoff: NaiveDate) -> Option<f64> {
        let col = self.column_index(ticker)?;
        self.dates
            .iter()
            .zip(&self.columns[col])
            .filter(|(date, value)| **date <= cutoff && value.is_some())
            .next_back()
            .and_then(|(_, value)| *value)
    }

    /// Month-end percentage returns.
    ///
    /// Prices are resampled to the last observation of each calendar month,
    /// returns are taken between consecutive months, and rows with any
    /// missing cell are dropped (matching how the study preprocessed its
    /// return series).
    #[must_use]
    pub fn monthly_returns(&self) -> SeriesTable {
        // Resample: last non-missing observation per calendar month.
        let mut months: Vec<(i32, u32)> = Vec::new();
        for date in &self.dates {
            let key = (date.year(), date.month());
            if months.last() != Some(&key) && !months.contains(&key) {
                months.push(key);
            }
        }
        months.sort_unstable();

        let sampled: Vec<Vec<Option<f64>>> = self
            .columns
            .iter()
            .map(|column| {
                months
                    .iter()
                    .map(|&(year, month)| {
                        self.dates
                            .iter()
                            .zip(column)
                            .filter(|(d, v)| d.year() == year && d.month() == month && v.is_some())
                            .next_back()
                            .and_then(|(_, v)| *v)
                    })
                    .collect()
            })
            .collect();

        let mut result = SeriesTable::new(self.tickers.clone());
        for row in 1..months.len() {
            let values: Vec<Option<f64>> = sampled
                .iter()
                .map(|column| match (column[row - 1], column[row]) {
                    (Some(prev), Some(cur)) if prev != 0.0 => Some(cur / prev - 1.0),
                    _ => None,
                })
                .collect();
            if values.iter().all(Option::is_some) {
                let (year, month) = months[row];
                result.push_row(month_end(year, month), values);
            }
        }
        result
    }
}

/// Last calendar day of a month.
#[must_use]
pub fn month_end(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or_default()
}

/// Same calendar date `years` earlier, clamping Feb 29 to Feb 28.
fn years_before(date: NaiveDate, years: u32) -> NaiveDate {
    let year = date.year() - years as i32;
    NaiveDate::from_ymd_opt(year, date.month(), date.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), 28))
        .unwrap_or(date)
}

/// Annualized period returns per ticker, in percent.
#[derive(Debug, Clone, Serialize)]
pub struct AnnualReturns {
    /// Period labels such as `1y`, `3y`, `7y`.
    pub periods: Vec<String>,
    pub rows: Vec<AnnualReturnRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnualReturnRow {
    pub ticker: String,
    /// Aligned with `periods`; `None` where price history is insufficient.
    pub returns: Vec<Option<f64>>,
}

impl AnnualReturns {
    #[must_use]
    pub fn get(&self, ticker: &str, period: &str) -> Option<f64> {
        let idx = self.periods.iter().position(|p| p == period)?;
        self.rows
            .iter()
            .find(|r| r.ticker == ticker)
            .and_then(|r| r.returns[idx])
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        let mut headers = vec!["Ticker".to_string()];
        headers.extend(self.periods.iter().map(|p| format!("{p}_return")));
        writer.write_record(&headers)?;
        for row in &self.rows {
            let mut record = vec![row.ticker.clone()];
            for value in &row.returns {
                record.push(value.map(|v| v.to_string()).unwrap_or_default());
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        if headers.is_empty() || &headers[0] != "Ticker" {
            return Err(AdvError::MissingColumns("Ticker".into()));
        }
        let periods: Vec<String> = headers
            .iter()
            .skip(1)
            .map(|h| h.trim_end_matches("_return").to_string())
            .collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let ticker = record.get(0).unwrap_or_default().to_string();
            let returns = (1..=periods.len())
                .map(|i| record.get(i).and_then(|s| s.trim().parse::<f64>().ok()))
                .collect();
            rows.push(AnnualReturnRow { ticker, returns });
        }
        Ok(Self { periods, rows })
    }
}

/// Compound annualized returns per ticker over each lookback window.
///
/// For an `n`-year window ending at `end_date`, the entry price is the
/// last observation at or before the window start and the exit price the
/// last observation at or before `end_date`; the result is
/// `(exit/entry)^(1/n) − 1` in percent, rounded to two decimals.
#[must_use]
pub fn annualized_returns(
    prices: &SeriesTable,
    end_date: NaiveDate,
    periods_years: &[u32],
) -> AnnualReturns {
    let periods: Vec<String> = periods_years.iter().map(|n| format!("{n}y")).collect();
    let rows = prices
        .tickers
        .iter()
        .map(|ticker| {
            let end_price = prices.last_at_or_before(ticker, end_date);
            let returns = periods_years
                .iter()
                .map(|&n| {
                    let start = years_before(end_date, n);
                    let start_price = prices.last_at_or_before(ticker, start);
                    match (start_price, end_price) {
                        (Some(entry), Some(exit)) if entry > 0.0 => {
                            let annual = (exit / entry).powf(1.0 / f64::from(n)) - 1.0;
                            Some(round2(annual * 100.0))
                        }
                        _ => None,
                    }
                })
                .collect();
            AnnualReturnRow {
                ticker: ticker.clone(),
                returns,
            }
        })
        .collect();
    AnnualReturns { periods, rows }
}

/// One fund's labeled performance metrics.
#[derive(Debug, Clone, Serialize)]
pub struct FundPerformance {
    pub advisor_group: Option<String>,
    pub fund_name: Option<String>,
    pub ticker: String,
    /// Aligned with the owning table's `metric_labels`.
    pub metrics: Vec<Option<f64>>,
}

/// A per-fund metric table (performance stats or the combined dataset).
#[derive(Debug, Clone, Serialize)]
pub struct PerformanceTable {
    pub metric_labels: Vec<String>,
    pub rows: Vec<FundPerformance>,
}

impl PerformanceTable {
    #[must_use]
    pub fn metric_index(&self, label: &str) -> Option<usize> {
        self.metric_labels.iter().position(|l| l == label)
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let with_groups = self.rows.iter().any(|r| r.advisor_group.is_some());
        let mut writer = csv::Writer::from_path(path)?;

        let mut headers = Vec::new();
        if with_groups {
            headers.push("Advisor Group".to_string());
            headers.push("Fund Name".to_string());
        }
        headers.push("Ticker".to_string());
        headers.extend(self.metric_labels.iter().cloned());
        writer.write_record(&headers)?;

        for row in &self.rows {
            let mut record = Vec::new();
            if with_groups {
                record.push(row.advisor_group.clone().unwrap_or_default());
                record.push(row.fund_name.clone().unwrap_or_default());
            }
            record.push(row.ticker.clone());
            for value in &row.metrics {
                record.push(value.map(|v| v.to_string()).unwrap_or_default());
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();

        let ticker_col = headers
            .iter()
            .position(|h| h == "Ticker")
            .ok_or_else(|| AdvError::MissingColumns("Ticker".into()))?;
        let group_col = headers.iter().position(|h| h == "Advisor Group");
        let name_col = headers.iter().position(|h| h == "Fund Name");

        let metric_cols: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != ticker_col && Some(*i) != group_col && Some(*i) != name_col)
            .map(|(i, h)| (i, h.to_string()))
            .collect();
        let metric_labels = metric_cols.iter().map(|(_, h)| h.clone()).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let get_text = |i: Option<usize>| {
                i.and_then(|i| record.get(i))
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            };
            rows.push(FundPerformance {
                advisor_group: get_text(group_col),
                fund_name: get_text(name_col),
                ticker: record.get(ticker_col).unwrap_or_default().to_string(),
                metrics: metric_cols
                    .iter()
                    .map(|(i, _)| record.get(*i).and_then(|s| s.trim().parse::<f64>().ok()))
                    .collect(),
            });
        }
        Ok(Self {
            metric_labels,
            rows,
        })
    }
}

/// Annualized volatility and Sharpe ratio per ticker and period, merged
/// with the annualized returns into one table.
///
/// Volatility is the monthly-return standard deviation scaled by √12;
/// Sharpe subtracts the period-average risk-free rate from the annual
/// return. Periods with fewer monthly observations than the configured
/// minimum stay blank.
pub fn performance_stats(
    monthly: &SeriesTable,
    annual: &AnnualReturns,
    config: &Config,
) -> Result<PerformanceTable> {
    let end_date = NaiveDate::parse_from_str(&config.settings.analysis.end_date, "%Y-%m-%d")
        .map_err(|e| AdvError::Config(format!("invalid analysis.end_date: {e}")))?;
    let end_year = end_date.year();
    let periods = &config.settings.analysis.periods_years;
    let min_obs = config.settings.analysis.min_monthly_observations;

    let mut metric_labels: Vec<String> = periods.iter().map(|n| format!("{n}y_return")).collect();
    for n in periods {
        metric_labels.push(format!("{n}y_volatility"));
        metric_labels.push(format!("{n}y_sharpe"));
    }

    let rows = monthly
        .tickers
        .iter()
        .map(|ticker| {
            let col = monthly
                .column_index(ticker)
                .expect("ticker from own table");

            let mut metrics: Vec<Option<f64>> = periods
                .iter()
                .map(|&n| annual.get(ticker, &format!("{n}y")))
                .collect();

            for &n in periods {
                let first_year = end_year - n as i32 + 1;
                let window: Vec<f64> = monthly
                    .dates
                    .iter()
                    .zip(&monthly.columns[col])
                    .filter(|(date, value)| {
                        date.year() >= first_year && date.year() <= end_year && value.is_some()
                    })
                    .filter_map(|(_, value)| *value)
                    .collect();

                let (volatility, sharpe) = if window.len() >= min_obs {
                    let vol_raw = stats::sample_std(&window).map(|s| s * 12.0_f64.sqrt());
                    let volatility = vol_raw.map(|v| round2(v * 100.0));
                    let sharpe = match (
                        annual.get(ticker, &format!("{n}y")),
                        config.average_risk_free(end_year, n),
                        vol_raw,
                    ) {
                        (Some(r_pct), Some(rf), Some(vol)) if vol > 0.0 => {
                            Some(round2((r_pct / 100.0 - rf) / vol))
                        }
                        _ => None,
                    };
                    (volatility, sharpe)
                } else {
                    (None, None)
                };
                metrics.push(volatility);
                metrics.push(sharpe);
            }

            FundPerformance {
                advisor_group: None,
                fund_name: None,
                ticker: ticker.clone(),
                metrics,
            }
        })
        .collect();

    Ok(PerformanceTable {
        metric_labels,
        rows,
    })
}

/// Merge the traditional and automated performance tables into the
/// combined study dataset.
///
/// Automated return and volatility columns arrive as fractions and are
/// scaled to percent here; automated rows are labeled by ticker since no
/// fund name exists for them. Traditional rows take their names from the
/// fund-summaries store.
#[must_use]
pub fn combine_groups(
    traditional: &PerformanceTable,
    automated: &PerformanceTable,
    fund_names: &BTreeMap<String, String>,
) -> PerformanceTable {
    let mut metric_labels = traditional.metric_labels.clone();
    for label in &automated.metric_labels {
        if !metric_labels.contains(label) {
            metric_labels.push(label.clone());
        }
    }

    let align = |table: &PerformanceTable, row: &FundPerformance| -> Vec<Option<f64>> {
        metric_labels
            .iter()
            .map(|label| table.metric_index(label).and_then(|i| row.metrics[i]))
            .collect()
    };

    let mut rows = Vec::new();
    for row in &traditional.rows {
        rows.push(FundPerformance {
            advisor_group: Some("Traditional".into()),
            fund_name: fund_names.get(&row.ticker).cloned(),
            ticker: row.ticker.clone(),
            metrics: align(traditional, row),
        });
    }
    for row in &automated.rows {
        let mut metrics = align(automated, row);
        for (label, value) in metric_labels.iter().zip(metrics.iter_mut()) {
            if label.ends_with("_return") || label.ends_with("_volatility") {
                *value = value.map(|v| round2(v * 100.0));
            }
        }
        rows.push(FundPerformance {
            advisor_group: Some("Automated".into()),
            fund_name: Some(row.ticker.clone()),
            ticker: row.ticker.clone(),
            metrics,
        });
    }

    PerformanceTable {
        metric_labels,
        rows,
    }
}

/// Welch's t-test outcome for one performance metric.
#[derive(Debug, Clone, Serialize)]
pub struct MetricComparison {
    pub metric: String,
    pub label: String,
    pub automated_mean: Option<f64>,
    pub traditional_mean: Option<f64>,
    pub t_statistic: Option<f64>,
    pub p_value: Option<f64>,
    pub significant: bool,
}

/// Compare every performance metric between advisor groups.
#[must_use]
pub fn compare_groups(combined: &PerformanceTable) -> Vec<MetricComparison> {
    COMPARED_METRICS
        .iter()
        .filter_map(|&(metric, label)| {
            let idx = combined.metric_index(metric)?;
            let collect = |group: &str| -> Vec<f64> {
                combined
                    .rows
                    .iter()
                    .filter(|r| r.advisor_group.as_deref() == Some(group))
                    .filter_map(|r| r.metrics[idx])
                    .collect()
            };
            let automated = collect("Automated");
            let traditional = collect("Traditional");

            let outcome = welch_t_test(&automated, &traditional);
            Some(MetricComparison {
                metric: metric.to_string(),
                label: label.to_string(),
                automated_mean: stats::mean(&automated).map(round2),
                traditional_mean: stats::mean(&traditional).map(round2),
                t_statistic: outcome.map(|o| (o.t * 1000.0).round() / 1000.0),
                p_value: outcome.map(|o| (o.p_value * 10_000.0).round() / 10_000.0),
                significant: outcome.is_some_and(|o| o.p_value < SIGNIFICANCE_LEVEL),
            })
        })
        .collect()
}

/// Write metric comparisons as CSV.
pub fn write_comparison_csv(path: &Path, comparisons: &[MetricComparison]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "Metric",
        "Automated Mean",
        "Traditional Mean",
        "t-statistic",
        "p-value",
    ])?;
    for c in comparisons {
        writer.write_record([
            c.label.clone(),
            c.automated_mean.map(|v| v.to_string()).unwrap_or_default(),
            c.traditional_mean.map(|v| v.to_string()).unwrap_or_default(),
            c.t_statistic.map(|v| v.to_string()).unwrap_or_default(),
            c.p_value.map(|v| v.to_string()).unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
