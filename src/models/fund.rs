use serde::Serialize;

/// Metadata for a benchmark mutual fund, fetched from the market-data
/// provider and joined onto performance output by ticker.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FundSummary {
    /// Database row ID (0 if not yet persisted).
    pub id: i64,
    pub ticker: String,
    pub name: Option<String>,
    pub currency: Option<String>,
    pub asset_class: Option<String>,
    pub expense_ratio: Option<f64>,
    pub net_assets: Option<f64>,
    pub inception_date: Option<String>,
    pub morningstar_rating: Option<i64>,
}

impl FundSummary {
    #[must_use]
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sets_ticker_only() {
        let f = FundSummary::new("PRWCX");
        assert_eq!(f.ticker, "PRWCX");
        assert_eq!(f.id, 0);
        assert!(f.name.is_none());
    }
}
