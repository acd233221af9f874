use chrono::NaiveDate;
use rusqlite::params;

use crate::error::Result;
use crate::models::fund::FundSummary;
use crate::models::portfolio::PortfolioRecord;

use super::Database;

impl Database {
    // ─── Portfolio operations ───

    /// Insert or fully replace a portfolio row keyed by `portfolio_id`.
    ///
    /// The replace is total: every column takes the new record's value,
    /// including columns the new record leaves empty. Returns the row ID.
    pub fn upsert_portfolio(&self, record: &PortfolioRecord) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO portfolios (
                portfolio_id, advisor_type, platform_name, fund_name,
                expense_ratio, transaction_costs, turnover_rate,
                tax_efficiency, assets_under_management,
                document_date, extraction_notes, excluded
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(portfolio_id) DO UPDATE SET
                advisor_type=?2, platform_name=?3, fund_name=?4,
                expense_ratio=?5, transaction_costs=?6, turnover_rate=?7,
                tax_efficiency=?8, assets_under_management=?9,
                document_date=?10, extraction_notes=?11, excluded=?12",
            params![
                record.portfolio_id,
                record.advisor_type,
                record.platform_name,
                record.fund_name,
                record.expense_ratio,
                record.transaction_costs,
                record.turnover_rate,
                record.tax_efficiency,
                record.assets_under_management,
                record.document_date.map(|d| d.to_string()),
                record.extraction_notes,
                record.excluded,
            ],
        )?;
        // last_insert_rowid() is unreliable for ON CONFLICT DO UPDATE,
        // so always query back the actual ID.
        let id: i64 = self.conn().query_row(
            "SELECT id FROM portfolios WHERE portfolio_id = ?1",
            params![record.portfolio_id],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Get a portfolio row by its identity.
    pub fn get_portfolio(&self, portfolio_id: &str) -> Result<Option<PortfolioRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, portfolio_id, advisor_type, platform_name, fund_name,
                    expense_ratio, transaction_costs, turnover_rate,
                    tax_efficiency, assets_under_management,
                    document_date, extraction_notes, excluded
             FROM portfolios WHERE portfolio_id = ?1",
        )?;
        let mut rows = Self::map_portfolios(&mut stmt, params![portfolio_id])?;
        Ok(rows.pop())
    }

    /// Get every portfolio row, ordered by identity.
    pub fn get_all_portfolios(&self) -> Result<Vec<PortfolioRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, portfolio_id, advisor_type, platform_name, fund_name,
                    expense_ratio, transaction_costs, turnover_rate,
                    tax_efficiency, assets_under_management,
                    document_date, extraction_notes, excluded
             FROM portfolios ORDER BY portfolio_id",
        )?;
        Self::map_portfolios(&mut stmt, [])
    }

    /// Get the rows visible to downstream analysis: exclusion flag unset or `0`.
    ///
    /// This is the one place the inclusion predicate is defined; consumers
    /// must not re-derive it.
    pub fn get_included_portfolios(&self) -> Result<Vec<PortfolioRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, portfolio_id, advisor_type, platform_name, fund_name,
                    expense_ratio, transaction_costs, turnover_rate,
                    tax_efficiency, assets_under_management,
                    document_date, extraction_notes, excluded
             FROM portfolios
             WHERE excluded IS NULL OR excluded = 0 OR excluded = ''
             ORDER BY portfolio_id",
        )?;
        Self::map_portfolios(&mut stmt, [])
    }

    fn map_portfolios(
        stmt: &mut rusqlite::Statement,
        params: impl rusqlite::Params,
    ) -> Result<Vec<PortfolioRecord>> {
        let rows = stmt.query_map(params, |row| {
            let date_text: Option<String> = row.get(10)?;
            Ok(PortfolioRecord {
                id: row.get(0)?,
                portfolio_id: row.get(1)?,
                advisor_type: row.get(2)?,
                platform_name: row.get(3)?,
                fund_name: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                expense_ratio: row.get(5)?,
                transaction_costs: row.get(6)?,
                turnover_rate: row.get(7)?,
                tax_efficiency: row.get(8)?,
                assets_under_management: row.get(9)?,
                document_date: date_text
                    .as_deref()
                    .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()),
                extraction_notes: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
                excluded: row.get(12)?,
            })
        })?;
        let mut records = Vec::new();
        for r in rows {
            records.push(r?);
        }
        Ok(records)
    }

    // ─── Fund summary operations ───

    /// Insert or replace a fund summary keyed by ticker. Returns the row ID.
    pub fn upsert_fund_summary(&self, fund: &FundSummary) -> Result<i64> {
        self.conn().execute(
            "INSERT INTO fund_summaries (
                ticker, name, currency, asset_class, expense_ratio,
                net_assets, inception_date, morningstar_rating
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(ticker) DO UPDATE SET
                name=?2, currency=?3, asset_class=?4, expense_ratio=?5,
                net_assets=?6, inception_date=?7, morningstar_rating=?8",
            params![
                fund.ticker,
                fund.name,
                fund.currency,
                fund.asset_class,
                fund.expense_ratio,
                fund.net_assets,
                fund.inception_date,
                fund.morningstar_rating,
            ],
        )?;
        let id: i64 = self.conn().query_row(
            "SELECT id FROM fund_summaries WHERE ticker = ?1",
            params![fund.ticker],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Get all fund summaries, ordered by ticker.
    pub fn get_all_fund_summaries(&self) -> Result<Vec<FundSummary>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, ticker, name, currency, asset_class, expense_ratio,
                    net_assets, inception_date, morningstar_rating
             FROM fund_summaries ORDER BY ticker",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FundSummary {
                id: row.get(0)?,
                ticker: row.get(1)?,
                name: row.get(2)?,
                currency: row.get(3)?,
                asset_class: row.get(4)?,
                expense_ratio: row.get(5)?,
                net_assets: row.get(6)?,
                inception_date: row.get(7)?,
                morningstar_rating: row.get(8)?,
            })
        })?;
        let mut funds = Vec::new();
        for r in rows {
            funds.push(r?);
        }
        Ok(funds)
    }

    /// Ticker-to-name lookup for labeling combined performance output.
    pub fn fund_name_map(&self) -> Result<std::collections::BTreeMap<String, String>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT ticker, name FROM fund_summaries WHERE name IS NOT NULL")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut map = std::collections::BTreeMap::new();
        for r in rows {
            let (ticker, name) = r?;
            map.insert(ticker, name);
        }
        Ok(map)
    }

    // ─── Statistics ───

    /// Get store statistics.
    pub fn stats(&self) -> Result<StoreStats> {
        let portfolio_count: i64 =
            self.conn()
                .query_row("SELECT COUNT(*) FROM portfolios", [], |r| r.get(0))?;
        let included_count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM portfolios WHERE excluded IS NULL OR excluded = 0 OR excluded = ''",
            [],
            |r| r.get(0),
        )?;
        let fund_count: i64 =
            self.conn()
                .query_row("SELECT COUNT(*) FROM fund_summaries", [], |r| r.get(0))?;

        let mut stmt = self.conn().prepare(
            "SELECT advisor_type, COUNT(*) FROM portfolios GROUP BY advisor_type ORDER BY advisor_type",
        )?;
        let type_rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        let mut advisor_types = Vec::new();
        for r in type_rows {
            advisor_types.push(r?);
        }

        Ok(StoreStats {
            portfolio_count: portfolio_count as u64,
            included_count: included_count as u64,
            excluded_count: (portfolio_count - included_count) as u64,
            fund_count: fund_count as u64,
            advisor_types,
        })
    }
}

/// Store statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub portfolio_count: u64,
    pub included_count: u64,
    pub excluded_count: u64,
    pub fund_count: u64,
    pub advisor_types: Vec<(String, i64)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::portfolio::CandidateRecord;

    fn test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn sample_record(portfolio_id: &str) -> PortfolioRecord {
        PortfolioRecord::from_candidate(
            portfolio_id.into(),
            CandidateRecord {
                advisor_type: "Robo-advisor".into(),
                platform_name: "Acme Robo".into(),
                fund_name: "Acme Core".into(),
                expense_ratio: Some(0.25),
                transaction_costs: Some(0.05),
                turnover_rate: None,
                tax_efficiency: Some(8.0),
                assets_under_management: Some(1_200_000.0),
                document_date: NaiveDate::from_ymd_opt(2024, 3, 15),
                extraction_notes: "sourced from fee table".into(),
            },
        )
    }

    #[test]
    fn upsert_and_retrieve() {
        let db = test_db();
        let r = sample_record("RA_000");
        let id = db.upsert_portfolio(&r).unwrap();
        assert!(id > 0);
        let got = db.get_portfolio("RA_000").unwrap().unwrap();
        assert_eq!(got.platform_name, "Acme Robo");
        assert_eq!(got.expense_ratio, Some(0.25));
        assert_eq!(
            got.document_date,
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );
    }

    #[test]
    fn upsert_is_idempotent() {
        let db = test_db();
        let r = sample_record("RA_000");
        let id1 = db.upsert_portfolio(&r).unwrap();
        let id2 = db.upsert_portfolio(&r).unwrap();
        assert_eq!(id1, id2);
        let all = db.get_all_portfolios().unwrap();
        assert_eq!(all.len(), 1);
        let got = db.get_portfolio("RA_000").unwrap().unwrap();
        assert_eq!(got.expense_ratio, r.expense_ratio);
        assert_eq!(got.extraction_notes, r.extraction_notes);
    }

    #[test]
    fn upsert_replaces_every_field() {
        let db = test_db();
        let r1 = sample_record("RA_000");
        db.upsert_portfolio(&r1).unwrap();

        // Second parse of the same document found fewer fields; nothing
        // from the first write may survive.
        let mut r2 = sample_record("RA_000");
        r2.advisor_type = "Traditional".into();
        r2.expense_ratio = None;
        r2.tax_efficiency = None;
        r2.document_date = None;
        r2.extraction_notes = "re-extracted".into();
        db.upsert_portfolio(&r2).unwrap();

        let got = db.get_portfolio("RA_000").unwrap().unwrap();
        assert_eq!(got.advisor_type, "Traditional");
        assert_eq!(got.expense_ratio, None);
        assert_eq!(got.tax_efficiency, None);
        assert_eq!(got.document_date, None);
        assert_eq!(got.extraction_notes, "re-extracted");
        assert_eq!(got.assets_under_management, Some(1_200_000.0));
    }

    #[test]
    fn included_filter_is_first_class() {
        let db = test_db();
        let mut a = sample_record("RA_000");
        let mut b = sample_record("RA_001");
        let c = sample_record("RA_002");
        a.excluded = Some("1".into());
        b.excluded = Some("0".into());
        db.upsert_portfolio(&a).unwrap();
        db.upsert_portfolio(&b).unwrap();
        db.upsert_portfolio(&c).unwrap();

        let included = db.get_included_portfolios().unwrap();
        let ids: Vec<&str> = included.iter().map(|r| r.portfolio_id.as_str()).collect();
        assert_eq!(ids, vec!["RA_001", "RA_002"]);
    }

    #[test]
    fn duplicate_platform_under_different_ids_is_legal() {
        let db = test_db();
        db.upsert_portfolio(&sample_record("RA_000")).unwrap();
        db.upsert_portfolio(&sample_record("RA_001")).unwrap();
        assert_eq!(db.get_all_portfolios().unwrap().len(), 2);
    }

    #[test]
    fn fund_summary_upsert_and_name_map() {
        let db = test_db();
        let mut f = FundSummary::new("PRWCX");
        f.name = Some("T. Rowe Price Capital Appreciation".into());
        let id1 = db.upsert_fund_summary(&f).unwrap();
        f.name = Some("T. Rowe Price Capital Appreciation Fund".into());
        let id2 = db.upsert_fund_summary(&f).unwrap();
        assert_eq!(id1, id2);

        let map = db.fund_name_map().unwrap();
        assert_eq!(
            map.get("PRWCX").map(String::as_str),
            Some("T. Rowe Price Capital Appreciation Fund")
        );
    }

    #[test]
    fn stats_counts_types_and_exclusions() {
        let db = test_db();
        let a = sample_record("RA_000");
        let mut b = sample_record("RA_001");
        b.advisor_type = "Traditional".into();
        b.excluded = Some("1".into());
        db.upsert_portfolio(&a).unwrap();
        db.upsert_portfolio(&b).unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.portfolio_count, 2);
        assert_eq!(stats.included_count, 1);
        assert_eq!(stats.excluded_count, 1);
        assert_eq!(stats.advisor_types.len(), 2);
    }
}
