/// SQL statements for creating the study schema.
///
/// Column names and types of `portfolios` are a durable contract read by
/// reporting and reprocessing tooling; do not rename them.
pub const CREATE_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS portfolios (
    id INTEGER PRIMARY KEY,
    portfolio_id TEXT UNIQUE NOT NULL,
    advisor_type TEXT NOT NULL,
    platform_name TEXT NOT NULL,
    fund_name TEXT,
    expense_ratio REAL,
    transaction_costs REAL,
    turnover_rate REAL,
    tax_efficiency REAL,
    assets_under_management REAL,
    document_date TEXT,
    extraction_notes TEXT,
    excluded TEXT
);

CREATE INDEX IF NOT EXISTS idx_portfolios_advisor_type ON portfolios(advisor_type);

CREATE TABLE IF NOT EXISTS fund_summaries (
    id INTEGER PRIMARY KEY,
    ticker TEXT UNIQUE NOT NULL,
    name TEXT,
    currency TEXT,
    asset_class TEXT,
    expense_ratio REAL,
    net_assets REAL,
    inception_date TEXT,
    morningstar_rating INTEGER
);
";

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn schema_creates_without_error() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_SCHEMA).unwrap();
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CREATE_SCHEMA).unwrap();
        conn.execute_batch(CREATE_SCHEMA).unwrap();
    }
}
