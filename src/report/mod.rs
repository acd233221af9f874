//! CSV reporting: table export for downstream tooling and re-import of
//! manually reviewed rows.

use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use crate::analysis::costs::CostReport;
use crate::db::Database;
use crate::error::{AdvError, Result};
use crate::models::portfolio::PortfolioRecord;

/// Columns a reviewed CSV must carry (an `id` column is tolerated and
/// ignored). Also the column order of exports.
const EXPECTED_COLUMNS: [&str; 12] = [
    "portfolio_id",
    "advisor_type",
    "platform_name",
    "fund_name",
    "expense_ratio",
    "transaction_costs",
    "turnover_rate",
    "tax_efficiency",
    "assets_under_management",
    "document_date",
    "extraction_notes",
    "excluded",
];

/// Export the portfolios table to CSV. Returns the number of rows written.
pub fn export_portfolios_csv(db: &Database, path: &Path, included_only: bool) -> Result<usize> {
    let rows = if included_only {
        db.get_included_portfolios()?
    } else {
        db.get_all_portfolios()?
    };

    let mut writer = csv::Writer::from_path(path)?;
    let mut headers = vec!["id"];
    headers.extend(EXPECTED_COLUMNS);
    writer.write_record(&headers)?;

    for row in &rows {
        writer.write_record([
            row.id.to_string(),
            row.portfolio_id.clone(),
            row.advisor_type.clone(),
            row.platform_name.clone(),
            row.fund_name.clone(),
            opt_num(row.expense_ratio),
            opt_num(row.transaction_costs),
            opt_num(row.turnover_rate),
            opt_num(row.tax_efficiency),
            opt_num(row.assets_under_management),
            row.document_date.map(|d| d.to_string()).unwrap_or_default(),
            row.extraction_notes.clone(),
            row.excluded.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(rows.len())
}

fn opt_num(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Outcome of a reviewed-CSV import.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub rows_imported: usize,
    /// Rows without a portfolio identity.
    pub rows_skipped: usize,
}

/// Import a manually reviewed CSV into the store by upsert.
///
/// Header names are normalized (trimmed, lowercased, spaces to
/// underscores) and validated against the expected column set before any
/// row is written. Unparseable dates and numbers degrade to null.
pub fn import_reviewed_csv(db: &Database, path: &Path) -> Result<ImportReport> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase().replace(' ', "_"))
        .collect();

    let missing: Vec<&str> = EXPECTED_COLUMNS
        .iter()
        .filter(|c| !headers.iter().any(|h| h == *c))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(AdvError::MissingColumns(missing.join(", ")));
    }

    let column = |name: &str| -> usize {
        headers
            .iter()
            .position(|h| h == name)
            .expect("validated above")
    };
    let text = |record: &csv::StringRecord, name: &str| -> String {
        record.get(column(name)).unwrap_or_default().trim().to_string()
    };
    let number = |record: &csv::StringRecord, name: &str| -> Option<f64> {
        record
            .get(column(name))
            .and_then(|s| s.trim().parse::<f64>().ok())
    };

    let mut report = ImportReport::default();
    for record in reader.records() {
        let record = record?;
        let portfolio_id = text(&record, "portfolio_id");
        if portfolio_id.is_empty() {
            warn!("skipping reviewed row without portfolio_id");
            report.rows_skipped += 1;
            continue;
        }

        let excluded = {
            let raw = text(&record, "excluded");
            if raw.is_empty() {
                None
            } else {
                Some(raw)
            }
        };

        let row = PortfolioRecord {
            id: 0,
            portfolio_id,
            advisor_type: text(&record, "advisor_type"),
            platform_name: text(&record, "platform_name"),
            fund_name: text(&record, "fund_name"),
            expense_ratio: number(&record, "expense_ratio"),
            transaction_costs: number(&record, "transaction_costs"),
            turnover_rate: number(&record, "turnover_rate"),
            tax_efficiency: number(&record, "tax_efficiency"),
            assets_under_management: number(&record, "assets_under_management"),
            document_date: parse_flexible_date(&text(&record, "document_date")),
            extraction_notes: text(&record, "extraction_notes"),
            excluded,
        };
        db.upsert_portfolio(&row)?;
        report.rows_imported += 1;
    }
    Ok(report)
}

/// Parse review-sheet dates: ISO first, then the day-first forms the
/// review spreadsheets use. Anything else is null, never an error.
#[must_use]
pub fn parse_flexible_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    const FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y"];
    for format in FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    // Datetime exports: keep the date part.
    NaiveDate::parse_from_str(raw.split(' ').next().unwrap_or(raw), "%Y-%m-%d").ok()
}

/// Write the cost report as two CSVs in `dir`: per-group summaries and
/// test outcomes.
pub fn write_cost_report_csv(report: &CostReport, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    let mut writer = csv::Writer::from_path(dir.join("cost_summary.csv"))?;
    writer.write_record(["Variable", "Group", "Count", "Mean", "Std", "Median"])?;
    for s in &report.summaries {
        writer.write_record([
            s.variable.clone(),
            s.group.clone(),
            s.count.to_string(),
            opt_num(s.mean),
            opt_num(s.std),
            opt_num(s.median),
        ])?;
    }
    writer.flush()?;

    let mut writer = csv::Writer::from_path(dir.join("cost_tests.csv"))?;
    writer.write_record(["Variable", "U-statistic", "p-value", "Significant"])?;
    for t in &report.tests {
        writer.write_record([
            t.variable.clone(),
            t.u_statistic.to_string(),
            t.p_value.to_string(),
            t.significant.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::portfolio::CandidateRecord;
    use tempfile::TempDir;

    fn sample_record(portfolio_id: &str) -> PortfolioRecord {
        PortfolioRecord::from_candidate(
            portfolio_id.into(),
            CandidateRecord {
                advisor_type: "Robo-advisor".into(),
                platform_name: "Acme Robo".into(),
                fund_name: String::new(),
                expense_ratio: Some(0.25),
                transaction_costs: None,
                turnover_rate: None,
                tax_efficiency: None,
                assets_under_management: Some(1_200_000.0),
                document_date: NaiveDate::from_ymd_opt(2024, 3, 15),
                extraction_notes: "fee table".into(),
            },
        )
    }

    #[test]
    fn export_then_import_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("portfolios.csv");

        let db = Database::open_in_memory().unwrap();
        db.upsert_portfolio(&sample_record("RA_000")).unwrap();
        db.upsert_portfolio(&sample_record("RA_001")).unwrap();
        let written = export_portfolios_csv(&db, &path, false).unwrap();
        assert_eq!(written, 2);

        let db2 = Database::open_in_memory().unwrap();
        let report = import_reviewed_csv(&db2, &path).unwrap();
        assert_eq!(report.rows_imported, 2);

        let row = db2.get_portfolio("RA_000").unwrap().unwrap();
        assert_eq!(row.platform_name, "Acme Robo");
        assert_eq!(row.expense_ratio, Some(0.25));
        assert_eq!(row.document_date, NaiveDate::from_ymd_opt(2024, 3, 15));
    }

    #[test]
    fn import_rejects_missing_columns() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("broken.csv");
        std::fs::write(&path, "portfolio_id,advisor_type\nRA_000,Hybrid\n").unwrap();

        let db = Database::open_in_memory().unwrap();
        let err = import_reviewed_csv(&db, &path).unwrap_err();
        assert!(matches!(err, AdvError::MissingColumns(_)));
    }

    #[test]
    fn import_applies_exclusions_and_reparses_dates() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("reviewed.csv");
        let header = EXPECTED_COLUMNS.join(",");
        std::fs::write(
            &path,
            format!(
                "{header}\n\
                 RA_000,Hybrid,Acme Robo,,0.3,,,,,15/03/2024,reviewed,1\n\
                 RA_001,Traditional,Beta Fund,,1.1,,,,,not a date,,\n\
                 ,Traditional,No Identity,,,,,,,,,\n"
            ),
        )
        .unwrap();

        let db = Database::open_in_memory().unwrap();
        let report = import_reviewed_csv(&db, &path).unwrap();
        assert_eq!(report.rows_imported, 2);
        assert_eq!(report.rows_skipped, 1);

        let excluded = db.get_portfolio("RA_000").unwrap().unwrap();
        assert!(!excluded.is_included());
        assert_eq!(
            excluded.document_date,
            NaiveDate::from_ymd_opt(2024, 3, 15)
        );

        let kept = db.get_portfolio("RA_001").unwrap().unwrap();
        assert!(kept.is_included());
        assert_eq!(kept.document_date, None);
    }

    #[test]
    fn import_header_normalization() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("spaced.csv");
        let header = "Portfolio Id,Advisor Type,Platform Name,Fund Name,Expense Ratio,\
                      Transaction Costs,Turnover Rate,Tax Efficiency,Assets Under Management,\
                      Document Date,Extraction Notes,Excluded";
        std::fs::write(&path, format!("{header}\nRA_000,Hybrid,Acme,,,,,,,,,\n")).unwrap();

        let db = Database::open_in_memory().unwrap();
        let report = import_reviewed_csv(&db, &path).unwrap();
        assert_eq!(report.rows_imported, 1);
    }

    #[test]
    fn flexible_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15);
        assert_eq!(parse_flexible_date("2024-03-15"), expected);
        assert_eq!(parse_flexible_date("15/03/2024"), expected);
        assert_eq!(parse_flexible_date("15-03-2024"), expected);
        assert_eq!(parse_flexible_date("2024-03-15 00:00:00"), expected);
        assert_eq!(parse_flexible_date(""), None);
        assert_eq!(parse_flexible_date("March 15, 2024"), None);
    }

    #[test]
    fn cost_report_files_written() {
        let tmp = TempDir::new().unwrap();
        let db = Database::open_in_memory().unwrap();
        db.upsert_portfolio(&sample_record("RA_000")).unwrap();
        let report = crate::analysis::costs::run_cost_analysis(&db).unwrap();

        write_cost_report_csv(&report, tmp.path()).unwrap();
        assert!(tmp.path().join("cost_summary.csv").exists());
        assert!(tmp.path().join("cost_tests.csv").exists());
    }
}
