use serde::Serialize;

use crate::analysis::stats::{self, mann_whitney_u};
use crate::db::Database;
use crate::error::Result;
use crate::models::portfolio::{AdvisorGroup, PortfolioRecord};

/// Threshold below which a group difference is reported as significant.
const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// The cost variables compared between advisor groups. AUM enters on a
/// log scale to tame its spread.
const VARIABLES: &[(&str, fn(&PortfolioRecord) -> Option<f64>)] = &[
    ("Expense Ratio", |r| r.expense_ratio),
    ("Transaction Costs", |r| r.transaction_costs),
    ("Tax Efficiency", |r| r.tax_efficiency),
    ("Log AUM", |r| r.assets_under_management.map(f64::ln_1p)),
];

/// Descriptive statistics for one variable within one advisor group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    pub variable: String,
    pub group: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub median: Option<f64>,
}

/// Mann–Whitney U outcome for one variable.
#[derive(Debug, Clone, Serialize)]
pub struct VariableTest {
    pub variable: String,
    pub u_statistic: f64,
    pub p_value: f64,
    pub significant: bool,
}

/// Full output of the cost comparison.
#[derive(Debug, Clone, Serialize)]
pub struct CostReport {
    pub automated_count: usize,
    pub traditional_count: usize,
    pub summaries: Vec<GroupSummary>,
    pub tests: Vec<VariableTest>,
}

/// Compare cost variables between Automated and Traditional advisors over
/// the store's included rows.
pub fn run_cost_analysis(db: &Database) -> Result<CostReport> {
    let rows = db.get_included_portfolios()?;

    let (automated, traditional): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .partition(|r| r.advisor_group() == AdvisorGroup::Automated);

    let mut summaries = Vec::new();
    let mut tests = Vec::new();

    for &(name, extract) in VARIABLES {
        let auto_values: Vec<f64> = automated.iter().filter_map(extract).collect();
        let trad_values: Vec<f64> = traditional.iter().filter_map(extract).collect();

        summaries.push(summarize(name, AdvisorGroup::Automated, &auto_values));
        summaries.push(summarize(name, AdvisorGroup::Traditional, &trad_values));

        if let Some(outcome) = mann_whitney_u(&auto_values, &trad_values) {
            tests.push(VariableTest {
                variable: name.to_string(),
                u_statistic: outcome.u,
                p_value: outcome.p_value,
                significant: outcome.p_value < SIGNIFICANCE_LEVEL,
            });
        }
    }

    Ok(CostReport {
        automated_count: automated.len(),
        traditional_count: traditional.len(),
        summaries,
        tests,
    })
}

fn summarize(variable: &str, group: AdvisorGroup, values: &[f64]) -> GroupSummary {
    GroupSummary {
        variable: variable.to_string(),
        group: group.as_str().to_string(),
        count: values.len(),
        mean: stats::mean(values),
        std: stats::sample_std(values),
        median: stats::median(values),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::portfolio::CandidateRecord;

    fn record(id: &str, advisor_type: &str, expense: Option<f64>, aum: Option<f64>) -> PortfolioRecord {
        PortfolioRecord::from_candidate(
            id.into(),
            CandidateRecord {
                advisor_type: advisor_type.into(),
                platform_name: format!("{advisor_type} platform"),
                fund_name: String::new(),
                expense_ratio: expense,
                transaction_costs: None,
                turnover_rate: None,
                tax_efficiency: None,
                assets_under_management: aum,
                document_date: None,
                extraction_notes: String::new(),
            },
        )
    }

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        let rows = [
            record("RA_000", "Robo-advisor", Some(0.25), Some(1.0e6)),
            record("RA_001", "Hybrid", Some(0.30), Some(2.0e6)),
            record("RA_002", "Robo-advisor", Some(0.20), None),
            record("RA_003", "Traditional", Some(1.00), Some(5.0e6)),
            record("RA_004", "Traditional", Some(1.20), Some(8.0e6)),
            record("RA_005", "Traditional", Some(0.90), Some(4.0e6)),
        ];
        for r in &rows {
            db.upsert_portfolio(r).unwrap();
        }
        db
    }

    #[test]
    fn groups_split_and_summarize() {
        let db = seeded_db();
        let report = run_cost_analysis(&db).unwrap();
        assert_eq!(report.automated_count, 3);
        assert_eq!(report.traditional_count, 3);

        let expense_auto = report
            .summaries
            .iter()
            .find(|s| s.variable == "Expense Ratio" && s.group == "Automated")
            .unwrap();
        assert_eq!(expense_auto.count, 3);
        assert!((expense_auto.mean.unwrap() - 0.25).abs() < 1e-12);
        assert_eq!(expense_auto.median, Some(0.25));

        // AUM has a missing value on the automated side.
        let aum_auto = report
            .summaries
            .iter()
            .find(|s| s.variable == "Log AUM" && s.group == "Automated")
            .unwrap();
        assert_eq!(aum_auto.count, 2);
    }

    #[test]
    fn tests_cover_populated_variables() {
        let db = seeded_db();
        let report = run_cost_analysis(&db).unwrap();
        let names: Vec<&str> = report.tests.iter().map(|t| t.variable.as_str()).collect();
        assert!(names.contains(&"Expense Ratio"));
        assert!(names.contains(&"Log AUM"));
        // Nobody reported transaction costs, so there is nothing to test.
        assert!(!names.contains(&"Transaction Costs"));
    }

    #[test]
    fn excluded_rows_are_invisible() {
        let db = seeded_db();
        let mut extra = record("RA_006", "Robo-advisor", Some(9.99), None);
        extra.excluded = Some("1".into());
        db.upsert_portfolio(&extra).unwrap();

        let report = run_cost_analysis(&db).unwrap();
        assert_eq!(report.automated_count, 3);
    }

    #[test]
    fn clear_separation_is_significant() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..12 {
            let (advisor, expense) = if i < 6 {
                ("Robo-advisor", 0.20 + 0.01 * f64::from(i))
            } else {
                ("Traditional", 1.00 + 0.01 * f64::from(i))
            };
            db.upsert_portfolio(&record(&format!("RA_{i:03}"), advisor, Some(expense), None))
                .unwrap();
        }
        let report = run_cost_analysis(&db).unwrap();
        let expense = report
            .tests
            .iter()
            .find(|t| t.variable == "Expense Ratio")
            .unwrap();
        assert!(expense.significant, "p = {}", expense.p_value);
    }
}
