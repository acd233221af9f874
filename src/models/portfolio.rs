use chrono::NaiveDate;
use serde::Serialize;

/// Advisor types counted as "Automated" in the group comparison.
const AUTOMATED_TYPES: [&str; 2] = ["Robo-advisor", "Hybrid"];

/// Derived category used by the cost and performance comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AdvisorGroup {
    Automated,
    Traditional,
}

impl AdvisorGroup {
    /// Derive the group from a raw advisor type string.
    #[must_use]
    pub fn from_advisor_type(advisor_type: &str) -> Self {
        if AUTOMATED_TYPES.contains(&advisor_type) {
            AdvisorGroup::Automated
        } else {
            AdvisorGroup::Traditional
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvisorGroup::Automated => "Automated",
            AdvisorGroup::Traditional => "Traditional",
        }
    }
}

/// In-memory, not-yet-validated output of the field parser.
///
/// Identity fields are guaranteed non-empty; everything else degrades to
/// `None`/empty when the response does not state it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRecord {
    pub advisor_type: String,
    pub platform_name: String,
    pub fund_name: String,
    pub expense_ratio: Option<f64>,
    pub transaction_costs: Option<f64>,
    pub turnover_rate: Option<f64>,
    pub tax_efficiency: Option<f64>,
    pub assets_under_management: Option<f64>,
    pub document_date: Option<NaiveDate>,
    pub extraction_notes: String,
}

impl CandidateRecord {
    /// True when at least one of the five numeric analytic fields is present.
    #[must_use]
    pub fn has_signal(&self) -> bool {
        self.expense_ratio.is_some()
            || self.transaction_costs.is_some()
            || self.turnover_rate.is_some()
            || self.tax_efficiency.is_some()
            || self.assets_under_management.is_some()
    }
}

/// A portfolio row stored in the study database.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioRecord {
    /// Database row ID (0 if not yet persisted).
    pub id: i64,
    /// Run-assigned identity (`RA_000`, `RA_001`, ...), unique in the table.
    pub portfolio_id: String,
    pub advisor_type: String,
    pub platform_name: String,
    pub fund_name: String,
    pub expense_ratio: Option<f64>,
    pub transaction_costs: Option<f64>,
    pub turnover_rate: Option<f64>,
    pub tax_efficiency: Option<f64>,
    pub assets_under_management: Option<f64>,
    pub document_date: Option<NaiveDate>,
    pub extraction_notes: String,
    /// Manual exclusion flag; absent/`0` means the row is included.
    pub excluded: Option<String>,
}

impl PortfolioRecord {
    /// Build a persistable record from a validated candidate.
    #[must_use]
    pub fn from_candidate(portfolio_id: String, candidate: CandidateRecord) -> Self {
        Self {
            id: 0,
            portfolio_id,
            advisor_type: candidate.advisor_type,
            platform_name: candidate.platform_name,
            fund_name: candidate.fund_name,
            expense_ratio: candidate.expense_ratio,
            transaction_costs: candidate.transaction_costs,
            turnover_rate: candidate.turnover_rate,
            tax_efficiency: candidate.tax_efficiency,
            assets_under_management: candidate.assets_under_management,
            document_date: candidate.document_date,
            extraction_notes: candidate.extraction_notes,
            excluded: None,
        }
    }

    /// Whether downstream analysis should see this row.
    #[must_use]
    pub fn is_included(&self) -> bool {
        match self.excluded.as_deref() {
            None | Some("" | "0") => true,
            Some(_) => false,
        }
    }

    #[must_use]
    pub fn advisor_group(&self) -> AdvisorGroup {
        AdvisorGroup::from_advisor_type(&self.advisor_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> CandidateRecord {
        CandidateRecord {
            advisor_type: "Robo-advisor".into(),
            platform_name: "Acme Robo".into(),
            fund_name: String::new(),
            expense_ratio: Some(0.25),
            transaction_costs: None,
            turnover_rate: None,
            tax_efficiency: None,
            assets_under_management: None,
            document_date: None,
            extraction_notes: String::new(),
        }
    }

    #[test]
    fn has_signal_any_numeric_field() {
        let mut c = candidate();
        assert!(c.has_signal());
        c.expense_ratio = None;
        assert!(!c.has_signal());
        c.assets_under_management = Some(1_200_000.0);
        assert!(c.has_signal());
    }

    #[test]
    fn from_candidate_carries_fields() {
        let r = PortfolioRecord::from_candidate("RA_007".into(), candidate());
        assert_eq!(r.id, 0);
        assert_eq!(r.portfolio_id, "RA_007");
        assert_eq!(r.platform_name, "Acme Robo");
        assert_eq!(r.expense_ratio, Some(0.25));
        assert!(r.excluded.is_none());
    }

    #[test]
    fn advisor_group_derivation() {
        assert_eq!(
            AdvisorGroup::from_advisor_type("Robo-advisor"),
            AdvisorGroup::Automated
        );
        assert_eq!(
            AdvisorGroup::from_advisor_type("Hybrid"),
            AdvisorGroup::Automated
        );
        assert_eq!(
            AdvisorGroup::from_advisor_type("Traditional"),
            AdvisorGroup::Traditional
        );
        // Free strings outside the closed set fall back to Traditional.
        assert_eq!(
            AdvisorGroup::from_advisor_type("Unknown"),
            AdvisorGroup::Traditional
        );
    }

    #[test]
    fn exclusion_flag_semantics() {
        let mut r = PortfolioRecord::from_candidate("RA_000".into(), candidate());
        assert!(r.is_included());
        r.excluded = Some("0".into());
        assert!(r.is_included());
        r.excluded = Some(String::new());
        assert!(r.is_included());
        r.excluded = Some("1".into());
        assert!(!r.is_included());
        r.excluded = Some("manual review".into());
        assert!(!r.is_included());
    }
}
