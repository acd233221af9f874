use std::collections::HashMap;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{AdvError, Result};
use crate::models::portfolio::CandidateRecord;

/// Fields named by the response label grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Field {
    Platform,
    AdvisorType,
    FundName,
    ManagementFees,
    TransactionFees,
    Aum,
    TurnoverRate,
    TaxEfficiency,
    DocumentDate,
    Notes,
}

/// How a matched value is coerced.
#[derive(Debug, Clone, Copy)]
enum ValueKind {
    /// Trimmed line text; required for a usable record.
    Identity,
    /// Trimmed line text, optional.
    Text,
    /// Digits with optional decimal point; unparseable means absent.
    Numeric,
    /// Numeric with a leading currency symbol and thousands separators.
    Currency,
    /// Strict `YYYY-MM-DD`, validated as a real calendar date.
    Date,
    /// Everything from the label to the end of the response.
    Block,
}

/// The label grammar as data: one (field, label, kind) row per line of the
/// prompt's response template. Parser behavior is this table, not scattered
/// per-field code.
const GRAMMAR: &[(Field, &str, ValueKind)] = &[
    (Field::Platform, "Platform", ValueKind::Identity),
    (Field::AdvisorType, "Advisor Type", ValueKind::Identity),
    (Field::FundName, "Fund Name", ValueKind::Text),
    (Field::ManagementFees, "Management Fees", ValueKind::Numeric),
    (Field::TransactionFees, "Transaction Fees", ValueKind::Numeric),
    (Field::Aum, "AUM", ValueKind::Currency),
    (Field::TurnoverRate, "Turnover Rate", ValueKind::Numeric),
    (Field::TaxEfficiency, "Tax Efficiency", ValueKind::Numeric),
    (Field::DocumentDate, "Document Date", ValueKind::Date),
    (Field::Notes, "Notes", ValueKind::Block),
];

/// A typed value extracted for one field.
#[derive(Debug, Clone)]
enum FieldValue {
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

struct CompiledRule {
    field: Field,
    kind: ValueKind,
    re: Regex,
}

impl CompiledRule {
    fn pattern(label: &str, kind: ValueKind) -> String {
        match kind {
            ValueKind::Identity | ValueKind::Text => format!("{label}:[ \\t]*(.+)"),
            ValueKind::Numeric => format!("{label}:[ \\t]*([\\d.]+)"),
            ValueKind::Currency => format!("{label}:[ \\t]*\\$?([\\d,.]+)"),
            ValueKind::Date => format!("{label}:[ \\t]*(\\d{{4}}-\\d{{2}}-\\d{{2}})"),
            ValueKind::Block => format!("(?s){label}:[ \\t]*(.+)"),
        }
    }

    /// Extract this field from the response, degrading to `None` on any
    /// malformed value. Only a successful match with a coercible value
    /// produces `Some`.
    fn extract(&self, text: &str) -> Option<FieldValue> {
        let raw = self.re.captures(text)?.get(1)?.as_str().trim();
        if raw.is_empty() {
            return None;
        }
        match self.kind {
            ValueKind::Identity | ValueKind::Text | ValueKind::Block => {
                Some(FieldValue::Text(raw.to_string()))
            }
            ValueKind::Numeric => raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(FieldValue::Number),
            ValueKind::Currency => raw
                .replace(',', "")
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(FieldValue::Number),
            ValueKind::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(FieldValue::Date),
        }
    }
}

/// Parses the structured-extraction response into a candidate record.
///
/// Total over arbitrary input: every field degrades to absent rather than
/// failing the parse. The only hard failure is a missing platform or
/// advisor type, which makes the record unusable.
pub struct FieldParser {
    rules: Vec<CompiledRule>,
}

impl Default for FieldParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldParser {
    #[must_use]
    pub fn new() -> Self {
        let rules = GRAMMAR
            .iter()
            .map(|&(field, label, kind)| CompiledRule {
                field,
                kind,
                // Patterns are static and known-valid.
                re: Regex::new(&CompiledRule::pattern(label, kind)).expect("grammar pattern"),
            })
            .collect();
        Self { rules }
    }

    /// Parse a response into a candidate record.
    ///
    /// Returns `AdvError::IdentityMissing` when `Platform` or `Advisor Type`
    /// is absent or blank; every other field falls back to null/empty.
    pub fn parse(&self, text: &str) -> Result<CandidateRecord> {
        let mut values: HashMap<Field, FieldValue> = HashMap::new();
        for rule in &self.rules {
            if let Some(v) = rule.extract(text) {
                values.insert(rule.field, v);
            }
        }

        let platform_name = take_text(&mut values, Field::Platform).ok_or(AdvError::IdentityMissing)?;
        let advisor_type =
            take_text(&mut values, Field::AdvisorType).ok_or(AdvError::IdentityMissing)?;

        Ok(CandidateRecord {
            advisor_type,
            platform_name,
            fund_name: take_text(&mut values, Field::FundName).unwrap_or_default(),
            expense_ratio: take_number(&mut values, Field::ManagementFees),
            transaction_costs: take_number(&mut values, Field::TransactionFees),
            turnover_rate: take_number(&mut values, Field::TurnoverRate),
            tax_efficiency: take_number(&mut values, Field::TaxEfficiency),
            assets_under_management: take_number(&mut values, Field::Aum),
            document_date: take_date(&mut values, Field::DocumentDate),
            extraction_notes: take_text(&mut values, Field::Notes).unwrap_or_default(),
        })
    }
}

fn take_text(values: &mut HashMap<Field, FieldValue>, field: Field) -> Option<String> {
    match values.remove(&field) {
        Some(FieldValue::Text(s)) => Some(s),
        _ => None,
    }
}

fn take_number(values: &mut HashMap<Field, FieldValue>, field: Field) -> Option<f64> {
    match values.remove(&field) {
        Some(FieldValue::Number(n)) => Some(n),
        _ => None,
    }
}

fn take_date(values: &mut HashMap<Field, FieldValue>, field: Field) -> Option<NaiveDate> {
    match values.remove(&field) {
        Some(FieldValue::Date(d)) => Some(d),
        _ => None,
    }
}
