use crate::models::portfolio::CandidateRecord;

/// Why a candidate was rejected before persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// All five numeric analytic fields are absent.
    NoSignal,
}

impl RejectReason {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::NoSignal => "NO_SIGNAL",
        }
    }
}

/// Outcome of gating a candidate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(RejectReason),
}

/// Gate a candidate record: rows without any numeric field carry no
/// analytic value and must not be persisted.
#[must_use]
pub fn validate(candidate: &CandidateRecord) -> Verdict {
    if candidate.has_signal() {
        Verdict::Accept
    } else {
        Verdict::Reject(RejectReason::NoSignal)
    }
}
