use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::Config;
use crate::db::Database;
use crate::error::{AdvError, Result};
use crate::extract::llm::FeeExtractor;
use crate::extract::parser::FieldParser;
use crate::extract::pdf::DocumentReader;
use crate::extract::validator::{self, Verdict};
use crate::models::portfolio::PortfolioRecord;

/// Statistics from one extraction batch.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BatchResult {
    /// Documents found in the inbox.
    pub documents_found: usize,
    /// Documents attempted, independent of outcome.
    pub documents_attempted: usize,
    /// Rows durably written to the store.
    pub records_upserted: usize,
    /// Parsed responses with no numeric field; not persisted.
    pub skipped_no_signal: usize,
    /// Text- or structured-extraction failures; document left in the inbox.
    pub failed_extraction: usize,
    /// Responses missing platform/advisor type; document moved anyway.
    pub failed_parse: usize,
    /// Store write failures; logged for manual replay.
    pub failed_store: usize,
}

/// Run the extraction batch: one document at a time, inbox to processed.
///
/// No per-document failure aborts the batch. A document is moved out of
/// the inbox only after its row (when accepted) is durably upserted, so an
/// interrupted run resumes safely from whatever is still in the inbox.
pub async fn run_batch(
    config: &Config,
    reader: &dyn DocumentReader,
    extractor: &dyn FeeExtractor,
) -> Result<BatchResult> {
    config.ensure_dirs()?;

    let db = Database::open(&config.db_path)?;
    let parser = FieldParser::new();

    let documents = list_inbox(config)?;
    let mut result = BatchResult {
        documents_found: documents.len(),
        ..BatchResult::default()
    };

    // Identity is run-local: position in this run's lexicographic inbox
    // order. Rerunning after the inbox changed reassigns ids.
    for (seq, path) in documents.iter().enumerate() {
        let portfolio_id = format!("RA_{seq:03}");
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        result.documents_attempted += 1;

        info!(document = %file_name, %portfolio_id, "processing");

        let text = match reader.read_text(path) {
            Ok(t) => t,
            Err(e) => {
                warn!(document = %file_name, error = %e, "text extraction failed, leaving in inbox");
                result.failed_extraction += 1;
                continue;
            }
        };

        let response = match extractor.extract_fee_structure(&text).await {
            Ok(r) => r,
            Err(e) => {
                warn!(document = %file_name, error = %e, "extraction service failed, leaving in inbox");
                result.failed_extraction += 1;
                continue;
            }
        };

        let candidate = match parser.parse(&response) {
            Ok(c) => c,
            Err(AdvError::IdentityMissing) => {
                warn!(document = %file_name, %portfolio_id, "response unusable: platform/advisor type missing");
                result.failed_parse += 1;
                move_to_processed(config, path, &file_name);
                continue;
            }
            Err(e) => return Err(e),
        };

        match validator::validate(&candidate) {
            Verdict::Accept => {}
            Verdict::Reject(reason) => {
                info!(document = %file_name, %portfolio_id, reason = reason.as_str(), "no extractable numeric data");
                result.skipped_no_signal += 1;
                move_to_processed(config, path, &file_name);
                continue;
            }
        }

        let record = PortfolioRecord::from_candidate(portfolio_id.clone(), candidate);
        if let Err(e) = db.upsert_portfolio(&record) {
            // Enough context to replay the row by hand.
            warn!(
                document = %file_name,
                %portfolio_id,
                platform = %record.platform_name,
                fields = %serde_json::to_string(&record).unwrap_or_default(),
                error = %e,
                "store write failed"
            );
            result.failed_store += 1;
            move_to_processed(config, path, &file_name);
            continue;
        }

        result.records_upserted += 1;
        move_to_processed(config, path, &file_name);
        info!(%portfolio_id, "record upserted");
    }

    info!(
        attempted = result.documents_attempted,
        upserted = result.records_upserted,
        "batch finished"
    );
    Ok(result)
}

/// Pending documents in lexicographic filename order.
fn list_inbox(config: &Config) -> Result<Vec<PathBuf>> {
    let mut documents = Vec::new();
    for entry in std::fs::read_dir(&config.inbox_dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if path.is_file() && is_pdf {
            documents.push(path);
        }
    }
    documents.sort();
    Ok(documents)
}

/// Move an attempted document out of the inbox. A failed move is logged,
/// not fatal: the worst case is a duplicate attempt on the next run.
fn move_to_processed(config: &Config, path: &PathBuf, file_name: &str) {
    let target = config.processed_dir.join(file_name);
    if let Err(e) = std::fs::rename(path, &target) {
        warn!(document = %file_name, error = %e, "failed to move document to processed");
    }
}
