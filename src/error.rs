use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdvError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document extraction failed for {path}: {detail}")]
    Extraction { path: String, detail: String },

    #[error("structured extraction service failed: {0}")]
    Service(String),

    #[error("response missing platform or advisor type")]
    IdentityMissing,

    #[error("market data error for {symbol}: {detail}")]
    MarketData { symbol: String, detail: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing expected columns: {0}")]
    MissingColumns(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AdvError>;
