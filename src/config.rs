use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AdvError, Result};

/// Directory holding documents waiting for extraction.
const INBOX_DIR: &str = "inbox";
/// Directory holding documents that have been attempted.
const PROCESSED_DIR: &str = "processed";
/// Default database filename.
const DB_FILE: &str = "portfolio.db";
/// Config filename.
const CONFIG_FILE: &str = "config.toml";

/// Study-level configuration resolved from the data directory.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory of the study data.
    pub data_root: PathBuf,
    /// Path to the inbox of pending documents.
    pub inbox_dir: PathBuf,
    /// Path to the processed-documents directory.
    pub processed_dir: PathBuf,
    /// Path to the `SQLite` database.
    pub db_path: PathBuf,
    /// Path to the config file.
    pub config_path: PathBuf,
    /// User settings loaded from config.toml.
    pub settings: UserSettings,
}

/// User-configurable settings from config.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// Structured-extraction configuration.
    pub extraction: ExtractionSettings,
    /// Analysis configuration.
    pub analysis: AnalysisSettings,
}

/// Settings for the structured-extraction service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Chat-completion model used for fee extraction.
    pub model: String,
    /// Override for the API base URL (OpenAI-compatible endpoints).
    pub api_base: Option<String>,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4.1-mini".into(),
            api_base: None,
        }
    }
}

/// Settings for the performance analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Last trading date included in return windows (YYYY-MM-DD).
    pub end_date: String,
    /// Lookback windows in whole years.
    pub periods_years: Vec<u32>,
    /// Annual US 10Y yield per year, used as the risk-free rate.
    pub risk_free: BTreeMap<String, f64>,
    /// Minimum monthly observations required for a volatility estimate.
    pub min_monthly_observations: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        let risk_free = [
            ("2018", 0.0291),
            ("2019", 0.0214),
            ("2020", 0.0089),
            ("2021", 0.0145),
            ("2022", 0.0339),
            ("2023", 0.0388),
            ("2024", 0.0410),
        ]
        .into_iter()
        .map(|(y, r)| (y.to_string(), r))
        .collect();

        Self {
            end_date: "2024-12-31".into(),
            periods_years: vec![1, 3, 7],
            risk_free,
            min_monthly_observations: 10,
        }
    }
}

impl Config {
    /// Create config for a given data root.
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        let data_root = data_root.into();
        let inbox_dir = data_root.join(INBOX_DIR);
        let processed_dir = data_root.join(PROCESSED_DIR);
        let db_path = data_root.join(DB_FILE);
        let config_path = data_root.join(CONFIG_FILE);

        let settings = Self::load_settings(&config_path).unwrap_or_default();

        Self {
            data_root,
            inbox_dir,
            processed_dir,
            db_path,
            config_path,
            settings,
        }
    }

    /// Create config from the current working directory.
    pub fn from_cwd() -> Result<Self> {
        let cwd =
            std::env::current_dir().map_err(|e| AdvError::Config(format!("cannot get cwd: {e}")))?;
        Ok(Self::new(cwd))
    }

    /// Load settings from config.toml if it exists.
    fn load_settings(config_path: &Path) -> Option<UserSettings> {
        if !config_path.exists() {
            return None;
        }
        let content = std::fs::read_to_string(config_path).ok()?;
        toml::from_str(&content).ok()
    }

    /// Save current settings to config.toml.
    pub fn save_settings(&self) -> Result<()> {
        let content = toml::to_string_pretty(&self.settings)
            .map_err(|e| AdvError::Config(format!("failed to serialize settings: {e}")))?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Ensure the inbox and processed directories exist.
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.inbox_dir)?;
        std::fs::create_dir_all(&self.processed_dir)?;
        Ok(())
    }

    /// Risk-free rate averaged over the last `years` calendar years
    /// ending with `end_year`. Years missing from the table are skipped.
    #[must_use]
    pub fn average_risk_free(&self, end_year: i32, years: u32) -> Option<f64> {
        let start_year = end_year - years as i32 + 1;
        let rates: Vec<f64> = (start_year..=end_year)
            .filter_map(|y| self.settings.analysis.risk_free.get(&y.to_string()).copied())
            .collect();
        if rates.is_empty() {
            return None;
        }
        Some(rates.iter().sum::<f64>() / rates.len() as f64)
    }
}
