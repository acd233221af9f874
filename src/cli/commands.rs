use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "advpipe",
    version,
    about = "Form ADV fee extraction and advisor cost/performance analysis",
    after_help = "The data directory (default: cwd) holds inbox/, processed/, portfolio.db \
                  and config.toml. Extraction needs OPENAI_API_KEY in the environment or a \
                  .env file."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Extract fee structures from every PDF in inbox/ into the store.
    ///
    /// Documents are processed one at a time in filename order. A document
    /// whose extraction service call fails stays in the inbox for the next
    /// run; everything else moves to processed/ once attempted.
    Extract {
        /// Data directory (default: current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Import a manually reviewed CSV into the store (upsert by portfolio_id)
    Import {
        /// Reviewed CSV file
        csv: String,
    },

    /// Export the portfolios table to CSV
    Export {
        /// Output file
        #[arg(short, long, default_value = "portfolios_export.csv")]
        output: String,
        /// Only rows not flagged as excluded
        #[arg(long)]
        included_only: bool,
    },

    /// Compare cost variables between advisor groups (Mann-Whitney U)
    Costs {
        /// Directory to write cost_summary.csv and cost_tests.csv into
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Download adjusted-close history and month-end returns for tickers
    Download {
        /// Comma-separated ticker list
        #[arg(short, long, value_delimiter = ',', required = true)]
        tickers: Vec<String>,
        /// First date of the window (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// Last date of the window (YYYY-MM-DD)
        #[arg(long)]
        end: String,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: String,
        /// Filename prefix, e.g. "traditional" or "automated"
        #[arg(long, default_value = "market")]
        prefix: String,
    },

    /// Compute annualized period returns from a prices CSV
    Returns {
        /// Wide prices CSV (Date column plus one column per ticker)
        prices: String,
        /// Output CSV
        #[arg(short, long)]
        output: String,
    },

    /// Compute volatility and Sharpe ratios per ticker and period
    PerfStats {
        /// Month-end returns CSV
        monthly: String,
        /// Annualized returns CSV
        annual: String,
        /// Output CSV
        #[arg(short, long)]
        output: String,
    },

    /// Merge traditional and automated performance tables
    Combine {
        /// Traditional performance stats CSV
        traditional: String,
        /// Automated performance stats CSV (fractional returns/volatility)
        automated: String,
        /// Output CSV
        #[arg(short, long)]
        output: String,
    },

    /// Welch's t-test between advisor groups for each performance metric
    Compare {
        /// Combined performance CSV
        combined: String,
        /// Optional output CSV
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Fetch fund names and types into the store
    Funds {
        /// Comma-separated ticker list
        #[arg(short, long, value_delimiter = ',', required = true)]
        tickers: Vec<String>,
    },

    /// Show store statistics (row counts by advisor type and exclusion)
    Stats,
}
