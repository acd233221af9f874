// Inherit lint configuration from lib.rs for consistency
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::items_after_statements,
    clippy::too_many_lines,
    clippy::similar_names,
    clippy::needless_pass_by_value
)]

use std::path::Path;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use advpipe::analysis::performance::{
    annualized_returns, compare_groups, combine_groups, performance_stats, write_comparison_csv,
    AnnualReturns, PerformanceTable, SeriesTable,
};
use advpipe::analysis::costs::run_cost_analysis;
use advpipe::cli::commands::{Cli, Command};
use advpipe::cli::output;
use advpipe::config::Config;
use advpipe::db::Database;
use advpipe::extract::batch::run_batch;
use advpipe::extract::llm::OpenAiExtractor;
use advpipe::extract::pdf::PdfReader;
use advpipe::market;
use advpipe::report;

fn main() {
    // Results go to stdout; logs stay on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::fmt::Display>> {
    match cli.command {
        Command::Extract { path } => cmd_extract(&path),
        Command::Import { csv } => cmd_import(&csv),
        Command::Export {
            output,
            included_only,
        } => cmd_export(&output, included_only),
        Command::Costs { output } => cmd_costs(output.as_deref()),
        Command::Download {
            tickers,
            start,
            end,
            output,
            prefix,
        } => cmd_download(&tickers, &start, &end, &output, &prefix),
        Command::Returns { prices, output } => cmd_returns(&prices, &output),
        Command::PerfStats {
            monthly,
            annual,
            output,
        } => cmd_perf_stats(&monthly, &annual, &output),
        Command::Combine {
            traditional,
            automated,
            output,
        } => cmd_combine(&traditional, &automated, &output),
        Command::Compare { combined, output } => cmd_compare(&combined, output.as_deref()),
        Command::Funds { tickers } => cmd_funds(&tickers),
        Command::Stats => cmd_stats(),
    }
}

type CmdResult = Result<(), Box<dyn std::fmt::Display>>;

fn map_err(e: impl std::fmt::Display + 'static) -> Box<dyn std::fmt::Display> {
    Box::new(e.to_string())
}

fn get_config() -> Result<Config, Box<dyn std::fmt::Display>> {
    Config::from_cwd().map_err(map_err)
}

fn get_db(config: &Config) -> Result<Database, Box<dyn std::fmt::Display>> {
    Database::open(&config.db_path).map_err(map_err)
}

fn runtime() -> Result<tokio::runtime::Runtime, Box<dyn std::fmt::Display>> {
    tokio::runtime::Runtime::new().map_err(map_err)
}

fn parse_date(raw: &str) -> Result<chrono::NaiveDate, Box<dyn std::fmt::Display>> {
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| map_err(format!("invalid date {raw}: {e}")))
}

fn cmd_extract(path: &str) -> CmdResult {
    let config = if path == "." {
        get_config()?
    } else {
        Config::new(path)
    };

    let extractor = OpenAiExtractor::from_env(&config.settings.extraction).map_err(map_err)?;
    let reader = PdfReader::new();

    let rt = runtime()?;
    let result = rt
        .block_on(run_batch(&config, &reader, &extractor))
        .map_err(map_err)?;
    println!("{}", output::format_json(&result));
    Ok(())
}

fn cmd_import(csv: &str) -> CmdResult {
    let config = get_config()?;
    let db = get_db(&config)?;
    let result = report::import_reviewed_csv(&db, Path::new(csv)).map_err(map_err)?;
    println!("{}", output::format_json(&result));
    Ok(())
}

fn cmd_export(output_path: &str, included_only: bool) -> CmdResult {
    let config = get_config()?;
    let db = get_db(&config)?;
    let rows = report::export_portfolios_csv(&db, Path::new(output_path), included_only)
        .map_err(map_err)?;

    #[derive(serde::Serialize)]
    struct ExportOutput<'a> {
        file: &'a str,
        rows: usize,
    }
    println!(
        "{}",
        output::format_json(&ExportOutput {
            file: output_path,
            rows,
        })
    );
    Ok(())
}

fn cmd_costs(output_dir: Option<&str>) -> CmdResult {
    let config = get_config()?;
    let db = get_db(&config)?;
    let report_data = run_cost_analysis(&db).map_err(map_err)?;
    if let Some(dir) = output_dir {
        report::write_cost_report_csv(&report_data, Path::new(dir)).map_err(map_err)?;
    }
    println!("{}", output::format_json(&report_data));
    Ok(())
}

fn cmd_download(tickers: &[String], start: &str, end: &str, output_dir: &str, prefix: &str) -> CmdResult {
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    std::fs::create_dir_all(output_dir).map_err(map_err)?;

    let rt = runtime()?;
    let download = rt
        .block_on(market::download_price_history(tickers, start, end))
        .map_err(map_err)?;

    let prices_path = Path::new(output_dir).join(format!("{prefix}_prices.csv"));
    let returns_path = Path::new(output_dir).join(format!("{prefix}_monthly_returns.csv"));
    download.prices.write_csv(&prices_path).map_err(map_err)?;
    download
        .prices
        .monthly_returns()
        .write_csv(&returns_path)
        .map_err(map_err)?;

    #[derive(serde::Serialize)]
    struct DownloadOutput {
        tickers: usize,
        missing: Vec<String>,
        rows: usize,
        prices_file: String,
        returns_file: String,
    }
    println!(
        "{}",
        output::format_json(&DownloadOutput {
            tickers: download.prices.tickers.len(),
            missing: download.missing,
            rows: download.prices.dates.len(),
            prices_file: prices_path.display().to_string(),
            returns_file: returns_path.display().to_string(),
        })
    );
    Ok(())
}

fn cmd_returns(prices: &str, output_path: &str) -> CmdResult {
    let config = get_config()?;
    let end_date = parse_date(&config.settings.analysis.end_date)?;

    let table = SeriesTable::read_csv(Path::new(prices)).map_err(map_err)?;
    let returns = annualized_returns(&table, end_date, &config.settings.analysis.periods_years);
    returns.write_csv(Path::new(output_path)).map_err(map_err)?;

    #[derive(serde::Serialize)]
    struct ReturnsOutput<'a> {
        file: &'a str,
        tickers: usize,
        periods: &'a [String],
    }
    println!(
        "{}",
        output::format_json(&ReturnsOutput {
            file: output_path,
            tickers: returns.rows.len(),
            periods: &returns.periods,
        })
    );
    Ok(())
}

fn cmd_perf_stats(monthly: &str, annual: &str, output_path: &str) -> CmdResult {
    let config = get_config()?;
    let monthly_table = SeriesTable::read_csv(Path::new(monthly)).map_err(map_err)?;
    let annual_table = AnnualReturns::read_csv(Path::new(annual)).map_err(map_err)?;

    let stats = performance_stats(&monthly_table, &annual_table, &config).map_err(map_err)?;
    stats.write_csv(Path::new(output_path)).map_err(map_err)?;

    #[derive(serde::Serialize)]
    struct PerfStatsOutput<'a> {
        file: &'a str,
        tickers: usize,
        metrics: &'a [String],
    }
    println!(
        "{}",
        output::format_json(&PerfStatsOutput {
            file: output_path,
            tickers: stats.rows.len(),
            metrics: &stats.metric_labels,
        })
    );
    Ok(())
}

fn cmd_combine(traditional: &str, automated: &str, output_path: &str) -> CmdResult {
    let config = get_config()?;
    let db = get_db(&config)?;

    let traditional_table = PerformanceTable::read_csv(Path::new(traditional)).map_err(map_err)?;
    let automated_table = PerformanceTable::read_csv(Path::new(automated)).map_err(map_err)?;
    let names = db.fund_name_map().map_err(map_err)?;

    let combined = combine_groups(&traditional_table, &automated_table, &names);
    combined.write_csv(Path::new(output_path)).map_err(map_err)?;

    #[derive(serde::Serialize)]
    struct CombineOutput<'a> {
        file: &'a str,
        rows: usize,
    }
    println!(
        "{}",
        output::format_json(&CombineOutput {
            file: output_path,
            rows: combined.rows.len(),
        })
    );
    Ok(())
}

fn cmd_compare(combined: &str, output_path: Option<&str>) -> CmdResult {
    let table = PerformanceTable::read_csv(Path::new(combined)).map_err(map_err)?;
    let comparisons = compare_groups(&table);
    if let Some(path) = output_path {
        write_comparison_csv(Path::new(path), &comparisons).map_err(map_err)?;
    }
    println!("{}", output::format_json(&comparisons));
    Ok(())
}

fn cmd_funds(tickers: &[String]) -> CmdResult {
    let config = get_config()?;
    let db = get_db(&config)?;

    let rt = runtime()?;
    let summaries = rt
        .block_on(market::fetch_fund_summaries(tickers))
        .map_err(map_err)?;
    for summary in &summaries {
        db.upsert_fund_summary(summary).map_err(map_err)?;
    }

    #[derive(serde::Serialize)]
    struct FundsOutput {
        fetched: usize,
        resolved: usize,
    }
    println!(
        "{}",
        output::format_json(&FundsOutput {
            fetched: summaries.len(),
            resolved: summaries.iter().filter(|s| s.name.is_some()).count(),
        })
    );
    Ok(())
}

fn cmd_stats() -> CmdResult {
    let config = get_config()?;
    let db = get_db(&config)?;
    let stats = db.stats().map_err(map_err)?;
    println!("{}", output::format_json(&stats));
    Ok(())
}
