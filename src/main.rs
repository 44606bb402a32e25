//! cws-lister main entry point
//!
//! This is the command-line interface for the Chrome Web Store catalog lister.

use anyhow::Context;
use clap::Parser;
use cws_lister::config::{load_config_with_hash, validate, Config};
use cws_lister::crawler::run_with_hash;
use cws_lister::output::{
    append_github_outputs, github_output_path, load_previous, log_report, write_markdown_summary,
    write_report, write_snapshot, RunReport,
};
use cws_lister::{ConfigError, ConfigResult, ListerError, SnapshotDiff};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const EXIT_ABORTED: u8 = 2;
const EXIT_PARTIAL: u8 = 3;

/// cws-lister: builds a catalog of every public Chrome Web Store item
///
/// Enumerates the store's sitemap and listing pages, resolves each item's
/// detail page, and writes one sorted, de-duplicated JSON snapshot. The
/// previous snapshot is left untouched when a run aborts.
#[derive(Parser, Debug)]
#[command(name = "cws-lister")]
#[command(version)]
#[command(about = "Chrome Web Store catalog lister", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults target the public store)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Catalog artifact path; `.json` is appended when missing
    #[arg(short, long, env = "OUTPUT_FILE")]
    output: Option<String>,

    /// Previous snapshot to diff against (defaults to the output path)
    #[arg(long)]
    previous: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT")]
    timeout: Option<u64>,

    /// Minimum delay between requests to the same host, in seconds
    #[arg(long, env = "REQUEST_DELAY")]
    delay: Option<f64>,

    /// Maximum number of requests in flight
    #[arg(long, env = "MAX_WORKERS")]
    max_workers: Option<u32>,

    /// Retries for transient failures
    #[arg(long, env = "RETRY_ATTEMPTS")]
    retry_attempts: Option<u32>,

    /// Stop dispatching new work after this many seconds
    #[arg(long, value_name = "SECS")]
    deadline: Option<u64>,

    /// Abort when failed items reach this fraction of attempted items
    #[arg(long)]
    failure_threshold: Option<f64>,

    /// Write the JSON run report here
    #[arg(long)]
    report: Option<String>,

    /// Write a markdown run summary here
    #[arg(long)]
    summary: Option<String>,

    /// Publish the snapshot even if the deadline cut the run short
    #[arg(long)]
    allow_partial: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("cws_lister=info,warn"),
            1 => EnvFilter::new("cws_lister=debug,info"),
            2 => EnvFilter::new("cws_lister=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);

    // CI logs carry their own timestamps
    if std::env::var("GITHUB_ACTIONS").ok().as_deref() == Some("true") {
        builder.without_time().init();
    } else {
        builder.init();
    }
}

async fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let (config, config_hash) = load_effective_config(&cli)?;

    if cli.dry_run {
        print_dry_run(&config);
        return Ok(ExitCode::SUCCESS);
    }

    let previous_path = PathBuf::from(config.output.previous());
    let previous = load_previous(&previous_path)
        .map_err(ListerError::from)
        .with_context(|| format!("failed to load previous snapshot {}", previous_path.display()))?;

    tracing::info!(
        "Seeds: {}, workers: {}, output: {}",
        config.seeds.len(),
        config.fetcher.max_concurrency,
        config.output.data_path
    );

    let outcome = match run_with_hash(&config, previous, config_hash).await {
        Ok(outcome) => outcome,
        Err(aborted) => {
            log_report(&aborted.report);
            tracing::error!(
                "{}; {} left untouched",
                aborted,
                config.output.data_path
            );
            publish_reports(&config, &aborted.report, None, 0)?;
            return Ok(ExitCode::from(EXIT_ABORTED));
        }
    };

    log_report(&outcome.report);

    if outcome.snapshot.partial && !cli.allow_partial {
        tracing::warn!(
            "Snapshot is partial ({} entries); not publishing without --allow-partial",
            outcome.snapshot.len()
        );
        publish_reports(&config, &outcome.report, outcome.diff.as_ref(), 0)?;
        return Ok(ExitCode::from(EXIT_PARTIAL));
    }

    let data_path = Path::new(&config.output.data_path);
    write_snapshot(&outcome.snapshot, data_path)
        .with_context(|| format!("failed to write {}", data_path.display()))?;

    publish_reports(
        &config,
        &outcome.report,
        outcome.diff.as_ref(),
        outcome.snapshot.len(),
    )?;

    Ok(ExitCode::SUCCESS)
}

/// Loads the config file if one was given, then applies overrides and validates
fn load_effective_config(cli: &Cli) -> cws_lister::Result<(Config, Option<String>)> {
    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            (Config::default(), None)
        }
    };

    apply_overrides(&mut config, cli)?;
    validate(&config)?;
    Ok((config, config_hash))
}

/// Applies command-line and environment overrides on top of the file config
fn apply_overrides(config: &mut Config, cli: &Cli) -> ConfigResult<()> {
    if let Some(output) = &cli.output {
        config.output.data_path = output.clone();
    }
    config.output.data_path = with_json_extension(&config.output.data_path);

    if let Some(previous) = &cli.previous {
        config.output.previous_path = Some(previous.clone());
    }
    if let Some(report) = &cli.report {
        config.output.report_path = Some(report.clone());
    }
    if let Some(summary) = &cli.summary {
        config.output.summary_path = Some(summary.clone());
    }
    if let Some(timeout) = cli.timeout {
        config.fetcher.timeout_ms = timeout.saturating_mul(1000);
    }
    if let Some(delay) = cli.delay {
        if !delay.is_finite() || delay < 0.0 {
            return Err(ConfigError::Validation(format!(
                "--delay must be a non-negative number of seconds, got {}",
                delay
            )));
        }
        config.fetcher.min_interval_ms = (delay * 1000.0).round() as u64;
    }
    if let Some(workers) = cli.max_workers {
        config.fetcher.max_concurrency = workers;
    }
    if let Some(retries) = cli.retry_attempts {
        config.fetcher.max_retries = retries;
    }
    if let Some(deadline) = cli.deadline {
        config.run.deadline_secs = deadline;
    }
    if let Some(threshold) = cli.failure_threshold {
        config.run.failure_threshold = threshold;
    }

    Ok(())
}

/// Appends `.json` to paths that lack that extension
fn with_json_extension(path: &str) -> String {
    let has_json = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if has_json {
        path.to_string()
    } else {
        format!("{}.json", path)
    }
}

/// Writes the report, the markdown summary and the step outputs that are configured
fn publish_reports(
    config: &Config,
    report: &RunReport,
    diff: Option<&SnapshotDiff>,
    items_count: usize,
) -> anyhow::Result<()> {
    if let Some(path) = &config.output.report_path {
        write_report(report, Path::new(path))
            .with_context(|| format!("failed to write report {}", path))?;
        tracing::info!("Report written to {}", path);
    }

    if let Some(path) = &config.output.summary_path {
        write_markdown_summary(report, diff, Path::new(path))
            .with_context(|| format!("failed to write summary {}", path))?;
        tracing::info!("Summary written to {}", path);
    }

    if let Some(path) = github_output_path() {
        append_github_outputs(&path, report, items_count, &config.output.data_path)
            .with_context(|| format!("failed to append step outputs to {}", path.display()))?;
    }

    Ok(())
}

/// Handles the --dry-run mode: shows the effective configuration
fn print_dry_run(config: &Config) {
    println!("=== cws-lister Dry Run ===\n");

    println!("Fetcher:");
    println!("  Max concurrency: {}", config.fetcher.max_concurrency);
    println!("  Min interval: {}ms", config.fetcher.min_interval_ms);
    println!("  Timeout: {}ms", config.fetcher.timeout_ms);
    println!(
        "  Retries: {} (backoff {}ms..{}ms)",
        config.fetcher.max_retries, config.fetcher.backoff_base_ms, config.fetcher.backoff_max_ms
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nStore:");
    println!("  Base URL: {}", config.store.base_url);
    println!("  Download template: {}", config.store.download_url_template);

    println!("\nRun:");
    println!("  Failure threshold: {}", config.run.failure_threshold);
    if config.run.deadline_secs > 0 {
        println!("  Deadline: {}s", config.run.deadline_secs);
    } else {
        println!("  Deadline: none");
    }

    println!("\nOutput:");
    println!("  Data: {}", config.output.data_path);
    println!("  Previous: {}", config.output.previous());
    if let Some(report) = &config.output.report_path {
        println!("  Report: {}", report);
    }
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  - {}", seed.url);
    }

    println!("\n✓ Configuration is valid");
}
