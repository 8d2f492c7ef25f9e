// Command-line interface definitions and parsing for linksentry

use crate::config::CliConfig;
use crate::core::constants::{limits, output_formats, timeouts};
use crate::core::error::{LinkSentryError, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Files or directories to scan for links (directories are walked recursively)
    pub files: Vec<String>,

    /// Also scan standard input
    #[arg(long, help_heading = "Input")]
    pub stdin: bool,

    /// File extensions to scan inside directories (e.g., md,html,txt)
    #[arg(long, value_name = "EXTENSIONS", help_heading = "Input")]
    pub include: Option<String>,

    // Concurrency
    /// Maximum checks in flight across all hosts (default: 256)
    #[arg(long, value_name = "COUNT", help_heading = "Concurrency")]
    pub concurrency: Option<usize>,

    /// Maximum checks in flight against one host (default: 8)
    #[arg(long, value_name = "COUNT", help_heading = "Concurrency")]
    pub per_host: Option<usize>,

    // Timeouts
    /// Connection timeout in seconds (default: 10)
    #[arg(long, value_name = "SECONDS", help_heading = "Timeouts")]
    pub connect_timeout: Option<u64>,

    /// Total time budget per link in seconds, retries included (default: 30)
    #[arg(short = 't', long, value_name = "SECONDS", help_heading = "Timeouts")]
    pub timeout: Option<u64>,

    /// Abort the whole run after this many seconds
    #[arg(long, value_name = "SECONDS", help_heading = "Timeouts")]
    pub run_timeout: Option<u64>,

    // Retry & Redirects
    /// Redirects followed before giving up (default: 10)
    #[arg(long, value_name = "COUNT", help_heading = "Retry & Redirects")]
    pub max_redirects: Option<usize>,

    /// Retries for transient failures (default: 3)
    #[arg(long, value_name = "COUNT", help_heading = "Retry & Redirects")]
    pub retry: Option<u32>,

    /// Base backoff between retries in ms (default: 500)
    #[arg(long, value_name = "MS", help_heading = "Retry & Redirects")]
    pub backoff_base: Option<u64>,

    /// Random jitter added to each backoff in ms (default: 250)
    #[arg(long, value_name = "MS", help_heading = "Retry & Redirects")]
    pub backoff_jitter: Option<u64>,

    /// Skip HEAD requests and always probe with GET
    #[arg(long, help_heading = "Retry & Redirects")]
    pub get_only: bool,

    // Filtering & Classification
    /// URL patterns to exclude (regex)
    #[arg(long, value_name = "REGEX", help_heading = "Filtering & Classification")]
    pub exclude_pattern: Vec<String>,

    /// Edit distance at which a redirect target counts as a lookalike domain (0 disables)
    #[arg(long, value_name = "DISTANCE", help_heading = "Filtering & Classification")]
    pub squatting_distance: Option<usize>,

    /// Report redirects that leave the original registrable domain
    #[arg(long, help_heading = "Filtering & Classification")]
    pub flag_cross_domain: bool,

    // Output & Verbosity
    /// Suppress progress output
    #[arg(short = 'q', long, help_heading = "Output & Verbosity")]
    pub quiet: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long, help_heading = "Output & Verbosity")]
    pub verbose: bool,

    /// Output format
    #[arg(long, value_name = "FORMAT", value_parser = output_formats::ALL, help_heading = "Output & Verbosity")]
    pub format: Option<String>,

    /// List healthy links too
    #[arg(long, help_heading = "Output & Verbosity")]
    pub show_healthy: bool,

    /// Disable progress bars
    #[arg(long, help_heading = "Output & Verbosity")]
    pub no_progress: bool,

    // Network
    /// Custom User-Agent header
    #[arg(long, value_name = "AGENT", help_heading = "Network")]
    pub user_agent: Option<String>,

    /// HTTP/HTTPS proxy URL
    #[arg(long, value_name = "URL", help_heading = "Network")]
    pub proxy: Option<String>,

    // Configuration
    /// Use specific config file
    #[arg(long, value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Ignore config files
    #[arg(long, help_heading = "Configuration")]
    pub no_config: bool,
}

impl Cli {
    /// Whether any input was given at all
    pub fn has_input(&self) -> bool {
        self.stdin || !self.files.is_empty()
    }
}

/// Convert derive-based CLI arguments directly to CliConfig structure
pub fn cli_to_config(cli: &Cli) -> CliConfig {
    CliConfig {
        max_concurrency: cli.concurrency,
        max_per_host_concurrency: cli.per_host,
        connect_timeout: cli.connect_timeout,
        total_timeout: cli.timeout,
        run_timeout: cli.run_timeout,
        max_redirects: cli.max_redirects,
        retry_limit: cli.retry,
        backoff_base: cli.backoff_base,
        backoff_jitter: cli.backoff_jitter,
        get_only: cli.get_only,
        exclude_patterns: if cli.exclude_pattern.is_empty() {
            None
        } else {
            Some(cli.exclude_pattern.clone())
        },
        file_types: cli.include.as_deref().map(parse_file_types),
        squatting_distance: cli.squatting_distance,
        flag_cross_domain_redirects: cli.flag_cross_domain,
        quiet: cli.quiet,
        verbose: cli.verbose,
        show_healthy: cli.show_healthy,
        output_format: cli.format.clone(),
        no_progress: cli.no_progress,
        user_agent: cli.user_agent.clone(),
        proxy: cli.proxy.clone(),
        config_file: cli.config.clone(),
        no_config: cli.no_config,
    }
}

/// "md, .html,txt" -> ["md", "html", "txt"]
fn parse_file_types(include: &str) -> Vec<String> {
    include
        .split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_string())
        .collect()
}

/// Reject argument values that can never work, before any config is loaded
pub fn validate_cli_args(cli: &Cli) -> Result<()> {
    for (name, value) in [
        ("Timeout", cli.timeout),
        ("Connect timeout", cli.connect_timeout),
        ("Run timeout", cli.run_timeout),
    ] {
        if let Some(seconds) = value {
            if seconds == 0 {
                return Err(LinkSentryError::InvalidArgument(format!(
                    "{name} cannot be 0. Expected a positive integer representing seconds."
                )));
            }
            if seconds > timeouts::MAX_TIMEOUT_SECONDS {
                return Err(LinkSentryError::InvalidArgument(format!(
                    "{name} of {seconds} seconds exceeds the maximum of {} seconds.",
                    timeouts::MAX_TIMEOUT_SECONDS
                )));
            }
        }
    }

    for (name, value) in [("Concurrency", cli.concurrency), ("Per-host", cli.per_host)] {
        if value == Some(0) {
            return Err(LinkSentryError::InvalidArgument(format!(
                "{name} cannot be 0. Expected a positive integer."
            )));
        }
    }

    if let Some(retry) = cli.retry
        && retry > limits::MAX_RETRY_LIMIT
    {
        return Err(LinkSentryError::InvalidArgument(format!(
            "Retry count {retry} is too high. Expected at most {}.",
            limits::MAX_RETRY_LIMIT
        )));
    }

    Ok(())
}
