//! Configuration management
//!
//! This module handles loading and managing configuration from
//! TOML files and CLI arguments.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::core::constants::{defaults, limits, output_formats, timeouts};
use crate::core::error::{LinkSentryError, Result};

/// Name of the configuration file looked up in standard locations
pub const CONFIG_FILE_NAME: &str = ".linksentry.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global ceiling of in-flight checks
    pub max_concurrency: Option<usize>,

    /// Ceiling of in-flight checks against a single host
    pub max_per_host_concurrency: Option<usize>,

    /// Per-attempt connect timeout in seconds
    pub connect_timeout: Option<u64>,

    /// End-to-end timeout for one check in seconds, retries included
    pub total_timeout: Option<u64>,

    /// Redirect hops followed before giving up
    pub max_redirects: Option<usize>,

    /// Retries after the first attempt for transient failures
    pub retry_limit: Option<u32>,

    /// Base delay for exponential backoff in milliseconds
    pub backoff_base: Option<u64>,

    /// Upper bound of random jitter added to each backoff in milliseconds
    pub backoff_jitter: Option<u64>,

    /// Cap for a single backoff delay in milliseconds
    pub backoff_max: Option<u64>,

    /// How long a check may wait for a host slot before it is reported as rate limited, in seconds
    pub host_wait_limit: Option<u64>,

    /// Cancel the whole run after this many seconds
    pub run_timeout: Option<u64>,

    /// Use HEAD first and fall back to a ranged GET
    pub use_head_requests: Option<bool>,

    /// Custom User-Agent header
    pub user_agent: Option<String>,

    /// HTTP/HTTPS proxy URL
    pub proxy: Option<String>,

    /// Raw URL patterns to skip (regex)
    pub exclude_patterns: Option<Vec<String>>,

    /// File extensions scanned inside directory arguments (e.g. md, html)
    pub file_types: Option<Vec<String>>,

    /// Registrable domains within this edit distance are flagged as look-alikes
    pub squatting_distance: Option<usize>,

    /// Flag every redirect to another registrable domain as a hijack
    pub flag_cross_domain_redirects: Option<bool>,

    /// Output format (text, json)
    pub output_format: Option<String>,

    /// Include healthy links in text output
    pub show_healthy: Option<bool>,

    /// Enable verbose logging
    pub verbose: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrency: Some(defaults::MAX_CONCURRENCY),
            max_per_host_concurrency: Some(defaults::MAX_PER_HOST_CONCURRENCY),
            connect_timeout: Some(timeouts::DEFAULT_CONNECT_TIMEOUT_SECONDS),
            total_timeout: Some(timeouts::DEFAULT_TOTAL_TIMEOUT_SECONDS),
            max_redirects: Some(defaults::MAX_REDIRECTS),
            retry_limit: Some(defaults::RETRY_LIMIT),
            backoff_base: Some(timeouts::DEFAULT_BACKOFF_BASE_MS),
            backoff_jitter: Some(timeouts::DEFAULT_BACKOFF_JITTER_MS),
            backoff_max: Some(timeouts::DEFAULT_BACKOFF_MAX_MS),
            host_wait_limit: Some(timeouts::DEFAULT_HOST_WAIT_LIMIT_SECONDS),
            run_timeout: None, // No run-level deadline by default
            use_head_requests: Some(defaults::USE_HEAD_REQUESTS),
            user_agent: None,
            proxy: None,
            exclude_patterns: None,
            file_types: None, // Every file with an extension
            squatting_distance: Some(defaults::SQUATTING_DISTANCE),
            flag_cross_domain_redirects: Some(false),
            output_format: Some(output_formats::DEFAULT.to_string()),
            show_healthy: Some(false),
            verbose: Some(false),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults for missing keys
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            LinkSentryError::Config(format!(
                "Could not read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            LinkSentryError::Config(format!(
                "Invalid TOML in config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Try to find and load a config file in standard locations.
    ///
    /// Files that exist but fail to load are skipped; their errors are
    /// returned alongside the config so the caller can report them once
    /// logging is up.
    pub fn load_from_standard_locations() -> (Self, Vec<LinkSentryError>) {
        // Current directory, then parent directories up to 3 levels
        let candidates: Vec<String> = (0..=3)
            .map(|i| format!("{}{CONFIG_FILE_NAME}", "../".repeat(i)))
            .collect();
        Self::load_first_valid(&candidates)
    }

    fn load_first_valid<P: AsRef<Path>>(candidates: &[P]) -> (Self, Vec<LinkSentryError>) {
        let mut skipped = Vec::new();
        for path in candidates {
            let path = path.as_ref();
            if !path.is_file() {
                continue;
            }
            match Self::load_from_file(path) {
                Ok(config) => return (config, skipped),
                Err(e) => skipped.push(e),
            }
        }

        (Self::default(), skipped)
    }

    /// Merge this config with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli_config: &CliConfig) {
        // Concurrency
        if let Some(max_concurrency) = cli_config.max_concurrency {
            self.max_concurrency = Some(max_concurrency);
        }
        if let Some(per_host) = cli_config.max_per_host_concurrency {
            self.max_per_host_concurrency = Some(per_host);
        }

        // Timeouts
        if let Some(connect_timeout) = cli_config.connect_timeout {
            self.connect_timeout = Some(connect_timeout);
        }
        if let Some(total_timeout) = cli_config.total_timeout {
            self.total_timeout = Some(total_timeout);
        }
        if let Some(run_timeout) = cli_config.run_timeout {
            self.run_timeout = Some(run_timeout);
        }

        // Retry & redirects
        if let Some(max_redirects) = cli_config.max_redirects {
            self.max_redirects = Some(max_redirects);
        }
        if let Some(retry_limit) = cli_config.retry_limit {
            self.retry_limit = Some(retry_limit);
        }
        if let Some(backoff_base) = cli_config.backoff_base {
            self.backoff_base = Some(backoff_base);
        }
        if let Some(backoff_jitter) = cli_config.backoff_jitter {
            self.backoff_jitter = Some(backoff_jitter);
        }
        if cli_config.get_only {
            self.use_head_requests = Some(false);
        }

        // Filtering & classification
        if let Some(ref exclude_patterns) = cli_config.exclude_patterns {
            self.exclude_patterns = Some(exclude_patterns.clone());
        }
        if let Some(ref file_types) = cli_config.file_types {
            self.file_types = Some(file_types.clone());
        }
        if let Some(distance) = cli_config.squatting_distance {
            self.squatting_distance = Some(distance);
        }
        if cli_config.flag_cross_domain_redirects {
            self.flag_cross_domain_redirects = Some(true);
        }

        // Output
        if cli_config.verbose {
            self.verbose = Some(true);
        }
        if cli_config.show_healthy {
            self.show_healthy = Some(true);
        }
        if let Some(ref output_format) = cli_config.output_format {
            self.output_format = Some(output_format.clone());
        }

        // Network
        if let Some(ref user_agent) = cli_config.user_agent {
            self.user_agent = Some(user_agent.clone());
        }
        if let Some(ref proxy) = cli_config.proxy {
            self.proxy = Some(proxy.clone());
        }
    }

    /// Compile exclude patterns into regex objects
    pub fn compile_exclude_patterns(&self) -> Result<Vec<Regex>> {
        let mut compiled = Vec::new();
        if let Some(ref patterns) = self.exclude_patterns {
            for pattern in patterns {
                compiled.push(Regex::new(pattern)?);
            }
        }
        Ok(compiled)
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or(defaults::MAX_CONCURRENCY)
    }

    pub fn max_per_host_concurrency(&self) -> usize {
        self.max_per_host_concurrency
            .unwrap_or(defaults::MAX_PER_HOST_CONCURRENCY)
    }

    pub fn max_redirects(&self) -> usize {
        self.max_redirects.unwrap_or(defaults::MAX_REDIRECTS)
    }

    pub fn retry_limit(&self) -> u32 {
        self.retry_limit.unwrap_or(defaults::RETRY_LIMIT)
    }

    pub fn squatting_distance(&self) -> usize {
        self.squatting_distance
            .unwrap_or(defaults::SQUATTING_DISTANCE)
    }

    /// Get connect timeout as Duration
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(
            self.connect_timeout
                .unwrap_or(timeouts::DEFAULT_CONNECT_TIMEOUT_SECONDS),
        )
    }

    /// Get total per-check timeout as Duration
    pub fn total_timeout_duration(&self) -> Duration {
        Duration::from_secs(
            self.total_timeout
                .unwrap_or(timeouts::DEFAULT_TOTAL_TIMEOUT_SECONDS),
        )
    }

    /// Get backoff base as Duration
    pub fn backoff_base_duration(&self) -> Duration {
        Duration::from_millis(self.backoff_base.unwrap_or(timeouts::DEFAULT_BACKOFF_BASE_MS))
    }

    /// Get backoff jitter bound as Duration
    pub fn backoff_jitter_duration(&self) -> Duration {
        Duration::from_millis(
            self.backoff_jitter
                .unwrap_or(timeouts::DEFAULT_BACKOFF_JITTER_MS),
        )
    }

    /// Get backoff cap as Duration
    pub fn backoff_max_duration(&self) -> Duration {
        Duration::from_millis(self.backoff_max.unwrap_or(timeouts::DEFAULT_BACKOFF_MAX_MS))
    }

    /// Get host wait bound as Duration
    pub fn host_wait_limit_duration(&self) -> Duration {
        Duration::from_secs(
            self.host_wait_limit
                .unwrap_or(timeouts::DEFAULT_HOST_WAIT_LIMIT_SECONDS),
        )
    }

    /// Get the run deadline as Duration, if any
    pub fn run_timeout_duration(&self) -> Option<Duration> {
        self.run_timeout.map(Duration::from_secs)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let max_concurrency = self.max_concurrency();
        if max_concurrency == 0 {
            return Err(LinkSentryError::Config(
                "max_concurrency cannot be 0. Expected a positive integer.".to_string(),
            ));
        }
        if max_concurrency > limits::MAX_CONCURRENCY_CEILING {
            return Err(LinkSentryError::Config(format!(
                "max_concurrency of {max_concurrency} exceeds the ceiling of {}.",
                limits::MAX_CONCURRENCY_CEILING
            )));
        }

        let per_host = self.max_per_host_concurrency();
        if per_host == 0 {
            return Err(LinkSentryError::Config(
                "max_per_host_concurrency cannot be 0. Expected a positive integer.".to_string(),
            ));
        }
        if per_host > max_concurrency {
            return Err(LinkSentryError::Config(format!(
                "max_per_host_concurrency ({per_host}) cannot exceed max_concurrency ({max_concurrency})."
            )));
        }

        for (name, value) in [
            ("connect_timeout", self.connect_timeout),
            ("total_timeout", self.total_timeout),
            ("host_wait_limit", self.host_wait_limit),
            ("run_timeout", self.run_timeout),
        ] {
            if let Some(seconds) = value {
                if seconds == 0 {
                    return Err(LinkSentryError::Config(format!(
                        "{name} cannot be 0. Expected a positive integer representing seconds."
                    )));
                }
                if seconds > timeouts::MAX_TIMEOUT_SECONDS {
                    return Err(LinkSentryError::Config(format!(
                        "{name} of {seconds} seconds is extremely large (>24 hours). Consider using a smaller value."
                    )));
                }
            }
        }

        if self.connect_timeout_duration() > self.total_timeout_duration() {
            return Err(LinkSentryError::Config(format!(
                "connect_timeout ({}s) cannot exceed total_timeout ({}s).",
                self.connect_timeout_duration().as_secs(),
                self.total_timeout_duration().as_secs()
            )));
        }

        let retry_limit = self.retry_limit();
        if retry_limit > limits::MAX_RETRY_LIMIT {
            return Err(LinkSentryError::Config(format!(
                "retry_limit of {retry_limit} is very high and may cause long delays. Expected at most {}.",
                limits::MAX_RETRY_LIMIT
            )));
        }

        let max_redirects = self.max_redirects();
        if max_redirects > limits::MAX_REDIRECTS_CEILING {
            return Err(LinkSentryError::Config(format!(
                "max_redirects of {max_redirects} exceeds the ceiling of {}.",
                limits::MAX_REDIRECTS_CEILING
            )));
        }

        if self.backoff_base_duration() > self.backoff_max_duration() {
            return Err(LinkSentryError::Config(
                "backoff_base cannot exceed backoff_max.".to_string(),
            ));
        }

        let distance = self.squatting_distance();
        if distance > limits::MAX_SQUATTING_DISTANCE {
            return Err(LinkSentryError::Config(format!(
                "squatting_distance of {distance} would flag unrelated domains. Expected at most {}.",
                limits::MAX_SQUATTING_DISTANCE
            )));
        }

        if let Some(ref format) = self.output_format
            && !output_formats::ALL.contains(&format.as_str())
        {
            return Err(LinkSentryError::Config(format!(
                "Invalid output format '{format}'. Expected one of: {}.",
                output_formats::ALL.join(", ")
            )));
        }

        if let Some(ref proxy) = self.proxy
            && url::Url::parse(proxy).is_err()
        {
            return Err(LinkSentryError::Config(format!(
                "Proxy '{proxy}' is not a valid URL."
            )));
        }

        // Validate exclude patterns by trying to compile them
        self.compile_exclude_patterns()?;

        Ok(())
    }
}

/// Configuration options that can come from CLI
#[derive(Debug, Default)]
pub struct CliConfig {
    // Concurrency
    pub max_concurrency: Option<usize>,          // --concurrency
    pub max_per_host_concurrency: Option<usize>, // --per-host

    // Timeouts
    pub connect_timeout: Option<u64>, // --connect-timeout
    pub total_timeout: Option<u64>,   // --timeout
    pub run_timeout: Option<u64>,     // --run-timeout

    // Retry & redirects
    pub max_redirects: Option<usize>, // --max-redirects
    pub retry_limit: Option<u32>,     // --retry
    pub backoff_base: Option<u64>,    // --backoff-base
    pub backoff_jitter: Option<u64>,  // --backoff-jitter
    pub get_only: bool,               // --get-only

    // Filtering & classification
    pub exclude_patterns: Option<Vec<String>>, // --exclude-pattern
    pub file_types: Option<Vec<String>>,       // --include
    pub squatting_distance: Option<usize>,     // --squatting-distance
    pub flag_cross_domain_redirects: bool,     // --flag-cross-domain

    // Output
    pub quiet: bool,                   // --quiet
    pub verbose: bool,                 // --verbose
    pub show_healthy: bool,            // --show-healthy
    pub output_format: Option<String>, // --format
    pub no_progress: bool,             // --no-progress

    // Network
    pub user_agent: Option<String>, // --user-agent
    pub proxy: Option<String>,      // --proxy

    // Configuration
    pub config_file: Option<String>, // --config
    pub no_config: bool,             // --no-config
}
