use crate::classification::Category;
use crate::config::Config;
use crate::reporting::aggregator::{ClassifiedResult, RunSummary};
use log::{debug, error, info, warn};
use std::path::Path;

/// Initialize the logger with appropriate level based on verbosity.
///
/// `RUST_LOG`, when set, replaces the level derived from the flags.
pub fn init_logger(verbose: bool, quiet: bool) {
    let level = if quiet {
        log::LevelFilter::Off
    } else if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Off // Only show structured logs in verbose mode
    };
    let rust_log = std::env::var(env_logger::DEFAULT_FILTER_ENV).ok();

    // try_init so repeated initialization (tests, embedding) is harmless
    let _ = logger_builder(level, rust_log.as_deref()).try_init();

    debug!("Logger initialized with level: {level:?}");
}

fn logger_builder(level: log::LevelFilter, rust_log: Option<&str>) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(false);

    match rust_log {
        Some(filters) if !filters.trim().is_empty() => builder.parse_filters(filters),
        _ => builder.filter_level(level),
    };
    builder
}

/// Log the effective configuration
pub fn log_config_info(config: &Config) {
    info!(
        "Concurrency: global={}, per_host={}",
        config.max_concurrency(),
        config.max_per_host_concurrency()
    );
    info!(
        "Timeouts: connect={}s, total={}s, host_wait={}s, run={}",
        config.connect_timeout_duration().as_secs(),
        config.total_timeout_duration().as_secs(),
        config.host_wait_limit_duration().as_secs(),
        config
            .run_timeout_duration()
            .map(|run| format!("{}s", run.as_secs()))
            .unwrap_or_else(|| "none".to_string())
    );
    info!(
        "Retry: limit={}, backoff_base={}ms, jitter={}ms, max={}ms",
        config.retry_limit(),
        config.backoff_base_duration().as_millis(),
        config.backoff_jitter_duration().as_millis(),
        config.backoff_max_duration().as_millis()
    );
    info!(
        "HTTP: head_requests={}, max_redirects={}, proxy={}",
        config.use_head_requests.unwrap_or(true),
        config.max_redirects(),
        config.proxy.as_deref().unwrap_or("none")
    );
    info!(
        "Classification: squatting_distance={}, flag_cross_domain_redirects={}",
        config.squatting_distance(),
        config.flag_cross_domain_redirects.unwrap_or(false)
    );
}

/// Log file processing information
pub fn log_file_info<P: AsRef<Path>>(file_count: usize, files: &[P]) {
    info!("Processing {file_count} file(s)");
    for (i, file) in files.iter().enumerate() {
        debug!("  {}. {}", i + 1, file.as_ref().display());
    }
}

/// Log discovery totals once input is exhausted
pub fn log_discovery_complete(summary: &RunSummary) {
    info!(
        "Discovery complete: {} occurrence(s), {} unique link(s), {} excluded",
        summary.occurrences, summary.unique_urls, summary.excluded
    );
}

/// Log individual results for debugging
pub fn log_result(result: &ClassifiedResult) {
    match result.category {
        Category::Healthy => debug!("✓ {} -> {}", result.url, result.outcome.describe()),
        category => debug!(
            "✗ {} -> {category} ({}) [{} location(s)]",
            result.url,
            result.outcome.describe(),
            result.source_locations.len()
        ),
    }
}

/// Log run completion
pub fn log_run_complete(summary: &RunSummary) {
    let duration_ms = summary.duration.as_millis();
    if summary.all_healthy() {
        info!(
            "✅ Validation complete: {}/{} links healthy ({}ms)",
            summary.healthy(),
            summary.results(),
            duration_ms
        );
    } else {
        warn!(
            "❌ Validation complete: {}/{} links healthy, {} issues found ({}ms)",
            summary.healthy(),
            summary.results(),
            summary.issues(),
            duration_ms
        );
    }
    if summary.cancelled {
        warn!("Run was cancelled before every check finished");
    }
}

/// Log error information
pub fn log_error(message: &str, source: Option<&dyn std::error::Error>) {
    match source {
        Some(err) => error!("{message}: {err}"),
        None => error!("{message}"),
    }
}

/// Log warning information
pub fn log_warning(message: &str) {
    warn!("{message}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::outcome::CheckOutcome;
    use std::io;

    #[test]
    fn test_logger_initialization_is_repeatable() {
        init_logger(true, false);
        init_logger(false, true);
    }

    #[test]
    fn test_rust_log_overrides_flag_level() {
        use log::LevelFilter;

        assert_eq!(
            logger_builder(LevelFilter::Off, Some("info")).build().filter(),
            LevelFilter::Info
        );
        assert_eq!(
            logger_builder(LevelFilter::Debug, Some("warn")).build().filter(),
            LevelFilter::Warn
        );
    }

    #[test]
    fn test_flag_level_applies_without_rust_log() {
        use log::LevelFilter;

        assert_eq!(
            logger_builder(LevelFilter::Debug, None).build().filter(),
            LevelFilter::Debug
        );
        assert_eq!(
            logger_builder(LevelFilter::Off, Some("  ")).build().filter(),
            LevelFilter::Off
        );
    }

    #[test]
    fn test_log_functions_do_not_panic() {
        let config = Config::default();
        log_config_info(&config);
        log_file_info(2, &["a.md", "b.md"]);

        let mut summary = RunSummary::default();
        log_discovery_complete(&summary);
        log_run_complete(&summary);
        summary.by_category.insert(Category::Dead, 1);
        summary.cancelled = true;
        log_run_complete(&summary);

        log_result(&ClassifiedResult {
            url: "https://example.com".to_string(),
            category: Category::Dead,
            outcome: CheckOutcome::new("https://example.com").with_status(404),
            source_locations: Vec::new(),
        });

        let err = io::Error::other("disk full");
        log_error("Failed to write", Some(&err));
        log_error("Plain error", None);
        log_warning("careful");
    }
}
