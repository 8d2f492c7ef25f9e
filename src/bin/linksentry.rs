use clap::Parser;
use linksentry::config::{CliConfig, Config};
use linksentry::core::constants::output_formats;
use linksentry::core::error::LinkSentryError;
use linksentry::discovery::{OccurrenceSource, TextSource};
use linksentry::engine::Engine;
use linksentry::reporting::logging;
use linksentry::reporting::{JsonLinesSink, ResultSink, RunSummary, TextSink};
use linksentry::ui::ProgressReporter;
use linksentry::ui::{Cli, cli_to_config, validate_cli_args};

use std::path::Path;
use tokio::io::AsyncReadExt;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.has_input() {
        eprintln!("Error: No files provided");
        eprintln!("\nFor more information, try '--help'.");
        std::process::exit(1);
    }

    match run_linksentry_logic(&cli).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Main link validation logic extracted from main() for testing
pub async fn run_linksentry_logic(cli: &Cli) -> Result<i32, Box<dyn std::error::Error>> {
    validate_cli_args(cli)?;
    let cli_config = cli_to_config(cli);

    let (config, skipped_config_files) = load_and_merge_config(&cli_config)?;

    let output_settings = setup_output_settings(&cli_config, &config);
    logging::init_logger(output_settings.verbose, output_settings.quiet);
    for error in &skipped_config_files {
        logging::log_warning(&format!("Ignoring config file: {error}"));
    }
    logging::log_config_info(&config);

    validate_file_paths(&cli.files)?;
    let source = build_source(cli, config.file_types.as_deref()).await?;

    let engine = Engine::from_config(config).inspect_err(|e| {
        logging::log_error("Could not start the engine", Some(e));
    })?;
    spawn_interrupt_handler(&engine);

    let mut progress = create_progress_reporter(&output_settings);
    if let Some(ref mut progress) = progress {
        progress.start_validation();
    }

    let mut sink: Box<dyn ResultSink> = if output_settings.output_format == output_formats::JSON {
        Box::new(JsonLinesSink::new(std::io::stdout()))
    } else {
        Box::new(TextSink::new(std::io::stdout(), output_settings.show_healthy))
    };

    let summary = engine
        .run_with_progress(source.into_stream(), sink.as_mut(), progress.as_ref())
        .await?;

    finalize_progress_reporter(progress, &summary);
    Ok(determine_exit_code(&summary))
}

/// Load configuration from file or standard locations and merge with CLI config.
///
/// Also returns the errors of standard-location files that were skipped.
pub fn load_and_merge_config(
    cli_config: &CliConfig,
) -> Result<(Config, Vec<LinkSentryError>), Box<dyn std::error::Error>> {
    let (mut config, skipped) = if cli_config.no_config {
        (Config::default(), Vec::new())
    } else if let Some(ref config_file) = cli_config.config_file {
        let config = Config::load_from_file(config_file).inspect_err(|e| {
            logging::log_error(
                &format!("Could not load config file '{config_file}'"),
                Some(e),
            );
        })?;
        (config, Vec::new())
    } else {
        Config::load_from_standard_locations()
    };

    // Merge CLI arguments with configuration (CLI takes precedence)
    config.merge_with_cli(cli_config);
    config.validate()?;
    Ok((config, skipped))
}

/// Settings for output formatting and display
pub struct OutputSettings {
    pub quiet: bool,
    pub verbose: bool,
    pub output_format: String,
    pub show_progress: bool,
    pub show_healthy: bool,
}

/// Setup output settings based on CLI and config
pub fn setup_output_settings(cli_config: &CliConfig, config: &Config) -> OutputSettings {
    let quiet = cli_config.quiet;
    let verbose = config.verbose.unwrap_or(false);
    let output_format = config
        .output_format
        .as_deref()
        .unwrap_or(output_formats::DEFAULT)
        .to_string();
    let show_progress = !quiet && !cli_config.no_progress;

    OutputSettings {
        quiet,
        verbose,
        output_format,
        show_progress,
        show_healthy: config.show_healthy.unwrap_or(false),
    }
}

/// Validate that every path is an existing file or directory
pub fn validate_file_paths(files: &[String]) -> Result<(), Box<dyn std::error::Error>> {
    for file in files {
        let path = Path::new(file);
        if !path.is_file() && !path.is_dir() {
            let error_msg = format!("File not found: '{}'", path.display());
            logging::log_error(&error_msg, None);
            return Err(error_msg.into());
        }
    }
    Ok(())
}

/// Directories are expanded and files read lazily by the source; stdin is read up front
pub async fn build_source(
    cli: &Cli,
    file_types: Option<&[String]>,
) -> Result<TextSource, Box<dyn std::error::Error>> {
    let mut source = TextSource::from_paths(&cli.files, file_types)?;
    logging::log_file_info(source.documents(), &source.paths());
    if cli.stdin {
        let mut text = String::new();
        tokio::io::stdin().read_to_string(&mut text).await?;
        source = source.with_text("<stdin>", text);
    }
    Ok(source)
}

/// Cancel the run on Ctrl-C; unfinished links are reported as cancelled
fn spawn_interrupt_handler<P>(engine: &Engine<P>)
where
    P: linksentry::validation::Probe + 'static,
{
    let token = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            logging::log_warning("Interrupted, finishing with partial results");
            token.cancel();
        }
    });
}

/// Create progress reporter if needed
pub fn create_progress_reporter(output_settings: &OutputSettings) -> Option<ProgressReporter> {
    if output_settings.show_progress && output_settings.output_format == output_formats::TEXT {
        Some(ProgressReporter::new(true))
    } else {
        None
    }
}

pub fn finalize_progress_reporter(progress: Option<ProgressReporter>, summary: &RunSummary) {
    if let Some(progress) = progress {
        progress.finish(summary);
        progress.finish_and_clear();
    }
}

/// 0 when every link is healthy, 1 otherwise
pub fn determine_exit_code(summary: &RunSummary) -> i32 {
    if summary.all_healthy() { 0 } else { 1 }
}
