//! Result sinks for the command line consumer

use std::io::Write;

use super::aggregator::{ClassifiedResult, ResultSink, RunSummary};
use crate::classification::Category;
use crate::core::error::Result;
use crate::ui::color::{Colors, category_color, colorize};

/// How many source locations are listed per result before eliding
const MAX_LISTED_LOCATIONS: usize = 3;

/// One JSON object per line, followed by a summary object.
pub struct JsonLinesSink<W> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> ResultSink for JsonLinesSink<W> {
    fn emit(&mut self, result: ClassifiedResult) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &result)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &serde_json::json!({ "summary": summary }))?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Human readable lines with a summary block at the end.
pub struct TextSink<W> {
    writer: W,
    show_healthy: bool,
}

impl<W: Write + Send> TextSink<W> {
    pub fn new(writer: W, show_healthy: bool) -> Self {
        Self {
            writer,
            show_healthy,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Render one result as a single line
pub fn format_result_line(result: &ClassifiedResult) -> String {
    let mut locations: Vec<String> = result
        .source_locations
        .iter()
        .take(MAX_LISTED_LOCATIONS)
        .map(ToString::to_string)
        .collect();
    let hidden = result.source_locations.len().saturating_sub(MAX_LISTED_LOCATIONS);
    if hidden > 0 {
        locations.push(format!("+{hidden} more"));
    }

    format!(
        "{} {} {} ({}) - {}",
        result.category.emoji(),
        colorize(
            &format!("{:<19}", result.category.as_str()),
            category_color(result.category)
        ),
        result.url,
        result.outcome.describe(),
        locations.join(", ")
    )
}

/// Render the summary block
pub fn format_summary(summary: &RunSummary) -> String {
    let mut lines = vec![
        String::new(),
        colorize("Summary", Colors::BRIGHT_CYAN),
        format!(
            "  Links found: {} ({} unique, {} excluded)",
            summary.occurrences, summary.unique_urls, summary.excluded
        ),
        format!("  Checks issued: {}", summary.checks_issued),
    ];

    for category in Category::ALL {
        let count = summary.count(category);
        if count > 0 {
            lines.push(format!(
                "  {} {:<19} {}",
                category.emoji(),
                category.as_str(),
                colorize(&count.to_string(), Colors::BRIGHT_WHITE)
            ));
        }
    }

    lines.push(format!(
        "  Success rate: {:.1}% ({}/{}) in {:.2}s",
        summary.success_rate(),
        summary.healthy(),
        summary.results(),
        summary.duration.as_secs_f64()
    ));
    if summary.cancelled {
        lines.push(colorize(
            "  Run was cancelled; unfinished links are marked cancelled",
            Colors::BRIGHT_YELLOW,
        ));
    }
    lines.join("\n")
}

impl<W: Write + Send> ResultSink for TextSink<W> {
    fn emit(&mut self, result: ClassifiedResult) -> Result<()> {
        if result.is_healthy() && !self.show_healthy {
            return Ok(());
        }
        writeln!(self.writer, "{}", format_result_line(&result))?;
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<()> {
        writeln!(self.writer, "{}", format_summary(summary))?;
        self.writer.flush()?;
        Ok(())
    }
}
