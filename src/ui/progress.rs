use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

use crate::reporting::RunSummary;

const LINK_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.yellow/red}] {pos}/{len} links checked ({msg})";

/// Progress bar for a run. The total grows as discovery admits new links.
pub struct ProgressReporter {
    multi_progress: Arc<MultiProgress>,
    link_progress: Option<ProgressBar>,
    enabled: bool,
}

impl ProgressReporter {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi_progress: Arc::new(MultiProgress::new()),
            link_progress: None,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn start_validation(&mut self) {
        if !self.enabled {
            return;
        }

        let pb = self.multi_progress.add(ProgressBar::new(0));
        let style = ProgressStyle::default_bar()
            .template(LINK_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb.set_message("discovering");
        pb.enable_steady_tick(Duration::from_millis(120));
        self.link_progress = Some(pb);
    }

    /// A new distinct link was admitted
    pub fn inc_length(&self) {
        if let Some(ref pb) = self.link_progress {
            pb.inc_length(1);
        }
    }

    /// A link produced its final result
    pub fn inc_checked(&self) {
        if let Some(ref pb) = self.link_progress {
            pb.inc(1);
        }
    }

    pub fn discovery_finished(&self) {
        if let Some(ref pb) = self.link_progress {
            pb.set_message("checking");
        }
    }

    pub fn position(&self) -> u64 {
        self.link_progress.as_ref().map_or(0, ProgressBar::position)
    }

    pub fn length(&self) -> u64 {
        self.link_progress
            .as_ref()
            .and_then(ProgressBar::length)
            .unwrap_or(0)
    }

    pub fn finish(&self, summary: &RunSummary) {
        if let Some(ref pb) = self.link_progress {
            let message = if summary.cancelled {
                "cancelled".to_string()
            } else if summary.all_healthy() {
                "all healthy".to_string()
            } else {
                format!("{} issue(s)", summary.issues())
            };
            pb.finish_with_message(message);
        }
    }

    pub fn finish_and_clear(&self) {
        if self.enabled {
            self.multi_progress.clear().unwrap_or(());
        }
    }

    pub fn log_warning(&self, message: &str) {
        if self.enabled {
            self.multi_progress
                .println(format!("⚠ {message}"))
                .unwrap_or(());
        }
    }
}
