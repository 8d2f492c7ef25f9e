//! Color and formatting utilities for terminal output

use crate::classification::Category;

pub struct Colors;

impl Colors {
    pub const RESET: &'static str = "\x1b[0m";
    pub const DIM: &'static str = "\x1b[2m";

    pub const RED: &'static str = "\x1b[31m";
    pub const YELLOW: &'static str = "\x1b[33m";
    pub const MAGENTA: &'static str = "\x1b[35m";
    pub const CYAN: &'static str = "\x1b[36m";

    pub const BRIGHT_RED: &'static str = "\x1b[91m";
    pub const BRIGHT_GREEN: &'static str = "\x1b[92m";
    pub const BRIGHT_YELLOW: &'static str = "\x1b[93m";
    pub const BRIGHT_CYAN: &'static str = "\x1b[96m";
    pub const BRIGHT_WHITE: &'static str = "\x1b[97m";
}

/// Apply color to text if terminal supports it
pub fn colorize(text: &str, color: &str) -> String {
    if supports_formatting() {
        format!("{}{}{}", color, text, Colors::RESET)
    } else {
        text.to_string()
    }
}

/// Color used for a category in text output
pub fn category_color(category: Category) -> &'static str {
    match category {
        Category::Healthy => Colors::BRIGHT_GREEN,
        Category::Dead | Category::HttpError => Colors::BRIGHT_RED,
        Category::RedirectHijack | Category::DomainSquatting => Colors::MAGENTA,
        Category::CertificateExpired | Category::CertificateInvalid => Colors::RED,
        Category::Timeout | Category::RateLimited => Colors::BRIGHT_YELLOW,
        Category::DnsFailure => Colors::YELLOW,
        Category::Malformed => Colors::CYAN,
        Category::Cancelled => Colors::DIM,
    }
}

/// Terminal capability detection
pub fn supports_formatting() -> bool {
    use std::env;
    use std::io::IsTerminal;

    // Check if colors are explicitly disabled
    if env::var("NO_COLOR").is_ok() || env::var("FORCE_COLOR").as_deref() == Ok("0") {
        return false;
    }

    // Force enable if explicitly requested
    if env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    // Disable formatting when running tests
    if cfg!(test) {
        return false;
    }

    // Check if output is being redirected
    if !std::io::stdout().is_terminal() {
        return false;
    }

    match env::var("TERM") {
        Ok(term) => term != "dumb" && !term.is_empty(),
        Err(_) => env::var("CI").is_ok(),
    }
}
