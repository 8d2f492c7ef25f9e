use serde::Serialize;
use std::fmt;

use crate::core::constants::display;

/// Taxonomy every checked link ends up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Healthy,
    Dead,
    HttpError,
    RedirectHijack,
    DomainSquatting,
    CertificateExpired,
    CertificateInvalid,
    Timeout,
    DnsFailure,
    RateLimited,
    Malformed,
    Cancelled,
}

impl Category {
    /// Every category in report order
    pub const ALL: [Category; 12] = [
        Category::Healthy,
        Category::Dead,
        Category::HttpError,
        Category::RedirectHijack,
        Category::DomainSquatting,
        Category::CertificateExpired,
        Category::CertificateInvalid,
        Category::Timeout,
        Category::DnsFailure,
        Category::RateLimited,
        Category::Malformed,
        Category::Cancelled,
    ];

    pub fn is_healthy(&self) -> bool {
        matches!(self, Category::Healthy)
    }

    /// Categories that point at a security problem rather than a broken link
    pub fn is_suspicious(&self) -> bool {
        matches!(
            self,
            Category::RedirectHijack
                | Category::DomainSquatting
                | Category::CertificateExpired
                | Category::CertificateInvalid
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Healthy => "healthy",
            Category::Dead => "dead",
            Category::HttpError => "http_error",
            Category::RedirectHijack => "redirect_hijack",
            Category::DomainSquatting => "domain_squatting",
            Category::CertificateExpired => "certificate_expired",
            Category::CertificateInvalid => "certificate_invalid",
            Category::Timeout => "timeout",
            Category::DnsFailure => "dns_failure",
            Category::RateLimited => "rate_limited",
            Category::Malformed => "malformed",
            Category::Cancelled => "cancelled",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Category::Healthy => display::SUCCESS_EMOJI,
            Category::Dead | Category::HttpError => display::ERROR_EMOJI,
            Category::RedirectHijack | Category::DomainSquatting => display::WARNING_EMOJI,
            Category::CertificateExpired | Category::CertificateInvalid => display::TLS_EMOJI,
            Category::Timeout => display::TIMEOUT_EMOJI,
            Category::DnsFailure => display::DNS_EMOJI,
            Category::RateLimited => display::RATE_LIMIT_EMOJI,
            Category::Malformed => display::MALFORMED_EMOJI,
            Category::Cancelled => display::CANCELLED_EMOJI,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
