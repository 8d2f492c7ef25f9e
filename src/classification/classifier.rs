use log::trace;

use super::category::Category;
use super::domain::{host_of, registrable_domain, scheme_of};
use crate::config::Config;
use crate::core::constants::{defaults, http_status};
use crate::validation::outcome::{CheckOutcome, FailureKind, TlsFailure};

/// Tunable thresholds of the rule table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierPolicy {
    /// Registrable domains within this edit distance are look-alikes
    pub squatting_distance: usize,
    /// Treat every redirect to another registrable domain as a hijack
    pub flag_cross_domain_redirects: bool,
}

impl Default for ClassifierPolicy {
    fn default() -> Self {
        Self {
            squatting_distance: defaults::SQUATTING_DISTANCE,
            flag_cross_domain_redirects: false,
        }
    }
}

impl ClassifierPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            squatting_distance: config.squatting_distance(),
            flag_cross_domain_redirects: config.flag_cross_domain_redirects.unwrap_or(false),
        }
    }
}

/// Deterministic mapping from a check outcome to a category.
///
/// Rules are tried in order and the first match wins:
/// malformed, cancelled, DNS and network failures, TLS, rate limiting,
/// HTTP status, redirect target heuristics, healthy.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    policy: ClassifierPolicy,
}

impl Classifier {
    pub fn new(policy: ClassifierPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ClassifierPolicy {
        &self.policy
    }

    pub fn classify(&self, outcome: &CheckOutcome) -> Category {
        let category = self
            .by_failure(outcome)
            .or_else(|| self.by_certificate(outcome))
            .or_else(|| self.by_rate_limit(outcome))
            .or_else(|| self.by_status(outcome))
            .or_else(|| self.by_redirect_target(outcome))
            .unwrap_or(Category::Healthy);
        trace!("{} classified as {category}", outcome.url);
        category
    }

    fn by_failure(&self, outcome: &CheckOutcome) -> Option<Category> {
        let failure = outcome.failure.as_ref()?;
        let category = match failure {
            FailureKind::Malformed(_) => Category::Malformed,
            FailureKind::Cancelled => Category::Cancelled,
            FailureKind::Dns { .. } => Category::DnsFailure,
            FailureKind::Timeout => Category::Timeout,
            FailureKind::ConnectionRefused
            | FailureKind::ConnectionReset
            | FailureKind::Connection(_)
            | FailureKind::TooManyRedirects
            | FailureKind::Internal(_) => Category::Dead,
            FailureKind::Tls(TlsFailure::Expired) => Category::CertificateExpired,
            FailureKind::Tls(_) => Category::CertificateInvalid,
            FailureKind::RateLimitWait => Category::RateLimited,
            FailureKind::UnsupportedRedirect(_) => Category::HttpError,
        };
        Some(category)
    }

    /// Certificate problems reported alongside a response, whatever its status
    fn by_certificate(&self, outcome: &CheckOutcome) -> Option<Category> {
        let tls = outcome.tls.as_ref()?;
        if tls.failure == Some(TlsFailure::Expired)
            || tls.expiry.is_some_and(|expiry| expiry < outcome.checked_at)
        {
            return Some(Category::CertificateExpired);
        }
        if !tls.valid {
            return Some(Category::CertificateInvalid);
        }
        None
    }

    fn by_rate_limit(&self, outcome: &CheckOutcome) -> Option<Category> {
        (outcome.status == Some(http_status::TOO_MANY_REQUESTS)).then_some(Category::RateLimited)
    }

    fn by_status(&self, outcome: &CheckOutcome) -> Option<Category> {
        match outcome.status? {
            http_status::NOT_FOUND | http_status::GONE => Some(Category::Dead),
            status if status >= 400 => Some(Category::HttpError),
            // A redirect that could not be followed
            status if (300..400).contains(&status) => Some(Category::HttpError),
            status if status < 200 => Some(Category::HttpError),
            _ => None,
        }
    }

    fn by_redirect_target(&self, outcome: &CheckOutcome) -> Option<Category> {
        let final_url = outcome.final_url.as_deref()?;
        let origin = registrable_domain(&host_of(&outcome.url)?);
        let target = registrable_domain(&host_of(final_url)?);
        if origin == target {
            return None;
        }

        let distance = strsim::levenshtein(&origin, &target);
        if distance <= self.policy.squatting_distance {
            return Some(Category::DomainSquatting);
        }

        let visited: Vec<Option<String>> = outcome
            .visited_urls()
            .into_iter()
            .map(scheme_of)
            .collect();
        let downgraded = visited
            .windows(2)
            .any(|pair| pair[0].as_deref() == Some("https") && pair[1].as_deref() == Some("http"));
        let ends_on_http = scheme_of(final_url).as_deref() == Some("http");

        if downgraded || ends_on_http || self.policy.flag_cross_domain_redirects {
            return Some(Category::RedirectHijack);
        }
        None
    }
}
