use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Why a certificate was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsFailure {
    Expired,
    NotValidForName,
    UnknownIssuer,
    Other,
}

impl fmt::Display for TlsFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsFailure::Expired => write!(f, "certificate expired"),
            TlsFailure::NotValidForName => write!(f, "certificate not valid for host"),
            TlsFailure::UnknownIssuer => write!(f, "untrusted certificate issuer"),
            TlsFailure::Other => write!(f, "TLS handshake failed"),
        }
    }
}

/// Network-level reason a check produced no usable HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureKind {
    Dns { temporary: bool },
    Timeout,
    ConnectionRefused,
    ConnectionReset,
    Connection(String),
    Tls(TlsFailure),
    TooManyRedirects,
    UnsupportedRedirect(String),
    /// The per-host limiter did not grant a slot within the wait bound
    RateLimitWait,
    Cancelled,
    Malformed(String),
    /// The check itself failed (panic, unusable URL)
    Internal(String),
}

impl FailureKind {
    /// Failures worth another attempt after a backoff
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FailureKind::Dns { temporary: true }
                | FailureKind::ConnectionRefused
                | FailureKind::ConnectionReset
                | FailureKind::Connection(_)
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Dns { temporary: true } => write!(f, "temporary DNS failure"),
            FailureKind::Dns { temporary: false } => write!(f, "DNS lookup failed"),
            FailureKind::Timeout => write!(f, "timed out"),
            FailureKind::ConnectionRefused => write!(f, "connection refused"),
            FailureKind::ConnectionReset => write!(f, "connection reset"),
            FailureKind::Connection(detail) => write!(f, "connection failed: {detail}"),
            FailureKind::Tls(failure) => write!(f, "{failure}"),
            FailureKind::TooManyRedirects => write!(f, "too many redirects"),
            FailureKind::UnsupportedRedirect(target) => {
                write!(f, "redirect to unsupported target {target}")
            }
            FailureKind::RateLimitWait => write!(f, "gave up waiting for a host slot"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Malformed(reason) => write!(f, "malformed URL: {reason}"),
            FailureKind::Internal(reason) => write!(f, "internal error: {reason}"),
        }
    }
}

/// One response in a redirect chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectHop {
    pub url: String,
    pub status: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TlsInfo {
    pub valid: bool,
    pub failure: Option<TlsFailure>,
    pub expiry: Option<DateTime<Utc>>,
    pub issuer: Option<String>,
}

impl TlsInfo {
    pub fn verified() -> Self {
        Self {
            valid: true,
            failure: None,
            expiry: None,
            issuer: None,
        }
    }

    pub fn rejected(failure: TlsFailure) -> Self {
        Self {
            valid: false,
            failure: Some(failure),
            expiry: None,
            issuer: None,
        }
    }
}

fn serialize_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
}

/// Raw result of checking one link. Produced once per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    /// The checked URL (canonical form, or the cleaned raw text when malformed)
    pub url: String,
    /// Status of the final response, if one arrived
    pub status: Option<u16>,
    pub failure: Option<FailureKind>,
    /// Last URL requested
    pub final_url: Option<String>,
    /// Every redirect response in order, starting with the original URL
    pub redirect_chain: Vec<RedirectHop>,
    pub tls: Option<TlsInfo>,
    #[serde(rename = "latency_ms", serialize_with = "serialize_millis")]
    pub latency: Duration,
    pub attempts: u32,
    pub checked_at: DateTime<Utc>,
    /// Server requested delay from a `Retry-After` header
    #[serde(skip)]
    pub retry_after: Option<Duration>,
}

impl CheckOutcome {
    pub fn new<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            status: None,
            failure: None,
            final_url: None,
            redirect_chain: Vec::new(),
            tls: None,
            latency: Duration::ZERO,
            attempts: 0,
            checked_at: Utc::now(),
            retry_after: None,
        }
    }

    /// Outcome for a check that failed before or without a response
    pub fn failed<S: Into<String>>(url: S, failure: FailureKind) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new(url)
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_success_status(&self) -> bool {
        self.failure.is_none() && matches!(self.status, Some(200..=299))
    }

    /// URLs in the order they were requested, deduplicating consecutive repeats
    pub fn visited_urls(&self) -> Vec<&str> {
        let mut visited: Vec<&str> = Vec::with_capacity(self.redirect_chain.len() + 2);
        let chain = self.redirect_chain.iter().map(|hop| hop.url.as_str());
        for url in std::iter::once(self.url.as_str())
            .chain(chain)
            .chain(self.final_url.as_deref())
        {
            if visited.last() != Some(&url) {
                visited.push(url);
            }
        }
        visited
    }

    /// Short human readable description of what happened
    pub fn describe(&self) -> String {
        match (&self.failure, self.status) {
            (Some(failure), _) => failure.to_string(),
            (None, Some(status)) => match &self.final_url {
                Some(final_url) if !self.redirect_chain.is_empty() => {
                    format!("{status} via {} redirect(s) to {final_url}", self.redirect_chain.len())
                }
                _ => status.to_string(),
            },
            (None, None) => crate::core::constants::error_messages::UNKNOWN_ERROR.to_string(),
        }
    }
}
