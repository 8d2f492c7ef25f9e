use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::header::{HeaderMap, LOCATION, RANGE, RETRY_AFTER};
use reqwest::redirect::Policy;
use std::error::Error as StdError;
use std::io::ErrorKind;
use std::time::{Duration, Instant};
use url::Url;

use super::outcome::{CheckOutcome, FailureKind, RedirectHop, TlsFailure, TlsInfo};
use crate::config::Config;
use crate::core::constants::{error_messages, http_status, timeouts};
use crate::core::error::Result;
use crate::urls::CanonicalUrl;

/// One network attempt against a URL, redirects included.
///
/// Implementations never fail: every problem is reported inside the
/// returned `CheckOutcome`. Retries and admission are handled by the caller.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, url: &CanonicalUrl) -> CheckOutcome;
}

/// Response data kept from a single request
#[derive(Debug)]
struct HopResponse {
    status: u16,
    location: Option<String>,
    retry_after: Option<Duration>,
}

impl HopResponse {
    fn from_response(response: &reqwest::Response) -> Self {
        let headers = response.headers();
        Self {
            status: response.status().as_u16(),
            location: header_str(headers, LOCATION).map(str::to_string),
            retry_after: header_str(headers, RETRY_AFTER).and_then(parse_retry_after),
        }
    }
}

fn header_str(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// reqwest based probe that follows redirects by hand.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    max_redirects: usize,
    use_head_requests: bool,
}

impl HttpProbe {
    pub fn new(config: &Config) -> Result<Self> {
        let user_agent = config.user_agent.as_deref().unwrap_or(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));

        // Redirects are followed manually so every hop is recorded
        let mut client_builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout_duration())
            .redirect(Policy::none())
            .user_agent(user_agent);

        client_builder = client_builder
            .pool_max_idle_per_host(config.max_per_host_concurrency())
            .pool_idle_timeout(Duration::from_secs(timeouts::POOL_IDLE_TIMEOUT_SECONDS))
            .tcp_keepalive(Duration::from_secs(timeouts::TCP_KEEPALIVE_SECONDS));

        if let Some(ref proxy_url) = config.proxy {
            client_builder = client_builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        Ok(Self {
            client: client_builder.build()?,
            max_redirects: config.max_redirects(),
            use_head_requests: config.use_head_requests.unwrap_or(true),
        })
    }

    /// HEAD first; a ranged GET decides when HEAD reports an error other than 429.
    async fn request(&self, url: &Url) -> std::result::Result<HopResponse, FailureKind> {
        if self.use_head_requests {
            let response = self
                .client
                .head(url.clone())
                .send()
                .await
                .map_err(|err| classify_transport_error(&err))?;
            let status = response.status().as_u16();
            if status < 400 || status == http_status::TOO_MANY_REQUESTS {
                return Ok(HopResponse::from_response(&response));
            }
            debug!("HEAD {url} answered {status}, falling back to GET");
        }

        let response = self
            .client
            .get(url.clone())
            .header(RANGE, "bytes=0-0")
            .send()
            .await
            .map_err(|err| classify_transport_error(&err))?;
        if response.status().as_u16() != http_status::RANGE_NOT_SATISFIABLE {
            return Ok(HopResponse::from_response(&response));
        }

        debug!("Ranged GET {url} rejected, retrying without Range");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| classify_transport_error(&err))?;
        Ok(HopResponse::from_response(&response))
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, url: &CanonicalUrl) -> CheckOutcome {
        let started = Instant::now();
        let mut outcome = CheckOutcome::new(url.to_string());

        let mut current = match url.to_url() {
            Ok(parsed) => parsed,
            Err(err) => {
                outcome.failure = Some(FailureKind::Internal(err.to_string()));
                return outcome;
            }
        };

        loop {
            let hop = match self.request(&current).await {
                Ok(hop) => hop,
                Err(failure) => {
                    if let FailureKind::Tls(tls_failure) = failure {
                        outcome.tls = Some(TlsInfo::rejected(tls_failure));
                    }
                    debug!("{current} -> {failure}");
                    outcome.failure = Some(failure);
                    outcome.final_url = Some(current.to_string());
                    break;
                }
            };

            // A completed https request means the certificate was accepted
            if current.scheme() == "https" {
                outcome.tls = Some(TlsInfo::verified());
            }
            debug!("{current} -> {}", hop.status);

            let next = match hop.location.as_deref() {
                Some(location) if is_redirect(hop.status) => current.join(location).ok(),
                _ => None,
            };

            let Some(next) = next else {
                // Final response, or a 3xx without a usable Location
                outcome.status = Some(hop.status);
                outcome.retry_after = hop.retry_after;
                outcome.final_url = Some(current.to_string());
                break;
            };

            outcome.redirect_chain.push(RedirectHop {
                url: current.to_string(),
                status: hop.status,
            });

            if !matches!(next.scheme(), "http" | "https") {
                outcome.status = Some(hop.status);
                outcome.failure = Some(FailureKind::UnsupportedRedirect(next.to_string()));
                outcome.final_url = Some(current.to_string());
                break;
            }

            if outcome.redirect_chain.len() > self.max_redirects {
                outcome.status = Some(hop.status);
                outcome.failure = Some(FailureKind::TooManyRedirects);
                outcome.final_url = Some(next.to_string());
                break;
            }

            current = next;
        }

        outcome.latency = started.elapsed();
        outcome
    }
}

/// Parse a `Retry-After` value given either in seconds or as an HTTP date.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let remaining = date.with_timezone(&Utc) - Utc::now();
    Some(remaining.to_std().unwrap_or(Duration::ZERO))
}

/// Map a transport error onto the failure taxonomy.
///
/// TLS and DNS problems only surface as nested error messages, so the
/// source chain is inspected for known fragments and IO error kinds.
pub fn classify_transport_error(err: &reqwest::Error) -> FailureKind {
    if err.is_timeout() {
        return FailureKind::Timeout;
    }
    if err.is_redirect() {
        return FailureKind::TooManyRedirects;
    }

    let mut messages = Vec::new();
    let mut io_kind = None;
    let mut source = err.source();
    while let Some(inner) = source {
        if let Some(io_err) = inner.downcast_ref::<std::io::Error>() {
            io_kind.get_or_insert(io_err.kind());
        }
        messages.push(inner.to_string().to_lowercase());
        source = inner.source();
    }
    if messages.is_empty() {
        messages.push(err.to_string().to_lowercase());
    }
    let text = messages.join(": ");

    if contains_any(&text, &error_messages::DNS_FRAGMENTS) {
        return FailureKind::Dns {
            temporary: contains_any(&text, &error_messages::DNS_TEMPORARY_FRAGMENTS),
        };
    }

    if contains_any(&text, &error_messages::TLS_FRAGMENTS) {
        return FailureKind::Tls(classify_tls_message(&text));
    }

    match io_kind {
        Some(ErrorKind::ConnectionRefused) => return FailureKind::ConnectionRefused,
        Some(ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe) => {
            return FailureKind::ConnectionReset;
        }
        Some(ErrorKind::TimedOut) => return FailureKind::Timeout,
        _ => {}
    }
    if text.contains("connection refused") {
        return FailureKind::ConnectionRefused;
    }
    if text.contains("connection reset") || text.contains("connection closed") {
        return FailureKind::ConnectionReset;
    }

    let detail = messages
        .last()
        .cloned()
        .unwrap_or_else(|| error_messages::UNKNOWN_ERROR.to_string());
    FailureKind::Connection(detail)
}

fn contains_any(text: &str, fragments: &[&str]) -> bool {
    fragments.iter().any(|fragment| text.contains(fragment))
}

/// Narrow a lower-cased TLS error message down to a failure reason
pub fn classify_tls_message(text: &str) -> TlsFailure {
    if contains_any(text, &error_messages::TLS_EXPIRED_FRAGMENTS) {
        TlsFailure::Expired
    } else if contains_any(text, &error_messages::TLS_NAME_FRAGMENTS) {
        TlsFailure::NotValidForName
    } else if contains_any(text, &error_messages::TLS_ISSUER_FRAGMENTS) {
        TlsFailure::UnknownIssuer
    } else {
        TlsFailure::Other
    }
}
