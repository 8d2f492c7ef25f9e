/// Application-wide constants to avoid magic values throughout the codebase.
///
/// This module centralizes the defaults, ceilings, status codes and error
/// message fragments used by the validation pipeline.
/// Output format constants
pub mod output_formats {
    /// Text output format - one human readable line per result plus a summary
    pub const TEXT: &str = "text";
    /// JSON output format - one JSON object per line for automation
    pub const JSON: &str = "json";

    /// Default output format
    pub const DEFAULT: &str = TEXT;

    /// All valid output formats
    pub const ALL: [&str; 2] = [TEXT, JSON];
}

/// HTTP status code constants
pub mod http_status {
    /// HTTP 200 OK - successful response
    pub const OK: u16 = 200;
    /// HTTP 206 Partial Content - answer to a ranged GET
    pub const PARTIAL_CONTENT: u16 = 206;
    /// HTTP 301 Moved Permanently - permanent redirect
    pub const MOVED_PERMANENTLY: u16 = 301;
    /// HTTP 302 Found - temporary redirect
    pub const FOUND: u16 = 302;
    /// HTTP 403 Forbidden - access forbidden
    pub const FORBIDDEN: u16 = 403;
    /// HTTP 404 Not Found - resource not found
    pub const NOT_FOUND: u16 = 404;
    /// HTTP 405 Method Not Allowed - HEAD rejected
    pub const METHOD_NOT_ALLOWED: u16 = 405;
    /// HTTP 410 Gone - resource permanently removed
    pub const GONE: u16 = 410;
    /// HTTP 416 Range Not Satisfiable - ranged GET rejected
    pub const RANGE_NOT_SATISFIABLE: u16 = 416;
    /// HTTP 429 Too Many Requests - server side throttling
    pub const TOO_MANY_REQUESTS: u16 = 429;
    /// HTTP 500 Internal Server Error - server error
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
    /// HTTP 501 Not Implemented - HEAD unsupported
    pub const NOT_IMPLEMENTED: u16 = 501;
    /// HTTP 503 Service Unavailable - transient server error
    pub const SERVICE_UNAVAILABLE: u16 = 503;
}

/// Timeout and duration constants
pub mod timeouts {
    /// Default per-attempt connect timeout in seconds
    pub const DEFAULT_CONNECT_TIMEOUT_SECONDS: u64 = 10;
    /// Default end-to-end timeout for one check in seconds
    pub const DEFAULT_TOTAL_TIMEOUT_SECONDS: u64 = 30;
    /// Maximum reasonable timeout in seconds (24 hours)
    pub const MAX_TIMEOUT_SECONDS: u64 = 86_400;
    /// Default base delay for exponential backoff in milliseconds
    pub const DEFAULT_BACKOFF_BASE_MS: u64 = 500;
    /// Default upper bound of the random jitter added to each backoff in milliseconds
    pub const DEFAULT_BACKOFF_JITTER_MS: u64 = 250;
    /// Default cap for a single backoff delay in milliseconds
    pub const DEFAULT_BACKOFF_MAX_MS: u64 = 30_000;
    /// Default bound on how long a check may wait for a host slot in seconds
    pub const DEFAULT_HOST_WAIT_LIMIT_SECONDS: u64 = 300;
    /// Pool idle timeout for the HTTP client in seconds
    pub const POOL_IDLE_TIMEOUT_SECONDS: u64 = 30;
    /// TCP keepalive for the HTTP client in seconds
    pub const TCP_KEEPALIVE_SECONDS: u64 = 60;
}

/// Default configuration values
pub mod defaults {
    /// Global ceiling of in-flight checks
    pub const MAX_CONCURRENCY: usize = 256;
    /// Ceiling of in-flight checks against a single host
    pub const MAX_PER_HOST_CONCURRENCY: usize = 8;
    /// Redirect hops followed before giving up
    pub const MAX_REDIRECTS: usize = 10;
    /// Retries after the first attempt for transient failures
    pub const RETRY_LIMIT: u32 = 3;
    /// Registrable domains within this edit distance are treated as look-alikes
    pub const SQUATTING_DISTANCE: usize = 2;
    /// Use HEAD first and fall back to a ranged GET
    pub const USE_HEAD_REQUESTS: bool = true;
}

/// Upper bounds enforced by configuration validation
pub mod limits {
    /// Highest accepted global concurrency
    pub const MAX_CONCURRENCY_CEILING: usize = 4096;
    /// Highest accepted retry limit
    pub const MAX_RETRY_LIMIT: u32 = 20;
    /// Highest accepted redirect limit
    pub const MAX_REDIRECTS_CEILING: usize = 50;
    /// Highest accepted squatting edit distance
    pub const MAX_SQUATTING_DISTANCE: usize = 5;
}

/// Error message fragments used to classify transport failures.
///
/// The HTTP stack reports DNS and certificate problems as nested error
/// messages, so classification matches on lower-cased fragments.
pub mod error_messages {
    /// Fragments that identify a name resolution failure
    pub const DNS_FRAGMENTS: [&str; 5] = [
        "dns error",
        "failed to lookup address",
        "name or service not known",
        "no such host",
        "nodename nor servname",
    ];
    /// Fragments that mark a DNS failure as temporary
    pub const DNS_TEMPORARY_FRAGMENTS: [&str; 2] = ["temporary failure", "try again"];
    /// Fragments that identify a certificate or handshake failure
    pub const TLS_FRAGMENTS: [&str; 4] = [
        "certificate",
        "invalid peer certificate",
        "handshake",
        "tls",
    ];
    /// Fragments that identify an expired certificate
    pub const TLS_EXPIRED_FRAGMENTS: [&str; 2] = ["expired", "not valid after"];
    /// Fragments that identify a certificate issued for another name
    pub const TLS_NAME_FRAGMENTS: [&str; 2] = ["notvalidforname", "not valid for name"];
    /// Fragments that identify an untrusted or self-signed chain
    pub const TLS_ISSUER_FRAGMENTS: [&str; 3] = ["unknownissuer", "unknown issuer", "self-signed"];
    /// Unknown error fallback
    pub const UNKNOWN_ERROR: &str = "Unknown error";
}

/// Display and formatting constants
pub mod display {
    /// Emoji for healthy links
    pub const SUCCESS_EMOJI: &str = "✅";
    /// Emoji for dead links and HTTP errors
    pub const ERROR_EMOJI: &str = "❌";
    /// Emoji for suspicious redirects and look-alike domains
    pub const WARNING_EMOJI: &str = "⚠️";
    /// Emoji for certificate problems
    pub const TLS_EMOJI: &str = "🔒";
    /// Emoji for timeouts
    pub const TIMEOUT_EMOJI: &str = "⌛";
    /// Emoji for DNS failures
    pub const DNS_EMOJI: &str = "🌐";
    /// Emoji for throttled hosts
    pub const RATE_LIMIT_EMOJI: &str = "🆘";
    /// Emoji for malformed links
    pub const MALFORMED_EMOJI: &str = "❓";
    /// Emoji for cancelled checks
    pub const CANCELLED_EMOJI: &str = "⏹";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_formats_constants() {
        assert_eq!(output_formats::TEXT, "text");
        assert_eq!(output_formats::JSON, "json");
        assert_eq!(output_formats::DEFAULT, "text");
        assert_eq!(output_formats::ALL.len(), 2);
    }

    #[test]
    fn test_defaults_are_within_limits() {
        assert!(defaults::MAX_CONCURRENCY <= limits::MAX_CONCURRENCY_CEILING);
        assert!(defaults::MAX_PER_HOST_CONCURRENCY <= defaults::MAX_CONCURRENCY);
        assert!(defaults::RETRY_LIMIT <= limits::MAX_RETRY_LIMIT);
        assert!(defaults::MAX_REDIRECTS <= limits::MAX_REDIRECTS_CEILING);
        assert!(defaults::SQUATTING_DISTANCE <= limits::MAX_SQUATTING_DISTANCE);
    }

    #[test]
    fn test_timeout_constants() {
        assert!(timeouts::DEFAULT_CONNECT_TIMEOUT_SECONDS <= timeouts::DEFAULT_TOTAL_TIMEOUT_SECONDS);
        assert!(timeouts::DEFAULT_BACKOFF_BASE_MS <= timeouts::DEFAULT_BACKOFF_MAX_MS);
    }

    #[test]
    fn test_fragments_are_lowercase() {
        let all = error_messages::DNS_FRAGMENTS
            .iter()
            .chain(error_messages::DNS_TEMPORARY_FRAGMENTS.iter())
            .chain(error_messages::TLS_FRAGMENTS.iter())
            .chain(error_messages::TLS_EXPIRED_FRAGMENTS.iter())
            .chain(error_messages::TLS_NAME_FRAGMENTS.iter())
            .chain(error_messages::TLS_ISSUER_FRAGMENTS.iter());
        for fragment in all {
            assert_eq!(*fragment, fragment.to_lowercase());
        }
    }
}
