use std::net::IpAddr;
use url::Url;

/// Two-label public suffixes common enough to matter for the heuristic.
const TWO_LABEL_SUFFIXES: [&str; 16] = [
    "co.uk", "org.uk", "ac.uk", "gov.uk", "com.au", "net.au", "org.au", "co.jp", "co.nz",
    "com.br", "com.cn", "co.in", "co.kr", "com.mx", "co.za", "com.tr",
];

/// Public suffix plus one label, approximated without a suffix list.
///
/// IP addresses are returned unchanged.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    if host.starts_with('[') || host.parse::<IpAddr>().is_ok() {
        return host;
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        return host;
    }

    let last_two = labels[labels.len() - 2..].join(".");
    let keep = if TWO_LABEL_SUFFIXES.contains(&last_two.as_str()) {
        3
    } else {
        2
    };
    labels[labels.len().saturating_sub(keep)..].join(".")
}

/// Host of an absolute URL string, lower-cased
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|host| host.to_ascii_lowercase())
}

pub fn scheme_of(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|parsed| parsed.scheme().to_string())
}
