//! Origin resolution: maps a URL to the politeness key that selects its
//! host queue.

use url::Url;

/// Extract the origin (hostname, lowercased) for queue selection. Returns
/// `None` for URLs with no host, which the frontier treats as unschedulable.
pub fn origin_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
}
