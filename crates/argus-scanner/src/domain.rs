//! Registrable-domain resolution, used to key findings per site.

use crate::error::{Result, ScanError};
use url::{Host, Url};

/// Effective top-level domain plus one label for `raw` (scheme optional,
/// `https` assumed).
///
/// ```rust
/// use argus_scanner::domain::registrable_domain;
///
/// assert_eq!(registrable_domain("https://www.github.com/alice").unwrap(), "github.com");
/// assert_eq!(registrable_domain("news.bbc.co.uk/x").unwrap(), "bbc.co.uk");
/// ```
pub fn registrable_domain(raw: &str) -> Result<String> {
    let failure = |reason: &str| ScanError::DomainResolution {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };

    let parsed = Url::parse(&with_scheme).map_err(|e| failure(&e.to_string()))?;
    let host = match parsed.host() {
        Some(Host::Domain(host)) => host.trim_end_matches('.').to_lowercase(),
        Some(Host::Ipv4(_) | Host::Ipv6(_)) => return Err(failure("host is an IP address")),
        None => return Err(failure("no host")),
    };

    psl::domain_str(&host)
        .map(str::to_string)
        .ok_or_else(|| failure("no registrable domain"))
}
