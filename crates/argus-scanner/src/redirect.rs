//! Bad-redirect detection.
//!
//! Many services answer a request for a missing profile by redirecting to a
//! login page, a search page or the home page. Those destinations are listed
//! in the denylist; a redirect landing on one aborts the request.

use argus_core::USERNAME_PLACEHOLDER;
use reqwest::redirect::{Attempt, Policy};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Normalize a URL into a comparison key: lower-cased host without a
/// leading `www.`, `:port` when it is not the scheme's default, path
/// without trailing slashes (`/` when empty), then `?query` when present.
/// Scheme-less input is treated as `https`.
///
/// ```rust
/// use argus_scanner::redirect::normalize_redirect_target;
///
/// assert_eq!(
///     normalize_redirect_target("https://www.Example.com/Foo/"),
///     normalize_redirect_target("example.com/Foo"),
/// );
/// ```
#[must_use]
pub fn normalize_redirect_target(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let parsed = if raw.contains("://") {
        Url::parse(raw).ok()?
    } else {
        Url::parse(&format!("https://{raw}")).ok()?
    };

    let host = parsed.host_str()?.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let path = parsed.path().trim_end_matches('/');
    let path = if path.is_empty() { "/" } else { path };

    let mut key = match parsed.port() {
        Some(port) => format!("{host}:{port}{path}"),
        None => format!("{host}{path}"),
    };
    if let Some(query) = parsed.query().filter(|q| !q.is_empty()) {
        key.push('?');
        key.push_str(query);
    }
    Some(key)
}

/// Denylisted redirect destinations, read-only after construction.
#[derive(Debug, Clone, Default)]
pub struct RedirectDenylist {
    entries: Vec<String>,
}

impl RedirectDenylist {
    /// Build a denylist from raw entries (may contain `{U}`).
    #[must_use]
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the denylist has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entry `target` lands on for `username`, if any.
    #[must_use]
    pub fn matching_entry(&self, target: &str, username: &str) -> Option<&str> {
        let target_key = normalize_redirect_target(target)?;
        self.entries
            .iter()
            .find(|entry| {
                normalize_redirect_target(&entry.replace(USERNAME_PLACEHOLDER, username))
                    .is_some_and(|key| key == target_key)
            })
            .map(String::as_str)
    }

    /// Whether a redirect to `target` must be rejected for `username`.
    #[must_use]
    pub fn rejects(&self, target: &str, username: &str) -> bool {
        self.matching_entry(target, username).is_some()
    }
}

/// Redirect policy for one username's requests: follow up to
/// `max_redirects` hops, abort on a denylisted destination.
#[must_use]
pub fn redirect_policy(
    denylist: Arc<RedirectDenylist>,
    username: Arc<str>,
    max_redirects: usize,
) -> Policy {
    Policy::custom(move |attempt: Attempt<'_>| {
        if attempt.previous().len() > max_redirects {
            return attempt.error(format!("too many redirects (> {max_redirects})"));
        }

        let target = attempt.url().as_str();
        if let Some(entry) = denylist.matching_entry(target, &username) {
            let from = attempt
                .previous()
                .last()
                .map(ToString::to_string)
                .unwrap_or_default();
            debug!(%from, to = %target, %entry, "bad redirect");
            let message = format!("bad redirect: tried going to {entry} from {from}");
            return attempt.error(message);
        }

        attempt.follow()
    })
}
