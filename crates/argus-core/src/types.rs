//! Shared types used across Argus.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Placeholder substituted with the username in URL templates and phrases.
pub const USERNAME_PLACEHOLDER: &str = "{U}";

/// Placeholder in a handle that expands into separator variants.
const VARIANT_PLACEHOLDER: &str = "{?}";

/// Separators substituted for [`VARIANT_PLACEHOLDER`], in expansion order.
const VARIANT_SEPARATORS: [&str; 3] = ["", "-", "_"];

/// One target service, parsed from a line of the source list.
///
/// Both templates contain `{U}`. The request template is what gets fetched,
/// the display template is what gets reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Source {
    request_template: String,
    display_template: String,
}

impl Source {
    /// Create a source from explicit request and display templates.
    #[must_use]
    pub fn new(request_template: impl Into<String>, display_template: impl Into<String>) -> Self {
        Self {
            request_template: request_template.into(),
            display_template: display_template.into(),
        }
    }

    /// Parse a `request|display` line. A line without a pipe uses the same
    /// template for both.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        match line.split_once('|') {
            Some((request, display)) => Self::new(request.trim(), display.trim()),
            None => Self::new(line.trim(), line.trim()),
        }
    }

    /// Raw request URL template.
    #[must_use]
    pub fn request_template(&self) -> &str {
        &self.request_template
    }

    /// Raw display URL template.
    #[must_use]
    pub fn display_template(&self) -> &str {
        &self.display_template
    }

    /// Request URL with `username` substituted.
    #[must_use]
    pub fn request_url(&self, username: &str) -> String {
        self.request_template.replace(USERNAME_PLACEHOLDER, username)
    }

    /// Display URL with `username` substituted.
    #[must_use]
    pub fn display_url(&self, username: &str) -> String {
        self.display_template.replace(USERNAME_PLACEHOLDER, username)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.request_template == self.display_template {
            write!(f, "{}", self.request_template)
        } else {
            write!(f, "{}|{}", self.request_template, self.display_template)
        }
    }
}

/// A (username, source) pair: the unit of work handed to a scan worker.
#[derive(Debug, Clone)]
pub struct ProbeJob {
    /// Handle being probed
    pub username: Arc<str>,
    /// Service being probed
    pub source: Arc<Source>,
}

impl ProbeJob {
    /// Create a job for `username` against `source`.
    #[must_use]
    pub fn new(username: Arc<str>, source: Arc<Source>) -> Self {
        Self { username, source }
    }

    /// URL fetched for the real probe.
    #[must_use]
    pub fn request_url(&self) -> String {
        self.source.request_url(&self.username)
    }

    /// URL reported when the probe is confirmed.
    #[must_use]
    pub fn display_url(&self) -> String {
        self.source.display_url(&self.username)
    }
}

/// Expand handles containing `{?}` into one variant per separator
/// (`""`, `"-"`, `"_"`). Other handles pass through unchanged.
///
/// ```rust
/// use argus_core::expand_usernames;
///
/// let expanded = expand_usernames(["john{?}doe".to_string()]);
/// assert_eq!(expanded, vec!["johndoe", "john-doe", "john_doe"]);
/// ```
pub fn expand_usernames<I>(usernames: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut expanded = Vec::new();
    for username in usernames {
        if username.contains(VARIANT_PLACEHOLDER) {
            expanded.extend(
                VARIANT_SEPARATORS
                    .iter()
                    .map(|sep| username.replace(VARIANT_PLACEHOLDER, sep)),
            );
        } else {
            expanded.push(username);
        }
    }
    expanded
}
