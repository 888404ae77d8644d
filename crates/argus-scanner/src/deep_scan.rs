//! Deep scan: configuration-driven attribute extraction from confirmed hits.
//!
//! `deepscan.json` maps a registrable domain to an ordered list of targets:
//!
//! ```json
//! {
//!   "github.com": {
//!     "targets": [
//!       { "name": "real_name", "selector": ".p-name" },
//!       { "name": "follower_count", "selector": "a[href$='followers'] span" },
//!       { "name": "description", "selector": ".p-note",
//!         "actions": [{ "type": "remove_if_contains", "value": "No bio" }] }
//!     ]
//!   }
//! }
//! ```

use crate::error::Result;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Per-domain extraction rules, read-only once loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeepScanConfig {
    domains: HashMap<String, DomainConfig>,
}

impl DeepScanConfig {
    /// Parse from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load `deepscan.json`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Rules for a registrable domain.
    #[must_use]
    pub fn domain(&self, domain: &str) -> Option<&DomainConfig> {
        self.domains.get(domain)
    }

    /// Number of configured domains.
    #[must_use]
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Ordered targets for one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainConfig {
    pub targets: Vec<DeepScanTarget>,
}

/// One field to extract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepScanTarget {
    /// Field name; `description`, `real_name`, `follower_count` and
    /// `following_count` are typed, anything else lands in `extra`
    pub name: String,
    /// CSS selector; the first match is used
    pub selector: String,
    /// Post-processing, applied in order
    #[serde(default)]
    pub actions: Vec<DeepScanAction>,
}

/// Post-processing step applied to extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DeepScanAction {
    /// Clear the text when it contains this substring.
    RemoveIfContains(String),
}

impl DeepScanAction {
    fn apply(&self, text: String) -> String {
        match self {
            Self::RemoveIfContains(needle) if text.contains(needle.as_str()) => String::new(),
            Self::RemoveIfContains(_) => text,
        }
    }
}

/// An attribute without a dedicated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraField {
    /// Title-cased field name
    pub title: String,
    pub value: String,
}

/// Structured attributes extracted from one hit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepScanRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follower_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<ExtraField>,
}

/// A present attribute of a [`DeepScanRecord`], for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeepScanField<'a> {
    Description(&'a str),
    RealName(&'a str),
    FollowerCount(u64),
    FollowingCount(u64),
    Extra(&'a ExtraField),
}

impl DeepScanField<'_> {
    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Description(_) => "Description",
            Self::RealName(_) => "Real Name",
            Self::FollowerCount(_) => "Followers",
            Self::FollowingCount(_) => "Following",
            Self::Extra(field) => &field.title,
        }
    }

    /// Rendered value.
    #[must_use]
    pub fn value(&self) -> String {
        match self {
            Self::Description(text) | Self::RealName(text) => (*text).to_string(),
            Self::FollowerCount(n) | Self::FollowingCount(n) => n.to_string(),
            Self::Extra(field) => field.value.clone(),
        }
    }
}

impl DeepScanRecord {
    /// Whether nothing was extracted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Present attributes in display order.
    #[must_use]
    pub fn fields(&self) -> Vec<DeepScanField<'_>> {
        let mut fields = Vec::with_capacity(4 + self.extra.len());
        if let Some(name) = &self.real_name {
            fields.push(DeepScanField::RealName(name));
        }
        if let Some(description) = &self.description {
            fields.push(DeepScanField::Description(description));
        }
        if let Some(n) = self.follower_count {
            fields.push(DeepScanField::FollowerCount(n));
        }
        if let Some(n) = self.following_count {
            fields.push(DeepScanField::FollowingCount(n));
        }
        fields.extend(self.extra.iter().map(DeepScanField::Extra));
        fields
    }

    fn assign(&mut self, name: &str, text: String) {
        match name {
            "description" => self.description = Some(text),
            "real_name" => self.real_name = Some(text),
            "follower_count" => match parse_shorthand_count(&text) {
                Some(n) => self.follower_count = Some(n),
                None => debug!(%text, "unparseable follower count"),
            },
            "following_count" => match parse_shorthand_count(&text) {
                Some(n) => self.following_count = Some(n),
                None => debug!(%text, "unparseable following count"),
            },
            other => self.extra.push(ExtraField {
                title: title_case(other),
                value: text,
            }),
        }
    }
}

/// Run every target of `config` against `body`.
///
/// Targets whose selector is invalid or matches nothing, or whose text is
/// empty after the actions, are skipped.
#[must_use]
pub fn extract(body: &str, config: &DomainConfig) -> DeepScanRecord {
    let document = Html::parse_document(body);
    let mut record = DeepScanRecord::default();

    for target in &config.targets {
        let selector = match Selector::parse(&target.selector) {
            Ok(selector) => selector,
            Err(e) => {
                debug!(selector = %target.selector, error = %e, "invalid deep-scan selector");
                continue;
            }
        };

        let Some(element) = document.select(&selector).next() else {
            continue;
        };

        let text = element.text().collect::<String>().trim().to_string();
        let text = target
            .actions
            .iter()
            .fold(text, |text, action| action.apply(text));
        if text.is_empty() {
            continue;
        }

        record.assign(&target.name, text);
    }

    record
}

/// Parse counts such as `1.5K`, `2m`, `10,000` or `3B`.
///
/// ```rust
/// use argus_scanner::deep_scan::parse_shorthand_count;
///
/// assert_eq!(parse_shorthand_count("12.3K"), Some(12_300));
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn parse_shorthand_count(text: &str) -> Option<u64> {
    let cleaned = text.trim().to_uppercase().replace(',', "");

    let (number, multiplier) = match cleaned.chars().last()? {
        'K' => (&cleaned[..cleaned.len() - 1], 1e3),
        'M' => (&cleaned[..cleaned.len() - 1], 1e6),
        'B' => (&cleaned[..cleaned.len() - 1], 1e9),
        _ => (cleaned.as_str(), 1.0),
    };

    let value = number.trim().parse::<f64>().ok()? * multiplier;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value.round() as u64)
}

/// `public_post_count` → `Public Post Count`.
#[must_use]
pub fn title_case(name: &str) -> String {
    name.split(|c: char| c == '_' || c == '-' || c.is_whitespace())
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
