//! Shared result store, keyed `username → domain`.

use crate::deep_scan::DeepScanRecord;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A confirmed hit, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    /// Registrable domain of the display URL
    pub domain: String,
    pub display_url: String,
    pub picture_url: Option<String>,
    pub deep_scan: Option<DeepScanRecord>,
}

/// Everything found on one site for one username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteResult {
    pub domain: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deep_scan: Option<DeepScanRecord>,
}

#[derive(Debug, Default)]
struct StoreState {
    findings: HashMap<String, BTreeMap<String, String>>,
    pictures: HashMap<String, BTreeMap<String, String>>,
    deep_scans: HashMap<String, BTreeMap<String, DeepScanRecord>>,
}

/// Findings, picture URLs and deep-scan records for the whole run.
///
/// A later hit on the same domain replaces the earlier one.
#[derive(Debug, Default)]
pub struct ResultStore {
    state: Mutex<StoreState>,
}

impl ResultStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store every part of `hit` under one lock.
    pub fn record_hit(&self, username: &str, hit: Hit) {
        let mut state = self.lock();

        state
            .findings
            .entry(username.to_string())
            .or_default()
            .insert(hit.domain.clone(), hit.display_url);

        if let Some(picture) = hit.picture_url {
            state
                .pictures
                .entry(username.to_string())
                .or_default()
                .insert(hit.domain.clone(), picture);
        }

        if let Some(record) = hit.deep_scan {
            state
                .deep_scans
                .entry(username.to_string())
                .or_default()
                .insert(hit.domain, record);
        }
    }

    /// `domain → display URL` for `username`.
    #[must_use]
    pub fn findings(&self, username: &str) -> BTreeMap<String, String> {
        self.lock().findings.get(username).cloned().unwrap_or_default()
    }

    /// `domain → picture URL` for `username`.
    #[must_use]
    pub fn pictures(&self, username: &str) -> BTreeMap<String, String> {
        self.lock().pictures.get(username).cloned().unwrap_or_default()
    }

    /// `domain → deep-scan record` for `username`.
    #[must_use]
    pub fn deep_scans(&self, username: &str) -> BTreeMap<String, DeepScanRecord> {
        self.lock()
            .deep_scans
            .get(username)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of domains found for `username`.
    #[must_use]
    pub fn finding_count(&self, username: &str) -> usize {
        self.lock().findings.get(username).map_or(0, BTreeMap::len)
    }

    /// Number of domains found across all usernames.
    #[must_use]
    pub fn total_findings(&self) -> usize {
        self.lock().findings.values().map(BTreeMap::len).sum()
    }

    /// Joined view for `username`, ordered by domain.
    #[must_use]
    pub fn site_results(&self, username: &str) -> Vec<SiteResult> {
        let state = self.lock();
        let Some(findings) = state.findings.get(username) else {
            return Vec::new();
        };
        let pictures = state.pictures.get(username);
        let deep_scans = state.deep_scans.get(username);

        findings
            .iter()
            .map(|(domain, url)| SiteResult {
                domain: domain.clone(),
                url: url.clone(),
                picture_url: pictures.and_then(|p| p.get(domain)).cloned(),
                deep_scan: deep_scans.and_then(|d| d.get(domain)).cloned(),
            })
            .collect()
    }
}
