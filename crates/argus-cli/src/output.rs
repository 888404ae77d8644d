//! Result files: one per username and format.

use anyhow::{Context, Result};
use argus_scanner::{ResultStore, SiteResult};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const RULE: &str = "==================================================";
const THIN_RULE: &str = "--------------------------------------------------";

/// Result file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "txt",
        }
    }

    fn render(self, username: &str, sites: &[SiteResult], timestamp: &str) -> Result<String> {
        match self {
            Self::Json => render_json(username, sites, timestamp),
            Self::Text => Ok(render_text(username, sites, timestamp)),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    username: &'a str,
    timestamp: &'a str,
    sites: &'a [SiteResult],
}

/// Pretty-printed JSON report.
pub fn render_json(username: &str, sites: &[SiteResult], timestamp: &str) -> Result<String> {
    let report = JsonReport {
        username,
        timestamp,
        sites,
    };
    serde_json::to_string_pretty(&report).context("failed to serialize results")
}

/// Plain-text report, deep-scan attributes indented under their site.
#[must_use]
pub fn render_text(username: &str, sites: &[SiteResult], timestamp: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "           Argus Scan Results");
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Username: {username}");
    let _ = writeln!(out, "Timestamp: {timestamp}");
    let _ = writeln!(out, "{THIN_RULE}");

    for site in sites {
        let _ = writeln!(out, "[+] {:<14} => {:<45}", site.domain, site.url);
        if let Some(picture) = &site.picture_url {
            let _ = writeln!(out, "    {:<16}: {picture}", "Profile Picture");
        }
        if let Some(record) = &site.deep_scan {
            for field in record.fields() {
                let _ = writeln!(out, "    {:<16}: {}", field.label(), field.value());
            }
        }
    }

    let _ = writeln!(out, "{} sites found for {username}", sites.len());
    out
}

/// Where the result file for `username` goes. With several usernames each
/// gets its own subdirectory.
#[must_use]
pub fn result_path(dir: &Path, username: &str, format: OutputFormat, several: bool) -> PathBuf {
    let file_name = format!("{username}_results.{}", format.extension());
    if several {
        dir.join(username).join(file_name)
    } else {
        dir.join(file_name)
    }
}

/// Write every requested format for every username; returns the paths.
pub fn write_results(
    dir: &Path,
    usernames: &[String],
    store: &ResultStore,
    formats: &[OutputFormat],
    now: DateTime<Local>,
) -> Result<Vec<PathBuf>> {
    let timestamp = now.format(TIMESTAMP_FORMAT).to_string();
    let several = usernames.len() > 1;
    let mut written = Vec::new();

    for username in usernames {
        let sites = store.site_results(username);
        for format in formats {
            let path = result_path(dir, username, *format, several);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            let contents = format.render(username, &sites, &timestamp)?;
            fs::write(&path, contents)
                .with_context(|| format!("failed to write {}", path.display()))?;
            written.push(path);
        }
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_scanner::{DeepScanRecord, Hit};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn store() -> ResultStore {
        let store = ResultStore::new();
        store.record_hit(
            "alice",
            Hit {
                domain: "site.test".to_string(),
                display_url: "https://site.test/alice".to_string(),
                picture_url: Some("https://site.test/alice.png".to_string()),
                deep_scan: Some(DeepScanRecord {
                    follower_count: Some(12_300),
                    ..DeepScanRecord::default()
                }),
            },
        );
        store
    }

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_json_report_shape() {
        let json = render_json("alice", &store().site_results("alice"), "2025-03-01 12:30:00")
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["username"], "alice");
        assert_eq!(value["timestamp"], "2025-03-01 12:30:00");
        assert_eq!(value["sites"][0]["domain"], "site.test");
        assert_eq!(value["sites"][0]["url"], "https://site.test/alice");
        assert_eq!(value["sites"][0]["deep_scan"]["follower_count"], 12300);
    }

    #[test]
    fn test_text_report() {
        let text = render_text("alice", &store().site_results("alice"), "2025-03-01 12:30:00");

        assert!(text.contains("Argus Scan Results"));
        assert!(text.contains("Username: alice"));
        assert!(text.contains("[+] site.test"));
        assert!(text.contains("Followers       : 12300"));
        assert!(text.ends_with("1 sites found for alice\n"));
    }

    #[test]
    fn test_result_paths() {
        let dir = Path::new("/out");
        assert_eq!(
            result_path(dir, "alice", OutputFormat::Json, false),
            PathBuf::from("/out/alice_results.json")
        );
        assert_eq!(
            result_path(dir, "alice", OutputFormat::Text, true),
            PathBuf::from("/out/alice/alice_results.txt")
        );
    }

    #[test]
    fn test_write_results() {
        let tmp = TempDir::new().unwrap();
        let usernames = vec!["alice".to_string(), "bob".to_string()];

        let written = write_results(
            tmp.path(),
            &usernames,
            &store(),
            &[OutputFormat::Json, OutputFormat::Text],
            now(),
        )
        .unwrap();

        assert_eq!(written.len(), 4);
        let bob = fs::read_to_string(tmp.path().join("bob/bob_results.txt")).unwrap();
        assert!(bob.contains("0 sites found for bob"));
        let alice = fs::read_to_string(tmp.path().join("alice/alice_results.json")).unwrap();
        assert!(alice.contains("2025-03-01 12:30:00"));
    }
}
