//! Parsers for the newline-delimited input lists.
//!
//! Two formats exist:
//!
//! - The source list: one `request|display` template pair per line. Blank
//!   lines and lines starting with `#` are skipped.
//! - Plain lists (fingerprints, bad redirects, user agents, proxies,
//!   usernames): one entry per line, `#` starts a whole-line or inline
//!   comment, entries are trimmed.

use crate::error::{ArgusError, Result};
use crate::types::Source;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Parse the contents of a source list.
#[must_use]
pub fn parse_sources(contents: &str) -> Vec<Source> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(Source::parse)
        .collect()
}

/// Parse a plain newline-delimited list, dropping comments and blanks.
#[must_use]
pub fn parse_list(contents: &str) -> Vec<String> {
    contents
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.starts_with('#') {
                return None;
            }
            let entry = match line.find('#') {
                Some(idx) => line[..idx].trim(),
                None => line,
            };
            (!entry.is_empty()).then(|| entry.to_string())
        })
        .collect()
}

/// Load a required source list from disk.
pub fn load_sources(path: &Path) -> Result<Vec<Source>> {
    let contents = read(path, "sources")?;
    let sources = parse_sources(&contents);
    debug!(path = %path.display(), count = sources.len(), "loaded sources");
    Ok(sources)
}

/// Load a required plain list from disk.
pub fn load_list(path: &Path, name: &str) -> Result<Vec<String>> {
    let contents = read(path, name)?;
    let entries = parse_list(&contents);
    debug!(path = %path.display(), list = name, count = entries.len(), "loaded list");
    Ok(entries)
}

/// Load an optional plain list; a missing file yields an empty list.
pub fn load_optional_list(path: &Path, name: &str) -> Result<Vec<String>> {
    if path.exists() {
        load_list(path, name)
    } else {
        debug!(path = %path.display(), list = name, "optional list not present");
        Ok(Vec::new())
    }
}

fn read(path: &Path, name: &str) -> Result<String> {
    fs::read_to_string(path).map_err(|source| ArgusError::ListLoad {
        name: name.to_string(),
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_sources_skips_comments_and_blanks() {
        let contents = "# header\n\nhttps://a.test/{U}\n  https://b.test/api/{U}|https://b.test/{U}  \n";
        let sources = parse_sources(contents);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].request_url("x"), "https://a.test/x");
        assert_eq!(sources[1].request_url("x"), "https://b.test/api/x");
        assert_eq!(sources[1].display_url("x"), "https://b.test/x");
    }

    #[test]
    fn test_parse_list_strips_inline_comments() {
        let contents = "user not found  # generic\n# full line\n\n  gone {U}  \n#\n   # indented comment\n";
        assert_eq!(parse_list(contents), vec!["user not found", "gone {U}"]);
    }

    #[test]
    fn test_parse_list_drops_entry_that_is_only_comment() {
        assert!(parse_list("   #nothing here").is_empty());
    }

    #[test]
    fn test_load_optional_list_missing_file() {
        let tmp = TempDir::new().expect("create temp dir");
        let entries = load_optional_list(&tmp.path().join("absent.txt"), "fingerprints")
            .expect("missing optional list is not an error");
        assert!(entries.is_empty());
    }

    #[test]
    fn test_load_sources_missing_file_is_error() {
        let tmp = TempDir::new().expect("create temp dir");
        let err = load_sources(&tmp.path().join("sources.txt")).unwrap_err();
        assert!(matches!(err, ArgusError::ListLoad { ref name, .. } if name == "sources"));
    }

    #[test]
    fn test_load_list_from_disk() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("UserAgents.txt");
        fs::write(&path, "Mozilla/5.0 A\nMozilla/5.0 B # second\n").expect("write list");
        let agents = load_list(&path, "user agents").expect("load list");
        assert_eq!(agents, vec!["Mozilla/5.0 A", "Mozilla/5.0 B"]);
    }
}
