//! Profile-picture extraction from a confirmed hit's page.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

/// `(selector, attribute)` pairs in priority order.
const STRATEGIES: &[(&str, &str)] = &[
    (r#"meta[property="og:image"]"#, "content"),
    (r#"meta[property="og:image:secure_url"]"#, "content"),
    (r#"meta[name="twitter:image"]"#, "content"),
    (r#"meta[name="twitter:image:src"]"#, "content"),
    (r#"img[class*="avatar"]"#, "src"),
    (r#"img[class*="profile"]"#, "src"),
    (r#"img[id*="avatar"]"#, "src"),
    (r#"img[id*="profile"]"#, "src"),
    (r#"img[alt*="avatar"]"#, "src"),
    (r#"img[alt*="profile"]"#, "src"),
    ("article img[src]", "src"),
    ("header img[src]", "src"),
    (r#"link[rel="apple-touch-icon"]"#, "href"),
    (r#"link[rel="icon"]"#, "href"),
    (r#"link[rel="shortcut icon"]"#, "href"),
];

/// Compiled strategies (initialized once)
static COMPILED: Lazy<Vec<(Selector, &'static str)>> = Lazy::new(|| {
    STRATEGIES
        .iter()
        .filter_map(|(selector, attr)| Selector::parse(selector).ok().map(|s| (s, *attr)))
        .collect()
});

/// URL of the profile picture on `body`, resolved against `base_url`.
///
/// Only the first element matching each strategy is considered; a strategy
/// whose element lacks the attribute falls through to the next one.
#[must_use]
pub fn extract_profile_picture(body: &str, base_url: &str) -> Option<String> {
    let base = Url::parse(base_url).ok()?;
    let document = Html::parse_document(body);

    COMPILED.iter().find_map(|(selector, attr)| {
        let element = document.select(selector).next()?;
        let raw = element.value().attr(attr).map(str::trim)?;
        if raw.is_empty() {
            return None;
        }
        base.join(raw).ok().map(String::from)
    })
}
