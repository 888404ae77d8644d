//! Existence verification.
//!
//! A fetched page passes through six checks, cheapest first, and the first
//! negative signal ends the pipeline:
//!
//! 1. status 404 or 410
//! 2. any other error status
//! 3. body does not mention the username
//! 4. body contains a soft-404 fingerprint
//! 5. body matches the page rendered for a made-up username
//! 6. the verdict oracle says no

use crate::fetcher::{FetchResult, PageFetcher};
use argus_core::{ProbeJob, USERNAME_PLACEHOLDER};
use argus_llm::{OracleOutcome, VerdictOracle};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Length of the synthetic username used by the differential probe.
pub const SYNTHETIC_USERNAME_LEN: usize = 30;

/// Placeholder for the display URL in the oracle prompt template.
pub const SITE_PLACEHOLDER: &str = "{S}";

/// Soft-404 phrases checked on every page, before any from `404checks.txt`.
pub const DEFAULT_FINGERPRINTS: &[&str] = &[
    "user not found",
    "profile not found",
    "could not find user",
    "this profile is not available",
    "user does not exist",
    "the user you are looking for does not exist",
    "account not found",
    "no user with that name",
    "username is not available",
    "this user does not have a profile",
    "page not found",
    "the page you were looking for",
    "couldn't find this page",
    "the requested url was not found on this server",
    "we can't find that page",
    "the resource cannot be found",
    "this page is not available",
    "the page you are looking for is not here",
    "there isn't a page here",
    "sorry, we can't find that page",
    "sorry, this page is not available",
    "oops, that page can't be found",
    "whoops, something went wrong",
    "uh oh, page not found",
    "it looks like nothing was found at this location",
    "the link you followed may be broken",
    "check the url for typos",
    "404 not found",
    "404 error",
];

/// Prompt used when `html_check.txt` is absent.
pub const DEFAULT_VERDICT_PROMPT: &str = "You are checking whether a web page is a real, existing \
profile. The page was fetched from {S} while looking for the username \"{U}\". Reply with the \
single word true if the page shows an existing profile belonging to \"{U}\", otherwise reply \
with the single word false.";

/// Why a page was judged not to belong to an existing account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundReason {
    /// 404 or 410
    Missing(u16),
    /// Any other 4xx/5xx
    ErrorStatus(u16),
    /// Soft 404: the username is not echoed anywhere in the body
    UsernameAbsent,
    /// Soft 404: a fingerprint phrase matched
    Fingerprint(String),
    /// The page is identical to the one rendered for a nonexistent user
    SameAsNonexistent,
    /// The verdict oracle answered something other than `true`
    OracleRejected,
    /// The oracle was unavailable and the fallback policy is fail-closed
    OracleUnavailable,
}

impl fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(status) => write!(f, "status {status}"),
            Self::ErrorStatus(status) => write!(f, "error status {status}"),
            Self::UsernameAbsent => f.write_str("soft 404, username not in body"),
            Self::Fingerprint(phrase) => write!(f, "soft 404, matched \"{phrase}\""),
            Self::SameAsNonexistent => f.write_str("same as nonexistent user"),
            Self::OracleRejected => f.write_str("rejected by AI verdict"),
            Self::OracleUnavailable => f.write_str("AI verdict unavailable"),
        }
    }
}

/// Outcome of verifying one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The account exists
    Confirmed,
    /// The account does not exist
    NotFound(NotFoundReason),
    /// No decision could be made (fetch failed, unexpected status); dropped
    Inconclusive(String),
}

impl Verdict {
    /// Whether this verdict records a hit.
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

/// Soft-404 fingerprint phrases.
#[derive(Debug, Clone, Default)]
pub struct FingerprintSet {
    phrases: Vec<String>,
}

impl FingerprintSet {
    /// Exactly the given phrases.
    #[must_use]
    pub fn new(phrases: Vec<String>) -> Self {
        Self { phrases }
    }

    /// Built-in phrases followed by `extra`.
    #[must_use]
    pub fn with_defaults(extra: impl IntoIterator<Item = String>) -> Self {
        let phrases = DEFAULT_FINGERPRINTS
            .iter()
            .map(ToString::to_string)
            .chain(extra)
            .collect();
        Self { phrases }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// First phrase found in `body_lower`, with `{U}` replaced by the
    /// lower-cased username before comparing.
    #[must_use]
    pub fn find_in(&self, body_lower: &str, username_lower: &str) -> Option<&str> {
        self.phrases
            .iter()
            .find(|phrase| {
                let needle = phrase
                    .replace(USERNAME_PLACEHOLDER, username_lower)
                    .to_lowercase();
                body_lower.contains(&needle)
            })
            .map(String::as_str)
    }
}

/// A random alphanumeric username that almost certainly belongs to no one.
#[must_use]
pub fn synthetic_username() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SYNTHETIC_USERNAME_LEN)
        .map(char::from)
        .collect()
}

/// Fill the oracle prompt template.
#[must_use]
pub fn render_prompt(template: &str, display_url: &str, username: &str) -> String {
    template
        .replace(SITE_PLACEHOLDER, display_url)
        .replace(USERNAME_PLACEHOLDER, username)
}

/// Runs the verification pipeline.
pub struct ExistenceVerifier {
    fingerprints: FingerprintSet,
    oracle: Arc<VerdictOracle>,
    prompt_template: String,
}

impl ExistenceVerifier {
    #[must_use]
    pub fn new(fingerprints: FingerprintSet, oracle: Arc<VerdictOracle>) -> Self {
        Self {
            fingerprints,
            oracle,
            prompt_template: DEFAULT_VERDICT_PROMPT.to_string(),
        }
    }

    /// Replace the oracle prompt template (`{S}` and `{U}` placeholders).
    #[must_use]
    pub fn with_prompt_template(mut self, template: impl Into<String>) -> Self {
        self.prompt_template = template.into();
        self
    }

    /// Whether the oracle stage is part of the pipeline for this run.
    #[must_use]
    pub fn uses_oracle(&self) -> bool {
        self.oracle.is_configured()
    }

    /// Judge `page`, fetched for `job`. `fetcher` serves the differential
    /// probe.
    pub async fn verify(
        &self,
        job: &ProbeJob,
        page: &FetchResult,
        fetcher: &dyn PageFetcher,
    ) -> Verdict {
        if let Some(verdict) = Self::check_status(page.status) {
            return verdict;
        }

        let body_lower = page.body.to_lowercase();
        let username_lower = job.username.to_lowercase();

        if !body_lower.contains(&username_lower) {
            return Verdict::NotFound(NotFoundReason::UsernameAbsent);
        }

        if let Some(phrase) = self.fingerprints.find_in(&body_lower, &username_lower) {
            return Verdict::NotFound(NotFoundReason::Fingerprint(phrase.to_string()));
        }

        if Self::matches_nonexistent(job, &body_lower, &username_lower, fetcher).await {
            return Verdict::NotFound(NotFoundReason::SameAsNonexistent);
        }

        self.ask_oracle(job, &page.body).await
    }

    fn check_status(status: u16) -> Option<Verdict> {
        match status {
            404 | 410 => Some(Verdict::NotFound(NotFoundReason::Missing(status))),
            400..=599 => Some(Verdict::NotFound(NotFoundReason::ErrorStatus(status))),
            200..=299 => None,
            _ => Some(Verdict::Inconclusive(format!("unexpected status {status}"))),
        }
    }

    /// Differential probe. Lower-cases the probe body and substitutes the
    /// real username for the synthetic one before comparing. A probe that
    /// fails or returns a non-2xx status cannot disprove the hit.
    async fn matches_nonexistent(
        job: &ProbeJob,
        body_lower: &str,
        username_lower: &str,
        fetcher: &dyn PageFetcher,
    ) -> bool {
        let synthetic = synthetic_username();
        let probe_url = job.source.request_url(&synthetic);

        match fetcher.fetch(&probe_url).await {
            Ok(probe) if probe.is_success() => {
                let probe_lower = probe
                    .body
                    .to_lowercase()
                    .replace(&synthetic.to_lowercase(), username_lower);
                probe_lower == body_lower
            }
            Ok(probe) => {
                debug!(url = %probe_url, status = probe.status, "differential probe not found");
                false
            }
            Err(e) => {
                debug!(url = %probe_url, error = %e, "differential probe failed");
                false
            }
        }
    }

    async fn ask_oracle(&self, job: &ProbeJob, body: &str) -> Verdict {
        if !self.oracle.is_configured() {
            return Verdict::Confirmed;
        }

        let display_url = job.display_url();
        let prompt = render_prompt(&self.prompt_template, &display_url, &job.username);

        match self.oracle.check(&prompt, body).await {
            outcome @ OracleOutcome::Answer(_) => {
                debug!(url = %display_url, outcome = ?outcome, "AI verdict");
                if outcome.is_affirmative() {
                    Verdict::Confirmed
                } else {
                    Verdict::NotFound(NotFoundReason::OracleRejected)
                }
            }
            OracleOutcome::Unavailable => self.fallback(),
        }
    }

    /// Verdict when the oracle cannot answer.
    fn fallback(&self) -> Verdict {
        if self.oracle.fails_open() {
            Verdict::Confirmed
        } else {
            Verdict::NotFound(NotFoundReason::OracleUnavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, ScanError};
    use argus_core::Source;
    use argus_llm::{
        CompletionRequest, CompletionResponse, GovernorSettings, LlmError, LlmProvider,
        OracleSettings, RateGovernor,
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves pages from a closure and records requested URLs.
    struct FnFetcher<F> {
        serve: F,
        requested: Mutex<Vec<String>>,
    }

    impl<F> FnFetcher<F>
    where
        F: Fn(&str) -> Option<FetchResult> + Send + Sync,
    {
        fn new(serve: F) -> Self {
            Self {
                serve,
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl<F> PageFetcher for FnFetcher<F>
    where
        F: Fn(&str) -> Option<FetchResult> + Send + Sync,
    {
        async fn fetch(&self, url: &str) -> Result<FetchResult> {
            self.requested.lock().unwrap().push(url.to_string());
            (self.serve)(url).ok_or_else(|| {
                ScanError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "offline",
                ))
            })
        }
    }

    struct FixedAnswer(&'static str);

    #[async_trait]
    impl LlmProvider for FixedAnswer {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> argus_llm::Result<CompletionResponse> {
            Ok(CompletionResponse {
                content: self.0.to_string(),
                model: "fixed".to_string(),
                usage: None,
            })
        }

        fn provider_id(&self) -> &str {
            "fixed"
        }
    }

    struct Broken;

    #[async_trait]
    impl LlmProvider for Broken {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> argus_llm::Result<CompletionResponse> {
            Err(LlmError::Internal("down".to_string()))
        }

        fn provider_id(&self) -> &str {
            "broken"
        }
    }

    fn page(status: u16, body: &str) -> FetchResult {
        FetchResult {
            status,
            final_url: "https://site.test/alice".to_string(),
            body: body.to_string(),
        }
    }

    fn job(username: &str) -> ProbeJob {
        ProbeJob::new(
            Arc::from(username),
            Arc::new(Source::parse("https://site.test/{U}")),
        )
    }

    fn verifier_with(oracle: VerdictOracle) -> ExistenceVerifier {
        ExistenceVerifier::new(FingerprintSet::with_defaults(Vec::new()), Arc::new(oracle))
    }

    fn verifier() -> ExistenceVerifier {
        verifier_with(VerdictOracle::disabled(OracleSettings::default()))
    }

    fn oracle_over(provider: impl LlmProvider + 'static, fail_open: bool) -> VerdictOracle {
        VerdictOracle::new(
            Arc::new(provider),
            Arc::new(RateGovernor::new(GovernorSettings::default())),
            OracleSettings {
                fail_open,
                ..OracleSettings::default()
            },
        )
    }

    fn offline() -> FnFetcher<impl Fn(&str) -> Option<FetchResult> + Send + Sync> {
        FnFetcher::new(|_: &str| None)
    }

    #[tokio::test]
    async fn test_missing_status_wins_over_body() {
        let fetcher = offline();
        for status in [404, 410] {
            let verdict = verifier()
                .verify(&job("alice"), &page(status, "alice's profile"), &fetcher)
                .await;
            assert_eq!(verdict, Verdict::NotFound(NotFoundReason::Missing(status)));
        }
        assert!(fetcher.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_other_error_status() {
        let verdict = verifier()
            .verify(&job("alice"), &page(503, "alice"), &offline())
            .await;
        assert_eq!(verdict, Verdict::NotFound(NotFoundReason::ErrorStatus(503)));
    }

    #[tokio::test]
    async fn test_redirect_status_is_inconclusive() {
        let verdict = verifier()
            .verify(&job("alice"), &page(302, "alice"), &offline())
            .await;
        assert!(matches!(verdict, Verdict::Inconclusive(_)));
    }

    #[tokio::test]
    async fn test_username_must_appear_in_body() {
        let verdict = verifier()
            .verify(&job("alice"), &page(200, "<h1>Welcome</h1>"), &offline())
            .await;
        assert_eq!(verdict, Verdict::NotFound(NotFoundReason::UsernameAbsent));

        let verdict = verifier()
            .verify(&job("ALICE"), &page(200, "<h1>alice</h1>"), &offline())
            .await;
        assert_eq!(verdict, Verdict::Confirmed);
    }

    #[tokio::test]
    async fn test_fingerprint_with_username_placeholder() {
        let verifier = ExistenceVerifier::new(
            FingerprintSet::new(vec!["no account named {U}".to_string()]),
            Arc::new(VerdictOracle::disabled(OracleSettings::default())),
        );
        let verdict = verifier
            .verify(
                &job("Alice"),
                &page(200, "Sorry, No Account Named ALICE here"),
                &offline(),
            )
            .await;
        assert_eq!(
            verdict,
            Verdict::NotFound(NotFoundReason::Fingerprint(
                "no account named {U}".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_template_page_is_not_found() {
        let fetcher = FnFetcher::new(|url: &str| {
            let name = url.rsplit('/').next().unwrap_or_default();
            Some(page(200, &format!("<title>Profile</title><p>{name}</p>")))
        });

        let verdict = verifier()
            .verify(
                &job("alice"),
                &page(200, "<title>Profile</title><p>alice</p>"),
                &fetcher,
            )
            .await;

        assert_eq!(verdict, Verdict::NotFound(NotFoundReason::SameAsNonexistent));
        let requested = fetcher.requested.lock().unwrap();
        assert_eq!(requested.len(), 1);
        assert!(requested[0].starts_with("https://site.test/"));
        assert_eq!(
            requested[0].len(),
            "https://site.test/".len() + SYNTHETIC_USERNAME_LEN
        );
    }

    #[tokio::test]
    async fn test_differential_difference_or_failure_does_not_block() {
        let different = FnFetcher::new(|_: &str| Some(page(200, "<p>nobody home</p>")));
        let verdict = verifier()
            .verify(&job("alice"), &page(200, "<p>alice</p>"), &different)
            .await;
        assert_eq!(verdict, Verdict::Confirmed);

        let missing = FnFetcher::new(|_: &str| Some(page(404, "<p>alice</p>")));
        let verdict = verifier()
            .verify(&job("alice"), &page(200, "<p>alice</p>"), &missing)
            .await;
        assert_eq!(verdict, Verdict::Confirmed);
    }

    #[tokio::test]
    async fn test_oracle_answers_decide() {
        let yes = verifier_with(oracle_over(FixedAnswer(" True \n"), true));
        let verdict = yes
            .verify(&job("alice"), &page(200, "alice"), &offline())
            .await;
        assert_eq!(verdict, Verdict::Confirmed);

        let no = verifier_with(oracle_over(FixedAnswer("false"), true));
        let verdict = no
            .verify(&job("alice"), &page(200, "alice"), &offline())
            .await;
        assert_eq!(verdict, Verdict::NotFound(NotFoundReason::OracleRejected));
    }

    #[tokio::test]
    async fn test_unavailable_oracle_follows_fallback_policy() {
        let open = verifier_with(oracle_over(Broken, true));
        assert_eq!(
            open.verify(&job("alice"), &page(200, "alice"), &offline())
                .await,
            Verdict::Confirmed
        );

        let closed = verifier_with(oracle_over(Broken, false));
        assert_eq!(
            closed
                .verify(&job("alice"), &page(200, "alice"), &offline())
                .await,
            Verdict::NotFound(NotFoundReason::OracleUnavailable)
        );
    }

    #[test]
    fn test_synthetic_username_shape() {
        let name = synthetic_username();
        assert_eq!(name.len(), SYNTHETIC_USERNAME_LEN);
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(name, synthetic_username());
    }

    #[test]
    fn test_render_prompt() {
        let prompt = render_prompt("Is {S} the profile of {U}? {U}!", "https://x.test/a", "a");
        assert_eq!(prompt, "Is https://x.test/a the profile of a? a!");
    }

    #[test]
    fn test_default_fingerprints_are_lowercase() {
        let set = FingerprintSet::with_defaults(vec!["Extra Phrase".to_string()]);
        assert_eq!(set.len(), DEFAULT_FINGERPRINTS.len() + 1);
        assert!(DEFAULT_FINGERPRINTS
            .iter()
            .all(|phrase| *phrase == phrase.to_lowercase()));
        assert_eq!(
            set.find_in("an extra phrase appears", "bob"),
            Some("Extra Phrase")
        );
    }
}
