//! End-to-end scans against an in-memory web.

use argus_core::{ProbeJob, Source};
use argus_llm::{
    CompletionRequest, CompletionResponse, GovernorSettings, LlmProvider, OracleSettings,
    RateGovernor, VerdictOracle,
};
use argus_scanner::{
    DeepScanConfig, ExistenceVerifier, FetchResult, FetcherFactory, FingerprintSet, PageFetcher,
    ResultStore, ScanObserver, ScanOrchestrator, ScanSession, Verdict,
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

type Serve = dyn Fn(&str) -> Option<(u16, String)> + Send + Sync;

/// Serves pages from a closure; unknown URLs get an empty 404.
struct FakeWeb {
    serve: Box<Serve>,
}

#[async_trait]
impl PageFetcher for FakeWeb {
    async fn fetch(&self, url: &str) -> argus_scanner::Result<FetchResult> {
        let (status, body) = (self.serve)(url).unwrap_or((404, String::new()));
        Ok(FetchResult {
            status,
            final_url: url.to_string(),
            body,
        })
    }
}

struct FakeWebFactory(Arc<FakeWeb>);

impl FetcherFactory for FakeWebFactory {
    fn fetcher_for(&self, _username: &Arc<str>) -> argus_scanner::Result<Arc<dyn PageFetcher>> {
        Ok(Arc::clone(&self.0) as Arc<dyn PageFetcher>)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Start(String),
    Job(String),
    Hit(String, String),
    Done(String, usize),
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl Recorder {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

impl ScanObserver for Recorder {
    fn on_username_start(&self, username: &str, _index: usize, _total: usize, _jobs: usize) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Start(username.to_string()));
    }

    fn on_job_complete(&self, job: &ProbeJob, _verdict: &Verdict) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Job(job.username.to_string()));
    }

    fn on_hit(&self, _username: &str, domain: &str, url: &str) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Hit(domain.to_string(), url.to_string()));
    }

    fn on_username_complete(&self, username: &str, findings: usize) {
        self.events
            .lock()
            .unwrap()
            .push(Event::Done(username.to_string(), findings));
    }
}

struct AlwaysFalse;

#[async_trait]
impl LlmProvider for AlwaysFalse {
    async fn complete(&self, _request: CompletionRequest) -> argus_llm::Result<CompletionResponse> {
        Ok(CompletionResponse {
            content: "false".to_string(),
            model: "fake".to_string(),
            usage: None,
        })
    }

    fn provider_id(&self) -> &str {
        "fake"
    }
}

fn web(
    serve: impl Fn(&str) -> Option<(u16, String)> + Send + Sync + 'static,
) -> Arc<dyn FetcherFactory> {
    Arc::new(FakeWebFactory(Arc::new(FakeWeb {
        serve: Box::new(serve),
    })))
}

fn sources(lines: &[&str]) -> Vec<Source> {
    lines.iter().map(|line| Source::parse(line)).collect()
}

fn verifier(oracle: VerdictOracle) -> Arc<ExistenceVerifier> {
    Arc::new(ExistenceVerifier::new(
        FingerprintSet::with_defaults(Vec::new()),
        Arc::new(oracle),
    ))
}

fn no_ai() -> VerdictOracle {
    VerdictOracle::disabled(OracleSettings::default())
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(ToString::to_string).collect()
}

async fn scan(session: ScanSession, usernames: &[&str]) -> Arc<ResultStore> {
    let store = Arc::clone(session.store());
    ScanOrchestrator::new(session).run(&names(usernames)).await;
    store
}

#[tokio::test]
async fn test_profile_page_is_recorded() {
    let fetchers = web(|url| match url {
        "https://site.test/alice" => Some((200, "Alice's profile".to_string())),
        _ => None,
    });
    let session = ScanSession::new(
        sources(&["https://site.test/{U}|https://site.test/{U}"]),
        verifier(no_ai()),
        fetchers,
        Arc::new(ResultStore::new()),
    );

    let store = scan(session, &["alice"]).await;

    let findings = store.findings("alice");
    assert_eq!(findings.len(), 1);
    assert_eq!(findings["site.test"], "https://site.test/alice");
}

#[tokio::test]
async fn test_fingerprint_page_is_not_recorded() {
    for body in ["User not found", "alice? User not found"] {
        let fetchers = web(move |url| {
            (url == "https://site.test/alice").then(|| (200, body.to_string()))
        });
        let session = ScanSession::new(
            sources(&["https://site.test/{U}|https://site.test/{U}"]),
            verifier(no_ai()),
            fetchers,
            Arc::new(ResultStore::new()),
        );

        let store = scan(session, &["alice"]).await;
        assert!(store.findings("alice").is_empty(), "body {body:?} was recorded");
    }
}

#[tokio::test]
async fn test_missing_status_never_records() {
    let fetchers = web(|url| {
        url.starts_with("https://site.test/")
            .then(|| (404, "alice alice alice".to_string()))
    });
    let session = ScanSession::new(
        sources(&["https://site.test/{U}"]),
        verifier(no_ai()),
        fetchers,
        Arc::new(ResultStore::new()),
    );

    let store = scan(session, &["alice"]).await;
    assert_eq!(store.total_findings(), 0);
}

#[tokio::test]
async fn test_template_page_is_not_recorded() {
    // Renders the same page for any handle.
    let fetchers = web(|url| {
        let handle = url.strip_prefix("https://tmpl.test/u/")?;
        Some((200, format!("<h1>{handle}</h1><p>Join today!</p>")))
    });
    let session = ScanSession::new(
        sources(&["https://tmpl.test/u/{U}"]),
        verifier(no_ai()),
        fetchers,
        Arc::new(ResultStore::new()),
    );

    let store = scan(session, &["alice"]).await;
    assert!(store.findings("alice").is_empty());
}

#[tokio::test]
async fn test_deep_scan_follower_count() {
    let fetchers = web(|url| {
        (url == "https://site.test/alice").then(|| {
            (
                200,
                r#"<h1>alice</h1><span class="followers">12.3K</span>"#.to_string(),
            )
        })
    });
    let config = DeepScanConfig::from_json(
        r#"{"site.test":{"targets":[{"name":"follower_count","selector":".followers"}]}}"#,
    )
    .unwrap();
    let session = ScanSession::new(
        sources(&["https://site.test/{U}"]),
        verifier(no_ai()),
        fetchers,
        Arc::new(ResultStore::new()),
    )
    .with_deep_scan(Arc::new(config));

    let store = scan(session, &["alice"]).await;

    let records = store.deep_scans("alice");
    assert_eq!(records["site.test"].follower_count, Some(12_300));
}

#[tokio::test]
async fn test_job_count_and_username_barrier() {
    let fetchers = web(|url| {
        let handle = url.rsplit('/').next()?;
        (handle.len() < 10).then(|| (200, format!("profile of {handle}")))
    });
    let recorder = Arc::new(Recorder::default());
    let session = ScanSession::new(
        sources(&[
            "https://a.test/{U}",
            "https://b.test/{U}",
            "https://c.test/{U}",
            "https://d.test/{U}",
        ]),
        verifier(no_ai()),
        fetchers,
        Arc::new(ResultStore::new()),
    )
    .with_concurrency(3, 3)
    .with_observer(Arc::clone(&recorder) as Arc<dyn ScanObserver>);

    let report = ScanOrchestrator::new(session)
        .run(&names(&["alice", "bob", "carol"]))
        .await;

    assert_eq!(report.jobs_completed(), 3 * 4);
    assert_eq!(report.findings(), 3 * 4);

    let events = recorder.events();
    let jobs = events.iter().filter(|e| matches!(e, Event::Job(_))).count();
    assert_eq!(jobs, 12);

    // Every event for a username sits between its Start and Done.
    let mut current = None;
    for event in &events {
        match event {
            Event::Start(name) => {
                assert!(current.is_none(), "usernames overlapped");
                current = Some(name.clone());
            }
            Event::Job(name) => assert_eq!(current.as_ref(), Some(name)),
            Event::Hit(_, url) => assert!(url.ends_with(current.as_deref().unwrap())),
            Event::Done(name, findings) => {
                assert_eq!(current.take().as_ref(), Some(name));
                assert_eq!(*findings, 4);
            }
        }
    }
}

#[tokio::test]
async fn test_sources_on_one_site_are_deduplicated() {
    let fetchers = web(|url| url.ends_with("/alice").then(|| (200, "alice".to_string())));
    let session = ScanSession::new(
        sources(&[
            "https://api.site.test/users/{U}|https://site.test/{U}",
            "https://www.site.test/{U}",
            "https://localhost/{U}",
        ]),
        verifier(no_ai()),
        fetchers,
        Arc::new(ResultStore::new()),
    );
    let store = Arc::clone(session.store());

    let report = ScanOrchestrator::new(session).run(&names(&["alice"])).await;

    assert_eq!(report.jobs_completed(), 3);
    // localhost has no registrable domain and is skipped.
    assert_eq!(store.findings("alice").len(), 1);
    assert!(store.findings("alice").contains_key("site.test"));
}

#[tokio::test]
async fn test_oracle_rejection_blocks_hit() {
    let fetchers = web(|url| {
        (url == "https://site.test/alice").then(|| (200, "Alice's profile".to_string()))
    });
    let oracle = VerdictOracle::new(
        Arc::new(AlwaysFalse),
        Arc::new(RateGovernor::new(GovernorSettings::default())),
        OracleSettings::default(),
    );
    let session = ScanSession::new(
        sources(&["https://site.test/{U}"]),
        verifier(oracle),
        fetchers,
        Arc::new(ResultStore::new()),
    );

    let store = scan(session, &["alice"]).await;
    assert!(store.findings("alice").is_empty());
}
