//! Scan orchestrator.
//!
//! Usernames are scanned one at a time. For each, every source becomes a
//! [`ProbeJob`] in a pre-sized channel that is closed once filled; a fixed
//! pool of workers drains it, and the orchestrator waits for the whole pool
//! before moving on to the next username.

use crate::deep_scan::{extract, DeepScanConfig};
use crate::domain::registrable_domain;
use crate::fetcher::{FetchResult, FetcherFactory};
use crate::picture::extract_profile_picture;
use crate::store::{Hit, ResultStore};
use crate::verifier::{ExistenceVerifier, Verdict};
use argus_core::{ProbeJob, Source};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Default worker count.
pub const DEFAULT_CONCURRENCY: usize = 25;

/// Worker count when the verdict oracle is in use.
pub const DEFAULT_AI_CONCURRENCY: usize = 10;

/// Progress callbacks. All methods default to no-ops.
pub trait ScanObserver: Send + Sync {
    /// A username is about to be scanned with `jobs` jobs.
    fn on_username_start(&self, _username: &str, _index: usize, _total: usize, _jobs: usize) {}

    /// A job finished, whatever the verdict.
    fn on_job_complete(&self, _job: &ProbeJob, _verdict: &Verdict) {}

    /// A hit was stored.
    fn on_hit(&self, _username: &str, _domain: &str, _url: &str) {}

    /// Every job for a username has finished.
    fn on_username_complete(&self, _username: &str, _findings: usize) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}

/// Everything a scan needs, created once per run.
pub struct ScanSession {
    sources: Vec<Arc<Source>>,
    verifier: Arc<ExistenceVerifier>,
    fetchers: Arc<dyn FetcherFactory>,
    store: Arc<ResultStore>,
    deep_scan: Option<Arc<DeepScanConfig>>,
    concurrency: usize,
    ai_concurrency: usize,
    observer: Arc<dyn ScanObserver>,
}

impl ScanSession {
    /// Create a session with default concurrency, no deep scan and no
    /// observer.
    #[must_use]
    pub fn new(
        sources: Vec<Source>,
        verifier: Arc<ExistenceVerifier>,
        fetchers: Arc<dyn FetcherFactory>,
        store: Arc<ResultStore>,
    ) -> Self {
        Self {
            sources: sources.into_iter().map(Arc::new).collect(),
            verifier,
            fetchers,
            store,
            deep_scan: None,
            concurrency: DEFAULT_CONCURRENCY,
            ai_concurrency: DEFAULT_AI_CONCURRENCY,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Worker counts without and with the verdict oracle.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize, ai_concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self.ai_concurrency = ai_concurrency.max(1);
        self
    }

    /// Enable deep scan with these rules.
    #[must_use]
    pub fn with_deep_scan(mut self, config: Arc<DeepScanConfig>) -> Self {
        self.deep_scan = Some(config);
        self
    }

    /// Receive progress callbacks.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Number of sources per username.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Store populated by the scan.
    #[must_use]
    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    fn worker_count(&self) -> usize {
        if self.verifier.uses_oracle() {
            self.ai_concurrency
        } else {
            self.concurrency
        }
    }

    /// Fetch, verify and, on a hit, enrich and store one job.
    async fn process(&self, job: &ProbeJob) -> Verdict {
        let fetcher = match self.fetchers.fetcher_for(&job.username) {
            Ok(fetcher) => fetcher,
            Err(e) => {
                warn!(username = %job.username, error = %e, "could not build HTTP client");
                return Verdict::Inconclusive(e.to_string());
            }
        };

        let url = job.request_url();
        let page = match fetcher.fetch(&url).await {
            Ok(page) => page,
            Err(e) => {
                debug!(%url, error = %e, "network error");
                return Verdict::Inconclusive(e.to_string());
            }
        };

        let verdict = self.verifier.verify(job, &page, fetcher.as_ref()).await;
        match &verdict {
            Verdict::Confirmed => self.record(job, &page),
            Verdict::NotFound(reason) => {
                debug!(username = %job.username, url = %job.display_url(), %reason, "not found");
            }
            Verdict::Inconclusive(reason) => {
                debug!(username = %job.username, %url, %reason, "inconclusive");
            }
        }
        verdict
    }

    fn record(&self, job: &ProbeJob, page: &FetchResult) {
        let display_url = job.display_url();
        info!(username = %job.username, url = %display_url, "FOUND");

        let domain = match registrable_domain(&display_url) {
            Ok(domain) => domain,
            Err(e) => {
                warn!(url = %display_url, error = %e, "failed to get main domain, hit not stored");
                return;
            }
        };

        let picture_url = extract_profile_picture(&page.body, &page.final_url);
        let deep_scan = self
            .deep_scan
            .as_ref()
            .and_then(|config| config.domain(&domain))
            .map(|rules| extract(&page.body, rules))
            .filter(|record| !record.is_empty());

        self.observer.on_hit(&job.username, &domain, &display_url);
        self.store.record_hit(
            &job.username,
            Hit {
                domain,
                display_url,
                picture_url,
                deep_scan,
            },
        );
    }
}

/// Per-username outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsernameReport {
    #[allow(missing_docs)]
    pub username: String,
    /// Jobs that ran to a verdict
    pub jobs_completed: usize,
    /// Distinct domains found
    pub findings: usize,
}

/// Outcome of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// One entry per username, in scan order
    pub usernames: Vec<UsernameReport>,
}

impl ScanReport {
    /// Jobs completed across all usernames.
    #[must_use]
    pub fn jobs_completed(&self) -> usize {
        self.usernames.iter().map(|u| u.jobs_completed).sum()
    }

    /// Distinct findings across all usernames.
    #[must_use]
    pub fn findings(&self) -> usize {
        self.usernames.iter().map(|u| u.findings).sum()
    }
}

/// Runs a [`ScanSession`] over a list of usernames.
pub struct ScanOrchestrator {
    session: Arc<ScanSession>,
}

impl ScanOrchestrator {
    #[must_use]
    pub fn new(session: ScanSession) -> Self {
        Self {
            session: Arc::new(session),
        }
    }

    /// The session this orchestrator runs.
    #[must_use]
    pub fn session(&self) -> &ScanSession {
        &self.session
    }

    /// Scan every username in order, populating the session's store.
    pub async fn run(&self, usernames: &[String]) -> ScanReport {
        let total = usernames.len();
        let mut report = ScanReport::default();

        for (index, username) in usernames.iter().enumerate() {
            let summary = self.scan_username(username, index, total).await;

            match usernames.get(index + 1) {
                Some(next) => info!("Finished search on {username}, starting {next}"),
                None => info!("Finished search on {username}"),
            }
            report.usernames.push(summary);
        }

        report
    }

    async fn scan_username(&self, username: &str, index: usize, total: usize) -> UsernameReport {
        let session = &self.session;
        let username: Arc<str> = Arc::from(username);
        let job_count = session.sources.len();
        session
            .observer
            .on_username_start(&username, index, total, job_count);

        let (tx, rx) = mpsc::channel(job_count.max(1));
        for source in &session.sources {
            let job = ProbeJob::new(Arc::clone(&username), Arc::clone(source));
            if tx.send(job).await.is_err() {
                break;
            }
        }
        drop(tx);

        let rx = Arc::new(Mutex::new(rx));
        let completed = Arc::new(AtomicUsize::new(0));
        let workers = session.worker_count().min(job_count);
        debug!(username = %username, jobs = job_count, workers, "starting workers");

        let mut pool = JoinSet::new();
        for _ in 0..workers {
            let session = Arc::clone(session);
            let rx = Arc::clone(&rx);
            let completed = Arc::clone(&completed);
            pool.spawn(async move {
                loop {
                    let next = rx.lock().await.recv().await;
                    let Some(job) = next else { break };
                    let verdict = session.process(&job).await;
                    completed.fetch_add(1, Ordering::Relaxed);
                    session.observer.on_job_complete(&job, &verdict);
                }
            });
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                error!(username = %username, error = %e, "scan worker failed");
            }
        }

        let findings = session.store.finding_count(&username);
        session.observer.on_username_complete(&username, findings);

        UsernameReport {
            username: username.to_string(),
            jobs_completed: completed.load(Ordering::Relaxed),
            findings,
        }
    }
}
