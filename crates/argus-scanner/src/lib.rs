//! Argus Scanner - username probing and verification pipeline.
//!
//! For each username, every configured source is fetched by a bounded pool
//! of workers. Each page goes through the existence verifier, which weeds
//! out soft-404 pages through status, body, fingerprint and differential
//! checks, optionally followed by an AI verdict. Confirmed hits are enriched
//! with a profile picture and deep-scan attributes and stored per
//! registrable domain.
//!
//! # Features
//!
//! - Per-username worker pool with a barrier between usernames
//! - Redirect denylist enforced inside the HTTP client's redirect policy
//! - Proxy validation and per-job rotation, without shared mutable clients
//! - Configuration-driven deep scan with shorthand count parsing
//!
//! # Example
//!
//! ```rust,ignore
//! use argus_scanner::{ScanOrchestrator, ScanSession};
//!
//! let session = ScanSession::new(sources, verifier, fetchers, store.clone())
//!     .with_concurrency(25, 10);
//! let report = ScanOrchestrator::new(session).run(&usernames).await;
//! println!("{} jobs, {} findings", report.jobs_completed(), report.findings());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod deep_scan;
pub mod domain;
#[allow(missing_docs)]
pub mod error;
pub mod fetcher;
pub mod orchestrator;
pub mod picture;
pub mod proxy;
pub mod redirect;
#[allow(missing_docs)]
pub mod store;
pub mod verifier;

// Re-export commonly used types
pub use deep_scan::{DeepScanConfig, DeepScanField, DeepScanRecord, DomainConfig, ExtraField};
pub use error::{Result, ScanError};
pub use fetcher::{
    FetchResult, FetchSettings, FetcherFactory, HttpFetcher, HttpFetcherFactory, PageFetcher,
    UserAgentPool,
};
pub use orchestrator::{
    NoopObserver, ScanObserver, ScanOrchestrator, ScanReport, ScanSession, UsernameReport,
};
pub use proxy::{HttpProxyValidator, ProxyFault, ProxyPool, ProxyValidator, TOR_PROXY};
pub use redirect::RedirectDenylist;
pub use store::{Hit, ResultStore, SiteResult};
pub use verifier::{ExistenceVerifier, FingerprintSet, NotFoundReason, Verdict};
