use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("proxy {proxy} is unusable: {reason}")]
    ProxyUnusable { proxy: String, reason: String },

    #[error("none of the {candidates} configured proxies passed validation")]
    NoUsableProxies { candidates: usize },

    #[error("invalid proxy address {proxy}: {source}")]
    InvalidProxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not resolve registrable domain for {url}: {reason}")]
    DomainResolution { url: String, reason: String },

    #[error("invalid deep-scan configuration: {0}")]
    DeepScanConfig(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ScanError>;
