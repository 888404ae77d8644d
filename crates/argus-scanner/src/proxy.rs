//! Proxy validation and per-job rotation.

use crate::error::{Result, ScanError};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::{Client, Proxy, StatusCode};
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

/// Address of a local Tor SOCKS proxy.
pub const TOR_PROXY: &str = "socks5://127.0.0.1:9050";

/// Why a candidate proxy was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyFault {
    /// Connection refused, proxy handshake failed, or timed out
    Unreachable(String),
    /// Wrong proxy type (http vs socks5) or malformed address
    Protocol(String),
    /// The echo endpoint answered with a non-200 status
    Status(u16),
    /// Anything else
    Other(String),
}

impl ProxyFault {
    fn classify(err: &reqwest::Error) -> Self {
        let text = err.to_string();
        if err.is_builder() || text.contains("protocol") || text.contains("scheme") {
            Self::Protocol(text)
        } else if err.is_connect() || err.is_timeout() || text.contains("proxyconnect") {
            Self::Unreachable(text)
        } else {
            Self::Other(text)
        }
    }
}

impl fmt::Display for ProxyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable(e) => write!(f, "failed to connect or timed out: {e}"),
            Self::Protocol(e) => {
                write!(f, "protocol error, is it the correct type (http/socks5)? {e}")
            }
            Self::Status(code) => write!(f, "echo endpoint returned HTTP {code}"),
            Self::Other(e) => write!(f, "request through proxy failed: {e}"),
        }
    }
}

/// Checks whether a proxy can carry traffic.
#[async_trait]
pub trait ProxyValidator: Send + Sync {
    /// `Ok(())` when the proxy is usable.
    async fn validate(&self, proxy: &str) -> std::result::Result<(), ProxyFault>;
}

/// Validates a proxy by fetching an IP-echo endpoint through it.
pub struct HttpProxyValidator {
    echo_url: String,
    timeout: Duration,
}

impl HttpProxyValidator {
    #[must_use]
    pub fn new(echo_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            echo_url: echo_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ProxyValidator for HttpProxyValidator {
    async fn validate(&self, proxy: &str) -> std::result::Result<(), ProxyFault> {
        let proxy_cfg = Proxy::all(proxy).map_err(|e| ProxyFault::classify(&e))?;
        let client = Client::builder()
            .proxy(proxy_cfg)
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ProxyFault::classify(&e))?;

        let response = client
            .get(&self.echo_url)
            .send()
            .await
            .map_err(|e| ProxyFault::classify(&e))?;

        let status = response.status();
        if status == StatusCode::OK {
            return Ok(());
        }
        if status == StatusCode::FORBIDDEN || status == StatusCode::PROXY_AUTHENTICATION_REQUIRED {
            warn!(%proxy, %status, "proxy might require authentication or is blocked");
        }
        Err(ProxyFault::Status(status.as_u16()))
    }
}

/// How requests are routed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyPool {
    /// No proxy
    Direct,
    /// One proxy for every request
    Fixed(String),
    /// A random proxy per job
    Rotating(Vec<String>),
}

impl ProxyPool {
    /// Resolve the configured proxies into a pool.
    ///
    /// - none: direct connection
    /// - one: validated once, unusable is fatal
    /// - up to `validation_limit`: all validated, invalid ones dropped,
    ///   fatal if none remain
    /// - more than `validation_limit`: used unvalidated
    pub async fn resolve(
        proxies: Vec<String>,
        validator: &dyn ProxyValidator,
        validation_limit: usize,
    ) -> Result<Self> {
        match proxies.len() {
            0 => Ok(Self::Direct),
            1 => {
                let proxy = proxies.into_iter().next().unwrap_or_default();
                if let Err(fault) = validator.validate(&proxy).await {
                    warn!(%proxy, %fault, "proxy validation failed");
                    if proxy == TOR_PROXY {
                        info!("Do you have the Tor proxy installed and set up?");
                    }
                    return Err(ScanError::ProxyUnusable {
                        proxy,
                        reason: fault.to_string(),
                    });
                }
                info!(%proxy, "using proxy");
                Ok(Self::Fixed(proxy))
            }
            n if n <= validation_limit => {
                let mut usable = Vec::with_capacity(n);
                for proxy in proxies {
                    match validator.validate(&proxy).await {
                        Ok(()) => usable.push(proxy),
                        Err(fault) => warn!(%proxy, %fault, "dropping proxy"),
                    }
                }
                info!(usable = usable.len(), candidates = n, "validated proxy list");
                Self::from_usable(usable, n)
            }
            n => {
                info!(count = n, "proxy list too long to validate, using as-is");
                Ok(Self::Rotating(proxies))
            }
        }
    }

    fn from_usable(mut usable: Vec<String>, candidates: usize) -> Result<Self> {
        match usable.len() {
            0 => Err(ScanError::NoUsableProxies { candidates }),
            1 => Ok(Self::Fixed(usable.remove(0))),
            _ => Ok(Self::Rotating(usable)),
        }
    }

    /// Whether a different proxy may be chosen per job.
    #[must_use]
    pub fn rotates(&self) -> bool {
        matches!(self, Self::Rotating(_))
    }

    /// Proxy for the next job.
    #[must_use]
    pub fn pick(&self) -> Option<&str> {
        match self {
            Self::Direct => None,
            Self::Fixed(proxy) => Some(proxy),
            Self::Rotating(proxies) => proxies.choose(&mut rand::thread_rng()).map(String::as_str),
        }
    }
}
