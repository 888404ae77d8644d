//! HTTP page fetching.
//!
//! Every job obtains its fetcher from a [`FetcherFactory`]. Clients are
//! immutable once built: the redirect policy is bound to one username and
//! the proxy to one choice from the [`ProxyPool`], so concurrent jobs never
//! share mutable client state.

use crate::error::{Result, ScanError};
use crate::proxy::ProxyPool;
use crate::redirect::{redirect_policy, RedirectDenylist};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Proxy};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

/// User agent sent when no list is configured.
pub const FALLBACK_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult {
    /// HTTP status code
    pub status: u16,
    /// URL after redirects
    pub final_url: String,
    /// Response body
    pub body: String,
}

impl FetchResult {
    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches one page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url`; transport errors and rejected redirects are `Err`.
    async fn fetch(&self, url: &str) -> Result<FetchResult>;
}

/// Hands out the fetcher a job should use.
pub trait FetcherFactory: Send + Sync {
    /// Fetcher for one job probing `username`.
    fn fetcher_for(&self, username: &Arc<str>) -> Result<Arc<dyn PageFetcher>>;
}

/// Read-only pool of user agents, one picked at random per request.
#[derive(Debug, Clone, Default)]
pub struct UserAgentPool {
    agents: Vec<String>,
}

impl UserAgentPool {
    #[must_use]
    pub fn new(agents: Vec<String>) -> Self {
        Self { agents }
    }

    /// A random agent, or [`FALLBACK_USER_AGENT`] when the pool is empty.
    #[must_use]
    pub fn pick(&self) -> &str {
        self.agents
            .choose(&mut rand::thread_rng())
            .map_or(FALLBACK_USER_AGENT, String::as_str)
    }
}

/// Client settings shared by every fetcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    /// Per-request timeout
    pub timeout: Duration,
    /// Redirect hops followed before giving up
    pub max_redirects: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_redirects: 20,
        }
    }
}

/// [`PageFetcher`] over a `reqwest` client bound to one username and proxy.
pub struct HttpFetcher {
    client: Client,
    user_agents: Arc<UserAgentPool>,
}

impl HttpFetcher {
    /// Build a client for `username`, optionally through `proxy`.
    pub fn build(
        settings: FetchSettings,
        denylist: Arc<RedirectDenylist>,
        username: Arc<str>,
        proxy: Option<&str>,
        user_agents: Arc<UserAgentPool>,
    ) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(settings.timeout)
            .redirect(redirect_policy(denylist, username, settings.max_redirects));

        if let Some(proxy) = proxy {
            let proxy_cfg = Proxy::all(proxy).map_err(|source| ScanError::InvalidProxy {
                proxy: proxy.to_string(),
                source,
            })?;
            builder = builder.proxy(proxy_cfg);
        }

        Ok(Self {
            client: builder.build()?,
            user_agents,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResult> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, self.user_agents.pick())
            .send()
            .await?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await?;

        Ok(FetchResult {
            status,
            final_url,
            body,
        })
    }
}

/// Builds [`HttpFetcher`]s from the run's proxy pool.
///
/// With a fixed or direct route the client for the current username is
/// cached and reused by every job for that username. A rotating pool gets a
/// fresh job-local client per call.
pub struct HttpFetcherFactory {
    settings: FetchSettings,
    denylist: Arc<RedirectDenylist>,
    user_agents: Arc<UserAgentPool>,
    proxies: ProxyPool,
    current: Mutex<Option<(Arc<str>, Arc<HttpFetcher>)>>,
}

impl HttpFetcherFactory {
    #[must_use]
    pub fn new(
        settings: FetchSettings,
        denylist: RedirectDenylist,
        user_agents: UserAgentPool,
        proxies: ProxyPool,
    ) -> Self {
        Self {
            settings,
            denylist: Arc::new(denylist),
            user_agents: Arc::new(user_agents),
            proxies,
            current: Mutex::new(None),
        }
    }

    fn build(&self, username: &Arc<str>, proxy: Option<&str>) -> Result<Arc<HttpFetcher>> {
        HttpFetcher::build(
            self.settings,
            Arc::clone(&self.denylist),
            Arc::clone(username),
            proxy,
            Arc::clone(&self.user_agents),
        )
        .map(Arc::new)
    }
}

impl FetcherFactory for HttpFetcherFactory {
    fn fetcher_for(&self, username: &Arc<str>) -> Result<Arc<dyn PageFetcher>> {
        if self.proxies.rotates() {
            let proxy = self.proxies.pick();
            debug!(username = %username, proxy = ?proxy, "building job-local client");
            return Ok(self.build(username, proxy)?);
        }

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached_for, fetcher)) = current.as_ref() {
            if cached_for == username {
                return Ok(Arc::clone(fetcher) as Arc<dyn PageFetcher>);
            }
        }

        debug!(username = %username, "building client");
        let fetcher = self.build(username, self.proxies.pick())?;
        *current = Some((Arc::clone(username), Arc::clone(&fetcher)));
        Ok(fetcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory(proxies: ProxyPool) -> HttpFetcherFactory {
        HttpFetcherFactory::new(
            FetchSettings::default(),
            RedirectDenylist::default(),
            UserAgentPool::default(),
            proxies,
        )
    }

    #[test]
    fn test_fetch_result_success_range() {
        let mut page = FetchResult {
            status: 200,
            final_url: "https://site.test/".to_string(),
            body: String::new(),
        };
        assert!(page.is_success());
        page.status = 302;
        assert!(!page.is_success());
        page.status = 404;
        assert!(!page.is_success());
    }

    #[test]
    fn test_empty_user_agent_pool_falls_back() {
        assert_eq!(UserAgentPool::default().pick(), FALLBACK_USER_AGENT);
        let pool = UserAgentPool::new(vec!["agent/1".to_string()]);
        assert_eq!(pool.pick(), "agent/1");
    }

    #[test]
    fn test_factory_reuses_client_per_username() {
        let factory = factory(ProxyPool::Direct);
        let alice: Arc<str> = Arc::from("alice");
        let bob: Arc<str> = Arc::from("bob");

        let first = factory.fetcher_for(&alice).unwrap();
        let second = factory.fetcher_for(&alice).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let other = factory.fetcher_for(&bob).unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn test_rotating_factory_builds_per_job() {
        let factory = factory(ProxyPool::Rotating(vec![
            "http://127.0.0.1:8001".to_string(),
            "http://127.0.0.1:8002".to_string(),
        ]));
        let alice: Arc<str> = Arc::from("alice");

        let first = factory.fetcher_for(&alice).unwrap();
        let second = factory.fetcher_for(&alice).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_invalid_proxy_is_reported() {
        let factory = factory(ProxyPool::Fixed("::not a proxy::".to_string()));
        let err = factory.fetcher_for(&Arc::from("alice")).err().unwrap();
        assert!(matches!(err, ScanError::InvalidProxy { .. }));
    }
}
