//! Verdict oracle: one governed LLM call per probe that reached the
//! semantic stage.

use crate::error::LlmError;
use crate::governor::RateGovernor;
use crate::provider::{CompletionRequest, LlmProvider};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Sampling temperature for verdicts; the answer must be reproducible.
pub const VERDICT_TEMPERATURE: f32 = 0.0;

/// Output budget for a verdict. The answer is a single `true`/`false` word.
pub const VERDICT_MAX_TOKENS: u32 = 8;

/// Tunables for [`VerdictOracle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleSettings {
    /// Sleep before retrying after a per-minute quota error
    pub quota_cooldown: Duration,
    /// Retries allowed after per-minute quota errors, per call
    pub max_quota_retries: u32,
    /// Treat an unavailable oracle as confirming the hit
    pub fail_open: bool,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            quota_cooldown: Duration::from_secs(30),
            max_quota_retries: 1,
            fail_open: true,
        }
    }
}

/// Result of asking the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleOutcome {
    /// The provider answered with this text.
    Answer(String),
    /// No answer: the oracle is disabled, degraded, or the call failed.
    Unavailable,
}

impl OracleOutcome {
    /// Whether the answer is exactly `true` after trimming and case-folding.
    #[must_use]
    pub fn is_affirmative(&self) -> bool {
        match self {
            Self::Answer(text) => text.trim().to_lowercase() == "true",
            Self::Unavailable => false,
        }
    }
}

/// Semantic verdict service gated by a [`RateGovernor`].
pub struct VerdictOracle {
    provider: Option<Arc<dyn LlmProvider>>,
    governor: Arc<RateGovernor>,
    settings: OracleSettings,
    enabled: AtomicBool,
}

impl std::fmt::Debug for VerdictOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerdictOracle")
            .field("configured", &self.provider.is_some())
            .field("governor", &self.governor)
            .field("settings", &self.settings)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl VerdictOracle {
    /// Create an enabled oracle over `provider`.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        governor: Arc<RateGovernor>,
        settings: OracleSettings,
    ) -> Self {
        Self {
            provider: Some(provider),
            governor,
            settings,
            enabled: AtomicBool::new(true),
        }
    }

    /// Create an oracle with no provider; every check is `Unavailable`.
    #[must_use]
    pub fn disabled(settings: OracleSettings) -> Self {
        Self {
            provider: None,
            governor: Arc::new(RateGovernor::new(crate::GovernorSettings::default())),
            settings,
            enabled: AtomicBool::new(false),
        }
    }

    /// Whether a provider was configured at all, regardless of degradation.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Whether calls will currently reach the provider.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.provider.is_some() && self.enabled.load(Ordering::Acquire)
    }

    /// Whether an `Unavailable` outcome should count as confirmation.
    #[must_use]
    pub fn fails_open(&self) -> bool {
        self.settings.fail_open
    }

    /// Governor shared by this oracle's calls.
    #[must_use]
    pub fn governor(&self) -> &Arc<RateGovernor> {
        &self.governor
    }

    /// Ask the provider to judge `page_body` under `system_prompt`.
    ///
    /// Per-minute quota errors sleep for the cooldown and retry, up to the
    /// configured retry count. A per-day quota error disables the oracle for
    /// the rest of the process. Any other failure yields `Unavailable` for
    /// this call only.
    pub async fn check(&self, system_prompt: &str, page_body: &str) -> OracleOutcome {
        let Some(provider) = self.provider.as_ref() else {
            return OracleOutcome::Unavailable;
        };

        let request = CompletionRequest::new(page_body)
            .with_system_prompt(system_prompt)
            .with_temperature(VERDICT_TEMPERATURE)
            .with_max_tokens(VERDICT_MAX_TOKENS);
        let mut quota_retries = 0;

        loop {
            if !self.is_enabled() {
                return OracleOutcome::Unavailable;
            }

            self.governor.admit_or_wait().await;

            match provider.complete(request.clone()).await {
                Ok(response) => {
                    if let Some(usage) = response.usage {
                        self.governor.record_usage(usage.total()).await;
                    }
                    debug!(answer = %response.content.trim(), "oracle answered");
                    return OracleOutcome::Answer(response.content);
                }
                Err(LlmError::QuotaPerDay { message, .. }) => {
                    if self.enabled.swap(false, Ordering::AcqRel) {
                        info!("Hit AI quota limit for today, continuing without AI");
                        debug!(%message, "daily quota error");
                    }
                    return OracleOutcome::Unavailable;
                }
                Err(err) if err.is_transient_quota() => {
                    if quota_retries >= self.settings.max_quota_retries {
                        warn!(error = %err, "quota retries exhausted, skipping verdict");
                        return OracleOutcome::Unavailable;
                    }
                    quota_retries += 1;
                    info!(
                        cooldown_secs = self.settings.quota_cooldown.as_secs(),
                        "Hit AI quota limit for this minute, sleeping before retry"
                    );
                    tokio::time::sleep(self.settings.quota_cooldown).await;
                }
                Err(err) => {
                    warn!(error = %err, "verdict call failed");
                    return OracleOutcome::Unavailable;
                }
            }
        }
    }
}
