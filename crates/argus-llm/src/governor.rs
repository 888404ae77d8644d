//! Sliding-window token governor for verdict calls.
//!
//! Usage is accounted against a fixed-length window. Callers are admitted
//! freely until recorded usage reaches the high-water mark; after that they
//! wait for the rest of the window plus a safety buffer. The lock guarding
//! the state is never held across a sleep, so one throttled caller does not
//! block others from recording usage.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Tunables for [`RateGovernor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GovernorSettings {
    /// Informational ceiling (the provider's hard quota per window)
    pub limit: u64,
    /// Usage at which callers start waiting
    pub high_water_mark: u64,
    /// Accounting window length
    pub window: Duration,
    /// Extra wait added to the remaining window time
    pub safety_buffer: Duration,
}

impl Default for GovernorSettings {
    fn default() -> Self {
        Self {
            limit: 1_000_000,
            high_water_mark: 900_000,
            window: Duration::from_secs(30),
            safety_buffer: Duration::from_secs(10),
        }
    }
}

#[derive(Debug)]
struct WindowState {
    started: Instant,
    usage: u64,
}

/// Token-usage governor shared by every verdict call in a run.
#[derive(Debug)]
pub struct RateGovernor {
    settings: GovernorSettings,
    state: Mutex<WindowState>,
}

impl RateGovernor {
    /// Create a governor whose first window starts now.
    #[must_use]
    pub fn new(settings: GovernorSettings) -> Self {
        Self {
            settings,
            state: Mutex::new(WindowState {
                started: Instant::now(),
                usage: 0,
            }),
        }
    }

    /// Settings this governor was created with.
    #[must_use]
    pub fn settings(&self) -> GovernorSettings {
        self.settings
    }

    /// Wait until a call may be issued.
    ///
    /// Returns immediately when the window has elapsed (resetting it) or
    /// usage is below the high-water mark. Otherwise sleeps for the rest of
    /// the window plus the safety buffer and re-evaluates from scratch.
    pub async fn admit_or_wait(&self) {
        loop {
            let sleep_for = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.started);

                if elapsed >= self.settings.window {
                    debug!("rate window reset");
                    state.started = now;
                    state.usage = 0;
                    return;
                }

                if state.usage < self.settings.high_water_mark {
                    return;
                }

                let sleep_for = (self.settings.window - elapsed) + self.settings.safety_buffer;
                debug!(
                    high_water_mark = self.settings.high_water_mark,
                    limit = self.settings.limit,
                    usage = state.usage,
                    sleep_ms = u64::try_from(sleep_for.as_millis()).unwrap_or(u64::MAX),
                    "high-water mark reached, throttling"
                );
                sleep_for
            };

            tokio::time::sleep(sleep_for).await;
        }
    }

    /// Credit `tokens` to the current window, or open a fresh window holding
    /// exactly `tokens` if the current one has already elapsed.
    pub async fn record_usage(&self, tokens: u64) {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        if now.duration_since(state.started) < self.settings.window {
            state.usage = state.usage.saturating_add(tokens);
            debug!(tokens, usage = state.usage, "recorded token usage");
        } else {
            state.started = now;
            state.usage = tokens;
            debug!(tokens, "window elapsed during call, recorded against new window");
        }
    }

    /// Current usage and time elapsed in the current window.
    pub async fn snapshot(&self) -> (u64, Duration) {
        let state = self.state.lock().await;
        (state.usage, Instant::now().duration_since(state.started))
    }
}
