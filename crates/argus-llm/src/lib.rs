//! Argus LLM - Rate-governed semantic verdicts for username probes.
//!
//! This crate wraps a single external "does this page really show this
//! profile?" call behind a sliding-window token governor, with graceful
//! degradation when the provider's quota runs out.
//!
//! # Features
//!
//! - **Provider Abstraction**: [`LlmProvider`] trait with a Gemini backend
//! - **Rate Governor**: proactive throttling at a high-water mark
//! - **Verdict Oracle**: per-minute quota retries, per-day quota shutdown
//!
//! # Example
//!
//! ```rust,ignore
//! use argus_llm::{GeminiProvider, GovernorSettings, OracleSettings, RateGovernor, VerdictOracle};
//! use std::sync::Arc;
//!
//! let governor = Arc::new(RateGovernor::new(GovernorSettings::default()));
//! let provider = Arc::new(GeminiProvider::new(api_key)?);
//! let oracle = VerdictOracle::new(provider, governor, OracleSettings::default());
//!
//! let outcome = oracle.check("Is this a real profile for alice?", &page_body).await;
//! ```
//!
//! # Degradation Model
//!
//! ```text
//! admit_or_wait → provider call ─ ok ──────────→ record_usage → Answer
//!                      │
//!                      ├─ per-minute quota → cooldown → retry (bounded)
//!                      └─ per-day quota ───→ disable for the run → Unavailable
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod governor;
pub mod oracle;
pub mod provider;
pub mod providers;

// Re-export commonly used types
pub use error::{LlmError, Result};
pub use governor::{GovernorSettings, RateGovernor};
pub use oracle::{
    OracleOutcome, OracleSettings, VerdictOracle, VERDICT_MAX_TOKENS, VERDICT_TEMPERATURE,
};
pub use provider::{CompletionRequest, CompletionResponse, LlmProvider, Usage};
pub use providers::GeminiProvider;
