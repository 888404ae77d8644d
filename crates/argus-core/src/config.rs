//! Configuration management for Argus.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides, plus the locations of the list files
//! that live next to `config.toml`.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/argus/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Scan behavior settings
    pub scan: ScanConfig,
    /// Verdict oracle (LLM) settings
    pub llm: LlmConfig,
    /// Proxy validation settings
    pub proxy: ProxyConfig,
    /// Result output settings
    pub output: OutputConfig,
}

impl AppConfig {
    /// Load configuration from an explicit path, falling back to defaults if
    /// the file is absent.
    pub fn load_from(config_path: &Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `ARGUS_GEMINI_API_KEY`: Gemini API key for the verdict oracle
    /// - `ARGUS_THREADS`: Override worker count
    /// - `ARGUS_AI`: Override LLM enabled status (true/false)
    pub fn load_with_env(config_path: &Path) -> ConfigResult<Self> {
        let mut config = Self::load_from(config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides using `lookup` to read variables.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("ARGUS_GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                self.llm.api_key = Some(key.trim().to_string());
                tracing::debug!("Override llm.api_key from env");
            }
        }

        if let Some(val) = lookup("ARGUS_THREADS") {
            if let Ok(threads) = val.parse() {
                self.scan.threads = threads;
                tracing::debug!("Override scan.threads from env: {}", threads);
            }
        }

        if let Some(val) = lookup("ARGUS_AI") {
            if let Ok(enabled) = val.parse() {
                self.llm.enabled = enabled;
                tracing::debug!("Override llm.enabled from env: {}", enabled);
            }
        }
    }

    /// Reject values that would stall or misconfigure a scan.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.scan.threads == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scan.threads".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.scan.ai_threads == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scan.ai_threads".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.llm.high_water_mark > self.llm.token_limit {
            return Err(ConfigError::InvalidValue {
                field: "llm.high_water_mark".to_string(),
                reason: format!(
                    "must not exceed llm.token_limit ({})",
                    self.llm.token_limit
                ),
            });
        }
        if self.llm.window_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "llm.window_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Save configuration to `config_path`.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save_to(&self, config_path: &Path) -> ConfigResult<()> {
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the default configuration directory.
    ///
    /// Uses XDG base directories: `~/.config/argus`
    pub fn config_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("org", "argus", "argus").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().to_path_buf())
    }
}

/// Scan behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Number of concurrent workers per username
    pub threads: usize,
    /// Worker count used instead of `threads` when the verdict oracle is on
    pub ai_threads: usize,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum redirects followed per request
    pub max_redirects: usize,
    /// Run deep-scan extraction on confirmed hits when a config is present
    pub deep_scan: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threads: 25,
            ai_threads: 10,
            timeout_secs: 5,
            max_redirects: 20,
            deep_scan: true,
        }
    }
}

/// Verdict oracle (LLM) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_field_names)]
pub struct LlmConfig {
    /// Whether the semantic verdict stage is enabled
    pub enabled: bool,
    /// Gemini API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Gemini model name
    pub model: String,
    /// Informational token ceiling per window
    pub token_limit: u64,
    /// Usage at which callers start being throttled
    pub high_water_mark: u64,
    /// Accounting window in seconds
    pub window_secs: u64,
    /// Extra wait added on top of the remaining window
    pub safety_buffer_secs: u64,
    /// Cooldown after a per-minute quota error
    pub quota_cooldown_secs: u64,
    /// Retries after a per-minute quota error
    pub max_quota_retries: u32,
    /// Treat an unavailable oracle as confirming the hit
    pub fail_open: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            model: "gemini-2.0-flash-lite".to_string(),
            token_limit: 1_000_000,
            high_water_mark: 900_000,
            window_secs: 30,
            safety_buffer_secs: 10,
            quota_cooldown_secs: 30,
            max_quota_retries: 1,
            fail_open: true,
        }
    }
}

/// Proxy validation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// IP-echo endpoint fetched through each candidate proxy
    pub echo_url: String,
    /// Validation request timeout in seconds
    pub validation_timeout_secs: u64,
    /// Pools larger than this skip validation
    pub validation_limit: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            echo_url: "http://ipinfo.io/ip".to_string(),
            validation_timeout_secs: 10,
            validation_limit: 10,
        }
    }
}

/// Result output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory result files are written to
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./results/"),
        }
    }
}

/// Locations of the list and template files inside a config directory.
#[derive(Debug, Clone)]
pub struct DataFiles {
    dir: PathBuf,
}

impl DataFiles {
    /// Files rooted at `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `config.toml`
    #[must_use]
    pub fn config(&self) -> PathBuf {
        self.dir.join("config.toml")
    }

    /// `sources.txt`
    #[must_use]
    pub fn sources(&self) -> PathBuf {
        self.dir.join("sources.txt")
    }

    /// `404checks.txt`
    #[must_use]
    pub fn fingerprints(&self) -> PathBuf {
        self.dir.join("404checks.txt")
    }

    /// `BadRedirects.txt`
    #[must_use]
    pub fn bad_redirects(&self) -> PathBuf {
        self.dir.join("BadRedirects.txt")
    }

    /// `UserAgents.txt`
    #[must_use]
    pub fn user_agents(&self) -> PathBuf {
        self.dir.join("UserAgents.txt")
    }

    /// `html_check.txt`
    #[must_use]
    pub fn verdict_prompt(&self) -> PathBuf {
        self.dir.join("html_check.txt")
    }

    /// `deepscan.json`
    #[must_use]
    pub fn deep_scan(&self) -> PathBuf {
        self.dir.join("deepscan.json")
    }
}
