//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. The
//! core never reads process-wide environment variables itself: binaries hand a lookup function
//! to [`CoreConfig::from_lookup`], which keeps request handling and tests independent of the
//! process environment.

use crate::constants::{
    DEFAULT_DATA_DIR, DEFAULT_MAX_ROUNDS, DEFAULT_RETRY_BACKOFF_MS, DEFAULT_UPSTREAM_TIMEOUT_MS,
    SESSIONS_DIR_NAME,
};
use crate::{CarePlanError, CarePlanResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the data directory.
pub const ENV_DATA_DIR: &str = "CAREPLAN_DATA_DIR";
/// Environment variable naming the reasoning service endpoint.
pub const ENV_REASONING_URL: &str = "CAREPLAN_REASONING_URL";
/// Environment variable naming the ranking service endpoint.
pub const ENV_RANKING_URL: &str = "CAREPLAN_RANKING_URL";
/// Environment variable for the per-attempt upstream timeout in milliseconds.
pub const ENV_UPSTREAM_TIMEOUT_MS: &str = "CAREPLAN_UPSTREAM_TIMEOUT_MS";
/// Environment variable for the retry backoff in milliseconds.
pub const ENV_RETRY_BACKOFF_MS: &str = "CAREPLAN_RETRY_BACKOFF_MS";
/// Environment variable for the question round cap.
pub const ENV_MAX_ROUNDS: &str = "CAREPLAN_MAX_ROUNDS";
/// Environment variable naming an optional guideline YAML file.
pub const ENV_KNOWLEDGE_FILE: &str = "CAREPLAN_KNOWLEDGE_FILE";

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    upstream_timeout: Duration,
    retry_backoff: Duration,
    max_rounds: usize,
    reasoning_url: Option<String>,
    ranking_url: Option<String>,
    knowledge_file: Option<PathBuf>,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with no upstream endpoints or knowledge override.
    ///
    /// # Errors
    ///
    /// Returns `CarePlanError::InvalidInput` if the timeout is zero or `max_rounds` is zero.
    pub fn new(
        data_dir: PathBuf,
        upstream_timeout: Duration,
        retry_backoff: Duration,
        max_rounds: usize,
    ) -> CarePlanResult<Self> {
        if upstream_timeout.is_zero() {
            return Err(CarePlanError::InvalidInput(
                "upstream timeout must be greater than zero".into(),
            ));
        }
        if max_rounds == 0 {
            return Err(CarePlanError::InvalidInput(
                "max_rounds must be at least 1".into(),
            ));
        }

        Ok(Self {
            data_dir,
            upstream_timeout,
            retry_backoff,
            max_rounds,
            reasoning_url: None,
            ranking_url: None,
            knowledge_file: None,
        })
    }

    /// Resolve configuration from a key lookup (normally `std::env::var(..).ok()`).
    ///
    /// Unset or blank values fall back to defaults. Malformed numbers are rejected rather than
    /// silently replaced.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CarePlanResult<Self> {
        let value = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let data_dir = value(ENV_DATA_DIR).unwrap_or_else(|| DEFAULT_DATA_DIR.into());
        let upstream_timeout = duration_ms_from_env_value(
            ENV_UPSTREAM_TIMEOUT_MS,
            value(ENV_UPSTREAM_TIMEOUT_MS),
            DEFAULT_UPSTREAM_TIMEOUT_MS,
        )?;
        let retry_backoff = duration_ms_from_env_value(
            ENV_RETRY_BACKOFF_MS,
            value(ENV_RETRY_BACKOFF_MS),
            DEFAULT_RETRY_BACKOFF_MS,
        )?;
        let max_rounds = max_rounds_from_env_value(value(ENV_MAX_ROUNDS))?;

        let mut cfg = Self::new(
            PathBuf::from(data_dir),
            upstream_timeout,
            retry_backoff,
            max_rounds,
        )?;
        cfg.reasoning_url = value(ENV_REASONING_URL);
        cfg.ranking_url = value(ENV_RANKING_URL);
        cfg.knowledge_file = value(ENV_KNOWLEDGE_FILE).map(PathBuf::from);
        Ok(cfg)
    }

    /// Set the reasoning and ranking service endpoints.
    pub fn with_upstream_urls(
        mut self,
        reasoning_url: impl Into<String>,
        ranking_url: impl Into<String>,
    ) -> Self {
        self.reasoning_url = Some(reasoning_url.into());
        self.ranking_url = Some(ranking_url.into());
        self
    }

    /// Use a guideline YAML file instead of the built-in guidelines.
    pub fn with_knowledge_file(mut self, path: PathBuf) -> Self {
        self.knowledge_file = Some(path);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir.join(SESSIONS_DIR_NAME)
    }

    pub fn upstream_timeout(&self) -> Duration {
        self.upstream_timeout
    }

    pub fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    pub fn reasoning_url(&self) -> Option<&str> {
        self.reasoning_url.as_deref()
    }

    pub fn ranking_url(&self) -> Option<&str> {
        self.ranking_url.as_deref()
    }

    pub fn knowledge_file(&self) -> Option<&Path> {
        self.knowledge_file.as_deref()
    }
}

/// Parse a millisecond duration from an optional value, falling back to `default_ms`.
pub fn duration_ms_from_env_value(
    name: &str,
    value: Option<String>,
    default_ms: u64,
) -> CarePlanResult<Duration> {
    match value {
        None => Ok(Duration::from_millis(default_ms)),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| {
                CarePlanError::InvalidInput(format!(
                    "{name} must be a whole number of milliseconds, got '{raw}'"
                ))
            }),
    }
}

/// Parse the question round cap from an optional value.
pub fn max_rounds_from_env_value(value: Option<String>) -> CarePlanResult<usize> {
    match value {
        None => Ok(DEFAULT_MAX_ROUNDS),
        Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
            CarePlanError::InvalidInput(format!(
                "{ENV_MAX_ROUNDS} must be a positive whole number, got '{raw}'"
            ))
        }),
    }
}
