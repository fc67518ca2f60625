//! Timeout, bounded retry and cancellation for upstream calls.

use super::{CallSite, UpstreamError};
use crate::config::CoreConfig;
use crate::constants::MAX_UPSTREAM_ATTEMPTS;
use crate::session::FailureCause;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Per-attempt timeout plus one retry after a fixed backoff on transient failure.
///
/// Attempts per call are capped at [`MAX_UPSTREAM_ATTEMPTS`]. Non-transient failures are never
/// retried. Cancelling the token stops the call, or the backoff, immediately.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    timeout: Duration,
    backoff: Duration,
}

impl RetryPolicy {
    pub fn new(timeout: Duration, backoff: Duration) -> Self {
        Self { timeout, backoff }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.upstream_timeout(), config.retry_backoff())
    }

    pub async fn run<T, F, Fut>(
        &self,
        site: CallSite,
        cancel: &CancellationToken,
        mut call: F,
    ) -> Result<T, FailureCause>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let timeout_ms = self.timeout.as_millis() as u64;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FailureCause::Aborted),
                res = tokio::time::timeout(self.timeout, call()) => {
                    res.unwrap_or(Err(UpstreamError::Timeout { timeout_ms }))
                }
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() {
                tracing::error!(%site, error = %err, "upstream call rejected");
                return Err(FailureCause::UpstreamRejection {
                    site,
                    detail: err.to_string(),
                });
            }

            if attempts >= MAX_UPSTREAM_ATTEMPTS {
                tracing::error!(%site, attempts, error = %err, "upstream call failed after retry");
                return Err(FailureCause::UpstreamTransientFailure {
                    site,
                    attempts,
                    detail: err.to_string(),
                });
            }

            tracing::warn!(
                %site,
                attempt = attempts,
                backoff_ms = self.backoff.as_millis() as u64,
                error = %err,
                "transient upstream failure, retrying"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FailureCause::Aborted),
                _ = tokio::time::sleep(self.backoff) => {}
            }
        }
    }
}
