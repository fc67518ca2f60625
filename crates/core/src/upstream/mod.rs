//! Boundaries to the external reasoning and ranking services.
//!
//! Both services are slow, fallible and network-bound. The traits here describe their contracts;
//! [`retry::RetryPolicy`] adds the per-attempt timeout and the single retry on transient failure,
//! and [`http`] provides JSON-over-HTTP implementations.

pub mod http;
pub mod retry;

use crate::profile::Profile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Treatment decision returned by the reasoning service. Never modified once received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(alias = "diseaseType")]
    pub disease_type: String,
    #[serde(alias = "treatmentType")]
    pub treatment_type: String,
    pub timeline: String,
    #[serde(default)]
    pub notes: String,
}

impl Decision {
    /// Context handed to the ranking service.
    pub fn ranking_context(&self) -> RankingContext {
        RankingContext {
            disease_type: self.disease_type.clone(),
            treatment_type: self.treatment_type.clone(),
        }
    }
}

/// Ranking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingContext {
    pub disease_type: String,
    pub treatment_type: String,
}

/// One candidate facility with its priority rank (1 = most preferred).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedFacility {
    #[serde(alias = "facilityName")]
    pub name: String,
    pub location: String,
    #[serde(rename = "type", alias = "facilityType")]
    pub facility_type: String,
    #[serde(alias = "priorityRank")]
    pub priority_rank: u32,
}

/// Which upstream boundary a call was made to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallSite {
    Reasoning,
    Ranking,
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallSite::Reasoning => f.write_str("reasoning"),
            CallSite::Ranking => f.write_str("ranking"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    #[error("upstream timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("connection error: {0}")]
    Connection(String),
    #[error("upstream unavailable (HTTP {status}): {message}")]
    Unavailable { status: u16, message: String },
    #[error("upstream rejected the request: {0}")]
    Rejected(String),
    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

impl UpstreamError {
    /// Transient failures are worth one retry; the rest are fatal immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            UpstreamError::Timeout { .. }
                | UpstreamError::Connection(_)
                | UpstreamError::Unavailable { .. }
        )
    }
}

/// Maps a completed profile to a treatment decision. Calls must be safe to repeat.
#[async_trait]
pub trait ReasoningClient: Send + Sync {
    async fn decide(&self, profile: &Profile) -> Result<Decision, UpstreamError>;
}

/// Ranks candidate facilities for a decision. An empty list is a valid answer.
#[async_trait]
pub trait RankingClient: Send + Sync {
    async fn rank(&self, context: &RankingContext) -> Result<Vec<RankedFacility>, UpstreamError>;
}
