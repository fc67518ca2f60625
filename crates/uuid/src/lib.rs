//! Session identity and sharded-path utilities.
//!
//! Every planning session is keyed by a UUID in *canonical* form: **32 lowercase hexadecimal
//! characters** (no hyphens). The same value names the session in API paths, in logs and in
//! the on-disk session store.
//!
//! This crate provides:
//! - [`SessionId`], a wrapper that *guarantees* the canonical format once constructed.
//! - The sharding logic used by the file-backed session store.
//!
//! ## Canonical form
//! - Length: 32
//! - Characters: `0-9` and `a-f` only
//! - Example: `550e8400e29b41d4a716446655440000`
//!
//! Externally supplied identifiers (path parameters, CLI arguments) must already be canonical.
//! Use [`SessionId::parse`] to validate them; uppercase or hyphenated values are rejected.
//!
//! ## Sharded directory layout
//! For a canonical id `u`, session files live under:
//! `parent_dir/<u[0..2]>/<u[2..4]>/<u>/`
//!
//! Example:
//! `careplan_data/sessions/55/0e/550e8400e29b41d4a716446655440000/`

mod service;

pub use service::{SessionId, Uuid};

/// Error type for session identity operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for session identity operations.
pub type UuidResult<T> = Result<T, UuidError>;
