//! # API Shared
//!
//! Shared wire types and services for the care-plan APIs.
//!
//! Contains:
//! - Request/response types for the inbound session operations (`wire` module), with OpenAPI
//!   schemas
//! - Conversions from core session types into those wire types
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the CLI for common functionality.

pub mod health;
pub mod wire;

pub use health::HealthService;
pub use wire::*;
