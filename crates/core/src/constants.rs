//! Constants used throughout the care-plan core crate.

/// Fixed disclaimer attached verbatim to every plan and failure report.
pub const DISCLAIMER: &str = "This is not a medical diagnosis. Consult a licensed medical professional before making any healthcare decisions.";

/// Default directory for session data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "careplan_data";

/// Directory name (under the data directory) holding session snapshots.
pub const SESSIONS_DIR_NAME: &str = "sessions";

/// Filename for a session snapshot inside its sharded directory.
pub const SESSION_JSON_FILENAME: &str = "session.json";

/// Default per-attempt timeout for reasoning and ranking calls.
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 20_000;

/// Default fixed delay before the single retry of a transient upstream failure.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 250;

/// Default cap on question rounds before a session is failed.
pub const DEFAULT_MAX_ROUNDS: usize = 12;

/// Attempts per upstream call site: the first call plus one retry.
pub const MAX_UPSTREAM_ATTEMPTS: u32 = 2;

/// Maximum number of facilities listed in a plan.
pub const MAX_RECOMMENDED_HOSPITALS: usize = 5;
