use careplan_uuid::SessionId;

use crate::session::Phase;

#[derive(Debug, thiserror::Error)]
pub enum CarePlanError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),
    #[error("session already exists: {0}")]
    SessionExists(SessionId),
    #[error("operation not allowed while session is {phase}")]
    InvalidSessionState { phase: Phase },
    #[error("session {0} is already processing an answer")]
    SessionBusy(SessionId),
    #[error("plan not ready: session is {phase}")]
    NotReady { phase: Phase },

    #[error("failed to create session directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write session file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read session file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize session: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize session: {0}")]
    Deserialization(serde_json::Error),

    #[error("failed to read knowledge file: {0}")]
    KnowledgeRead(std::io::Error),
    #[error("failed to parse knowledge YAML: {0}")]
    KnowledgeParse(serde_yaml::Error),

    #[error("failed to build upstream HTTP client: {0}")]
    HttpClient(reqwest::Error),
}

pub type CarePlanResult<T> = std::result::Result<T, CarePlanError>;
