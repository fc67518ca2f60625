//! Session persistence.
//!
//! Stores hold full [`Session`] snapshots keyed by session id. There is no delete: the end of a
//! session's life is its terminal phase, not the removal of its record.

use crate::constants::SESSION_JSON_FILENAME;
use crate::session::Session;
use crate::{CarePlanError, CarePlanResult};
use async_trait::async_trait;
use careplan_uuid::SessionId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session. Fails with `SessionExists` if the id is taken.
    async fn create(&self, session: &Session) -> CarePlanResult<()>;

    /// Read a session snapshot, `None` if unknown.
    async fn read(&self, id: &SessionId) -> CarePlanResult<Option<Session>>;

    /// Replace an existing snapshot. Fails with `SessionNotFound` if the id is unknown.
    async fn update(&self, session: &Session) -> CarePlanResult<()>;
}

/// Volatile store for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: &Session) -> CarePlanResult<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id()) {
            return Err(CarePlanError::SessionExists(session.id()));
        }
        sessions.insert(session.id(), session.clone());
        Ok(())
    }

    async fn read(&self, id: &SessionId) -> CarePlanResult<Option<Session>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn update(&self, session: &Session) -> CarePlanResult<()> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&session.id()) {
            Some(existing) => {
                *existing = session.clone();
                Ok(())
            }
            None => Err(CarePlanError::SessionNotFound(session.id())),
        }
    }
}

/// One pretty-printed JSON file per session under a sharded directory:
/// `<sessions_dir>/<s1>/<s2>/<session_id>/session.json`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    sessions_dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            sessions_dir: sessions_dir.into(),
        }
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn session_file(&self, id: &SessionId) -> PathBuf {
        id.sharded_dir(&self.sessions_dir)
            .join(SESSION_JSON_FILENAME)
    }

    /// Write via a temporary sibling and rename, so readers never see a partial file.
    async fn write_snapshot(&self, path: &Path, session: &Session) -> CarePlanResult<()> {
        let json = serde_json::to_string_pretty(session).map_err(CarePlanError::Serialization)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(CarePlanError::FileWrite)?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(CarePlanError::FileWrite)
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn create(&self, session: &Session) -> CarePlanResult<()> {
        let path = self.session_file(&session.id());
        if tokio::fs::try_exists(&path)
            .await
            .map_err(CarePlanError::FileRead)?
        {
            return Err(CarePlanError::SessionExists(session.id()));
        }
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(CarePlanError::StorageDirCreation)?;
        }
        self.write_snapshot(&path, session).await
    }

    async fn read(&self, id: &SessionId) -> CarePlanResult<Option<Session>> {
        let path = self.session_file(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CarePlanError::FileRead(e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(CarePlanError::Deserialization)
    }

    async fn update(&self, session: &Session) -> CarePlanResult<()> {
        let path = self.session_file(&session.id());
        if !tokio::fs::try_exists(&path)
            .await
            .map_err(CarePlanError::FileRead)?
        {
            return Err(CarePlanError::SessionNotFound(session.id()));
        }
        self.write_snapshot(&path, session).await
    }
}
