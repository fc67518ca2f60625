//! Process-wide map of live sessions.
//!
//! The registry is created at startup and grows through [`SessionRegistry::get_or_insert`];
//! nothing inside the core expires entries. An idle session can be evicted explicitly. Each
//! [`SessionHandle`] admits one in-flight submission at a time, which is the only writer of that
//! session's state apart from abort.

use crate::session::Session;
use careplan_uuid::SessionId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio_util::sync::CancellationToken;

/// A live session plus its concurrency controls.
#[derive(Debug)]
pub struct SessionHandle {
    session: Mutex<Session>,
    in_flight: AtomicBool,
    retired: AtomicBool,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
            in_flight: AtomicBool::new(false),
            retired: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Claim the single in-flight slot. `None` if a submission is already being processed or
    /// the handle has been evicted.
    pub fn try_begin(&self) -> Option<InFlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        let guard = InFlightGuard { handle: self };
        if self.is_retired() {
            return None;
        }
        Some(guard)
    }

    /// True once the handle has been evicted from the registry.
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Lock the session state. Never hold this across an upstream call.
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().await
    }

    /// Token cancelled when the session is aborted.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Releases the in-flight slot on drop.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    handle: &'a SessionHandle,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.handle.in_flight.store(false, Ordering::Release);
    }
}

/// Result of [`SessionRegistry::evict`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eviction {
    Evicted,
    Busy,
    Absent,
}

/// Concurrent identity-to-session lookup.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &SessionId) -> Option<Arc<SessionHandle>> {
        let sessions = self.sessions.read().await;
        sessions.get(id).cloned()
    }

    /// Register `session` unless its id is already live, returning whichever handle is
    /// registered.
    pub async fn get_or_insert(&self, session: Session) -> Arc<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session.id())
            .or_insert_with(|| Arc::new(SessionHandle::new(session)))
            .clone()
    }

    /// Remove an idle session. A session with a submission in flight is kept. The removed
    /// handle is retired while its in-flight slot is held, so a caller still holding it cannot
    /// start a submission on it.
    pub async fn evict(&self, id: &SessionId) -> Eviction {
        let mut sessions = self.sessions.write().await;
        let Some(handle) = sessions.get(id).cloned() else {
            return Eviction::Absent;
        };
        let Some(_slot) = handle.try_begin() else {
            return Eviction::Busy;
        };
        handle.retired.store(true, Ordering::Release);
        sessions.remove(id);
        Eviction::Evicted
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
