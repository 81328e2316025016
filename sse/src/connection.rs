use dashmap::DashMap;
use log::*;
use std::sync::Arc;
use std::time::Instant;

/// Unique identifier for a streaming session (server-generated)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// What the relay knows about an attached client.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub quota: Option<u64>,
    pub opened_at: Instant,
}

/// Registry of sessions currently streaming, keyed by session id.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SessionInfo>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Register a new session. The returned guard unregisters it on drop.
    pub(crate) fn register(self: &Arc<Self>, quota: Option<u64>) -> Registration {
        let id = SessionId::new();
        self.sessions.insert(
            id.clone(),
            SessionInfo {
                quota,
                opened_at: Instant::now(),
            },
        );
        debug!(
            "Registered event stream session {} ({} active)",
            id.as_str(),
            self.sessions.len()
        );

        Registration {
            registry: Arc::clone(self),
            id,
        }
    }

    fn unregister(&self, id: &SessionId) {
        if let Some((_, info)) = self.sessions.remove(id) {
            debug!(
                "Unregistered event stream session {} after {:?} ({} active)",
                id.as_str(),
                info.opened_at.elapsed(),
                self.sessions.len()
            );
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, id: &SessionId) -> Option<SessionInfo> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps a session listed in the registry for as long as it is alive.
pub(crate) struct Registration {
    registry: Arc<SessionRegistry>,
    id: SessionId,
}

impl Registration {
    pub(crate) fn id(&self) -> &SessionId {
        &self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(&self.id);
    }
}
