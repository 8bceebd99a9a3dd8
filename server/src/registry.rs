//! Session registry
//!
//! Two independent maps: session id to session handle (owning), and
//! connection id to session id (a back-reference used to route disconnects).
//! Each map has its own short-lived `std::sync::RwLock`; no registry call ever
//! waits on a session's mutex.

use crate::connections::ConnectionId;
use crate::session::{GameId, GameSession};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;

pub type SessionHandle = Arc<Mutex<GameSession>>;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<GameId, SessionHandle>>,
    connections: RwLock<HashMap<ConnectionId, GameId>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, session: GameSession) -> (GameId, SessionHandle) {
        let id = session.id;
        let handle = Arc::new(Mutex::new(session));
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::clone(&handle));
        (id, handle)
    }

    pub fn get(&self, id: &GameId) -> Option<SessionHandle> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Removes a session along with the given connection bindings, skipping
    /// any that already point elsewhere. Removing an unknown id is a no-op.
    pub fn remove(&self, id: &GameId, connections: &[ConnectionId]) -> Option<SessionHandle> {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        if removed.is_some() {
            let mut bindings = self.connections.write().unwrap_or_else(PoisonError::into_inner);
            for connection in connections {
                if bindings.get(connection) == Some(id) {
                    bindings.remove(connection);
                }
            }
        }
        removed
    }

    pub fn bind(&self, connection: ConnectionId, id: GameId) {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(connection, id);
    }

    pub fn resolve(&self, connection: ConnectionId) -> Option<GameId> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&connection)
            .copied()
    }

    pub fn unbind(&self, connection: ConnectionId) -> Option<GameId> {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&connection)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use uuid::Uuid;

    fn waiting(connection: u64) -> GameSession {
        GameSession::waiting(
            Uuid::new_v4(),
            ConnectionId(connection),
            Vec::new(),
            false,
            Duration::from_secs(120),
        )
    }

    #[tokio::test]
    async fn test_create_get_remove() {
        let registry = SessionRegistry::new();
        let (id, handle) = registry.create(waiting(1));

        let fetched = registry.get(&id).unwrap();
        assert!(Arc::ptr_eq(&handle, &fetched));
        assert_eq!(fetched.lock().await.id, id);
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(&id, &[]).is_some());
        assert!(registry.get(&id).is_none());
        assert!(registry.remove(&id, &[]).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_bindings() {
        let registry = SessionRegistry::new();
        let (id, _) = registry.create(waiting(1));

        registry.bind(ConnectionId(1), id);
        registry.bind(ConnectionId(2), id);
        assert_eq!(registry.resolve(ConnectionId(1)), Some(id));

        assert_eq!(registry.unbind(ConnectionId(1)), Some(id));
        assert_eq!(registry.resolve(ConnectionId(1)), None);
        assert_eq!(registry.unbind(ConnectionId(1)), None);
    }

    #[test]
    fn test_remove_drops_bindings() {
        let registry = SessionRegistry::new();
        let (first, _) = registry.create(waiting(1));
        let (second, _) = registry.create(waiting(3));
        registry.bind(ConnectionId(1), first);
        registry.bind(ConnectionId(2), first);
        registry.bind(ConnectionId(3), second);
        registry.bind(ConnectionId(4), second);

        // Connection 3 is listed by mistake; its binding belongs to the other game.
        registry.remove(&first, &[ConnectionId(1), ConnectionId(2), ConnectionId(3)]);

        assert_eq!(registry.resolve(ConnectionId(1)), None);
        assert_eq!(registry.resolve(ConnectionId(2)), None);
        assert_eq!(registry.resolve(ConnectionId(3)), Some(second));
        assert_eq!(registry.resolve(ConnectionId(4)), Some(second));
        assert!(registry.get(&second).is_some());
    }

    #[tokio::test]
    async fn test_concurrent_creates() {
        let registry = Arc::new(SessionRegistry::new());
        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    let (id, _) = registry.create(waiting(i));
                    registry.bind(ConnectionId(i), id);
                    id
                })
            })
            .collect();

        for (i, task) in tasks.into_iter().enumerate() {
            let id = task.await.unwrap();
            assert_eq!(registry.resolve(ConnectionId(i as u64)), Some(id));
        }
        assert_eq!(registry.len(), 64);
    }
}
