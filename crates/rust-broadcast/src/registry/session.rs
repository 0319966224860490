//! Registered sessions.

use std::collections::BTreeMap;
use std::time::SystemTime;

use crate::types::{NewSession, Session, SessionId, SessionStatus, SessionUpdate};

/// The table of known sessions, in registration order.
#[derive(Debug, Default, Clone)]
pub struct SessionRegistry {
    sessions: BTreeMap<SessionId, Session>,
    next_id: u64,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from previously stored sessions.
    ///
    /// `next_id` is the first ID the previous registry had not handed out
    /// yet. New IDs continue from it, or after the highest restored ID if
    /// that is larger, so removed sessions never have their IDs reissued.
    #[must_use]
    pub fn restore(sessions: Vec<Session>, next_id: u64) -> Self {
        let next_id = sessions
            .iter()
            .map(|s| s.id.as_u64())
            .max()
            .unwrap_or(0)
            .max(next_id.saturating_sub(1));
        Self {
            sessions: sessions.into_iter().map(|s| (s.id, s)).collect(),
            next_id,
        }
    }

    /// The ID the next registration will receive.
    #[must_use]
    pub const fn next_id(&self) -> u64 {
        self.next_id + 1
    }

    /// Register a session and return its fresh ID.
    pub fn register(&mut self, session: NewSession) -> SessionId {
        self.next_id += 1;
        let id = SessionId::new(self.next_id);
        self.sessions
            .insert(id, session.into_session(id, SystemTime::now()));
        id
    }

    /// Merge `update` into a session. Returns `false` if the ID is unknown.
    pub fn update(&mut self, id: SessionId, update: SessionUpdate) -> bool {
        match self.sessions.get_mut(&id) {
            Some(session) => {
                update.apply(session, SystemTime::now());
                true
            }
            None => false,
        }
    }

    /// Set a session's status. Returns `false` if the ID is unknown.
    pub fn set_status(&mut self, id: SessionId, status: SessionStatus) -> bool {
        self.update(id, SessionUpdate::new().status(status))
    }

    /// Remove a session.
    ///
    /// Group membership is not touched here; use
    /// [`GroupRegistry::purge_session`](super::GroupRegistry::purge_session)
    /// or go through the engine, which does both.
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    /// Get a session.
    #[must_use]
    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    /// Check if a session is registered.
    #[must_use]
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Iterate over sessions in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Get all sessions in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<Session> {
        self.sessions.values().cloned().collect()
    }

    /// Get all sessions with the given status.
    #[must_use]
    pub fn list_by_status(&self, status: SessionStatus) -> Vec<Session> {
        self.sessions
            .values()
            .filter(|s| s.status == status)
            .cloned()
            .collect()
    }

    /// Look up `ids` in the given order, keeping only known active sessions.
    #[must_use]
    pub fn active_in_order<'a, I>(&self, ids: I) -> Vec<Session>
    where
        I: IntoIterator<Item = &'a SessionId>,
    {
        ids.into_iter()
            .filter_map(|id| self.sessions.get(id))
            .filter(|s| s.is_active())
            .cloned()
            .collect()
    }

    /// Get session count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SessionType;

    #[test]
    fn register_assigns_unique_ids() {
        let mut registry = SessionRegistry::new();
        let a = registry.register(NewSession::new("a", SessionType::Local));
        let b = registry.register(NewSession::new("b", SessionType::Local));

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        let session = registry.get(a).unwrap();
        assert_eq!(session.name, "a");
        assert_eq!(session.created_at, session.last_activity);
    }

    #[test]
    fn update_unknown_is_noop() {
        let mut registry = SessionRegistry::new();
        assert!(!registry.update(SessionId::new(99), SessionUpdate::new().name("x")));
        assert!(registry.is_empty());
    }

    #[test]
    fn update_merges_and_refreshes_activity() {
        let mut registry = SessionRegistry::new();
        let id = registry.register(NewSession::new("a", SessionType::Local).tag("dev"));
        let before = registry.get(id).unwrap().last_activity;

        assert!(registry.update(id, SessionUpdate::new().name("renamed")));

        let session = registry.get(id).unwrap();
        assert_eq!(session.name, "renamed");
        assert!(session.has_tag("dev"));
        assert!(session.last_activity >= before);
    }

    #[test]
    fn remove_returns_session() {
        let mut registry = SessionRegistry::new();
        let id = registry.register(NewSession::new("a", SessionType::Local));
        assert_eq!(registry.remove(id).map(|s| s.name), Some("a".to_string()));
        assert!(registry.remove(id).is_none());
    }

    #[test]
    fn active_in_order_keeps_caller_order() {
        let mut registry = SessionRegistry::new();
        let a = registry.register(NewSession::new("a", SessionType::Local));
        let b = registry.register(NewSession::new("b", SessionType::Local));
        let c = registry
            .register(NewSession::new("c", SessionType::Local).status(SessionStatus::Inactive));

        let active = registry.active_in_order(&[b, c, SessionId::new(42), a]);
        let names: Vec<_> = active.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn restore_continues_ids() {
        let mut original = SessionRegistry::new();
        original.register(NewSession::new("a", SessionType::Local));
        let b = original.register(NewSession::new("b", SessionType::Local));

        let mut restored = SessionRegistry::restore(original.list(), 0);
        let c = restored.register(NewSession::new("c", SessionType::Local));
        assert!(c > b);
        assert_eq!(restored.len(), 3);
    }

    #[test]
    fn restore_never_reissues_removed_ids() {
        let mut original = SessionRegistry::new();
        let a = original.register(NewSession::new("a", SessionType::Local));
        let b = original.register(NewSession::new("b", SessionType::Local));
        original.remove(b);
        assert_eq!(original.next_id(), 3);

        let mut restored = SessionRegistry::restore(original.list(), original.next_id());
        let c = restored.register(NewSession::new("c", SessionType::Local));
        assert_eq!(c, SessionId::new(3));
        assert_ne!(c, a);

        let stale = SessionRegistry::restore(restored.list(), 1);
        assert_eq!(stale.next_id(), 4);
    }

    #[test]
    fn list_by_status_filters() {
        let mut registry = SessionRegistry::new();
        let a = registry.register(NewSession::new("a", SessionType::Local));
        registry.register(NewSession::new("b", SessionType::Local));
        registry.set_status(a, SessionStatus::Error);

        assert_eq!(registry.list_by_status(SessionStatus::Error).len(), 1);
        assert_eq!(registry.list_by_status(SessionStatus::Active).len(), 1);
    }
}
