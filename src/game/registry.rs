//! Username → session mapping; the single owner of identity uniqueness

use std::collections::BTreeMap;

use crate::game::state::{Session, SessionSnapshot};

/// Registration failed because the username is held by a live session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Username already taken.")]
pub struct DuplicateUsername;

/// Live sessions keyed by username.
///
/// Iteration order (sorted by username) is the natural order used for
/// collision checks and snapshots.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<String, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `session` unless its username is already live
    pub fn register(&mut self, session: Session) -> Result<&Session, DuplicateUsername> {
        use std::collections::btree_map::Entry;

        match self.sessions.entry(session.username.clone()) {
            Entry::Occupied(_) => Err(DuplicateUsername),
            Entry::Vacant(slot) => Ok(slot.insert(session)),
        }
    }

    /// Remove a session; absent usernames are ignored
    pub fn unregister(&mut self, username: &str) -> Option<Session> {
        self.sessions.remove(username)
    }

    pub fn lookup(&self, username: &str) -> Option<&Session> {
        self.sessions.get(username)
    }

    pub fn lookup_mut(&mut self, username: &str) -> Option<&mut Session> {
        self.sessions.get_mut(username)
    }

    pub fn contains(&self, username: &str) -> bool {
        self.sessions.contains_key(username)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Public fields of every live session, in natural order
    pub fn snapshot(&self) -> Vec<SessionSnapshot> {
        self.sessions.values().map(Session::to_snapshot).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::vec2::Vec2;
    use std::net::{IpAddr, Ipv4Addr};

    fn session(name: &str, color: &str) -> Session {
        Session::new(
            name.to_string(),
            color.to_string(),
            None,
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            1,
            Vec2::new(100.0, 100.0),
        )
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = SessionRegistry::new();
        registry.register(session("alice", "red")).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("alice").unwrap().color, "red");
        assert!(registry.lookup("bob").is_none());
    }

    #[test]
    fn test_duplicate_rejected_and_original_kept() {
        let mut registry = SessionRegistry::new();
        registry.register(session("alice", "red")).unwrap();

        let result = registry.register(session("alice", "blue"));
        assert_eq!(result.unwrap_err(), DuplicateUsername);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup("alice").unwrap().color, "red");
    }

    #[test]
    fn test_usernames_case_sensitive() {
        let mut registry = SessionRegistry::new();
        registry.register(session("alice", "red")).unwrap();
        assert!(registry.register(session("Alice", "blue")).is_ok());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unregister_idempotent() {
        let mut registry = SessionRegistry::new();
        registry.register(session("alice", "red")).unwrap();

        assert!(registry.unregister("alice").is_some());
        assert!(registry.unregister("alice").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_has_each_user_once_in_order() {
        let mut registry = SessionRegistry::new();
        for name in ["carol", "alice", "bob"] {
            registry.register(session(name, "red")).unwrap();
        }

        let names: Vec<_> = registry.snapshot().into_iter().map(|s| s.username).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_duplicate_error_text() {
        assert_eq!(DuplicateUsername.to_string(), "Username already taken.");
    }
}
