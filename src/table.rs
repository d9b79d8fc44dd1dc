//! Peer Table
//!
//! Maps an opaque identity to its [`PeerSession`] — the single source of
//! truth for which peers are currently reachable. A session is present
//! here if and only if its peer's transport connection is established.
//!
//! Sessions are stored in a `BTreeMap` keyed by [`SessionId`]. Because
//! session ids are allocated monotonically and never reused, the map's
//! key order is exactly connection order, which the fair-queue scheduler
//! uses as its rotation order. A second map resolves identities to
//! session ids for O(1)-ish routing lookups.

use crate::identity::Identity;
use crate::session::{PeerSession, SessionId};
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound::{Excluded, Unbounded};
use thiserror::Error;

/// Errors related to peer table operations.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("identity already connected: {0}")]
    DuplicateIdentity(Identity),
}

/// Identity-addressed table of connected peer sessions.
#[derive(Clone, Debug, Default)]
pub struct PeerTable {
    /// Sessions in connection order (monotonic ids, never reused).
    sessions: BTreeMap<SessionId, PeerSession>,
    /// Reverse lookup: identity -> session id.
    by_identity: HashMap<Identity, SessionId>,
    /// Next session id to allocate.
    next_session_id: u64,
}

impl PeerTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh session id.
    ///
    /// Ids are never reused, so a reconnecting identity always gets a
    /// new slot and a new position at the end of the rotation order.
    pub fn allocate_session_id(&mut self) -> SessionId {
        let id = SessionId::new(self.next_session_id);
        self.next_session_id += 1;
        id
    }

    /// Insert a session under its identity.
    ///
    /// A colliding identity is rejected, never overwritten — the caller
    /// treats the collision as a failed registration and the existing
    /// session is untouched.
    pub fn insert(&mut self, session: PeerSession) -> Result<SessionId, TableError> {
        let identity = session.identity().clone();
        if self.by_identity.contains_key(&identity) {
            return Err(TableError::DuplicateIdentity(identity));
        }
        let session_id = session.session_id();
        self.by_identity.insert(identity, session_id);
        self.sessions.insert(session_id, session);
        Ok(session_id)
    }

    /// Remove and return the session for an identity.
    ///
    /// Unknown identities are a tolerated no-op: disconnect notifications
    /// may race with session teardown and must never be fatal.
    pub fn remove(&mut self, identity: &Identity) -> Option<PeerSession> {
        let session_id = self.by_identity.remove(identity)?;
        self.sessions.remove(&session_id)
    }

    /// Look up the session for an identity.
    pub fn lookup(&self, identity: &Identity) -> Option<&PeerSession> {
        let session_id = self.by_identity.get(identity)?;
        self.sessions.get(session_id)
    }

    /// Look up the session for an identity, mutably.
    pub fn lookup_mut(&mut self, identity: &Identity) -> Option<&mut PeerSession> {
        let session_id = self.by_identity.get(identity)?;
        self.sessions.get_mut(session_id)
    }

    /// Get a session by id.
    pub fn get(&self, session_id: SessionId) -> Option<&PeerSession> {
        self.sessions.get(&session_id)
    }

    /// Get a session by id, mutably.
    pub fn get_mut(&mut self, session_id: SessionId) -> Option<&mut PeerSession> {
        self.sessions.get_mut(&session_id)
    }

    /// Whether an identity is currently connected.
    pub fn contains(&self, identity: &Identity) -> bool {
        self.by_identity.contains_key(identity)
    }

    /// Number of connected peers.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Iterate over sessions in connection order.
    pub fn iter(&self) -> impl Iterator<Item = &PeerSession> {
        self.sessions.values()
    }

    /// Iterate mutably over sessions in connection order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PeerSession> {
        self.sessions.values_mut()
    }

    /// Iterate over connected identities in connection order.
    pub fn identities(&self) -> impl Iterator<Item = &Identity> {
        self.sessions.values().map(|s| s.identity())
    }

    /// Session ids in rotation order, starting just after `cursor`.
    ///
    /// Produces each current member exactly once: the ids greater than
    /// the cursor first, then a wrap back to the start of the table. A
    /// cursor whose session has since been removed degrades gracefully —
    /// the range starts at the next surviving id. `None` starts at the
    /// beginning.
    pub fn rotation_from(&self, cursor: Option<SessionId>) -> Vec<SessionId> {
        let mut order = Vec::with_capacity(self.sessions.len());
        match cursor {
            None => order.extend(self.sessions.keys().copied()),
            Some(cursor) => {
                order.extend(
                    self.sessions
                        .range((Excluded(cursor), Unbounded))
                        .map(|(id, _)| *id),
                );
                order.extend(
                    self.sessions
                        .range(..=cursor)
                        .map(|(id, _)| *id),
                );
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_session(table: &mut PeerTable, name: &[u8]) -> PeerSession {
        let session_id = table.allocate_session_id();
        let identity = Identity::from_bytes(name).unwrap();
        PeerSession::new(session_id, identity, 0)
    }

    fn insert_peer(table: &mut PeerTable, name: &[u8]) -> SessionId {
        let session = make_session(table, name);
        table.insert(session).unwrap()
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut table = PeerTable::new();
        let id = insert_peer(&mut table, b"A");

        let identity = Identity::from_bytes(b"A").unwrap();
        assert!(table.contains(&identity));
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(&identity).unwrap().session_id(), id);
    }

    #[test]
    fn test_insert_rejects_duplicate_identity() {
        let mut table = PeerTable::new();
        insert_peer(&mut table, b"A");

        let duplicate = make_session(&mut table, b"A");
        let err = table.insert(duplicate).unwrap_err();
        assert!(matches!(err, TableError::DuplicateIdentity(_)));

        // Existing session untouched
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut table = PeerTable::new();
        insert_peer(&mut table, b"A");

        let unknown = Identity::from_bytes(b"ghost").unwrap();
        assert!(table.remove(&unknown).is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove_returns_session() {
        let mut table = PeerTable::new();
        insert_peer(&mut table, b"A");

        let identity = Identity::from_bytes(b"A").unwrap();
        let session = table.remove(&identity).unwrap();
        assert_eq!(session.identity(), &identity);
        assert!(table.is_empty());
        assert!(!table.contains(&identity));
    }

    #[test]
    fn test_session_ids_never_reused() {
        let mut table = PeerTable::new();
        let first = insert_peer(&mut table, b"A");

        let identity = Identity::from_bytes(b"A").unwrap();
        table.remove(&identity);

        // Same identity bytes reconnect: brand-new slot
        let second = insert_peer(&mut table, b"A");
        assert_ne!(first, second);
        assert!(second > first);
    }

    #[test]
    fn test_rotation_order_is_connection_order() {
        let mut table = PeerTable::new();
        let a = insert_peer(&mut table, b"A");
        let b = insert_peer(&mut table, b"B");
        let c = insert_peer(&mut table, b"C");

        assert_eq!(table.rotation_from(None), vec![a, b, c]);
        assert_eq!(table.rotation_from(Some(a)), vec![b, c, a]);
        assert_eq!(table.rotation_from(Some(b)), vec![c, a, b]);
        assert_eq!(table.rotation_from(Some(c)), vec![a, b, c]);
    }

    #[test]
    fn test_rotation_with_removed_cursor() {
        let mut table = PeerTable::new();
        let a = insert_peer(&mut table, b"A");
        let b = insert_peer(&mut table, b"B");
        let c = insert_peer(&mut table, b"C");

        // Remove the peer the cursor points at: rotation resumes at the
        // next surviving entry, removed peer skipped.
        table.remove(&Identity::from_bytes(b"B").unwrap());
        assert_eq!(table.rotation_from(Some(b)), vec![c, a]);
        assert_eq!(table.rotation_from(Some(a)), vec![c, a]);
    }

    #[test]
    fn test_rotation_restart_reflects_membership() {
        let mut table = PeerTable::new();
        insert_peer(&mut table, b"A");
        let b = insert_peer(&mut table, b"B");

        let before = table.rotation_from(None);
        assert_eq!(before.len(), 2);

        table.remove(&Identity::from_bytes(b"A").unwrap());
        let after = table.rotation_from(None);
        assert_eq!(after, vec![b]);
    }

    #[test]
    fn test_rotation_empty_table() {
        let table = PeerTable::new();
        assert!(table.rotation_from(None).is_empty());
        assert!(table.rotation_from(Some(SessionId::new(3))).is_empty());
    }
}
