//! Fair-Queue Scheduler
//!
//! Round-robin service across all connected peers' inbound queues. The
//! scheduler keeps one piece of state: a cursor recording the session
//! last serviced. Each receive resumes the rotation just after the
//! cursor, so a peer that bursts many messages still yields the floor
//! after one dequeue and cannot starve quieter peers.
//!
//! The cursor is only ever an id; if the session it names disconnects,
//! the next rotation simply starts at the next surviving entry. No
//! invalidation hook is needed.

use crate::identity::Identity;
use crate::message::Message;
use crate::session::SessionId;
use crate::table::PeerTable;
use tracing::trace;

/// Round-robin scheduler over peer inbound queues.
#[derive(Debug, Default)]
pub struct FairQueue {
    /// Session serviced by the previous poll, if any.
    cursor: Option<SessionId>,
}

impl FairQueue {
    /// Create a scheduler with no history.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current cursor position.
    pub fn cursor(&self) -> Option<SessionId> {
        self.cursor
    }

    /// Dequeue one message from the next peer in rotation.
    ///
    /// Scans peers in connection order starting just after the cursor,
    /// wrapping once. The first peer with a non-empty inbound queue has
    /// exactly one message dequeued; the cursor advances to that peer.
    /// Returns `None` when every queue is empty (including the empty
    /// table).
    pub fn poll(&mut self, table: &mut PeerTable) -> Option<(Identity, Message)> {
        for session_id in table.rotation_from(self.cursor) {
            let session = match table.get_mut(session_id) {
                Some(session) => session,
                None => continue,
            };
            if let Some(message) = session.dequeue_inbound() {
                let identity = session.identity().clone();
                self.cursor = Some(session_id);
                trace!(identity = %identity, %session_id, "fair-queue dequeue");
                return Some((identity, message));
            }
        }
        None
    }

    /// Whether any peer has an inbound message waiting.
    pub fn has_pending(&self, table: &PeerTable) -> bool {
        table.iter().any(|session| session.has_inbound())
    }
}
