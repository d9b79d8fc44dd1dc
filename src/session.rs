//! Peer Sessions
//!
//! One [`PeerSession`] exists per currently-connected peer: the private
//! inbound/outbound queue pair plus bookkeeping. Sessions own message
//! buffers only — no network resources. Created when the transport
//! reports a connect, destroyed (queues purged) the instant it reports a
//! disconnect.
//!
//! Session ids are allocated monotonically and never reused, so a peer
//! reconnecting under the same identity bytes always occupies a brand-new
//! slot: no pre-disconnect data can leak across the gap.

use crate::identity::Identity;
use crate::message::Message;
use std::collections::VecDeque;
use std::fmt;

/// Unique identifier for a session instance. Never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Create a new session ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

/// Statistics for a session.
#[derive(Clone, Debug, Default)]
pub struct SessionStats {
    /// Messages appended to the inbound queue.
    pub inbound_enqueued: u64,
    /// Messages handed to the application.
    pub inbound_dequeued: u64,
    /// Messages appended to the outbound queue.
    pub outbound_enqueued: u64,
    /// Messages handed to the transport.
    pub outbound_dequeued: u64,
}

impl SessionStats {
    /// Create new session statistics.
    pub fn new() -> Self {
        Self::default()
    }
}

/// The queue pair and state for one connected peer.
///
/// Strict FIFO in each direction; messages are atomic units and are never
/// split or reordered within a session. Queues have no hard capacity
/// limit here — backpressure, if any, is the transport collaborator's
/// concern.
#[derive(Clone, Debug)]
pub struct PeerSession {
    /// Slot identifier (monotonic, never reused).
    session_id: SessionId,
    /// Routing key for this peer.
    identity: Identity,
    /// Messages received from the peer, awaiting application receive.
    inbound: VecDeque<Message>,
    /// Messages routed to the peer, awaiting transport transmission.
    outbound: VecDeque<Message>,
    /// Whether the transport connection is currently established.
    connected: bool,
    /// Queue counters.
    stats: SessionStats,
    /// When this session was created (Unix milliseconds).
    connected_at_ms: u64,
}

impl PeerSession {
    /// Create a new session with empty queues.
    pub fn new(session_id: SessionId, identity: Identity, connected_at_ms: u64) -> Self {
        Self {
            session_id,
            identity,
            inbound: VecDeque::new(),
            outbound: VecDeque::new(),
            connected: true,
            stats: SessionStats::new(),
            connected_at_ms,
        }
    }

    // === Accessors ===

    /// Get the session ID.
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Get the peer's identity.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Whether the transport connection is established.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Get the session statistics.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// When this session was created (Unix milliseconds).
    pub fn connected_at_ms(&self) -> u64 {
        self.connected_at_ms
    }

    /// Number of queued inbound messages.
    pub fn inbound_len(&self) -> usize {
        self.inbound.len()
    }

    /// Number of queued outbound messages.
    pub fn outbound_len(&self) -> usize {
        self.outbound.len()
    }

    /// Whether any inbound message is waiting.
    pub fn has_inbound(&self) -> bool {
        !self.inbound.is_empty()
    }

    /// Whether any outbound message is waiting.
    pub fn has_outbound(&self) -> bool {
        !self.outbound.is_empty()
    }

    // === Queue Operations ===

    /// Append a message to the inbound queue.
    pub fn enqueue_inbound(&mut self, message: Message) {
        self.inbound.push_back(message);
        self.stats.inbound_enqueued += 1;
    }

    /// Remove and return the oldest inbound message.
    pub fn dequeue_inbound(&mut self) -> Option<Message> {
        let message = self.inbound.pop_front();
        if message.is_some() {
            self.stats.inbound_dequeued += 1;
        }
        message
    }

    /// Append a message to the outbound queue.
    pub fn enqueue_outbound(&mut self, message: Message) {
        self.outbound.push_back(message);
        self.stats.outbound_enqueued += 1;
    }

    /// Remove and return the oldest outbound message.
    pub fn dequeue_outbound(&mut self) -> Option<Message> {
        let message = self.outbound.pop_front();
        if message.is_some() {
            self.stats.outbound_dequeued += 1;
        }
        message
    }

    /// Push an outbound message back to the front of the queue.
    ///
    /// Used when the transmit channel is full: the message stays queued
    /// in send order and a later drain retries it.
    pub fn requeue_outbound(&mut self, message: Message) {
        self.outbound.push_front(message);
        self.stats.outbound_dequeued = self.stats.outbound_dequeued.saturating_sub(1);
    }

    /// Discard all queued messages in both directions.
    ///
    /// Called exactly once, at disconnect, before the session is
    /// released. Returns (inbound, outbound) discard counts.
    pub fn purge(&mut self) -> (usize, usize) {
        let inbound = self.inbound.len();
        let outbound = self.outbound.len();
        self.inbound.clear();
        self.outbound.clear();
        self.connected = false;
        (inbound, outbound)
    }
}
