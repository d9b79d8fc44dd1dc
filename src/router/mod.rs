//! Router Entity
//!
//! Top-level structure representing a running routing core. The Router
//! holds all state required for identity-addressed fan-in/fan-out: the
//! peer table, the fair-queue scheduler, delivery policy, channels to
//! the transport collaborator, and pending receive waiters.
//!
//! All mutation happens on the router's event loop task; applications
//! and transports interact through channels (see [`RouterHandle`] and
//! the event/transmit channel pairs created by `start()`).

mod handle;
mod handlers;
mod lifecycle;

pub use handle::{Command, RouterHandle};

use crate::config::Config;
use crate::dispatch::{dispatch, DispatchError, DispatchOutcome};
use crate::identity::{Identity, IdentityError};
use crate::message::{Frame, Message};
use crate::scheduler::FairQueue;
use crate::session::{PeerSession, SessionStats};
use crate::table::PeerTable;
use crate::transport::{EventRx, EventTx, TransmitRx, TransmitTx};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info};

/// Errors related to router operations.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("router not started")]
    NotStarted,

    #[error("router already started")]
    AlreadyStarted,

    #[error("router already stopped")]
    AlreadyStopped,

    #[error("router channel closed")]
    ChannelClosed,

    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Why a peer registration was rejected.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("identity already connected: {0}")]
    DuplicateIdentity(Identity),

    #[error("max peers exceeded: {max}")]
    TooManyPeers { max: usize },

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
}

/// Why a receive produced no message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecvError {
    /// No message is queued right now (non-blocking receive).
    #[error("no message available")]
    WouldBlock,

    /// The receive deadline passed with no message arriving.
    #[error("receive timed out")]
    Timeout,

    /// The router has stopped.
    #[error("router closed")]
    Closed,
}

/// Router operational state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouterState {
    /// Created but not started.
    Created,
    /// Fully operational.
    Running,
    /// Shutting down.
    Stopping,
    /// Stopped.
    Stopped,
}

impl RouterState {
    /// Check if the router is operational.
    pub fn is_operational(&self) -> bool {
        matches!(self, RouterState::Running)
    }

    /// Check if the router can be started.
    pub fn can_start(&self) -> bool {
        matches!(self, RouterState::Created | RouterState::Stopped)
    }

    /// Check if the router can be stopped.
    pub fn can_stop(&self) -> bool {
        matches!(self, RouterState::Running)
    }
}

impl fmt::Display for RouterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RouterState::Created => "created",
            RouterState::Running => "running",
            RouterState::Stopping => "stopping",
            RouterState::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

/// A parked blocking receive, waiting for the next fair-queued message.
///
/// Waiters are served strictly in arrival order. A waiter whose reply
/// side was dropped is discarded before any message is dequeued for it.
pub(crate) struct RecvWaiter {
    /// Absolute expiry, if the caller gave a timeout.
    pub(crate) deadline: Option<Instant>,
    /// Where the message (or timeout) is reported.
    pub(crate) reply: oneshot::Sender<Result<Message, RecvError>>,
}

/// A running routing core instance.
///
/// This is the top-level container holding all routing state.
///
/// ## Peer Lifecycle
///
/// A peer exists from the transport's connect notification until its
/// disconnect notification. Both of the peer's queues are destroyed at
/// disconnect; a reconnect under the same identity starts from empty
/// queues and a fresh position at the end of the fair-queue rotation.
pub struct Router {
    // === Configuration ===
    /// Loaded configuration.
    config: Config,

    // === State ===
    /// Router operational state.
    state: RouterState,

    // === Peers ===
    /// Connected peers, in connection order.
    table: PeerTable,

    // === Scheduling ===
    /// Fair-queue rotation over peer inbound queues.
    scheduler: FairQueue,

    // === Delivery Policy ===
    /// Socket-level default for the mandatory flag. When false, sends
    /// to unreachable identities are silently dropped.
    mandatory: bool,

    // === Resource Limits ===
    /// Maximum peers (0 = unlimited).
    max_peers: usize,

    // === Transport Channels ===
    /// Event sender handed to transports.
    event_tx: Option<EventTx>,
    /// Event receiver (for the event loop).
    event_rx: Option<EventRx>,
    /// Outbound transmit sender (drained queues go here).
    transmit_tx: Option<TransmitTx>,
    /// Outbound transmit receiver, handed to the transport.
    transmit_rx: Option<TransmitRx>,

    // === Command Channel ===
    /// Command sender cloned into [`RouterHandle`]s.
    command_tx: Option<tokio::sync::mpsc::Sender<Command>>,
    /// Command receiver (for the event loop).
    command_rx: Option<tokio::sync::mpsc::Receiver<Command>>,

    // === Receive Waiters ===
    /// Parked blocking receives, in arrival order.
    waiters: VecDeque<RecvWaiter>,
}

impl Router {
    /// Create a new router from configuration.
    pub fn new(config: Config) -> Self {
        let mandatory = config.router.delivery.mandatory();
        let max_peers = config.router.limits.max_peers();

        Self {
            config,
            state: RouterState::Created,
            table: PeerTable::new(),
            scheduler: FairQueue::new(),
            mandatory,
            max_peers,
            event_tx: None,
            event_rx: None,
            transmit_tx: None,
            transmit_rx: None,
            command_tx: None,
            command_rx: None,
            waiters: VecDeque::new(),
        }
    }

    // === Configuration ===

    /// Get the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    // === State ===

    /// Get the router state.
    pub fn state(&self) -> RouterState {
        self.state
    }

    /// Check if the router is operational.
    pub fn is_running(&self) -> bool {
        self.state.is_operational()
    }

    // === Delivery Policy ===

    /// Socket-level default for the mandatory flag.
    pub fn mandatory(&self) -> bool {
        self.mandatory
    }

    /// Set the socket-level default for the mandatory flag.
    pub fn set_mandatory(&mut self, mandatory: bool) {
        self.mandatory = mandatory;
    }

    // === Resource Limits ===

    /// Set the maximum number of peers (0 = unlimited).
    pub fn set_max_peers(&mut self, max: usize) {
        self.max_peers = max;
    }

    // === Counts ===

    /// Number of connected peers.
    pub fn peer_count(&self) -> usize {
        self.table.len()
    }

    /// Number of parked blocking receives.
    pub fn waiter_count(&self) -> usize {
        self.waiters.len()
    }

    // === Peer Accessors ===

    /// Whether an identity is currently connected.
    pub fn is_connected(&self, identity: &Identity) -> bool {
        self.table.contains(identity)
    }

    /// Connected identities, in connection order.
    pub fn identities(&self) -> Vec<Identity> {
        self.table.identities().cloned().collect()
    }

    /// Queue statistics for a connected peer.
    pub fn peer_stats(&self, identity: &Identity) -> Option<&SessionStats> {
        self.table.lookup(identity).map(|s| s.stats())
    }

    // === Peer Registration ===

    /// Register a newly connected peer and return its routing identity.
    ///
    /// A hint supplied by the peer becomes its identity after validation;
    /// without a hint the router generates one (0x00-prefixed, never
    /// colliding with a live peer). A hint that matches a live peer is
    /// rejected rather than stealing the existing session.
    pub fn handle_connect(
        &mut self,
        identity_hint: Option<Vec<u8>>,
    ) -> Result<Identity, ConnectError> {
        if self.max_peers > 0 && self.table.len() >= self.max_peers {
            return Err(ConnectError::TooManyPeers {
                max: self.max_peers,
            });
        }

        let identity = match identity_hint {
            Some(hint) => {
                let identity = Identity::from_hint(&hint)?;
                if self.table.contains(&identity) {
                    return Err(ConnectError::DuplicateIdentity(identity));
                }
                identity
            }
            None => {
                let mut rng = rand::thread_rng();
                loop {
                    let candidate = Identity::generate(&mut rng);
                    if !self.table.contains(&candidate) {
                        break candidate;
                    }
                }
            }
        };

        let session_id = self.table.allocate_session_id();
        let session = PeerSession::new(session_id, identity.clone(), unix_millis());
        self.table
            .insert(session)
            .map_err(|_| ConnectError::DuplicateIdentity(identity.clone()))?;

        info!(
            identity = %identity,
            session_id = %session_id,
            peers = self.table.len(),
            "Peer connected"
        );
        Ok(identity)
    }

    /// Remove a disconnected peer and destroy both of its queues.
    ///
    /// Tolerant of unknown identities: a disconnect for a peer that was
    /// never registered (or was already removed) is a no-op.
    pub fn handle_disconnect(&mut self, identity: &Identity) {
        match self.table.remove(identity) {
            Some(mut session) => {
                let (inbound_purged, outbound_purged) = session.purge();
                info!(
                    identity = %identity,
                    session_id = %session.session_id(),
                    inbound_purged,
                    outbound_purged,
                    peers = self.table.len(),
                    "Peer disconnected"
                );
            }
            None => {
                debug!(identity = %identity, "Disconnect for unknown peer, ignoring");
            }
        }
    }

    /// Queue an inbound message from a connected peer.
    ///
    /// Frames from an identity with no live session are dropped; the
    /// peer disconnected while the event was in flight.
    pub fn handle_frames(&mut self, identity: Identity, frames: Vec<Frame>) {
        let message = match Message::new(frames) {
            Ok(m) => m,
            Err(e) => {
                debug!(identity = %identity, error = %e, "Dropping malformed inbound message");
                return;
            }
        };

        match self.table.lookup_mut(&identity) {
            Some(session) => {
                session.enqueue_inbound(message);
            }
            None => {
                debug!(identity = %identity, "Inbound frames from unknown peer, dropping");
            }
        }
    }

    // === Receive ===

    /// Dequeue the next fair-queued message, if any.
    ///
    /// The returned message carries the source identity as its first
    /// frame, followed by the payload frames as the peer sent them.
    pub fn try_recv(&mut self) -> Result<Message, RecvError> {
        match self.scheduler.poll(&mut self.table) {
            Some((identity, payload)) => Ok(Message::addressed(&identity, payload)),
            None => Err(RecvError::WouldBlock),
        }
    }

    // === Send ===

    /// Route an outbound message using the socket-level mandatory flag.
    pub fn send(&mut self, message: Message) -> Result<DispatchOutcome, DispatchError> {
        let mandatory = self.mandatory;
        self.send_with(message, mandatory)
    }

    /// Route an outbound message with an explicit mandatory flag.
    pub fn send_with(
        &mut self,
        message: Message,
        mandatory: bool,
    ) -> Result<DispatchOutcome, DispatchError> {
        dispatch(&mut self.table, message, mandatory)
    }

    // === Test Support ===

    #[cfg(test)]
    pub(crate) fn table(&self) -> &PeerTable {
        &self.table
    }
}

/// Current Unix time in milliseconds.
fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
