//! Transport Collaborator Interface
//!
//! The routing core performs no network I/O. A transport collaborator
//! (TCP/IPC listener, test harness, ...) owns sockets, framing, and
//! handshakes, and talks to the core through two channels:
//!
//! - **Events in**: connect/disconnect notifications and fully
//!   reassembled inbound messages, delivered as [`PeerEvent`]s. Connect
//!   notifications carry a oneshot ack through which the core returns
//!   the identity it assigned, so the transport can associate it with
//!   the underlying connection.
//! - **Transmits out**: [`Transmit`] requests asking the transport to
//!   put a queued outbound message on the wire for a given peer.
//!
//! All events are processed on the core's single logical thread; the
//! channels are the serialization boundary.

use crate::identity::Identity;
use crate::message::Frame;
use crate::router::ConnectError;
use tokio::sync::{mpsc, oneshot};

/// Ack channel for a connect notification: the core replies with the
/// assigned identity, or why the registration was rejected.
pub type ConnectAck = oneshot::Sender<Result<Identity, ConnectError>>;

/// A notification from the transport to the routing core.
#[derive(Debug)]
pub enum PeerEvent {
    /// A peer's connection (and handshake) completed.
    Connected {
        /// Peer-suggested identity bytes, if the peer assigned one.
        identity_hint: Option<Vec<u8>>,
        /// Where the core reports the final identity it assigned.
        ack: ConnectAck,
    },
    /// A previously connected peer's connection ended.
    Disconnected {
        /// The identity assigned at connect time.
        identity: Identity,
    },
    /// A fully reassembled message arrived from a peer.
    Frames {
        /// The identity assigned at connect time.
        identity: Identity,
        /// The message's frames (at least one).
        frames: Vec<Frame>,
    },
}

/// A request from the core to transmit a queued outbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transmit {
    /// Destination peer.
    pub identity: Identity,
    /// Message frames to put on the wire.
    pub frames: Vec<Frame>,
}

/// Channel sender for transport events.
pub type EventTx = mpsc::Sender<PeerEvent>;

/// Channel receiver for transport events.
pub type EventRx = mpsc::Receiver<PeerEvent>;

/// Create an event channel with the given buffer size.
pub fn event_channel(buffer: usize) -> (EventTx, EventRx) {
    mpsc::channel(buffer)
}

/// Channel sender for transmit requests.
pub type TransmitTx = mpsc::Sender<Transmit>;

/// Channel receiver for transmit requests.
pub type TransmitRx = mpsc::Receiver<Transmit>;

/// Create a transmit channel with the given buffer size.
pub fn transmit_channel(buffer: usize) -> (TransmitTx, TransmitRx) {
    mpsc::channel(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_channel() {
        let (tx, mut rx) = event_channel(8);
        let identity = Identity::from_bytes(b"A").unwrap();

        tx.send(PeerEvent::Frames {
            identity: identity.clone(),
            frames: vec![b"M".to_vec()],
        })
        .await
        .unwrap();

        match rx.recv().await.unwrap() {
            PeerEvent::Frames { identity: id, frames } => {
                assert_eq!(id, identity);
                assert_eq!(frames, vec![b"M".to_vec()]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connect_ack_round_trip() {
        let (tx, mut rx) = event_channel(8);
        let (ack, ack_rx) = oneshot::channel();

        tx.send(PeerEvent::Connected {
            identity_hint: Some(b"B".to_vec()),
            ack,
        })
        .await
        .unwrap();

        // Core side: assign and ack
        match rx.recv().await.unwrap() {
            PeerEvent::Connected { identity_hint, ack } => {
                let identity = Identity::from_hint(&identity_hint.unwrap()).unwrap();
                ack.send(Ok(identity)).unwrap();
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let assigned = ack_rx.await.unwrap().unwrap();
        assert_eq!(assigned.as_bytes(), b"B");
    }

    #[tokio::test]
    async fn test_transmit_channel() {
        let (tx, mut rx) = transmit_channel(8);
        let transmit = Transmit {
            identity: Identity::from_bytes(b"C").unwrap(),
            frames: vec![b"payload".to_vec()],
        };

        tx.send(transmit.clone()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), transmit);
    }
}
