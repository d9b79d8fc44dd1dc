//! Routing Dispatcher
//!
//! Resolves an application-issued send — destination identity in the
//! first frame — to the right peer's outbound queue, and enforces the
//! delivery policy for unreachable destinations:
//!
//! - **Mandatory**: the caller is told delivery is impossible
//!   ([`DispatchError::HostUnreachable`]) rather than the message being
//!   silently dropped.
//! - **Best-effort** (default): the message is silently discarded and the
//!   send reports success. No error, no queueing. This trades reliability
//!   for ease of use and is preserved exactly.
//!
//! Queueing is the only guarantee here; wire transmission is the
//! transport collaborator's job.

use crate::identity::Identity;
use crate::message::{Message, MessageError};
use crate::table::PeerTable;
use thiserror::Error;
use tracing::debug;

/// Errors related to send dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("host unreachable: {0}")]
    HostUnreachable(Identity),

    #[error("malformed routed message: {0}")]
    Message(#[from] MessageError),
}

/// What happened to a dispatched message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Payload appended to the destination's outbound queue.
    Queued(Identity),
    /// Destination unreachable; message silently dropped (best-effort).
    Discarded(Identity),
}

/// Route a send to its destination's outbound queue.
///
/// The message's first frame names the destination; the remaining frames
/// are the payload appended to that peer's outbound queue.
pub fn dispatch(
    table: &mut PeerTable,
    message: Message,
    mandatory: bool,
) -> Result<DispatchOutcome, DispatchError> {
    let (destination, payload) = message.split_address()?;

    match table.lookup_mut(&destination) {
        Some(session) => {
            session.enqueue_outbound(payload);
            Ok(DispatchOutcome::Queued(destination))
        }
        None if mandatory => Err(DispatchError::HostUnreachable(destination)),
        None => {
            debug!(identity = %destination, "destination unreachable, dropping (best-effort)");
            Ok(DispatchOutcome::Discarded(destination))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::PeerSession;

    fn connect(table: &mut PeerTable, name: &[u8]) -> Identity {
        let session_id = table.allocate_session_id();
        let identity = Identity::from_bytes(name).unwrap();
        table
            .insert(PeerSession::new(session_id, identity.clone(), 0))
            .unwrap();
        identity
    }

    fn routed(dest: &[u8], payload: &[u8]) -> Message {
        Message::new(vec![dest.to_vec(), payload.to_vec()]).unwrap()
    }

    #[test]
    fn test_dispatch_queues_payload_only() {
        let mut table = PeerTable::new();
        let b = connect(&mut table, b"B");

        let outcome = dispatch(&mut table, routed(b"B", b"hello"), false).unwrap();
        assert_eq!(outcome, DispatchOutcome::Queued(b.clone()));

        let session = table.lookup_mut(&b).unwrap();
        assert_eq!(session.outbound_len(), 1);
        let queued = session.dequeue_outbound().unwrap();
        // Address frame stripped, payload intact
        assert_eq!(queued.frame_count(), 1);
        assert_eq!(queued.frames()[0], b"hello".to_vec());
    }

    #[test]
    fn test_mandatory_unreachable_fails() {
        let mut table = PeerTable::new();
        connect(&mut table, b"B");

        let err = dispatch(&mut table, routed(b"ghost", b"x"), true).unwrap_err();
        match err {
            DispatchError::HostUnreachable(identity) => {
                assert_eq!(identity.as_bytes(), b"ghost");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_best_effort_unreachable_discards_silently() {
        let mut table = PeerTable::new();
        let b = connect(&mut table, b"B");

        let outcome = dispatch(&mut table, routed(b"ghost", b"x"), false).unwrap();
        assert!(matches!(outcome, DispatchOutcome::Discarded(_)));

        // Nothing observable was queued anywhere
        assert_eq!(table.lookup(&b).unwrap().outbound_len(), 0);
    }

    #[test]
    fn test_dispatch_preserves_send_order() {
        let mut table = PeerTable::new();
        let b = connect(&mut table, b"B");

        dispatch(&mut table, routed(b"B", b"1"), false).unwrap();
        dispatch(&mut table, routed(b"B", b"2"), false).unwrap();
        dispatch(&mut table, routed(b"B", b"3"), false).unwrap();

        let session = table.lookup_mut(&b).unwrap();
        for expected in [b"1", b"2", b"3"] {
            let msg = session.dequeue_outbound().unwrap();
            assert_eq!(msg.frames()[0], expected.to_vec());
        }
    }

    #[test]
    fn test_dispatch_rejects_missing_payload() {
        let mut table = PeerTable::new();
        connect(&mut table, b"B");

        let address_only = Message::single(b"B".to_vec());
        let err = dispatch(&mut table, address_only, false).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Message(MessageError::MissingPayload)
        ));
    }

    #[test]
    fn test_multi_frame_payload_stays_atomic() {
        let mut table = PeerTable::new();
        let b = connect(&mut table, b"B");

        let msg =
            Message::new(vec![b"B".to_vec(), b"part1".to_vec(), b"part2".to_vec()]).unwrap();
        dispatch(&mut table, msg, false).unwrap();

        let queued = table.lookup_mut(&b).unwrap().dequeue_outbound().unwrap();
        assert_eq!(queued.frame_count(), 2);
        assert_eq!(queued.frames()[0], b"part1".to_vec());
        assert_eq!(queued.frames()[1], b"part2".to_vec());
    }
}
