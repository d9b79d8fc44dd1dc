//! Messages
//!
//! A message is an ordered sequence of one or more opaque frames, treated
//! as an atomic unit by all queueing and fairness logic — never split or
//! reordered internally. Application-issued sends carry the destination
//! identity as their first frame; [`Message::split_address`] peels it off
//! on the dispatch path.

use crate::identity::{Identity, IdentityError};
use thiserror::Error;

/// A single opaque frame.
pub type Frame = Vec<u8>;

/// Errors related to message construction.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("message has no frames")]
    Empty,

    #[error("routed message has an address frame but no payload frames")]
    MissingPayload,

    #[error("invalid address frame: {0}")]
    Address(#[from] IdentityError),
}

/// An atomic multi-frame message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    frames: Vec<Frame>,
}

impl Message {
    /// Create a message from frames. At least one frame is required.
    pub fn new(frames: Vec<Frame>) -> Result<Self, MessageError> {
        if frames.is_empty() {
            return Err(MessageError::Empty);
        }
        Ok(Self { frames })
    }

    /// Create a single-frame message.
    pub fn single(frame: impl Into<Frame>) -> Self {
        Self {
            frames: vec![frame.into()],
        }
    }

    /// Prefix a payload message with a destination address frame.
    ///
    /// Produces the wire shape the application hands to `send`.
    pub fn addressed(destination: &Identity, payload: Message) -> Self {
        let mut frames = Vec::with_capacity(payload.frames.len() + 1);
        frames.push(destination.as_bytes().to_vec());
        frames.extend(payload.frames);
        Self { frames }
    }

    /// Get the frames.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Total payload size across all frames.
    pub fn byte_len(&self) -> usize {
        self.frames.iter().map(|f| f.len()).sum()
    }

    /// Consume the message, yielding its frames.
    pub fn into_frames(self) -> Vec<Frame> {
        self.frames
    }

    /// Split a routed message into its destination identity and payload.
    ///
    /// The first frame is the address; the remaining frames form the
    /// payload message, which must be non-empty.
    pub fn split_address(self) -> Result<(Identity, Message), MessageError> {
        let mut frames = self.frames.into_iter();
        let address = frames.next().expect("message invariant: at least one frame");
        let identity = Identity::from_bytes(&address)?;
        let payload: Vec<Frame> = frames.collect();
        if payload.is_empty() {
            return Err(MessageError::MissingPayload);
        }
        Ok((identity, Message { frames: payload }))
    }
}

impl From<Vec<u8>> for Message {
    fn from(frame: Vec<u8>) -> Self {
        Self::single(frame)
    }
}
