//! Application handle for a running router.

use super::{RecvError, RouterError};
use crate::dispatch::{DispatchError, DispatchOutcome};
use crate::message::Message;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// A command from an application handle to the event loop.
#[derive(Debug)]
pub enum Command {
    /// Route an outbound message.
    Send {
        /// Address frame plus payload frames.
        message: Message,
        /// Per-call mandatory override; None uses the socket default.
        mandatory: Option<bool>,
        /// Where the dispatch outcome is reported.
        reply: oneshot::Sender<Result<DispatchOutcome, DispatchError>>,
    },
    /// Dequeue the next fair-queued message without waiting.
    TryRecv {
        reply: oneshot::Sender<Result<Message, RecvError>>,
    },
    /// Dequeue the next fair-queued message, waiting for one to arrive.
    Recv {
        /// Give up after this long; None waits indefinitely.
        timeout: Option<Duration>,
        reply: oneshot::Sender<Result<Message, RecvError>>,
    },
    /// Shut down the event loop.
    Stop { reply: oneshot::Sender<()> },
}

/// Cloneable handle for sending commands to a running router.
///
/// All methods are async because they round-trip through the event
/// loop; the loop itself never blocks on a handle.
#[derive(Clone)]
pub struct RouterHandle {
    command_tx: mpsc::Sender<Command>,
}

impl RouterHandle {
    pub(super) fn new(command_tx: mpsc::Sender<Command>) -> Self {
        Self { command_tx }
    }

    /// Route an outbound message using the socket-level mandatory flag.
    pub async fn send(
        &self,
        message: Message,
    ) -> Result<Result<DispatchOutcome, DispatchError>, RouterError> {
        self.send_command(message, None).await
    }

    /// Route an outbound message with an explicit mandatory flag.
    pub async fn send_with(
        &self,
        message: Message,
        mandatory: bool,
    ) -> Result<Result<DispatchOutcome, DispatchError>, RouterError> {
        self.send_command(message, Some(mandatory)).await
    }

    async fn send_command(
        &self,
        message: Message,
        mandatory: Option<bool>,
    ) -> Result<Result<DispatchOutcome, DispatchError>, RouterError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command::Send {
                message,
                mandatory,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RouterError::ChannelClosed)?;
        reply_rx.await.map_err(|_| RouterError::ChannelClosed)
    }

    /// Dequeue the next fair-queued message without waiting.
    pub async fn try_recv(&self) -> Result<Message, RecvError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command::TryRecv { reply: reply_tx })
            .await
            .map_err(|_| RecvError::Closed)?;
        reply_rx.await.map_err(|_| RecvError::Closed)?
    }

    /// Dequeue the next fair-queued message, waiting for one to arrive.
    pub async fn recv(&self) -> Result<Message, RecvError> {
        self.recv_command(None).await
    }

    /// Like [`RouterHandle::recv`] but giving up after `timeout`.
    pub async fn recv_timeout(&self, timeout: Duration) -> Result<Message, RecvError> {
        self.recv_command(Some(timeout)).await
    }

    async fn recv_command(&self, timeout: Option<Duration>) -> Result<Message, RecvError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command::Recv {
                timeout,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RecvError::Closed)?;
        reply_rx.await.map_err(|_| RecvError::Closed)?
    }

    /// Ask the event loop to shut down.
    pub async fn stop(&self) -> Result<(), RouterError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command::Stop { reply: reply_tx })
            .await
            .map_err(|_| RouterError::ChannelClosed)?;
        reply_rx.await.map_err(|_| RouterError::ChannelClosed)
    }
}
