//! Router lifecycle management: start, stop, and channel wiring.

use super::{RecvError, Router, RouterError, RouterHandle, RouterState};
use crate::transport::{event_channel, transmit_channel, EventTx, TransmitRx};
use tracing::info;

impl Router {
    // === State Transitions ===

    /// Start the router.
    ///
    /// Creates the event, command, and transmit channels sized from
    /// configuration and transitions to the Running state. After this,
    /// hand [`Router::event_sender`] and [`Router::take_transmit_rx`]
    /// to the transport collaborator, clone application handles from
    /// [`Router::handle`], and drive [`Router::run`] on a task.
    pub fn start(&mut self) -> Result<(), RouterError> {
        if !self.state.can_start() {
            return Err(RouterError::AlreadyStarted);
        }

        let buffers = &self.config.router.buffers;
        let (event_tx, event_rx) = event_channel(buffers.event_channel());
        let (command_tx, command_rx) = tokio::sync::mpsc::channel(buffers.command_channel());
        let (transmit_tx, transmit_rx) = transmit_channel(buffers.transmit_channel());

        self.event_tx = Some(event_tx);
        self.event_rx = Some(event_rx);
        self.command_tx = Some(command_tx);
        self.command_rx = Some(command_rx);
        self.transmit_tx = Some(transmit_tx);
        self.transmit_rx = Some(transmit_rx);

        self.state = RouterState::Running;
        info!("Router started:");
        info!("      state: {}", self.state);
        info!("  mandatory: {}", self.mandatory);
        info!("  max peers: {}", self.max_peers);
        Ok(())
    }

    /// Stop the router.
    ///
    /// Disconnects all peers (destroying their queues), fails any
    /// parked receives, drops the channels, and transitions to the
    /// Stopped state. A running event loop exits once its channels
    /// close.
    pub fn stop(&mut self) -> Result<(), RouterError> {
        if !self.state.can_stop() {
            return Err(RouterError::NotStarted);
        }
        self.state = RouterState::Stopping;
        info!(state = %self.state, "Router stopping");

        // Destroy all peer sessions
        let identities = self.identities();
        for identity in &identities {
            self.handle_disconnect(identity);
        }

        // Fail parked receives
        for waiter in self.waiters.drain(..) {
            let _ = waiter.reply.send(Err(RecvError::Closed));
        }

        // Drop channels; senders held elsewhere observe the close
        self.event_tx.take();
        self.event_rx.take();
        self.command_tx.take();
        self.command_rx.take();
        self.transmit_tx.take();
        self.transmit_rx.take();

        self.state = RouterState::Stopped;
        info!(state = %self.state, peers_disconnected = identities.len(), "Router stopped");
        Ok(())
    }

    // === Channel Accessors ===

    /// Event sender for the transport collaborator.
    pub fn event_sender(&self) -> Result<EventTx, RouterError> {
        self.event_tx.clone().ok_or(RouterError::NotStarted)
    }

    /// Take the transmit receiver for the transport collaborator.
    pub fn take_transmit_rx(&mut self) -> Result<TransmitRx, RouterError> {
        self.transmit_rx.take().ok_or(RouterError::NotStarted)
    }

    /// Create an application handle for send/recv commands.
    pub fn handle(&self) -> Result<RouterHandle, RouterError> {
        let command_tx = self.command_tx.clone().ok_or(RouterError::NotStarted)?;
        Ok(RouterHandle::new(command_tx))
    }
}
