//! Event loop and event/command handlers.

use super::*;
use crate::transport::{PeerEvent, Transmit};
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

impl Router {
    // === Event Loop ===

    /// Run the event loop.
    ///
    /// Processes transport events and application commands on a single
    /// task, so every mutation of the peer table and scheduler is
    /// serialized. Parked receives are served in arrival order as
    /// messages arrive, and expired when their deadlines pass.
    ///
    /// This method takes ownership of the event and command receivers
    /// and runs until both channels are closed, or until a
    /// [`Command::Stop`] arrives.
    pub async fn run(&mut self) -> Result<(), RouterError> {
        let mut event_rx = self.event_rx.take().ok_or(RouterError::NotStarted)?;
        let mut command_rx = self.command_rx.take().ok_or(RouterError::NotStarted)?;

        info!("Router event loop started");

        let mut events_open = true;
        let mut commands_open = true;

        while events_open || commands_open {
            let next_deadline = self.earliest_waiter_deadline();
            // Wait for transmit capacity only while something is queued,
            // so a drained channel refills without a fresh event.
            let flush_tx = if self.has_outbound_pending() {
                self.transmit_tx.clone()
            } else {
                None
            };

            tokio::select! {
                event = event_rx.recv(), if events_open => {
                    match event {
                        Some(event) => {
                            self.process_event(event);
                            self.service_waiters();
                            self.flush_outbound();
                        }
                        None => events_open = false,
                    }
                }
                command = command_rx.recv(), if commands_open => {
                    match command {
                        Some(command) => {
                            let shutdown = self.process_command(command);
                            self.service_waiters();
                            self.flush_outbound();
                            if shutdown {
                                break;
                            }
                        }
                        None => commands_open = false,
                    }
                }
                _ = tokio::time::sleep_until(next_deadline.unwrap_or_else(Instant::now)),
                    if next_deadline.is_some() =>
                {
                    self.expire_waiters(Instant::now());
                }
                permit = async {
                    match flush_tx.as_ref() {
                        Some(tx) => tx.reserve().await,
                        None => std::future::pending().await,
                    }
                }, if flush_tx.is_some() => {
                    if let Ok(permit) = permit {
                        if let Some(transmit) = self.next_outbound() {
                            permit.send(transmit);
                        }
                    }
                    self.flush_outbound();
                }
            }
        }

        info!("Router event loop stopped");
        Ok(())
    }

    /// Process a single transport event.
    fn process_event(&mut self, event: PeerEvent) {
        match event {
            PeerEvent::Connected { identity_hint, ack } => {
                let result = self.handle_connect(identity_hint);
                // Transport side may have gone away; nothing to undo
                let _ = ack.send(result);
            }
            PeerEvent::Disconnected { identity } => {
                self.handle_disconnect(&identity);
            }
            PeerEvent::Frames { identity, frames } => {
                self.handle_frames(identity, frames);
            }
        }
    }

    /// Process a single application command.
    ///
    /// Returns true when the loop should shut down.
    fn process_command(&mut self, command: Command) -> bool {
        match command {
            Command::Send {
                message,
                mandatory,
                reply,
            } => {
                let result = match mandatory {
                    Some(mandatory) => self.send_with(message, mandatory),
                    None => self.send(message),
                };
                let _ = reply.send(result);
            }
            Command::TryRecv { reply } => {
                let _ = reply.send(self.try_recv());
            }
            Command::Recv { timeout, reply } => {
                // Serve immediately if a message is already queued,
                // otherwise park behind any earlier waiters.
                if self.waiters.is_empty() {
                    if let Ok(message) = self.try_recv() {
                        let _ = reply.send(Ok(message));
                        return false;
                    }
                }
                let deadline = timeout.map(|t| Instant::now() + t);
                self.waiters.push_back(RecvWaiter { deadline, reply });
            }
            Command::Stop { reply } => {
                let _ = reply.send(());
                return true;
            }
        }
        false
    }

    // === Receive Waiters ===

    /// Serve parked receives while messages are available.
    ///
    /// Waiters whose reply side was dropped are discarded first, so an
    /// abandoned receive never consumes a message.
    fn service_waiters(&mut self) {
        while let Some(waiter) = self.waiters.pop_front() {
            if waiter.reply.is_closed() {
                continue;
            }
            match self.try_recv() {
                Ok(message) => {
                    let _ = waiter.reply.send(Ok(message));
                }
                Err(_) => {
                    self.waiters.push_front(waiter);
                    break;
                }
            }
        }
    }

    /// Fail every waiter whose deadline has passed.
    fn expire_waiters(&mut self, now: Instant) {
        let mut remaining = VecDeque::with_capacity(self.waiters.len());
        for waiter in self.waiters.drain(..) {
            match waiter.deadline {
                Some(deadline) if deadline <= now => {
                    let _ = waiter.reply.send(Err(RecvError::Timeout));
                }
                _ => remaining.push_back(waiter),
            }
        }
        self.waiters = remaining;
    }

    /// The soonest deadline among parked receives.
    fn earliest_waiter_deadline(&self) -> Option<Instant> {
        self.waiters.iter().filter_map(|w| w.deadline).min()
    }

    // === Outbound Flush ===

    /// Whether any session has outbound messages waiting to transmit.
    fn has_outbound_pending(&self) -> bool {
        self.table.iter().any(|session| session.has_outbound())
    }

    /// Dequeue the next outbound message, in connection order.
    fn next_outbound(&mut self) -> Option<Transmit> {
        for session in self.table.iter_mut() {
            if let Some(message) = session.dequeue_outbound() {
                return Some(Transmit {
                    identity: session.identity().clone(),
                    frames: message.into_frames(),
                });
            }
        }
        None
    }

    /// Drain queued outbound messages into the transmit channel.
    ///
    /// Uses try_send so a slow transport never blocks the event loop.
    /// When the channel fills, the message goes back to the front of
    /// its peer's outbound queue, where it remains subject to purge if
    /// the peer disconnects before the next flush.
    pub(super) fn flush_outbound(&mut self) {
        let Some(transmit_tx) = self.transmit_tx.clone() else {
            return;
        };

        for session in self.table.iter_mut() {
            while let Some(message) = session.dequeue_outbound() {
                let transmit = Transmit {
                    identity: session.identity().clone(),
                    frames: message.into_frames(),
                };
                match transmit_tx.try_send(transmit) {
                    Ok(()) => {}
                    Err(TrySendError::Full(transmit)) => {
                        if let Ok(message) = Message::new(transmit.frames) {
                            session.requeue_outbound(message);
                        }
                        warn!(
                            identity = %session.identity(),
                            "Transmit channel full, deferring outbound flush"
                        );
                        return;
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!("Transmit channel closed, dropping outbound flush");
                        return;
                    }
                }
            }
        }
    }
}
