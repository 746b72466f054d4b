//! Transport client.
//!
//! Owns the hub and the connection state. RPCs are gated on state; hub frames
//! are translated into [`TransportEvent`]s and applied to the state machine
//! before they are handed out.

use std::collections::VecDeque;

use quill_proto::{ChatMessage, HubEvent, HubInvocation, Identity};

use crate::{ConnectionState, Hub, HubFrame, TransportError, TransportEvent};

/// Real-time transport over a [`Hub`].
///
/// # Invariants
///
/// - `state` only changes through legal [`ConnectionState`] transitions, and
///   every change is reported as [`TransportEvent::StateChanged`]
/// - `send` never reaches the hub unless `state` is `Connected`
pub struct TransportClient<H> {
    hub: H,
    state: ConnectionState,
    pending: VecDeque<TransportEvent>,
}

impl<H: Hub> TransportClient<H> {
    /// Wrap a hub. Starts `Disconnected`.
    pub fn new(hub: H) -> Self {
        Self { hub, state: ConnectionState::Disconnected, pending: VecDeque::new() }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Underlying hub.
    pub fn hub(&self) -> &H {
        &self.hub
    }

    /// Connect to the hub.
    ///
    /// No-op unless `Disconnected`.
    ///
    /// # Errors
    ///
    /// - `Connection`: the hub refused; state returns to `Disconnected`
    pub async fn start(&mut self) -> Result<(), TransportError> {
        if self.state != ConnectionState::Disconnected {
            tracing::debug!(state = %self.state, "start ignored, already started");
            return Ok(());
        }

        self.transition(ConnectionState::Connecting);
        match self.hub.connect().await {
            Ok(()) => {
                self.transition(ConnectionState::Connected);
                Ok(())
            },
            Err(err) => {
                tracing::warn!(error = %err, "hub connect failed");
                self.transition(ConnectionState::Disconnected);
                Err(err)
            },
        }
    }

    /// Close the hub and move to `Disconnected` from any state.
    pub async fn stop(&mut self) {
        self.hub.close().await;
        self.transition(ConnectionState::Disconnected);
    }

    /// Send a message.
    ///
    /// # Errors
    ///
    /// - `SendFailed`: not `Connected`; nothing is queued
    /// - `Connection`: the hub rejected the invocation
    pub async fn send(
        &mut self,
        sender: &Identity,
        receiver: &Identity,
        content: String,
    ) -> Result<(), TransportError> {
        if !self.state.is_connected() {
            return Err(TransportError::SendFailed { state: self.state });
        }

        let invocation = HubInvocation::SendMessage(sender.clone(), receiver.clone(), content);
        self.hub.invoke(invocation).await
    }

    /// Tell the hub `reader` has read everything `author` sent them.
    ///
    /// Best effort: when not connected, or when the hub rejects the call, the
    /// receipt is logged and dropped.
    pub async fn mark_as_read(&mut self, reader: &Identity, author: &Identity) {
        if !self.state.is_connected() {
            tracing::warn!(%reader, %author, state = %self.state, "read receipt dropped");
            return;
        }

        let invocation = HubInvocation::MarkAsRead(reader.clone(), author.clone());
        if let Err(err) = self.hub.invoke(invocation).await {
            tracing::warn!(%reader, %author, error = %err, "read receipt failed");
        }
    }

    /// Next event, in arrival order.
    ///
    /// Returns `None` once disconnected and every queued event has been
    /// handed out. Cancel-safe if the hub's `next_frame` is.
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            if self.state == ConnectionState::Disconnected {
                return None;
            }

            let Some(frame) = self.hub.next_frame().await else {
                self.transition(ConnectionState::Disconnected);
                continue;
            };

            if let Some(event) = self.apply(frame) {
                return Some(event);
            }
        }
    }

    fn apply(&mut self, frame: HubFrame) -> Option<TransportEvent> {
        match frame {
            HubFrame::Event(HubEvent::ReceiveMessage(sender, receiver, content, timestamp)) => {
                Some(TransportEvent::MessageReceived(ChatMessage {
                    sender,
                    receiver,
                    content,
                    timestamp,
                    is_read: false,
                }))
            },
            HubFrame::Event(HubEvent::MessagesRead(reader, author)) => {
                Some(TransportEvent::ReadReceiptUpdated { reader, author })
            },
            HubFrame::Reconnecting => {
                self.transition(ConnectionState::Reconnecting);
                None
            },
            HubFrame::Reconnected => {
                self.transition(ConnectionState::Connected);
                None
            },
            HubFrame::Closed => {
                self.transition(ConnectionState::Disconnected);
                None
            },
        }
    }

    /// Move to `next`, queueing a state change event. Illegal transitions
    /// (e.g. a stray `Reconnected` while `Disconnected`) are ignored.
    fn transition(&mut self, next: ConnectionState) {
        if self.state == next {
            return;
        }
        if !self.state.can_transition_to(next) {
            tracing::warn!(from = %self.state, to = %next, "ignoring illegal transition");
            return;
        }

        tracing::info!(from = %self.state, to = %next, "connection state changed");
        self.state = next;
        self.pending.push_back(TransportEvent::StateChanged(next));
    }
}
