//! Push-hub contract.
//!
//! The hub is the real-time connection to the backend. Its implementation
//! (websockets, retry policy, serialization) lives outside this crate; the
//! client only needs to connect, invoke RPCs, read frames and close.

use std::future::Future;

use quill_proto::{HubEvent, HubInvocation};

use crate::TransportError;

/// What the hub hands back from [`Hub::next_frame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubFrame {
    /// Server-pushed event.
    Event(HubEvent),
    /// Connection dropped; the hub is retrying on its own.
    Reconnecting,
    /// Retry succeeded.
    Reconnected,
    /// Retries exhausted or the server closed the connection.
    Closed,
}

/// Real-time connection to the backend.
///
/// `next_frame` must be cancel-safe: the client races it against other work
/// and drops the future when another branch wins.
pub trait Hub: Send {
    /// Open the connection.
    fn connect(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Invoke a hub method.
    fn invoke(
        &mut self,
        invocation: HubInvocation,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Next frame. `None` once the connection is gone and nothing is buffered.
    fn next_frame(&mut self) -> impl Future<Output = Option<HubFrame>> + Send;

    /// Close the connection. Idempotent.
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
