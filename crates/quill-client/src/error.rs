//! Transport errors.

use thiserror::Error;

use crate::ConnectionState;

/// Errors from the transport client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Send attempted while not connected. Nothing is queued; the caller
    /// retries manually.
    #[error("cannot send while {state}")]
    SendFailed {
        /// State at the time of the attempt
        state: ConnectionState,
    },

    /// Connecting to the hub, or invoking it, failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Hub closed for good.
    #[error("hub closed")]
    Closed,
}
