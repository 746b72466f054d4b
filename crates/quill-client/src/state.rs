//! Connection lifecycle.
//!
//! ```text
//!                  start()
//! ┌──────────────┐ ───────> ┌────────────┐  connected  ┌───────────┐
//! │ Disconnected │          │ Connecting │ ──────────> │ Connected │
//! └──────────────┘ <─────── └────────────┘             └───────────┘
//!        ^          failed                       drop   │       ^
//!        │                                              v       │ reconnected
//!        │            closed / stop()            ┌──────────────┐
//!        └────────────────────────────────────── │ Reconnecting │
//!                                                └──────────────┘
//! ```
//!
//! `stop()` moves any state to `Disconnected`.

use std::fmt;

/// Transport connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not connected; `start()` has not run or the hub closed.
    #[default]
    Disconnected,
    /// Initial connect in progress.
    Connecting,
    /// Connected; sends are accepted.
    Connected,
    /// Connection dropped; the hub is retrying.
    Reconnecting,
}

impl ConnectionState {
    /// True if moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: Self) -> bool {
        use ConnectionState::{Connected, Connecting, Disconnected, Reconnecting};

        matches!(
            (self, next),
            (_, Disconnected)
                | (Disconnected, Connecting)
                | (Connecting | Reconnecting, Connected)
                | (Connected, Reconnecting)
        )
    }

    /// True only in `Connected`.
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}
