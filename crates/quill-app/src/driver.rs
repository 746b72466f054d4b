//! Driver trait for abstracting the UI surface.
//!
//! The [`Driver`] trait decouples the [`crate::Runtime`] from a concrete
//! frontend. The network side is abstracted separately by the transport's
//! hub and the backend collaborator traits.

use std::future::Future;

use crate::{App, ScrollTarget, UserCommand};

/// UI surface driven by the runtime.
///
/// # Implementations
///
/// - **Web/desktop shells**: translate widget events into [`UserCommand`]s
/// - **Simulation**: scripted commands, records renders and scrolls
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Wait for the next user command.
    ///
    /// Returns `None` when the user surface is gone. Must be cancel-safe: the
    /// runtime polls it alongside the transport.
    fn next_command(
        &mut self,
    ) -> impl Future<Output = Result<Option<UserCommand>, Self::Error>> + Send;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Scroll the conversation view.
    ///
    /// # Errors
    ///
    /// Returns an error if the view is gone.
    fn scroll_to(&mut self, target: &ScrollTarget) -> Result<(), Self::Error>;
}
