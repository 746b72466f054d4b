//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` stands in for a real chat frontend. Tests push
//! [`UserCommand`]s through a [`DriverHandle`] and observe every rendered
//! [`App`] snapshot, so the production [`quill_app::Runtime`] runs unchanged.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use quill_app::{App, Driver, ScrollTarget, UserCommand};
use thiserror::Error;
use tokio::sync::{mpsc, watch};

/// How long [`DriverHandle::until`] waits before giving up.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Error type for simulation driver.
#[derive(Debug, Clone, Error)]
#[error("sim driver: {0}")]
pub struct SimDriverError(pub String);

/// Simulation driver for deterministic testing.
pub struct SimDriver {
    commands: mpsc::UnboundedReceiver<UserCommand>,
    snapshots: watch::Sender<Option<App>>,
    scrolls: Arc<Mutex<Vec<ScrollTarget>>>,
}

/// Test-side end of a [`SimDriver`].
#[derive(Clone)]
pub struct DriverHandle {
    commands: mpsc::UnboundedSender<UserCommand>,
    snapshots: watch::Receiver<Option<App>>,
    scrolls: Arc<Mutex<Vec<ScrollTarget>>>,
}

impl SimDriver {
    /// Create a driver and the handle that scripts it.
    pub fn new() -> (Self, DriverHandle) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let scrolls = Arc::new(Mutex::new(Vec::new()));

        let driver =
            Self { commands: command_rx, snapshots: snapshot_tx, scrolls: Arc::clone(&scrolls) };
        let handle = DriverHandle { commands: command_tx, snapshots: snapshot_rx, scrolls };
        (driver, handle)
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;

    async fn next_command(&mut self) -> Result<Option<UserCommand>, Self::Error> {
        Ok(self.commands.recv().await)
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.snapshots.send_replace(Some(app.clone()));
        Ok(())
    }

    fn scroll_to(&mut self, target: &ScrollTarget) -> Result<(), Self::Error> {
        self.scrolls.lock().unwrap_or_else(PoisonError::into_inner).push(target.clone());
        Ok(())
    }
}

impl DriverHandle {
    /// Queue a command.
    ///
    /// # Errors
    ///
    /// Returns an error once the runtime has exited.
    pub fn send(&self, command: UserCommand) -> Result<(), SimDriverError> {
        self.commands.send(command).map_err(|_| SimDriverError("runtime exited".into()))
    }

    /// Latest rendered state.
    pub fn app(&self) -> Option<App> {
        self.snapshots.borrow().clone()
    }

    /// Wait until a rendered state satisfies `predicate` and return it.
    ///
    /// # Errors
    ///
    /// Returns an error after [`WAIT_TIMEOUT`] or if the runtime exited first.
    pub async fn until(
        &mut self,
        mut predicate: impl FnMut(&App) -> bool,
    ) -> Result<App, SimDriverError> {
        let wait = self.snapshots.wait_for(|app| app.as_ref().is_some_and(&mut predicate));

        match tokio::time::timeout(WAIT_TIMEOUT, wait).await {
            Ok(Ok(app)) => app.clone().ok_or_else(|| SimDriverError("no snapshot".into())),
            Ok(Err(_)) => Err(SimDriverError("runtime exited".into())),
            Err(_) => Err(SimDriverError("timed out waiting for state".into())),
        }
    }

    /// Scroll requests issued so far.
    pub fn scrolls(&self) -> Vec<ScrollTarget> {
        self.scrolls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}
