//! Deterministic simulation harness for Quill chat testing.
//!
//! In-memory implementations of the backend collaborators, the real-time hub
//! and the UI driver, so the production [`quill_app::Runtime`] can be run end
//! to end inside a test.
//!
//! # Components
//!
//! - [`SimBackend`]: chat REST, key service, file host and hub fan-out
//! - [`SimDriver`] / [`DriverHandle`]: scripted commands, observed renders
//! - [`SimEnv`]: seeded randomness
//! - [`sim_client`]: one fully wired client

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod sim_backend;
pub mod sim_client;
pub mod sim_driver;
pub mod sim_env;

pub use sim_backend::{SimBackend, SimHub, SimSession};
pub use sim_client::{SimRuntime, sim_client};
pub use sim_driver::{DriverHandle, SimDriver, SimDriverError, WAIT_TIMEOUT};
pub use sim_env::SimEnv;
