//! Participant session abstractions for roomload.
//!
//! The runner only talks to simulated participants through the
//! [`ParticipantSession`] trait; [`SimulatedSessionFactory`] provides an
//! in-process backend for tests and dry runs.

pub mod error;
pub mod session;
pub mod simulated;

pub use error::SessionError;
pub use session::{ParticipantSession, SessionFactory, SessionParams};
pub use simulated::{SimulatedSession, SimulatedSessionFactory, SimulationConfig};
