//! Core roomload primitives shared across crates.
//!
//! Includes run parameters, participant roles, identity generation, and the
//! setup error taxonomy.

pub mod error;
pub mod ident;
pub mod params;
pub mod types;

pub use error::SetupError;
pub use ident::{FixedIdentity, IdentityGenerator, RandomIdentity};
pub use params::{RunParameters, MANAGED_HOST_PARTICIPANT_LIMIT, MANAGED_HOST_SUFFIX};
pub use types::{MediaKind, ParticipantRole};
