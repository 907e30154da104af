//! Core types for the picnic particle-in-cell framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! value types shared by every other crate in the workspace: box geometry,
//! neighbor directions, node identifiers, particles, grid cells, and the
//! error taxonomy used by the distributed runtime.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cell;
pub mod error;
pub mod geometry;
pub mod id;
pub mod particle;

pub use cell::Cell;
pub use error::{CommunicationError, ConfigError, NodeError, ProtocolError};
pub use geometry::{DoubleBox, IntBox};
pub use id::{Direction, NodeId, ParticleId};
pub use particle::Particle;
