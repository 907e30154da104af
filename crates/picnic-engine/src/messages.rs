//! Wire schema of the node protocol.
//!
//! Three message families travel between nodes:
//!
//! - [`ProblemMessage`]: master to worker, once, before the first step;
//! - [`ResultMessage`]: worker to master, once, after the last step;
//! - [`ExchangeMessage`]: worker to worker, every step, one of four
//!   [`ExchangeKind`]s.
//!
//! Byte layouts live in [`codec`](crate::codec).

use picnic_core::{Cell, IntBox, NodeId, Particle, ProtocolError};
use picnic_space::Grid;

/// Discriminant of an [`ExchangeMessage`] on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ExchangeKind {
    /// Particles whose ownership moves to the receiver.
    ArrivingParticles = 0,
    /// Copies of particles whose stencil reaches the receiver.
    GhostParticles = 1,
    /// Current values of the sender's border cells.
    GhostCells = 2,
    /// Receiver-side slot of every border cell, sent once at setup.
    GhostCellIndexes = 3,
}

impl ExchangeKind {
    /// All kinds in tag order.
    pub const ALL: [ExchangeKind; 4] = [
        ExchangeKind::ArrivingParticles,
        ExchangeKind::GhostParticles,
        ExchangeKind::GhostCells,
        ExchangeKind::GhostCellIndexes,
    ];

    /// Wire tag.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Kind for a wire tag.
    pub fn from_tag(tag: u8) -> Result<Self, ProtocolError> {
        Self::ALL
            .into_iter()
            .find(|k| k.tag() == tag)
            .ok_or(ProtocolError::UnknownTag { tag })
    }

    /// Human-readable name, for logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            ExchangeKind::ArrivingParticles => "arriving particles",
            ExchangeKind::GhostParticles => "ghost particles",
            ExchangeKind::GhostCells => "ghost cells",
            ExchangeKind::GhostCellIndexes => "ghost cell indexes",
        }
    }
}

/// One worker-to-worker message.
#[derive(Clone, Debug, PartialEq)]
pub enum ExchangeMessage {
    /// Particles leaving the sender toward the receiver, in receiver
    /// coordinates.
    ArrivingParticles(Vec<Particle>),
    /// Border particle copies, in receiver coordinates.
    GhostParticles(Vec<Particle>),
    /// Border cell values, in index-map order.
    GhostCells(Vec<Cell>),
    /// Receiver-local coordinates of each border cell, in send order.
    GhostCellIndexes(Vec<(i32, i32)>),
}

impl ExchangeMessage {
    /// The message's kind.
    pub fn kind(&self) -> ExchangeKind {
        match self {
            ExchangeMessage::ArrivingParticles(_) => ExchangeKind::ArrivingParticles,
            ExchangeMessage::GhostParticles(_) => ExchangeKind::GhostParticles,
            ExchangeMessage::GhostCells(_) => ExchangeKind::GhostCells,
            ExchangeMessage::GhostCellIndexes(_) => ExchangeKind::GhostCellIndexes,
        }
    }
}

/// The problem a worker simulates, sent once by the master.
#[derive(Clone, Debug, PartialEq)]
pub struct ProblemMessage {
    /// The full partition table, indexed by node.
    pub partitions: Vec<IntBox>,
    /// The worker's particles, in partition-local coordinates.
    pub particles: Vec<Particle>,
    /// The worker's cells including the halo.
    pub cells: Grid,
}

/// A worker's final state, sent once to the master.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultMessage {
    /// The reporting worker.
    pub worker: NodeId,
    /// Final particles, in partition-local coordinates.
    pub particles: Vec<Particle>,
    /// Final cells including the halo.
    pub cells: Grid,
}
