//! Error types for the picnic framework.
//!
//! Three leaf enums cover the failure classes of a distributed run:
//! configuration problems detected at startup, protocol violations
//! between nodes, and communication failures on a channel. All three are
//! fatal to the node that observes them. [`NodeError`] wraps them for the
//! node run loop.

use std::error::Error;
use std::fmt;

use crate::id::{Direction, NodeId, ParticleId};

// ── ConfigError ─────────────────────────────────────────────────

/// Invalid simulation or layout configuration, detected at startup.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// A quantity that must be a power of two is not.
    NotPowerOfTwo {
        /// Which parameter was rejected.
        name: &'static str,
        /// The rejected value.
        value: usize,
    },
    /// A count exceeds what cell coordinates can address.
    CountTooLarge {
        /// Which parameter was rejected.
        name: &'static str,
        /// The rejected value.
        value: usize,
        /// Largest accepted value.
        maximum: usize,
    },
    /// More partitions were requested than there are cells.
    TooManyPartitions {
        /// Requested partition count.
        partitions: usize,
        /// Total number of cells in the grid.
        cells: usize,
    },
    /// The partition table and the node count disagree.
    PartitionCountMismatch {
        /// Number of partitions.
        partitions: usize,
        /// Number of nodes.
        nodes: usize,
    },
    /// A box with `min >= max` on some axis.
    MalformedBox {
        /// Minimum x.
        min_x: f64,
        /// Maximum x.
        max_x: f64,
        /// Minimum y.
        min_y: f64,
        /// Maximum y.
        max_y: f64,
    },
    /// A partition is too small to hold disjoint border bands.
    PartitionTooSmall {
        /// Cells along x.
        cells_x: usize,
        /// Cells along y.
        cells_y: usize,
        /// Minimum cells per axis.
        minimum: usize,
    },
    /// Partitions of different sizes; ghost indexes require equal sizes.
    UnevenPartitions,
    /// Cell width or height is not a positive finite number.
    InvalidCellSize {
        /// Cell width.
        width: f64,
        /// Cell height.
        height: f64,
    },
    /// Time step is not a positive finite number.
    InvalidTimeStep {
        /// The rejected value.
        value: f64,
    },
    /// A worker pool or node count of zero.
    ZeroCount {
        /// Which parameter was zero.
        name: &'static str,
    },
    /// A timeout of zero duration.
    ZeroTimeout {
        /// Which timeout was zero.
        name: &'static str,
    },
    /// A node identifier outside the partition table.
    UnknownNode {
        /// The rejected node.
        node: NodeId,
    },
    /// A border region requires a neighbor channel that does not exist.
    MissingNeighbor {
        /// Direction of the missing neighbor.
        direction: Direction,
    },
    /// A cell count does not match what the grid dimensions require.
    CellCountMismatch {
        /// Which quantity was rejected.
        name: &'static str,
        /// Count required.
        expected: usize,
        /// Count supplied.
        found: usize,
    },
    /// A particle has non-positive or non-finite mass.
    InvalidMass {
        /// The offending particle.
        particle: ParticleId,
    },
    /// The master node was started without the global problem.
    MissingProblem,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPowerOfTwo { name, value } => {
                write!(f, "{name} must be a power of two, got {value}")
            }
            Self::CountTooLarge {
                name,
                value,
                maximum,
            } => write!(f, "{name} of {value} exceeds the maximum of {maximum}"),
            Self::TooManyPartitions { partitions, cells } => {
                write!(f, "{partitions} partitions requested for only {cells} cells")
            }
            Self::PartitionCountMismatch { partitions, nodes } => {
                write!(f, "{partitions} partitions cannot be assigned to {nodes} nodes")
            }
            Self::MalformedBox {
                min_x,
                max_x,
                min_y,
                max_y,
            } => write!(
                f,
                "malformed box x=[{min_x}, {max_x}) y=[{min_y}, {max_y}): min must be below max"
            ),
            Self::PartitionTooSmall {
                cells_x,
                cells_y,
                minimum,
            } => write!(
                f,
                "partition of {cells_x}x{cells_y} cells is below the minimum of {minimum} per axis"
            ),
            Self::UnevenPartitions => write!(f, "partitions differ in size"),
            Self::InvalidCellSize { width, height } => {
                write!(f, "cell size {width}x{height} must be positive and finite")
            }
            Self::InvalidTimeStep { value } => {
                write!(f, "time step {value} must be positive and finite")
            }
            Self::ZeroCount { name } => write!(f, "{name} must be at least 1"),
            Self::ZeroTimeout { name } => write!(f, "{name} must be non-zero"),
            Self::UnknownNode { node } => write!(f, "node {node} has no partition"),
            Self::MissingNeighbor { direction } => {
                write!(f, "border region requires a neighbor in direction {direction}")
            }
            Self::CellCountMismatch {
                name,
                expected,
                found,
            } => write!(f, "{name}: expected {expected}, found {found}"),
            Self::InvalidMass { particle } => {
                write!(f, "particle {particle} has invalid mass")
            }
            Self::MissingProblem => write!(f, "the master node needs the global problem"),
        }
    }
}

impl Error for ConfigError {}

// ── ProtocolError ───────────────────────────────────────────────

/// A message violated the node-to-node protocol.
///
/// These indicate a setup bug or a corrupted frame and are never retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// A message tag byte is not recognized.
    UnknownTag {
        /// The unrecognized tag.
        tag: u8,
    },
    /// A frame could not be decoded (truncated or corrupt data).
    MalformedFrame {
        /// Human-readable description of what went wrong.
        detail: String,
    },
    /// The number of ghost cells received differs from the index map.
    GhostIndexMismatch {
        /// Entries in the ghost-slot index map.
        expected: usize,
        /// Cells received.
        found: usize,
    },
    /// A ghost-slot index points outside the local grid.
    GhostIndexOutOfRange {
        /// Local x of the slot.
        x: i32,
        /// Local y of the slot.
        y: i32,
    },
    /// A message kind arrived where another was expected.
    UnexpectedMessage {
        /// The kind the receiver expected.
        expected: &'static str,
        /// The kind that arrived.
        found: &'static str,
    },
    /// A worker reported its result twice.
    DuplicateResult {
        /// The reporting worker.
        worker: NodeId,
    },
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTag { tag } => write!(f, "unknown message tag {tag}"),
            Self::MalformedFrame { detail } => write!(f, "malformed frame: {detail}"),
            Self::GhostIndexMismatch { expected, found } => write!(
                f,
                "ghost cell count mismatch: index map has {expected} slots, received {found} cells"
            ),
            Self::GhostIndexOutOfRange { x, y } => {
                write!(f, "ghost slot ({x}, {y}) lies outside the local grid")
            }
            Self::UnexpectedMessage { expected, found } => {
                write!(f, "expected {expected} message, received {found}")
            }
            Self::DuplicateResult { worker } => {
                write!(f, "worker {worker} reported its result twice")
            }
        }
    }
}

impl Error for ProtocolError {}

// ── CommunicationError ──────────────────────────────────────────

/// A channel failed to deliver or receive a message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommunicationError {
    /// The receiving end of a channel is gone.
    SendFailed {
        /// Description of the channel.
        channel: String,
    },
    /// The sending end of a channel is gone.
    Disconnected {
        /// Description of the channel.
        channel: String,
    },
    /// A blocking wait exceeded its deadline.
    Timeout {
        /// What the caller was waiting for.
        waiting_for: String,
        /// How long the caller waited, in milliseconds.
        elapsed_ms: u64,
    },
    /// A send endpoint was requested before its receiver was published.
    EndpointMissing {
        /// Description of the channel.
        channel: String,
    },
    /// A node or exchange thread panicked.
    ThreadPanicked {
        /// Name of the thread.
        thread: String,
    },
    /// The operating system refused to start a thread.
    SpawnFailed {
        /// Name of the thread.
        thread: String,
        /// Error reported by the OS.
        reason: String,
    },
    /// A receive thread stopped the exchange after a fatal error.
    Aborted,
}

impl fmt::Display for CommunicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendFailed { channel } => write!(f, "send failed on {channel}"),
            Self::Disconnected { channel } => write!(f, "{channel} disconnected"),
            Self::Timeout {
                waiting_for,
                elapsed_ms,
            } => write!(f, "timed out after {elapsed_ms}ms waiting for {waiting_for}"),
            Self::EndpointMissing { channel } => {
                write!(f, "no receive endpoint published for {channel}")
            }
            Self::ThreadPanicked { thread } => write!(f, "thread '{thread}' panicked"),
            Self::SpawnFailed { thread, reason } => {
                write!(f, "failed to spawn thread '{thread}': {reason}")
            }
            Self::Aborted => write!(f, "exchange aborted by a receive thread"),
        }
    }
}

impl Error for CommunicationError {}

// ── NodeError ───────────────────────────────────────────────────

/// Any fatal error that terminates a node.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeError {
    /// Invalid configuration.
    Config(ConfigError),
    /// Protocol violation.
    Protocol(ProtocolError),
    /// Channel failure.
    Communication(CommunicationError),
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration error: {e}"),
            Self::Protocol(e) => write!(f, "protocol error: {e}"),
            Self::Communication(e) => write!(f, "communication failure: {e}"),
        }
    }
}

impl Error for NodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Protocol(e) => Some(e),
            Self::Communication(e) => Some(e),
        }
    }
}

impl From<ConfigError> for NodeError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ProtocolError> for NodeError {
    fn from(e: ProtocolError) -> Self {
        Self::Protocol(e)
    }
}

impl From<CommunicationError> for NodeError {
    fn from(e: CommunicationError) -> Self {
        Self::Communication(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_parameter() {
        let e = ConfigError::NotPowerOfTwo {
            name: "cells_x",
            value: 12,
        };
        assert_eq!(e.to_string(), "cells_x must be a power of two, got 12");
    }

    #[test]
    fn oversized_count_names_the_limit() {
        let e = ConfigError::CountTooLarge {
            name: "cells_x",
            value: 1 << 31,
            maximum: i32::MAX as usize,
        };
        assert_eq!(
            e.to_string(),
            "cells_x of 2147483648 exceeds the maximum of 2147483647"
        );
    }

    #[test]
    fn node_error_exposes_source() {
        let e: NodeError = ProtocolError::UnknownTag { tag: 9 }.into();
        assert!(e.source().is_some());
        assert_eq!(
            e.to_string(),
            "protocol error: unknown message tag 9"
        );
    }

    #[test]
    fn timeout_display_includes_elapsed() {
        let e = CommunicationError::Timeout {
            waiting_for: "ghost cells".into(),
            elapsed_ms: 250,
        };
        assert_eq!(e.to_string(), "timed out after 250ms waiting for ghost cells");
    }
}
