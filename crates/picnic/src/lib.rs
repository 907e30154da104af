//! picnic: a particle-in-cell simulator that runs on one node or on many.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all picnic sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use picnic::prelude::*;
//!
//! let settings = SimulationSettings::hardwall()
//!     .with_cells(16, 16)
//!     .with_iterations(5);
//! let particles: Vec<Particle> = (0..32u64)
//!     .map(|i| {
//!         let x = 0.5 + (i % 8) as f64 * 2.0;
//!         let y = 0.5 + (i / 8) as f64 * 4.0;
//!         Particle::new(ParticleId(i), x, y, 0.4, -0.3, 1.0, 1.0)
//!     })
//!     .collect();
//! let grid = Grid::new(16, 16, 1.0, 1.0).unwrap();
//!
//! let env = EmulatedEnvironment::new(DistributedConfig::new(4, settings));
//! let run = env.run(particles, grid).unwrap();
//! assert_eq!(run.particles.len(), 32);
//! assert_eq!(run.metrics.len(), 4);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `picnic-core` | Boxes, directions, ids, particles, cells, errors |
//! | [`space`] | `picnic-space` | Partitioning, region classification, neighbors, grids |
//! | [`physics`] | `picnic-physics` | Pushers, forces, boundaries, interpolation, local runs |
//! | [`engine`] | `picnic-engine` | Exchange runtime, master/worker protocol, emulation |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core value types and the error taxonomy (`picnic-core`).
pub use picnic_core as types;

/// Partitioning, region classification, neighbor discovery and the grid
/// (`picnic-space`).
pub use picnic_space as space;

/// Physics collaborators and the single-node reference run
/// (`picnic-physics`).
///
/// [`physics::LocalSimulation`] is what a distributed run is compared
/// against.
pub use picnic_physics as physics;

/// The distributed runtime (`picnic-engine`).
///
/// [`engine::EmulatedEnvironment`] runs every node as a thread in one
/// process; [`engine::Node`] runs a single node over given links.
pub use picnic_engine as engine;

/// Common imports for typical picnic usage.
pub mod prelude {
    // Core types
    pub use picnic_core::{Cell, Direction, DoubleBox, IntBox, NodeId, Particle, ParticleId};

    // Errors
    pub use picnic_core::{CommunicationError, ConfigError, NodeError, ProtocolError};

    // Space
    pub use picnic_space::{Grid, Topology};

    // Physics
    pub use picnic_physics::{
        FieldSolverKind, Force, LocalSimulation, ParticleBoundaryKind, SimulationSettings,
        SolverKind,
    };

    // Engine
    pub use picnic_engine::{DistributedConfig, EmulatedEnvironment, EmulatedRun, ExchangeMetrics};
}
