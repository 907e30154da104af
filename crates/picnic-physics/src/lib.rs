//! Physics collaborators and the local reference simulation.
//!
//! The distributed runtime treats everything in this crate as pluggable
//! collaborators: it pushes particles through a [`SolverKind`], applies a
//! [`ParticleBoundaryKind`] at physical edges, deposits and gathers with
//! [`CloudInCell`], and advances fields with a [`FieldSolverKind`]. The
//! [`LocalSimulation`] wires the same pieces together on a single node and
//! is the reference a distributed run is compared against.
//!
//! All per-particle solver state lives in the
//! [`Particle`](picnic_core::Particle) itself, so a particle can migrate
//! between nodes mid-run without losing integration history.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod boundary;
pub mod field;
pub mod force;
pub mod interpolation;
pub mod phases;
pub mod pool;
pub mod settings;
pub mod simulation;
pub mod solver;

pub use boundary::{BoundaryOutcome, ParticleBoundaryKind, Walls};
pub use field::FieldSolverKind;
pub use force::Force;
pub use interpolation::CloudInCell;
pub use pool::WorkerPool;
pub use settings::SimulationSettings;
pub use simulation::LocalSimulation;
pub use solver::SolverKind;
