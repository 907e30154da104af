//! Test utilities for picnic development.
//!
//! Provides seeded particle and grid fixtures ([`fixtures`]), a
//! field-by-field comparison of two simulation results ([`compare`]) and
//! [`SimulationComparator`], which runs one scenario both on a single node
//! and distributed over emulated nodes and reports every divergence.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod compare;
pub mod fixtures;

pub use compare::{
    compare_results, CellDivergence, ComparisonReport, ParticleDivergence, SimulationComparator,
};
pub use fixtures::{presets, seeded_grid, seeded_particles, Scenario};

/// Install a test-writer `fmt` subscriber once per process.
///
/// Later calls are no-ops, so every test may call it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::WARN)
        .with_thread_names(true)
        .try_init();
}
