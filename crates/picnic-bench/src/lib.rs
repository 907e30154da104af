//! Benchmark profiles for the picnic particle-in-cell framework.
//!
//! - [`reference_profile`]: 64x64 periodic grid, Boris pusher, one step
//! - [`stress_profile`]: 256x256 hardwall grid for larger layouts
//! - [`distributed_profile`]: a reference profile spread over emulated nodes

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::time::Duration;

use picnic_engine::DistributedConfig;
use picnic_physics::{SimulationSettings, SolverKind};

/// Particles per cell used by the profiles.
pub const PARTICLES_PER_CELL: usize = 4;

/// 64x64 periodic grid with the Boris pusher and one iteration per run.
pub fn reference_profile() -> SimulationSettings {
    SimulationSettings::periodic()
        .with_cells(64, 64)
        .with_solver(SolverKind::Boris)
        .with_iterations(1)
}

/// 256x256 hardwall grid with the leapfrog pusher.
pub fn stress_profile() -> SimulationSettings {
    SimulationSettings::hardwall()
        .with_cells(256, 256)
        .with_solver(SolverKind::LeapFrog)
        .with_iterations(1)
}

/// The reference profile over `nodes` emulated nodes, with timeouts short
/// enough that a stuck benchmark fails instead of hanging.
pub fn distributed_profile(nodes: usize) -> DistributedConfig {
    DistributedConfig {
        gather_timeout: Duration::from_secs(10),
        exchange_timeout: Duration::from_secs(5),
        ..DistributedConfig::new(nodes, reference_profile())
    }
}

/// Particle count matching [`PARTICLES_PER_CELL`] for `settings`.
pub fn particle_count(settings: &SimulationSettings) -> usize {
    settings.cells_x * settings.cells_y * PARTICLES_PER_CELL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_are_valid() {
        assert!(reference_profile().validate().is_ok());
        assert!(stress_profile().validate().is_ok());
        for nodes in [1, 4, 16] {
            assert!(distributed_profile(nodes).validate().is_ok());
        }
        assert_eq!(particle_count(&reference_profile()), 64 * 64 * 4);
    }
}
