//! Simulation parameters shared by local and distributed runs.
//!
//! [`SimulationSettings`] is a plain value: a distributed run clones it for
//! every node and derives the partition-local variant with
//! [`SimulationSettings::local`]. [`validate()`](SimulationSettings::validate)
//! checks everything that can be checked without a partition layout.

use picnic_core::{ConfigError, DoubleBox, IntBox};
use picnic_space::Topology;

use crate::boundary::ParticleBoundaryKind;
use crate::field::FieldSolverKind;
use crate::force::Force;
use crate::interpolation::CloudInCell;
use crate::pool::WorkerPool;
use crate::solver::SolverKind;

/// Physics and grid parameters of a simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationSettings {
    /// Cells along x (power of two). Default: 32.
    pub cells_x: usize,
    /// Cells along y (power of two). Default: 32.
    pub cells_y: usize,
    /// Physical width of a cell. Default: 1.0.
    pub cell_width: f64,
    /// Physical height of a cell. Default: 1.0.
    pub cell_height: f64,
    /// Time step. Default: 0.1.
    pub time_step: f64,
    /// Number of steps. Default: 100.
    pub iterations: usize,
    /// Particle boundary condition at physical edges. Default: periodic.
    pub boundary: ParticleBoundaryKind,
    /// Particle pusher. Default: semi-implicit Euler.
    pub solver: SolverKind,
    /// Force acting on every particle. Default: Lorentz.
    pub force: Force,
    /// Field update. Default: Ampere.
    pub field_solver: FieldSolverKind,
    /// Worker threads per node for local fork-join work. Default: 1.
    pub threads: usize,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            cells_x: 32,
            cells_y: 32,
            cell_width: 1.0,
            cell_height: 1.0,
            time_step: 0.1,
            iterations: 100,
            boundary: ParticleBoundaryKind::default(),
            solver: SolverKind::default(),
            force: Force::default(),
            field_solver: FieldSolverKind::default(),
            threads: 1,
        }
    }
}

impl SimulationSettings {
    /// Check the structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("cells_x", self.cells_x), ("cells_y", self.cells_y)] {
            if value == 0 {
                return Err(ConfigError::ZeroCount { name });
            }
            if !value.is_power_of_two() {
                return Err(ConfigError::NotPowerOfTwo { name, value });
            }
        }
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.cell_width) || !positive(self.cell_height) {
            return Err(ConfigError::InvalidCellSize {
                width: self.cell_width,
                height: self.cell_height,
            });
        }
        if !positive(self.time_step) {
            return Err(ConfigError::InvalidTimeStep {
                value: self.time_step,
            });
        }
        if self.threads == 0 {
            return Err(ConfigError::ZeroCount { name: "threads" });
        }
        Ok(())
    }

    /// Physical extent of the grid.
    pub fn simulation_box(&self) -> Result<DoubleBox, ConfigError> {
        DoubleBox::new(
            0.0,
            self.cells_x as f64 * self.cell_width,
            0.0,
            self.cells_y as f64 * self.cell_height,
        )
    }

    /// Layout topology implied by the boundary condition.
    pub fn topology(&self) -> Topology {
        self.boundary.topology()
    }

    /// Interpolation stencil radius in cells.
    pub fn stencil_radius(&self) -> i32 {
        CloudInCell::RADIUS
    }

    /// Pool sized by [`threads`](Self::threads).
    pub fn pool(&self) -> WorkerPool {
        WorkerPool::new(self.threads)
    }

    /// The same settings restricted to one partition.
    pub fn local(&self, partition: &IntBox) -> SimulationSettings {
        SimulationSettings {
            cells_x: partition.width() as usize,
            cells_y: partition.height() as usize,
            ..self.clone()
        }
    }

    // ── Presets ─────────────────────────────────────────────────

    /// Periodic box with Lorentz force and semi-implicit Euler.
    pub fn periodic() -> Self {
        Self::default()
    }

    /// Reflecting walls.
    pub fn hardwall() -> Self {
        Self {
            boundary: ParticleBoundaryKind::Hardwall,
            ..Self::default()
        }
    }

    /// Absorbing walls with a constant force pushing particles out.
    pub fn absorbing() -> Self {
        Self {
            boundary: ParticleBoundaryKind::Absorbing,
            force: Force::Combined(vec![
                Force::Lorentz,
                Force::Constant { fx: 0.05, fy: 0.02 },
            ]),
            ..Self::default()
        }
    }

    /// Replace the pusher.
    pub fn with_solver(self, solver: SolverKind) -> Self {
        Self { solver, ..self }
    }

    /// Replace the grid size.
    pub fn with_cells(self, cells_x: usize, cells_y: usize) -> Self {
        Self {
            cells_x,
            cells_y,
            ..self
        }
    }

    /// Replace the number of steps.
    pub fn with_iterations(self, iterations: usize) -> Self {
        Self { iterations, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(SimulationSettings::default().validate().is_ok());
        assert!(SimulationSettings::hardwall().validate().is_ok());
        assert!(SimulationSettings::absorbing().validate().is_ok());
    }

    #[test]
    fn rejects_non_power_of_two() {
        let s = SimulationSettings::default().with_cells(24, 32);
        assert_eq!(
            s.validate(),
            Err(ConfigError::NotPowerOfTwo {
                name: "cells_x",
                value: 24
            })
        );
    }

    #[test]
    fn rejects_bad_time_step() {
        let s = SimulationSettings {
            time_step: -0.1,
            ..SimulationSettings::default()
        };
        assert!(matches!(
            s.validate(),
            Err(ConfigError::InvalidTimeStep { .. })
        ));
    }

    #[test]
    fn rejects_zero_threads() {
        let s = SimulationSettings {
            threads: 0,
            ..SimulationSettings::default()
        };
        assert_eq!(s.validate(), Err(ConfigError::ZeroCount { name: "threads" }));
    }

    #[test]
    fn local_keeps_physics() {
        let s = SimulationSettings::hardwall().with_solver(SolverKind::Boris);
        let part = IntBox::new(16, 32, 0, 8).unwrap();
        let local = s.local(&part);
        assert_eq!((local.cells_x, local.cells_y), (16, 8));
        assert_eq!(local.solver, SolverKind::Boris);
        assert_eq!(local.boundary, ParticleBoundaryKind::Hardwall);
    }

    #[test]
    fn simulation_box_spans_cells() {
        let s = SimulationSettings {
            cell_width: 0.5,
            ..SimulationSettings::default().with_cells(8, 4)
        };
        let b = s.simulation_box().unwrap();
        assert_eq!((b.max_x(), b.max_y()), (4.0, 4.0));
        assert_eq!(s.topology(), Topology::Periodic);
    }
}
