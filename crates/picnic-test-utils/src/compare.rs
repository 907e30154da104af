//! Compare a distributed result against the single-node reference.

use std::collections::BTreeMap;
use std::fmt;

use picnic_core::{Cell, NodeError, Particle, ParticleId};
use picnic_engine::{DistributedConfig, EmulatedEnvironment, EmulatedRun};
use picnic_physics::{LocalSimulation, SimulationSettings};
use picnic_space::Grid;

use crate::fixtures::{seeded_grid, seeded_particles};

/// A particle whose state differs beyond the tolerance.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleDivergence {
    pub id: ParticleId,
    /// Largest absolute difference over position, velocity and fields.
    pub error: f64,
    pub expected: Particle,
    pub actual: Particle,
}

/// An owned cell whose fields differ beyond the tolerance.
#[derive(Clone, Debug, PartialEq)]
pub struct CellDivergence {
    pub x: i32,
    pub y: i32,
    pub error: f64,
    pub expected: Cell,
    pub actual: Cell,
}

/// Every difference between two results.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComparisonReport {
    pub tolerance: f64,
    pub particles_compared: usize,
    pub cells_compared: usize,
    /// Present in the expected result only.
    pub missing: Vec<ParticleId>,
    /// Present in the actual result only.
    pub unexpected: Vec<ParticleId>,
    /// Present more than once in the actual result.
    pub duplicated: Vec<ParticleId>,
    pub particles: Vec<ParticleDivergence>,
    pub cells: Vec<CellDivergence>,
    /// Set when the grids have different dimensions.
    pub shape_mismatch: bool,
    /// Largest difference seen anywhere.
    pub max_error: f64,
}

impl ComparisonReport {
    /// Whether the two results agree within the tolerance.
    pub fn is_match(&self) -> bool {
        !self.shape_mismatch
            && self.missing.is_empty()
            && self.unexpected.is_empty()
            && self.duplicated.is_empty()
            && self.particles.is_empty()
            && self.cells.is_empty()
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} particles and {} cells compared at tolerance {:e}: max error {:e}",
            self.particles_compared, self.cells_compared, self.tolerance, self.max_error
        )?;
        if self.shape_mismatch {
            write!(f, "; grid shapes differ")?;
        }
        for (label, ids) in [
            ("missing", &self.missing),
            ("unexpected", &self.unexpected),
            ("duplicated", &self.duplicated),
        ] {
            if !ids.is_empty() {
                write!(f, "; {} {label} (first {:?})", ids.len(), ids[0])?;
            }
        }
        if let Some(d) = self.particles.first() {
            write!(
                f,
                "; {} particles diverge (first {:?} by {:e})",
                self.particles.len(),
                d.id,
                d.error
            )?;
        }
        if let Some(d) = self.cells.first() {
            write!(
                f,
                "; {} cells diverge (first ({}, {}) by {:e})",
                self.cells.len(),
                d.x,
                d.y,
                d.error
            )?;
        }
        Ok(())
    }
}

fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            if x.is_nan() || y.is_nan() {
                f64::INFINITY
            } else {
                (x - y).abs()
            }
        })
        .fold(0.0, f64::max)
}

fn particle_state(p: &Particle) -> [f64; 7] {
    [p.x, p.y, p.vx, p.vy, p.ex, p.ey, p.bz]
}

fn cell_fields(c: &Cell) -> [f64; 3] {
    [c.ex, c.ey, c.bz]
}

/// Compare particles by id and the owned cells of two grids.
///
/// Particle order is irrelevant. Only field components of owned cells are
/// compared; halo cells and sources are not part of a gathered result.
pub fn compare_results(
    expected_particles: &[Particle],
    expected_grid: &Grid,
    actual_particles: &[Particle],
    actual_grid: &Grid,
    tolerance: f64,
) -> ComparisonReport {
    let mut report = ComparisonReport {
        tolerance,
        ..ComparisonReport::default()
    };

    let mut by_id: BTreeMap<ParticleId, &Particle> = BTreeMap::new();
    for p in actual_particles {
        if by_id.insert(p.id, p).is_some() {
            report.duplicated.push(p.id);
        }
    }
    for e in expected_particles {
        let Some(a) = by_id.remove(&e.id) else {
            report.missing.push(e.id);
            continue;
        };
        report.particles_compared += 1;
        let error = max_abs_diff(&particle_state(e), &particle_state(a));
        report.max_error = report.max_error.max(error);
        if error > tolerance {
            report.particles.push(ParticleDivergence {
                id: e.id,
                error,
                expected: e.clone(),
                actual: a.clone(),
            });
        }
    }
    report.unexpected = by_id.into_keys().collect();

    let (eg, ag) = (expected_grid, actual_grid);
    if eg.cells_x() != ag.cells_x() || eg.cells_y() != ag.cells_y() {
        report.shape_mismatch = true;
        return report;
    }
    for y in 0..eg.cells_y() {
        for x in 0..eg.cells_x() {
            let (Some(e), Some(a)) = (eg.get(x, y), ag.get(x, y)) else {
                continue;
            };
            report.cells_compared += 1;
            let error = max_abs_diff(&cell_fields(e), &cell_fields(a));
            report.max_error = report.max_error.max(error);
            if error > tolerance {
                report.cells.push(CellDivergence {
                    x,
                    y,
                    error,
                    expected: *e,
                    actual: *a,
                });
            }
        }
    }
    report
}

/// Runs one seeded scenario locally and distributed, then compares.
#[derive(Clone, Debug)]
pub struct SimulationComparator {
    pub settings: SimulationSettings,
    pub nodes: usize,
    pub particles: usize,
    pub seed: u64,
    pub tolerance: f64,
}

impl SimulationComparator {
    pub fn new(settings: SimulationSettings, nodes: usize) -> Self {
        Self {
            settings,
            nodes,
            particles: 200,
            seed: 42,
            tolerance: 1e-10,
        }
    }

    pub fn with_particles(self, particles: usize) -> Self {
        Self { particles, ..self }
    }

    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    /// The single-node reference result.
    pub fn run_local(&self) -> Result<(Vec<Particle>, Grid), NodeError> {
        let particles = seeded_particles(self.seed, self.particles, &self.settings);
        let grid = seeded_grid(self.seed, &self.settings);
        let sim = LocalSimulation::new(self.settings.clone(), particles, grid)?;
        Ok(sim.run())
    }

    /// The same scenario over emulated nodes.
    pub fn run_distributed(&self) -> Result<EmulatedRun, NodeError> {
        let particles = seeded_particles(self.seed, self.particles, &self.settings);
        let grid = seeded_grid(self.seed, &self.settings);
        let env = EmulatedEnvironment::new(DistributedConfig::new(
            self.nodes,
            self.settings.clone(),
        ));
        env.run(particles, grid)
    }

    /// Run both and compare.
    pub fn compare(&self) -> Result<(ComparisonReport, EmulatedRun), NodeError> {
        let (particles, grid) = self.run_local()?;
        let run = self.run_distributed()?;
        let report = compare_results(
            &particles,
            &grid,
            &run.particles,
            &run.grid,
            self.tolerance,
        );
        Ok((report, run))
    }
}
