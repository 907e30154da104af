//! Deterministic inputs for local and distributed runs.
//!
//! Everything here is driven by a `ChaCha8Rng` seeded from a `u64`, so a
//! failing scenario can be replayed from its seed alone.

use picnic_core::{Particle, ParticleId};
use picnic_physics::{FieldSolverKind, SimulationSettings, SolverKind};
use picnic_space::Grid;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Largest speed a fixture particle starts with, in cells per time unit.
pub const MAX_SPEED: f64 = 1.5;

/// Largest initial field magnitude on a fixture grid.
pub const MAX_FIELD: f64 = 0.1;

fn unit(rng: &mut ChaCha8Rng) -> f64 {
    (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}

fn symmetric(rng: &mut ChaCha8Rng, magnitude: f64) -> f64 {
    (2.0 * unit(rng) - 1.0) * magnitude
}

/// `count` particles spread uniformly over the simulation box.
///
/// Ids are `0..count`. Charges alternate in sign, masses lie in `[1, 2)`.
pub fn seeded_particles(seed: u64, count: usize, settings: &SimulationSettings) -> Vec<Particle> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let width = settings.cells_x as f64 * settings.cell_width;
    let height = settings.cells_y as f64 * settings.cell_height;
    (0..count)
        .map(|i| {
            let x = unit(&mut rng) * width;
            let y = unit(&mut rng) * height;
            let vx = symmetric(&mut rng, MAX_SPEED) * settings.cell_width;
            let vy = symmetric(&mut rng, MAX_SPEED) * settings.cell_height;
            let mass = 1.0 + unit(&mut rng);
            let charge = if i % 2 == 0 { 0.5 } else { -0.5 };
            Particle::new(ParticleId(i as u64), x, y, vx, vy, mass, charge)
        })
        .collect()
}

/// A grid sized by `settings` with small random fields in every stored
/// cell, halo included. Sources start at zero.
pub fn seeded_grid(seed: u64, settings: &SimulationSettings) -> Grid {
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15);
    let mut grid = match Grid::new(
        settings.cells_x,
        settings.cells_y,
        settings.cell_width,
        settings.cell_height,
    ) {
        Ok(grid) => grid,
        Err(e) => panic!("fixture settings do not describe a grid: {e}"),
    };
    for cell in grid.cells_mut() {
        cell.ex = symmetric(&mut rng, MAX_FIELD);
        cell.ey = symmetric(&mut rng, MAX_FIELD);
        cell.bz = symmetric(&mut rng, MAX_FIELD);
    }
    grid
}

/// A named simulation setup.
#[derive(Clone, Debug)]
pub struct Scenario {
    pub name: &'static str,
    pub settings: SimulationSettings,
}

/// The standard scenarios: one per boundary condition, plus variants with
/// other pushers, a drag force and frozen fields.
pub fn presets(cells: usize, iterations: usize) -> Vec<Scenario> {
    let base = |s: SimulationSettings| s.with_cells(cells, cells).with_iterations(iterations);
    vec![
        Scenario {
            name: "periodic",
            settings: base(SimulationSettings::periodic()),
        },
        Scenario {
            name: "hardwall",
            settings: base(SimulationSettings::hardwall()),
        },
        Scenario {
            name: "absorbing",
            settings: base(SimulationSettings::absorbing()),
        },
        Scenario {
            name: "periodic-boris",
            settings: base(SimulationSettings::periodic().with_solver(SolverKind::Boris)),
        },
        Scenario {
            name: "hardwall-leapfrog",
            settings: base(SimulationSettings::hardwall().with_solver(SolverKind::LeapFrog)),
        },
        Scenario {
            name: "absorbing-euler-frozen",
            settings: SimulationSettings {
                field_solver: FieldSolverKind::Frozen,
                ..base(SimulationSettings::absorbing().with_solver(SolverKind::Euler))
            },
        },
    ]
}
