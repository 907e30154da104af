//! The single-node reference simulation.
//!
//! [`LocalSimulation`] runs the same phases as a distributed worker over
//! the whole grid. Per step:
//!
//! 1. push every particle,
//! 2. apply the boundary condition at the global edges,
//! 3. reset sources and deposit every particle,
//! 4. under periodic topology, fold halo sources onto the wrapped owned
//!    cells,
//! 5. advance the fields,
//! 6. under periodic topology, refresh the halo from the wrapped owned
//!    cells,
//! 7. gather fields onto every particle.
//!
//! Steps 4 and 6 are what ghost particles and ghost cells provide in a
//! distributed run.

use picnic_core::{ConfigError, DoubleBox, Particle};
use picnic_space::{Grid, Topology};

use crate::boundary::{clamp_into, BoundaryOutcome, Walls};
use crate::phases;
use crate::pool::WorkerPool;
use crate::settings::SimulationSettings;

/// A complete simulation on one node.
#[derive(Debug)]
pub struct LocalSimulation {
    settings: SimulationSettings,
    simulation_box: DoubleBox,
    grid: Grid,
    particles: Vec<Particle>,
    pool: WorkerPool,
    steps: usize,
    prepared: bool,
}

impl LocalSimulation {
    /// Set up a simulation over `grid` (which must match the settings'
    /// cell counts).
    ///
    /// Particle positions are clamped into the simulation box.
    pub fn new(
        settings: SimulationSettings,
        mut particles: Vec<Particle>,
        grid: Grid,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        if grid.cells_x() as usize != settings.cells_x || grid.cells_y() as usize != settings.cells_y
        {
            return Err(ConfigError::CellCountMismatch {
                name: "grid cells",
                expected: settings.cells_x * settings.cells_y,
                found: (grid.cells_x() * grid.cells_y()) as usize,
            });
        }
        if let Some(p) = particles
            .iter()
            .find(|p| !(p.mass.is_finite() && p.mass > 0.0))
        {
            return Err(ConfigError::InvalidMass { particle: p.id });
        }
        let simulation_box = settings.simulation_box()?;
        for p in &mut particles {
            clamp_into(p, &simulation_box);
        }
        let pool = settings.pool();
        Ok(Self {
            settings,
            simulation_box,
            grid,
            particles,
            pool,
            steps: 0,
            prepared: false,
        })
    }

    /// Settings in use.
    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Current grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Current particles.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Steps completed so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    fn prepare(&mut self) {
        if self.prepared {
            return;
        }
        let s = &self.settings;
        phases::prepare_particles(
            &self.pool,
            &mut self.particles,
            s.solver,
            &s.force,
            s.time_step,
        );
        self.prepared = true;
    }

    /// Advance by one step. The solver is prepared before the first step.
    pub fn step(&mut self) {
        self.prepare();
        let dt = self.settings.time_step;
        let periodic = self.settings.topology() == Topology::Periodic;

        phases::push_particles(
            &self.pool,
            &mut self.particles,
            self.settings.solver,
            &self.settings.force,
            dt,
        );

        let boundary = self.settings.boundary;
        let sim = self.simulation_box;
        self.particles
            .retain_mut(|p| boundary.apply(p, &sim, Walls::ALL) == BoundaryOutcome::Kept);

        phases::reset_sources(&self.pool, &mut self.grid);
        phases::deposit_all(&mut self.grid, &self.particles);
        if periodic {
            fold_halo_sources(&mut self.grid);
        }

        phases::solve_fields(&self.pool, &mut self.grid, self.settings.field_solver, dt);
        if periodic {
            refresh_halo(&mut self.grid);
        }

        phases::gather_where(&self.pool, &self.grid, &mut self.particles, |_| true);
        self.steps += 1;
        tracing::trace!("local step {} done, {} particles", self.steps, self.particles.len());
    }

    /// Run the configured number of steps and complete the solver.
    pub fn run(mut self) -> (Vec<Particle>, Grid) {
        tracing::info!(
            "local run: {} particles, {}x{} cells, {} iterations",
            self.particles.len(),
            self.settings.cells_x,
            self.settings.cells_y,
            self.settings.iterations
        );
        for _ in 0..self.settings.iterations {
            self.step();
        }
        self.finish()
    }

    /// Complete the solver and hand out the final state.
    pub fn finish(mut self) -> (Vec<Particle>, Grid) {
        self.prepare();
        let s = &self.settings;
        phases::complete_particles(
            &self.pool,
            &mut self.particles,
            s.solver,
            &s.force,
            s.time_step,
        );
        (self.particles, self.grid)
    }
}

fn halo_cells(grid: &Grid) -> impl Iterator<Item = (i32, i32)> + '_ {
    let stored = grid.storage_box();
    (stored.min_y()..stored.max_y())
        .flat_map(move |y| (stored.min_x()..stored.max_x()).map(move |x| (x, y)))
        .filter(move |&(x, y)| !grid.is_owned(x, y))
}

fn wrapped(grid: &Grid, x: i32, y: i32) -> (i32, i32) {
    (x.rem_euclid(grid.cells_x()), y.rem_euclid(grid.cells_y()))
}

/// Add each halo cell's sources to the owned cell it wraps onto.
fn fold_halo_sources(grid: &mut Grid) {
    let halo: Vec<(i32, i32)> = halo_cells(grid).collect();
    for (x, y) in halo {
        let (wx, wy) = wrapped(grid, x, y);
        let source = *grid.clamped(x, y);
        grid.clamped_mut(wx, wy).add_sources(&source);
    }
}

/// Overwrite every halo cell with the owned cell it wraps onto.
fn refresh_halo(grid: &mut Grid) {
    let halo: Vec<(i32, i32)> = halo_cells(grid).collect();
    for (x, y) in halo {
        let (wx, wy) = wrapped(grid, x, y);
        let cell = *grid.clamped(wx, wy);
        grid.set(x, y, cell);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::ParticleBoundaryKind;
    use crate::force::Force;
    use crate::solver::SolverKind;
    use picnic_core::ParticleId;

    fn settings() -> SimulationSettings {
        SimulationSettings {
            iterations: 20,
            ..SimulationSettings::default().with_cells(8, 8)
        }
    }

    fn grid(s: &SimulationSettings) -> Grid {
        Grid::new(s.cells_x, s.cells_y, s.cell_width, s.cell_height).unwrap()
    }

    fn particle(id: u64, x: f64, y: f64, vx: f64, vy: f64) -> Particle {
        Particle::new(ParticleId(id), x, y, vx, vy, 1.0, 1.0)
    }

    #[test]
    fn periodic_fold_conserves_charge() {
        let s = settings();
        let p = particle(0, 7.5, 7.5, 0.0, 0.0);
        let mut sim = LocalSimulation::new(s.clone(), vec![p], grid(&s)).unwrap();
        sim.step();
        let owned: f64 = (0..8)
            .flat_map(|y| (0..8).map(move |x| (x, y)))
            .map(|(x, y)| sim.grid().get(x, y).unwrap().rho)
            .sum();
        assert!((owned - 1.0).abs() < 1e-12);
        assert!(sim.grid().get(0, 0).unwrap().rho > 0.0);
    }

    #[test]
    fn periodic_halo_mirrors_owned_cells() {
        let s = settings();
        let ps = vec![particle(0, 1.2, 3.4, 1.0, 0.0), particle(1, 6.9, 0.1, 0.0, -1.0)];
        let mut sim = LocalSimulation::new(s.clone(), ps, grid(&s)).unwrap();
        sim.step();
        let g = sim.grid();
        assert_eq!(g.get(8, 3), g.get(0, 3));
        assert_eq!(g.get(-1, -1), g.get(7, 7));
    }

    #[test]
    fn periodic_particles_stay_inside() {
        let s = settings();
        let ps = vec![particle(0, 7.95, 0.05, 3.0, -3.0)];
        let (ps, _) = LocalSimulation::new(s.clone(), ps, grid(&s)).unwrap().run();
        let b = s.simulation_box().unwrap();
        assert!(ps.iter().all(|p| b.contains(p.x, p.y)));
    }

    #[test]
    fn absorbing_removes_escaping_particles() {
        let s = SimulationSettings {
            boundary: ParticleBoundaryKind::Absorbing,
            force: Force::Constant { fx: 0.0, fy: 0.0 },
            ..settings()
        };
        let ps = vec![particle(0, 7.9, 4.0, 1.0, 0.0), particle(1, 4.0, 4.0, 0.0, 0.0)];
        let (ps, _) = LocalSimulation::new(s.clone(), ps, grid(&s)).unwrap().run();
        assert_eq!(ps.len(), 1);
        assert_eq!(ps[0].id, ParticleId(1));
    }

    #[test]
    fn hardwall_keeps_particle_count() {
        let s = SimulationSettings {
            boundary: ParticleBoundaryKind::Hardwall,
            solver: SolverKind::Boris,
            ..settings()
        };
        let ps = (0..16)
            .map(|i| particle(i, 0.5 * i as f64, 3.0, 2.0, -1.5))
            .collect();
        let (ps, _) = LocalSimulation::new(s.clone(), ps, grid(&s)).unwrap().run();
        assert_eq!(ps.len(), 16);
    }

    #[test]
    fn rejects_mismatched_grid() {
        let s = settings();
        let g = Grid::new(4, 8, 1.0, 1.0).unwrap();
        assert!(matches!(
            LocalSimulation::new(s, Vec::new(), g),
            Err(ConfigError::CellCountMismatch { .. })
        ));
    }

    #[test]
    fn rejects_massless_particle() {
        let s = settings();
        let mut p = particle(3, 1.0, 1.0, 0.0, 0.0);
        p.mass = 0.0;
        assert_eq!(
            LocalSimulation::new(s.clone(), vec![p], grid(&s)).err(),
            Some(ConfigError::InvalidMass {
                particle: ParticleId(3)
            })
        );
    }

    #[test]
    fn run_counts_steps() {
        let s = settings().with_iterations(3);
        let mut sim = LocalSimulation::new(s.clone(), Vec::new(), grid(&s)).unwrap();
        sim.step();
        sim.step();
        assert_eq!(sim.steps(), 2);
    }
}
