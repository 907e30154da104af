//! Step phases shared by the local and the distributed run.
//!
//! Each function is one phase of a simulation step over a grid and a
//! particle list. Both runs call the same functions in the same order; the
//! distributed run only interleaves exchange calls between them.

use std::sync::atomic::{AtomicUsize, Ordering};

use picnic_core::Particle;
use picnic_space::Grid;

use crate::field::FieldSolverKind;
use crate::force::Force;
use crate::interpolation::CloudInCell;
use crate::pool::WorkerPool;
use crate::solver::SolverKind;

/// Run the solver's `prepare` on every particle.
pub fn prepare_particles(
    pool: &WorkerPool,
    particles: &mut [Particle],
    solver: SolverKind,
    force: &Force,
    dt: f64,
) {
    pool.for_each(particles, |_, p| solver.prepare(p, force, dt));
}

/// Advance every particle by one step.
pub fn push_particles(
    pool: &WorkerPool,
    particles: &mut [Particle],
    solver: SolverKind,
    force: &Force,
    dt: f64,
) {
    pool.for_each(particles, |_, p| solver.step(p, force, dt));
}

/// Run the solver's `complete` on every particle.
pub fn complete_particles(
    pool: &WorkerPool,
    particles: &mut [Particle],
    solver: SolverKind,
    force: &Force,
    dt: f64,
) {
    pool.for_each(particles, |_, p| solver.complete(p, force, dt));
}

/// Zero the deposited sources of every stored cell.
pub fn reset_sources(pool: &WorkerPool, grid: &mut Grid) {
    pool.for_each(grid.cells_mut(), |_, c| c.reset_sources());
}

/// Deposit the particles' charge and current, in list order.
///
/// Deposits into shared cells, so this runs on the calling thread.
pub fn deposit_all<'a>(grid: &mut Grid, particles: impl IntoIterator<Item = &'a Particle>) {
    let cic = CloudInCell;
    for p in particles {
        cic.deposit(grid, p);
    }
}

/// Advance the fields of every stored cell, halo included.
pub fn solve_fields(pool: &WorkerPool, grid: &mut Grid, solver: FieldSolverKind, dt: f64) {
    pool.for_each(grid.cells_mut(), |_, c| solver.update(c, dt));
}

/// Gather fields onto the particles selected by `select`.
///
/// Returns the number of particles gathered.
pub fn gather_where<F>(
    pool: &WorkerPool,
    grid: &Grid,
    particles: &mut [Particle],
    select: F,
) -> usize
where
    F: Fn(&Particle) -> bool + Sync,
{
    let cic = CloudInCell;
    let count = AtomicUsize::new(0);
    pool.for_each(particles, |_, p| {
        if select(p) {
            cic.gather(grid, p);
            count.fetch_add(1, Ordering::Relaxed);
        }
    });
    count.into_inner()
}
