//! Integration test: every pusher driven through a full local run follows
//! the analytic trajectory of a uniformly accelerated particle.

use picnic_core::{Particle, ParticleId};
use picnic_physics::{
    FieldSolverKind, Force, LocalSimulation, ParticleBoundaryKind, SimulationSettings, SolverKind,
};
use picnic_space::Grid;

const ACCEL: (f64, f64) = (0.05, -0.02);
const V0: (f64, f64) = (0.3, 0.2);
const X0: (f64, f64) = (4.0, 6.0);

fn run(solver: SolverKind, dt: f64, iterations: usize) -> Particle {
    let settings = SimulationSettings {
        cells_x: 16,
        cells_y: 16,
        time_step: dt,
        iterations,
        boundary: ParticleBoundaryKind::Periodic,
        solver,
        force: Force::Constant {
            fx: ACCEL.0,
            fy: ACCEL.1,
        },
        field_solver: FieldSolverKind::Frozen,
        ..SimulationSettings::default()
    };
    let p = Particle::new(ParticleId(1), X0.0, X0.1, V0.0, V0.1, 1.0, 0.0);
    let grid = Grid::new(16, 16, 1.0, 1.0).unwrap();
    let (mut out, _) = LocalSimulation::new(settings, vec![p], grid).unwrap().run();
    out.pop().unwrap()
}

fn analytic(t: f64) -> (f64, f64, f64, f64) {
    (
        X0.0 + V0.0 * t + 0.5 * ACCEL.0 * t * t,
        X0.1 + V0.1 * t + 0.5 * ACCEL.1 * t * t,
        V0.0 + ACCEL.0 * t,
        V0.1 + ACCEL.1 * t,
    )
}

fn error(p: &Particle, t: f64) -> f64 {
    let (x, y, vx, vy) = analytic(t);
    [p.x - x, p.y - y, p.vx - vx, p.vy - vy]
        .iter()
        .map(|d| d.abs())
        .fold(0.0, f64::max)
}

#[test]
fn half_step_pushers_are_exact_for_constant_force() {
    for solver in [SolverKind::LeapFrog, SolverKind::Boris] {
        let p = run(solver, 0.1, 50);
        assert!(error(&p, 5.0) < 1e-9, "{solver:?}: {p:?}");
    }
}

#[test]
fn euler_pushers_converge_at_first_order() {
    for solver in [SolverKind::Euler, SolverKind::SemiImplicitEuler] {
        let coarse = error(&run(solver, 0.1, 50), 5.0);
        let fine = error(&run(solver, 0.01, 500), 5.0);
        assert!(coarse > 0.0, "{solver:?}");
        assert!(fine < coarse / 5.0, "{solver:?}: {coarse} -> {fine}");
        assert!(fine < 1e-2, "{solver:?}");
    }
}

#[test]
fn trajectory_wraps_across_the_periodic_edge() {
    // 200 steps of 0.1 at vx near 0.3 plus acceleration travel past x = 16.
    let p = run(SolverKind::LeapFrog, 0.1, 200);
    let (x, _, _, _) = analytic(20.0);
    assert!(x > 16.0);
    assert!((p.x - (x - 16.0)).abs() < 1e-9);
    assert!((0.0..16.0).contains(&p.x));
}
