//! Particle pushers.
//!
//! Each [`SolverKind`] exposes `prepare`, `step` and `complete`. Leapfrog
//! style pushers keep velocities half a step out of phase with positions:
//! `prepare` shifts the velocity back half a step before the first step,
//! `complete` shifts it forward again after the last one. The acceleration
//! used by that shift is stored on the particle.

use picnic_core::Particle;

use crate::force::Force;

/// Numerical integrator for particle motion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SolverKind {
    /// Explicit Euler: position from the old velocity.
    Euler,
    /// Semi-implicit Euler: position from the new velocity.
    #[default]
    SemiImplicitEuler,
    /// Leapfrog with half-step velocity offset.
    LeapFrog,
    /// Boris rotation with half-step velocity offset.
    Boris,
}

fn accelerate(p: &mut Particle, f: &Force) {
    let (fx, fy) = f.total(p);
    p.ax = fx / p.mass;
    p.ay = fy / p.mass;
}

impl SolverKind {
    /// Called once per particle before the first step.
    pub fn prepare(self, p: &mut Particle, f: &Force, dt: f64) {
        match self {
            SolverKind::Euler | SolverKind::SemiImplicitEuler => {}
            SolverKind::LeapFrog => {
                accelerate(p, f);
                p.vx += p.ax * dt / 2.0;
                p.vy += p.ay * dt / 2.0;
            }
            SolverKind::Boris => {
                accelerate(p, f);
                p.vx -= p.ax * dt / 2.0;
                p.vy -= p.ay * dt / 2.0;
            }
        }
    }

    /// Advance one particle by `dt`.
    pub fn step(self, p: &mut Particle, f: &Force, dt: f64) {
        match self {
            SolverKind::Euler => {
                accelerate(p, f);
                p.x += p.vx * dt;
                p.y += p.vy * dt;
                p.vx += p.ax * dt;
                p.vy += p.ay * dt;
            }
            SolverKind::SemiImplicitEuler => {
                accelerate(p, f);
                p.vx += p.ax * dt;
                p.vy += p.ay * dt;
                p.x += p.vx * dt;
                p.y += p.vy * dt;
            }
            SolverKind::LeapFrog => {
                p.x += p.vx * dt;
                p.y += p.vy * dt;
                accelerate(p, f);
                p.vx += p.ax * dt;
                p.vy += p.ay * dt;
            }
            SolverKind::Boris => boris(p, f, dt),
        }
    }

    /// Called once per particle after the last step.
    pub fn complete(self, p: &mut Particle, f: &Force, dt: f64) {
        match self {
            SolverKind::Euler | SolverKind::SemiImplicitEuler => {}
            SolverKind::LeapFrog => {
                p.vx -= p.ax * dt / 2.0;
                p.vy -= p.ay * dt / 2.0;
            }
            SolverKind::Boris => {
                accelerate(p, f);
                p.vx += p.ax * dt / 2.0;
                p.vy += p.ay * dt / 2.0;
            }
        }
    }
}

fn boris(p: &mut Particle, f: &Force, dt: f64) {
    let (kx, ky) = f.kick(p);
    let half = dt / (2.0 * p.mass);

    let vx_minus = p.vx + kx * half;
    let vy_minus = p.vy + ky * half;

    let t = f.rotation(p) * half;
    let s = 2.0 * t / (1.0 + t * t);

    let vx_prime = vx_minus + vy_minus * t;
    let vy_prime = vy_minus - vx_minus * t;
    let vx_plus = vx_minus + vy_prime * s;
    let vy_plus = vy_minus - vx_prime * s;

    p.vx = vx_plus + kx * half;
    p.vy = vy_plus + ky * half;
    p.ax = kx / p.mass;
    p.ay = ky / p.mass;
    p.x += p.vx * dt;
    p.y += p.vy * dt;
}
