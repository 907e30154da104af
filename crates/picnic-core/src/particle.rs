//! The [`Particle`] value type.

use crate::id::ParticleId;

/// A charged macro-particle.
///
/// Everything a particle solver needs between steps is stored here,
/// including the fields interpolated onto the particle and the last
/// acceleration. A particle that migrates to another node therefore
/// carries its complete integration state with it.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    /// Stable identity.
    pub id: ParticleId,
    /// Position x.
    pub x: f64,
    /// Position y.
    pub y: f64,
    /// Velocity x.
    pub vx: f64,
    /// Velocity y.
    pub vy: f64,
    /// Acceleration x from the last force evaluation.
    pub ax: f64,
    /// Acceleration y from the last force evaluation.
    pub ay: f64,
    /// Mass (positive).
    pub mass: f64,
    /// Charge.
    pub charge: f64,
    /// Electric field x at the particle.
    pub ex: f64,
    /// Electric field y at the particle.
    pub ey: f64,
    /// Magnetic field z at the particle.
    pub bz: f64,
}

impl Particle {
    /// A particle with zero acceleration and zero interpolated fields.
    pub fn new(id: ParticleId, x: f64, y: f64, vx: f64, vy: f64, mass: f64, charge: f64) -> Self {
        Self {
            id,
            x,
            y,
            vx,
            vy,
            ax: 0.0,
            ay: 0.0,
            mass,
            charge,
            ex: 0.0,
            ey: 0.0,
            bz: 0.0,
        }
    }

    /// Shift the position by `(dx, dy)`.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    /// A copy shifted by `(dx, dy)`.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        let mut p = self.clone();
        p.translate(dx, dy);
        p
    }
}
