//! Forces acting on particles.
//!
//! A [`Force`] is evaluated from the particle alone: its velocity and the
//! fields last interpolated onto it. No force reads absolute positions or
//! global state, which keeps a migrated particle's trajectory identical to
//! the one it would follow on a single node.

use picnic_core::Particle;

/// A force acting on a particle.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Force {
    /// Lorentz force `q (E + v x B)` from the interpolated fields.
    #[default]
    Lorentz,
    /// Uniform force, the same for every particle.
    Constant {
        /// Force x.
        fx: f64,
        /// Force y.
        fy: f64,
    },
    /// Linear drag `-c v`.
    Drag {
        /// Drag coefficient `c`.
        coefficient: f64,
    },
    /// Sum of several forces.
    Combined(Vec<Force>),
}

impl Force {
    /// Every term except the magnetic rotation, `(fx, fy)`.
    ///
    /// This is what Boris-type pushers apply as half kicks.
    pub fn kick(&self, p: &Particle) -> (f64, f64) {
        match self {
            Force::Lorentz => (p.charge * p.ex, p.charge * p.ey),
            Force::Constant { fx, fy } => (*fx, *fy),
            Force::Drag { coefficient } => (-coefficient * p.vx, -coefficient * p.vy),
            Force::Combined(forces) => forces.iter().fold((0.0, 0.0), |(ax, ay), f| {
                let (x, y) = f.kick(p);
                (ax + x, ay + y)
            }),
        }
    }

    /// Magnetic rotation strength `q * Bz`.
    pub fn rotation(&self, p: &Particle) -> f64 {
        match self {
            Force::Lorentz => p.charge * p.bz,
            Force::Constant { .. } | Force::Drag { .. } => 0.0,
            Force::Combined(forces) => forces.iter().map(|f| f.rotation(p)).sum(),
        }
    }

    /// Total force `(fx, fy)`.
    pub fn total(&self, p: &Particle) -> (f64, f64) {
        let (kx, ky) = self.kick(p);
        let r = self.rotation(p);
        (kx + r * p.vy, ky - r * p.vx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picnic_core::ParticleId;

    fn particle() -> Particle {
        let mut p = Particle::new(ParticleId(0), 0.0, 0.0, 2.0, -1.0, 1.0, 0.5);
        p.ex = 4.0;
        p.ey = -2.0;
        p.bz = 3.0;
        p
    }

    #[test]
    fn lorentz_matches_closed_form() {
        let p = particle();
        let (fx, fy) = Force::Lorentz.total(&p);
        assert_eq!(fx, 0.5 * (4.0 + -1.0 * 3.0));
        assert_eq!(fy, 0.5 * (-2.0 - 2.0 * 3.0));
    }

    #[test]
    fn drag_opposes_velocity() {
        let p = particle();
        let (fx, fy) = Force::Drag { coefficient: 0.1 }.total(&p);
        assert!(fx < 0.0 && fy > 0.0);
    }

    #[test]
    fn combined_sums_terms() {
        let p = particle();
        let f = Force::Combined(vec![
            Force::Lorentz,
            Force::Constant { fx: 1.0, fy: 1.0 },
        ]);
        let (lx, ly) = Force::Lorentz.total(&p);
        assert_eq!(f.total(&p), (lx + 1.0, ly + 1.0));
        assert_eq!(f.rotation(&p), Force::Lorentz.rotation(&p));
    }
}
