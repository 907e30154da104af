//! Particle boundary conditions at physical edges.
//!
//! A [`ParticleBoundaryKind`] is applied only to the sides of a box that
//! lie on the physical edge of the simulation ([`Walls`]). On a single
//! node that is every side of the global box; on a partition it is the
//! sides without a neighbor. Positions that end up outside the box after
//! the condition was applied (a particle moving more than a box width per
//! step, or rounding at an edge) are clamped back inside.

use picnic_core::{DoubleBox, Particle};
use picnic_space::Topology;

/// What happens to a particle crossing a physical edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ParticleBoundaryKind {
    /// Re-enter on the opposite side.
    #[default]
    Periodic,
    /// Reflect off the wall, reversing the normal velocity.
    Hardwall,
    /// Remove the particle.
    Absorbing,
}

/// Result of applying a boundary condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundaryOutcome {
    /// The particle stays in the simulation.
    Kept,
    /// The particle was absorbed and must be dropped.
    Removed,
}

/// Which sides of a box are physical walls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Walls {
    /// Lower x side.
    pub min_x: bool,
    /// Upper x side.
    pub max_x: bool,
    /// Lower y side.
    pub min_y: bool,
    /// Upper y side.
    pub max_y: bool,
}

impl Walls {
    /// Every side is a wall.
    pub const ALL: Walls = Walls {
        min_x: true,
        max_x: true,
        min_y: true,
        max_y: true,
    };

    /// No side is a wall.
    pub const NONE: Walls = Walls {
        min_x: false,
        max_x: false,
        min_y: false,
        max_y: false,
    };
}

/// Largest representable value strictly below `max`.
pub(crate) fn just_below(max: f64) -> f64 {
    let step = (max.abs() * f64::EPSILON).max(f64::MIN_POSITIVE);
    max - step
}

/// Clamp `v` into `[min, max)`.
pub fn clamp_half_open(v: f64, min: f64, max: f64) -> f64 {
    if v.is_nan() || v < min {
        min
    } else if v >= max {
        just_below(max)
    } else {
        v
    }
}

/// Clamp a particle's position into `sim`.
pub fn clamp_into(p: &mut Particle, sim: &DoubleBox) {
    p.x = clamp_half_open(p.x, sim.min_x(), sim.max_x());
    p.y = clamp_half_open(p.y, sim.min_y(), sim.max_y());
}

impl ParticleBoundaryKind {
    /// Layout topology implied by this condition.
    pub fn topology(self) -> Topology {
        match self {
            ParticleBoundaryKind::Periodic => Topology::Periodic,
            ParticleBoundaryKind::Hardwall | ParticleBoundaryKind::Absorbing => Topology::Bounded,
        }
    }

    /// Apply the condition on both axes for the sides marked in `walls`.
    pub fn apply(self, p: &mut Particle, sim: &DoubleBox, walls: Walls) -> BoundaryOutcome {
        let x = self.apply_axis(
            &mut p.x,
            &mut p.vx,
            sim.min_x(),
            sim.max_x(),
            walls.min_x,
            walls.max_x,
        );
        if x == BoundaryOutcome::Removed {
            return x;
        }
        self.apply_axis(
            &mut p.y,
            &mut p.vy,
            sim.min_y(),
            sim.max_y(),
            walls.min_y,
            walls.max_y,
        )
    }

    fn apply_axis(
        self,
        pos: &mut f64,
        vel: &mut f64,
        min: f64,
        max: f64,
        wall_min: bool,
        wall_max: bool,
    ) -> BoundaryOutcome {
        let below = *pos < min && wall_min;
        let above = *pos >= max && wall_max;
        if !below && !above {
            return BoundaryOutcome::Kept;
        }
        match self {
            ParticleBoundaryKind::Absorbing => return BoundaryOutcome::Removed,
            ParticleBoundaryKind::Hardwall => {
                *pos = if below { 2.0 * min - *pos } else { 2.0 * max - *pos };
                *vel = -*vel;
            }
            ParticleBoundaryKind::Periodic => {
                let width = max - min;
                *pos = if below { *pos + width } else { *pos - width };
            }
        }
        *pos = clamp_half_open(*pos, min, max);
        BoundaryOutcome::Kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picnic_core::ParticleId;

    fn sim() -> DoubleBox {
        DoubleBox::new(0.0, 10.0, 0.0, 5.0).unwrap()
    }

    fn at(x: f64, y: f64) -> Particle {
        Particle::new(ParticleId(0), x, y, 1.0, -1.0, 1.0, 1.0)
    }

    #[test]
    fn hardwall_reflects_position_and_velocity() {
        let mut p = at(10.5, 2.0);
        let out = ParticleBoundaryKind::Hardwall.apply(&mut p, &sim(), Walls::ALL);
        assert_eq!(out, BoundaryOutcome::Kept);
        assert_eq!(p.x, 9.5);
        assert_eq!(p.vx, -1.0);
        assert_eq!(p.vy, -1.0);
    }

    #[test]
    fn periodic_wraps() {
        let mut p = at(-0.25, 5.5);
        ParticleBoundaryKind::Periodic.apply(&mut p, &sim(), Walls::ALL);
        assert_eq!(p.x, 9.75);
        assert_eq!(p.y, 0.5);
        assert_eq!(p.vx, 1.0);
    }

    #[test]
    fn absorbing_removes() {
        let mut p = at(3.0, -0.1);
        assert_eq!(
            ParticleBoundaryKind::Absorbing.apply(&mut p, &sim(), Walls::ALL),
            BoundaryOutcome::Removed
        );
    }

    #[test]
    fn sides_without_wall_are_ignored() {
        let mut p = at(10.5, 2.0);
        let walls = Walls {
            max_x: false,
            ..Walls::ALL
        };
        let out = ParticleBoundaryKind::Absorbing.apply(&mut p, &sim(), walls);
        assert_eq!(out, BoundaryOutcome::Kept);
        assert_eq!(p.x, 10.5);
    }

    #[test]
    fn reflection_exactly_on_edge_is_clamped() {
        let mut p = at(10.0, 1.0);
        ParticleBoundaryKind::Hardwall.apply(&mut p, &sim(), Walls::ALL);
        assert!(p.x < 10.0 && p.x > 9.99);
    }

    #[test]
    fn clamp_handles_nan() {
        assert_eq!(clamp_half_open(f64::NAN, 0.0, 1.0), 0.0);
        assert!(clamp_half_open(1.0, 0.0, 1.0) < 1.0);
    }

    #[test]
    fn topology_follows_kind() {
        assert_eq!(ParticleBoundaryKind::Periodic.topology(), Topology::Periodic);
        assert_eq!(ParticleBoundaryKind::Hardwall.topology(), Topology::Bounded);
        assert_eq!(ParticleBoundaryKind::Absorbing.topology(), Topology::Bounded);
    }
}
