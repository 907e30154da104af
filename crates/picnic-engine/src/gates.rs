//! Boundary and border gates of one partition.
//!
//! After the push, every owned particle passes two gates, both working in
//! partition-local coordinates where the partition covers
//! `[0, LW) x [0, LH)`:
//!
//! - the **boundary gate** classifies the particle with
//!   [`BoundaryRegions`]. A particle that left toward an existing neighbor
//!   is translated into that neighbor's coordinates and handed over. A
//!   particle that crossed a physical edge gets the boundary condition,
//!   applied only on the physical sides, and is classified again; this
//!   repeats at most [`Gates::MAX_BOUNDARY_PASSES`] times before the
//!   position is clamped into the partition.
//! - the **border gate** classifies a kept particle with [`BorderRegions`]
//!   against the inner box `[0, LW - w) x [0, LH - h)`. Particles in a
//!   max-side band deposit into the neighbor's cells and are copied to
//!   every direction [`NeighborMap::route`] gives for their region.
//!
//! Particles arriving from a neighbor are [`settle`](Gates::settle)d: they
//! get the physical boundary condition and clamping but are never handed
//! on again within the same step.

use picnic_core::{ConfigError, Direction, DoubleBox, Particle};
use picnic_physics::boundary::{clamp_into, BoundaryOutcome, ParticleBoundaryKind, Walls};
use picnic_physics::SimulationSettings;
use picnic_space::{BorderRegions, BoundaryRegions, NeighborMap};

/// What the boundary gate decided for one particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gate {
    /// The particle stays on this node.
    Kept,
    /// The particle now belongs to the neighbor in this direction and has
    /// been translated into its coordinates.
    Leaving(Direction),
    /// The particle was absorbed.
    Removed,
}

/// Gate geometry of one partition.
#[derive(Clone, Debug)]
pub struct Gates {
    map: NeighborMap,
    boundary: ParticleBoundaryKind,
    local_box: DoubleBox,
    boundary_regions: BoundaryRegions,
    border_regions: BorderRegions,
    walls: Walls,
}

impl Gates {
    /// Boundary classification passes before a particle is clamped.
    pub const MAX_BOUNDARY_PASSES: usize = 3;

    /// Gates for the partition of `map`, using the partition-local
    /// `settings` (see [`SimulationSettings::local`]).
    pub fn new(map: NeighborMap, settings: &SimulationSettings) -> Result<Self, ConfigError> {
        let local_box = settings.simulation_box()?;
        let reach = f64::from(settings.stencil_radius());
        let inner = DoubleBox::new(
            local_box.min_x(),
            local_box.max_x() - reach * settings.cell_width,
            local_box.min_y(),
            local_box.max_y() - reach * settings.cell_height,
        )?;
        let border_regions = BorderRegions::new(local_box, inner)?;
        let walls = Walls {
            min_x: map.is_physical_edge(Direction::MINUS_X),
            max_x: map.is_physical_edge(Direction::PLUS_X),
            min_y: map.is_physical_edge(Direction::MINUS_Y),
            max_y: map.is_physical_edge(Direction::PLUS_Y),
        };
        Ok(Self {
            boundary: settings.boundary,
            boundary_regions: BoundaryRegions::new(local_box),
            border_regions,
            local_box,
            walls,
            map,
        })
    }

    /// The neighbor table the gates route with.
    pub fn neighbor_map(&self) -> &NeighborMap {
        &self.map
    }

    /// The partition in local coordinates.
    pub fn local_box(&self) -> &DoubleBox {
        &self.local_box
    }

    /// Which sides are physical walls.
    pub fn walls(&self) -> Walls {
        self.walls
    }

    /// Offset from local coordinates to those of the neighbor in `d`.
    pub fn translation(&self, d: Direction) -> (f64, f64) {
        (
            -f64::from(d.dx()) * self.local_box.width(),
            -f64::from(d.dy()) * self.local_box.height(),
        )
    }

    fn pass(&self, p: &mut Particle, hand_over: bool) -> Gate {
        for _ in 0..Self::MAX_BOUNDARY_PASSES {
            let region = self.boundary_regions.region(p.x, p.y);
            if region == BoundaryRegions::CENTER {
                return Gate::Kept;
            }
            if let Some(n) = self.map.boundary_neighbor(region) {
                if !hand_over {
                    break;
                }
                let (dx, dy) = self.translation(n.direction);
                p.translate(dx, dy);
                return Gate::Leaving(n.direction);
            }
            if self.boundary.apply(p, &self.local_box, self.walls) == BoundaryOutcome::Removed {
                return Gate::Removed;
            }
        }
        clamp_into(p, &self.local_box);
        Gate::Kept
    }

    /// Boundary gate for an owned particle after the push.
    pub fn boundary_gate(&self, p: &mut Particle) -> Gate {
        self.pass(p, true)
    }

    /// Boundary handling for a particle that just arrived from a
    /// neighbor. Never returns [`Gate::Leaving`].
    pub fn settle(&self, p: &mut Particle) -> Gate {
        self.pass(p, false)
    }

    /// Directions a kept particle must be copied to as a ghost.
    pub fn border_route(&self, p: &Particle) -> &[Direction] {
        self.map.route(self.border_regions.region(p.x, p.y))
    }

    /// Whether the particle's stencil reads owned cells only.
    pub fn in_zone_of_local_influence(&self, p: &Particle) -> bool {
        self.border_regions.region(p.x, p.y) == BorderRegions::CENTER
    }
}
