//! Global edge behavior of the partition layout.

/// How the global simulation box treats its edges.
///
/// This decides whether partitions on the physical edge have neighbors
/// across it. It is distinct from the particle boundary condition, which
/// decides what happens to a particle at a physical edge; several
/// boundary conditions share the [`Topology::Bounded`] layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Topology {
    /// Opposite edges are glued together (torus).
    Periodic,
    /// Edges are physical walls; edge partitions have fewer neighbors.
    Bounded,
}

impl Topology {
    /// Resolve a cell index along one axis of length `len`.
    ///
    /// Returns `None` for an out-of-range index under [`Topology::Bounded`].
    pub fn resolve_axis(self, val: i32, len: i32) -> Option<i32> {
        if val >= 0 && val < len {
            return Some(val);
        }
        match self {
            Topology::Bounded => None,
            Topology::Periodic => Some(val.rem_euclid(len)),
        }
    }
}
