//! Neighbor discovery and region routing for one partition.
//!
//! [`NeighborMap`] answers two questions for a node:
//!
//! - which node sits in each of the eight [`Direction`]s, and
//! - which of those directions a classified point must be sent to.
//!
//! Neighbors are found by stepping one partition size from the node's own
//! box and looking up the partition that contains the resulting cell,
//! wrapping around the global box under [`Topology::Periodic`]. Under
//! periodic topology a node can be its own neighbor, and the same node can
//! appear in several directions.

use smallvec::SmallVec;

use picnic_core::{ConfigError, Direction, IntBox, NodeId};

use crate::regions::{BorderRegions, BoundaryRegions, Bucket, RegionId};
use crate::topology::Topology;

/// Directions a single region is routed to; at most three.
pub type Route = SmallVec<[Direction; 3]>;

/// A remote node together with the direction it lies in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Neighbor {
    /// The remote node.
    pub node: NodeId,
    /// Direction of the remote node as seen from the local node.
    pub direction: Direction,
}

/// Per-node neighbor table and region routing.
#[derive(Clone, Debug)]
pub struct NeighborMap {
    node: NodeId,
    topology: Topology,
    partition: IntBox,
    neighbors: [Option<NodeId>; 8],
    routes: Vec<Route>,
}

impl NeighborMap {
    /// Build the map for `node` in the given layout.
    ///
    /// All partitions must share one size. Under periodic topology every
    /// direction must resolve to a partition.
    pub fn new(
        node: NodeId,
        partitions: &[IntBox],
        topology: Topology,
    ) -> Result<Self, ConfigError> {
        let own = *partitions
            .get(node.index())
            .ok_or(ConfigError::UnknownNode { node })?;
        if partitions
            .iter()
            .any(|p| p.width() != own.width() || p.height() != own.height())
        {
            return Err(ConfigError::UnevenPartitions);
        }
        let global = partitions.iter().fold(own, |acc, p| acc.union(p));

        let mut neighbors = [None; 8];
        for d in Direction::ALL {
            let x = own.min_x() + d.dx() * own.width() - global.min_x();
            let y = own.min_y() + d.dy() * own.height() - global.min_y();
            let found = match (
                topology.resolve_axis(x, global.width()),
                topology.resolve_axis(y, global.height()),
            ) {
                (Some(x), Some(y)) => partitions
                    .iter()
                    .position(|p| p.contains(x + global.min_x(), y + global.min_y()))
                    .map(|i| NodeId(i as u32)),
                _ => None,
            };
            if found.is_none() && topology == Topology::Periodic {
                return Err(ConfigError::MissingNeighbor { direction: d });
            }
            neighbors[d.index()] = found;
        }

        let mut map = Self {
            node,
            topology,
            partition: own,
            neighbors,
            routes: Vec::with_capacity(BorderRegions::COUNT),
        };
        map.routes = (0..BorderRegions::COUNT as u8)
            .map(|r| map.compute_route(RegionId(r)))
            .collect();
        Ok(map)
    }

    /// The local node.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The layout topology.
    pub fn topology(&self) -> Topology {
        self.topology
    }

    /// The local partition in global cell coordinates.
    pub fn partition(&self) -> &IntBox {
        &self.partition
    }

    /// The node in direction `d`, if any.
    pub fn neighbor(&self, d: Direction) -> Option<NodeId> {
        self.neighbors[d.index()]
    }

    /// Every existing neighbor, in [`Direction::ALL`] order.
    pub fn neighbors(&self) -> impl Iterator<Item = Neighbor> + '_ {
        Direction::ALL.into_iter().filter_map(move |d| {
            self.neighbor(d).map(|node| Neighbor { node, direction: d })
        })
    }

    /// Whether the partition touches the physical edge on the side `d`
    /// points to. Always false under periodic topology.
    pub fn is_physical_edge(&self, d: Direction) -> bool {
        self.neighbor(d).is_none()
    }

    /// Neighbor that receives a particle which left the partition into
    /// the given [`BoundaryRegions`] region. `None` means the particle
    /// crossed a physical edge.
    pub fn boundary_neighbor(&self, region: RegionId) -> Option<Neighbor> {
        let direction = BoundaryRegions::direction(region)?;
        self.neighbor(direction)
            .map(|node| Neighbor { node, direction })
    }

    /// Directions a point in the given [`BorderRegions`] region must be
    /// mirrored to.
    ///
    /// Border corners route to the diagonal neighbor first, then the y
    /// edge neighbor, then the x edge neighbor, skipping absent ones.
    /// Outside corners route to the adjacent edge neighbor only when the
    /// true corner neighbor is absent.
    pub fn route(&self, region: RegionId) -> &[Direction] {
        self.routes
            .get(usize::from(region.0))
            .map(|r| r.as_slice())
            .unwrap_or(&[])
    }

    fn push_existing(&self, route: &mut Route, dx: i32, dy: i32) {
        if let Some(d) = Direction::new(dx, dy) {
            if self.neighbor(d).is_some() {
                route.push(d);
            }
        }
    }

    fn compute_route(&self, region: RegionId) -> Route {
        let mut route = Route::new();
        let Some((bx, by)) = BorderRegions::decompose(region) else {
            return route;
        };
        let (sx, sy) = (bx.side(), by.side());
        let inside = |b: Bucket| !b.is_outside();

        if inside(bx) && inside(by) {
            if bx.is_border() && by.is_border() {
                self.push_existing(&mut route, sx, sy);
                self.push_existing(&mut route, 0, sy);
                self.push_existing(&mut route, sx, 0);
            } else if bx.is_border() || by.is_border() {
                self.push_existing(&mut route, sx, sy);
            }
        } else if BorderRegions::is_outside_corner(region) {
            let corner_exists = Direction::new(sx, sy)
                .and_then(|d| self.neighbor(d))
                .is_some();
            if !corner_exists {
                if bx.is_outside() {
                    self.push_existing(&mut route, 0, sy);
                } else {
                    self.push_existing(&mut route, sx, 0);
                }
            }
        }
        route
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::assert_neighbors_symmetric;
    use crate::partition::partition;

    fn maps(cells_x: usize, cells_y: usize, n: usize, topology: Topology) -> Vec<NeighborMap> {
        let parts = partition(cells_x, cells_y, n).unwrap();
        (0..n as u32)
            .map(|i| NeighborMap::new(NodeId(i), &parts, topology).unwrap())
            .collect()
    }

    #[test]
    fn single_node_periodic_is_own_neighbor() {
        let m = &maps(8, 8, 1, Topology::Periodic)[0];
        assert_eq!(m.neighbors().count(), 8);
        assert!(m.neighbors().all(|n| n.node == NodeId(0)));
    }

    #[test]
    fn single_node_bounded_has_no_neighbors() {
        let m = &maps(8, 8, 1, Topology::Bounded)[0];
        assert_eq!(m.neighbors().count(), 0);
        for r in 0..25u8 {
            assert!(m.route(RegionId(r)).is_empty());
        }
    }

    #[test]
    fn two_by_two_bounded() {
        // Layout: 1 | 3 on top, 0 | 2 on the bottom row.
        let ms = maps(8, 8, 4, Topology::Bounded);
        assert_eq!(ms[0].neighbor(Direction::PLUS_X), Some(NodeId(2)));
        assert_eq!(ms[0].neighbor(Direction::PLUS_Y), Some(NodeId(1)));
        assert_eq!(ms[0].neighbor(Direction::PLUS_X_PLUS_Y), Some(NodeId(3)));
        assert_eq!(ms[0].neighbor(Direction::MINUS_X), None);
        assert_eq!(ms[0].neighbors().count(), 3);
        assert_neighbors_symmetric(&ms);
    }

    #[test]
    fn periodic_layouts_are_symmetric() {
        for n in [1, 2, 4, 8, 16] {
            assert_neighbors_symmetric(&maps(16, 16, n, Topology::Periodic));
            assert_neighbors_symmetric(&maps(16, 16, n, Topology::Bounded));
        }
    }

    #[test]
    fn border_corner_routes_diagonal_first() {
        let ms = maps(8, 8, 4, Topology::Bounded);
        let corner = BorderRegions::compose(Bucket::BorderMax, Bucket::BorderMax);
        assert_eq!(
            ms[0].route(corner),
            &[
                Direction::PLUS_X_PLUS_Y,
                Direction::PLUS_Y,
                Direction::PLUS_X
            ]
        );
        // Node 2 has no +x neighbor: only +y survives.
        assert_eq!(ms[2].route(corner), &[Direction::PLUS_Y]);
    }

    #[test]
    fn outside_corner_falls_back_to_edge_neighbor() {
        let ms = maps(8, 8, 4, Topology::Bounded);
        // Node 3 (top right): its halo column beyond +x has no corner
        // neighbor at (+1, -1), so the cell goes to the -y neighbor.
        let region = BorderRegions::compose(Bucket::BoundaryMax, Bucket::BorderMin);
        assert_eq!(ms[3].route(region), &[Direction::MINUS_Y]);
        // Node 1 (top left) has a (+1, -1) neighbor: nothing to send.
        assert!(ms[1].route(region).is_empty());
    }

    #[test]
    fn outside_corners_unused_when_periodic() {
        let ms = maps(8, 8, 4, Topology::Periodic);
        for m in &ms {
            for r in BorderRegions::outside_corners() {
                assert!(m.route(r).is_empty());
            }
        }
    }

    #[test]
    fn boundary_neighbor_none_at_physical_edge() {
        let ms = maps(8, 8, 2, Topology::Bounded);
        let right = BoundaryRegions::compose(1, 0);
        let left = BoundaryRegions::compose(-1, 0);
        assert_eq!(
            ms[0].boundary_neighbor(right),
            Some(Neighbor {
                node: NodeId(1),
                direction: Direction::PLUS_X
            })
        );
        assert_eq!(ms[0].boundary_neighbor(left), None);
        assert!(ms[0].is_physical_edge(Direction::MINUS_X));
        assert_eq!(ms[0].boundary_neighbor(BoundaryRegions::CENTER), None);
    }

    #[test]
    fn unknown_node_rejected() {
        let parts = partition(8, 8, 2).unwrap();
        assert_eq!(
            NeighborMap::new(NodeId(5), &parts, Topology::Bounded).unwrap_err(),
            ConfigError::UnknownNode { node: NodeId(5) }
        );
    }

    #[test]
    fn uneven_partitions_rejected() {
        let parts = vec![
            IntBox::new(0, 4, 0, 8).unwrap(),
            IntBox::new(4, 6, 0, 8).unwrap(),
        ];
        assert_eq!(
            NeighborMap::new(NodeId(0), &parts, Topology::Bounded).unwrap_err(),
            ConfigError::UnevenPartitions
        );
    }

    #[test]
    fn periodic_gap_is_missing_neighbor() {
        let parts = vec![
            IntBox::new(0, 4, 0, 4).unwrap(),
            IntBox::new(8, 12, 0, 4).unwrap(),
        ];
        assert!(matches!(
            NeighborMap::new(NodeId(0), &parts, Topology::Periodic),
            Err(ConfigError::MissingNeighbor { .. })
        ));
    }
}
