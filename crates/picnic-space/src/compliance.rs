//! Layout compliance test helpers.
//!
//! These functions verify the invariants every partition layout and
//! neighbor map must satisfy. Reused across the partition, region and
//! neighbor test modules.

use picnic_core::{Direction, IntBox, NodeId};

use crate::neighbors::NeighborMap;

/// Assert that `parts` are distinct, pairwise disjoint, and tile
/// `[0, cells_x) x [0, cells_y)` exactly.
pub fn assert_valid_partitioning(parts: &[IntBox], cells_x: usize, cells_y: usize) {
    for (i, a) in parts.iter().enumerate() {
        for b in &parts[i + 1..] {
            assert_ne!(a, b, "duplicate partition {a}");
            assert!(!a.intersects(b), "partitions {a} and {b} overlap");
        }
    }
    let covered: usize = parts.iter().map(IntBox::area).sum();
    assert_eq!(covered, cells_x * cells_y, "partitions leave gaps");
    let bounds = parts
        .iter()
        .skip(1)
        .fold(parts[0], |acc, p| acc.union(p));
    assert_eq!(
        bounds,
        IntBox::new(0, cells_x as i32, 0, cells_y as i32).unwrap(),
        "partitions do not span the grid"
    );
}

/// Assert that whenever `a` sees `b` in direction `d`, `b` sees `a` in
/// the opposite direction.
pub fn assert_neighbors_symmetric(maps: &[NeighborMap]) {
    for (i, map) in maps.iter().enumerate() {
        for d in Direction::ALL {
            if let Some(nb) = map.neighbor(d) {
                let back = maps[nb.index()].neighbor(d.opposite());
                assert_eq!(
                    back,
                    Some(NodeId(i as u32)),
                    "node {i} sees {nb} in {d} but not the reverse"
                );
            }
        }
    }
}
