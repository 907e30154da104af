//! Partitioning of the global grid and assignment of partitions to nodes.
//!
//! The [`BisectionPartitioner`] repeatedly halves every box along its
//! longer axis (ties go to X). With power-of-two inputs every cut is exact,
//! all partitions end up the same size, and they tile the grid as a
//! regular lattice. Later stages rely on that regularity: ghost-cell
//! indexes are computed from the local cell counts, which therefore must
//! agree between neighbors.

use picnic_core::{ConfigError, IntBox, NodeId};

/// Splits the global grid into a fixed number of boxes.
pub trait Partitioner {
    /// Split `[0, cells_x) x [0, cells_y)` into `partitions` boxes.
    fn partition(
        &self,
        cells_x: usize,
        cells_y: usize,
        partitions: usize,
    ) -> Result<Vec<IntBox>, ConfigError>;
}

/// Maps partitions to the nodes that simulate them.
pub trait PartitionAssigner {
    /// Return the node for each partition, in partition order.
    fn assign(&self, partitions: &[IntBox], nodes: usize) -> Result<Vec<NodeId>, ConfigError>;
}

// ── BisectionPartitioner ────────────────────────────────────────

/// Longest-axis-first power-of-two bisection.
#[derive(Clone, Copy, Debug, Default)]
pub struct BisectionPartitioner;

fn require_power_of_two(name: &'static str, value: usize) -> Result<(), ConfigError> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(ConfigError::NotPowerOfTwo { name, value })
    }
}

fn to_i32(name: &'static str, value: usize) -> Result<i32, ConfigError> {
    i32::try_from(value).map_err(|_| ConfigError::CountTooLarge {
        name,
        value,
        maximum: i32::MAX as usize,
    })
}

/// Split `b` into two equal halves along its longer axis.
fn bisect(b: &IntBox) -> Result<[IntBox; 2], ConfigError> {
    if b.width() >= b.height() {
        let mid = b.min_x() + b.width() / 2;
        Ok([
            IntBox::new(b.min_x(), mid, b.min_y(), b.max_y())?,
            IntBox::new(mid, b.max_x(), b.min_y(), b.max_y())?,
        ])
    } else {
        let mid = b.min_y() + b.height() / 2;
        Ok([
            IntBox::new(b.min_x(), b.max_x(), b.min_y(), mid)?,
            IntBox::new(b.min_x(), b.max_x(), mid, b.max_y())?,
        ])
    }
}

impl Partitioner for BisectionPartitioner {
    fn partition(
        &self,
        cells_x: usize,
        cells_y: usize,
        partitions: usize,
    ) -> Result<Vec<IntBox>, ConfigError> {
        require_power_of_two("cells_x", cells_x)?;
        require_power_of_two("cells_y", cells_y)?;
        require_power_of_two("partitions", partitions)?;
        let cells = cells_x.saturating_mul(cells_y);
        if partitions > cells {
            return Err(ConfigError::TooManyPartitions { partitions, cells });
        }

        let mut boxes = vec![IntBox::new(
            0,
            to_i32("cells_x", cells_x)?,
            0,
            to_i32("cells_y", cells_y)?,
        )?];
        while boxes.len() < partitions {
            let mut next = Vec::with_capacity(boxes.len() * 2);
            for b in &boxes {
                next.extend(bisect(b)?);
            }
            boxes = next;
        }
        tracing::debug!(
            "partitioned {}x{} cells into {} boxes of {}x{}",
            cells_x,
            cells_y,
            boxes.len(),
            boxes[0].width(),
            boxes[0].height()
        );
        Ok(boxes)
    }
}

/// Partition with the default [`BisectionPartitioner`].
pub fn partition(
    cells_x: usize,
    cells_y: usize,
    partitions: usize,
) -> Result<Vec<IntBox>, ConfigError> {
    BisectionPartitioner.partition(cells_x, cells_y, partitions)
}

// ── IdentityAssigner ────────────────────────────────────────────

/// Assigns partition `i` to node `i`.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityAssigner;

impl PartitionAssigner for IdentityAssigner {
    fn assign(&self, partitions: &[IntBox], nodes: usize) -> Result<Vec<NodeId>, ConfigError> {
        if partitions.len() != nodes {
            return Err(ConfigError::PartitionCountMismatch {
                partitions: partitions.len(),
                nodes,
            });
        }
        Ok((0..nodes as u32).map(NodeId).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::assert_valid_partitioning;
    use proptest::prelude::*;

    #[test]
    fn sixty_four_by_thirty_two_into_sixteen() {
        let parts = partition(64, 32, 16).unwrap();
        assert_eq!(parts.len(), 16);
        assert_valid_partitioning(&parts, 64, 32);
        assert_eq!(parts.iter().map(|b| b.min_x()).min(), Some(0));
        assert_eq!(parts.iter().map(|b| b.max_x()).max(), Some(64));
        assert_eq!(parts.iter().map(|b| b.min_y()).min(), Some(0));
        assert_eq!(parts.iter().map(|b| b.max_y()).max(), Some(32));
        for p in &parts {
            assert_eq!((p.width(), p.height()), (16, 8));
        }
    }

    #[test]
    fn ties_split_along_x() {
        let parts = partition(8, 8, 2).unwrap();
        assert_eq!(parts[0], IntBox::new(0, 4, 0, 8).unwrap());
        assert_eq!(parts[1], IntBox::new(4, 8, 0, 8).unwrap());
    }

    #[test]
    fn tall_grid_splits_along_y() {
        let parts = partition(4, 16, 2).unwrap();
        assert_eq!(parts[0], IntBox::new(0, 4, 0, 8).unwrap());
        assert_eq!(parts[1], IntBox::new(0, 4, 8, 16).unwrap());
    }

    #[test]
    fn single_partition_is_whole_grid() {
        let parts = partition(16, 4, 1).unwrap();
        assert_eq!(parts, vec![IntBox::new(0, 16, 0, 4).unwrap()]);
    }

    #[test]
    fn one_cell_per_partition() {
        let parts = partition(4, 2, 8).unwrap();
        assert_valid_partitioning(&parts, 4, 2);
        assert!(parts.iter().all(|p| p.area() == 1));
    }

    #[test]
    fn rejects_non_power_of_two() {
        assert_eq!(
            partition(12, 8, 2),
            Err(ConfigError::NotPowerOfTwo {
                name: "cells_x",
                value: 12
            })
        );
        assert!(partition(8, 8, 3).is_err());
        assert!(partition(8, 0, 1).is_err());
    }

    #[test]
    fn rejects_counts_beyond_cell_coordinates() {
        assert_eq!(
            partition(1 << 31, 1, 1),
            Err(ConfigError::CountTooLarge {
                name: "cells_x",
                value: 1 << 31,
                maximum: i32::MAX as usize,
            })
        );
    }

    #[test]
    fn rejects_more_partitions_than_cells() {
        assert_eq!(
            partition(2, 2, 8),
            Err(ConfigError::TooManyPartitions {
                partitions: 8,
                cells: 4
            })
        );
    }

    #[test]
    fn identity_assignment() {
        let parts = partition(8, 8, 4).unwrap();
        let nodes = IdentityAssigner.assign(&parts, 4).unwrap();
        assert_eq!(nodes, vec![NodeId(0), NodeId(1), NodeId(2), NodeId(3)]);
    }

    #[test]
    fn assignment_count_mismatch() {
        let parts = partition(8, 8, 4).unwrap();
        assert_eq!(
            IdentityAssigner.assign(&parts, 2),
            Err(ConfigError::PartitionCountMismatch {
                partitions: 4,
                nodes: 2
            })
        );
    }

    proptest! {
        #[test]
        fn partitions_cover_grid(ex in 0u32..7, ey in 0u32..7, ep in 0u32..12) {
            let cx = 1usize << ex;
            let cy = 1usize << ey;
            let n = 1usize << ep;
            prop_assume!(n <= cx * cy);
            let parts = partition(cx, cy, n).unwrap();
            prop_assert_eq!(parts.len(), n);
            assert_valid_partitioning(&parts, cx, cy);
        }
    }
}
