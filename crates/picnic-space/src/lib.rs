//! Spatial decomposition for picnic simulations.
//!
//! This crate owns everything that can be derived from geometry alone,
//! without any communication:
//!
//! - [`partition`]: power-of-two bisection of the global grid and the
//!   partition-to-node assignment seam
//! - [`regions`]: the coarse ([`BoundaryRegions`]) and fine
//!   ([`BorderRegions`]) point classifiers
//! - [`neighbors`]: which node sits in each [`Direction`](picnic_core::Direction)
//!   of a partition, and which directions each region is routed to
//! - [`grid`]: the cell grid with its one-cell halo

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod grid;
pub mod neighbors;
pub mod partition;
pub mod regions;
pub mod topology;

#[cfg(test)]
pub(crate) mod compliance;

pub use grid::Grid;
pub use neighbors::{Neighbor, NeighborMap};
pub use partition::{
    partition, BisectionPartitioner, IdentityAssigner, PartitionAssigner, Partitioner,
};
pub use regions::{BorderRegions, BoundaryRegions, Bucket, RegionId};
pub use topology::Topology;
