//! Configuration of a distributed run.
//!
//! [`DistributedConfig`] wraps the physics [`SimulationSettings`] with the
//! layout and communication parameters. [`validate()`](DistributedConfig::validate)
//! runs the partitioner once so that every layout problem surfaces at
//! startup, before any node thread exists.

use std::time::Duration;

use picnic_core::{ConfigError, IntBox};
use picnic_physics::SimulationSettings;
use picnic_space::partition;

/// Layout, timeouts and physics of a distributed run.
#[derive(Clone, Debug, PartialEq)]
pub struct DistributedConfig {
    /// Number of nodes (power of two). Default: 4.
    pub nodes: usize,
    /// How long the master waits for all results. Default: 60 s.
    pub gather_timeout: Duration,
    /// How long a node waits for any single exchange. Default: 30 s.
    pub exchange_timeout: Duration,
    /// Physics and grid.
    pub settings: SimulationSettings,
}

impl Default for DistributedConfig {
    fn default() -> Self {
        Self {
            nodes: 4,
            gather_timeout: Duration::from_secs(60),
            exchange_timeout: Duration::from_secs(30),
            settings: SimulationSettings::default(),
        }
    }
}

impl DistributedConfig {
    /// Config for `nodes` nodes with default timeouts.
    pub fn new(nodes: usize, settings: SimulationSettings) -> Self {
        Self {
            nodes,
            settings,
            ..Self::default()
        }
    }

    /// Smallest partition extent, in cells, on either axis.
    ///
    /// Border bands on opposite sides of a partition must not overlap, so
    /// a partition needs a center band between them.
    pub fn min_partition_cells(&self) -> usize {
        2 * self.settings.stencil_radius() as usize + 1
    }

    /// Compute the partition table.
    pub fn partitions(&self) -> Result<Vec<IntBox>, ConfigError> {
        partition(self.settings.cells_x, self.settings.cells_y, self.nodes)
    }

    /// Check every invariant that does not need a running node.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.settings.validate()?;
        if self.nodes == 0 {
            return Err(ConfigError::ZeroCount { name: "nodes" });
        }
        if self.gather_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                name: "gather_timeout",
            });
        }
        if self.exchange_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                name: "exchange_timeout",
            });
        }
        let minimum = self.min_partition_cells();
        let parts = self.partitions()?;
        if let Some(small) = parts
            .iter()
            .find(|p| (p.width() as usize) < minimum || (p.height() as usize) < minimum)
        {
            return Err(ConfigError::PartitionTooSmall {
                cells_x: small.width() as usize,
                cells_y: small.height() as usize,
                minimum,
            });
        }
        Ok(())
    }
}
