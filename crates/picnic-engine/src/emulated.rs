//! Run a whole distributed simulation inside one process.
//!
//! [`EmulatedEnvironment`] starts one named thread per node over the
//! in-process transport. Node 0 is master and worker. The call blocks
//! until every node thread has ended and returns the master's gathered
//! result together with every node's metrics.

use std::thread;

use picnic_core::{CommunicationError, NodeError, Particle};
use picnic_space::Grid;

use crate::config::DistributedConfig;
use crate::metrics::ExchangeMetrics;
use crate::node::{GlobalProblem, Node, NodeOutcome};
use crate::transport::in_process;

/// The outcome of an emulated run.
#[derive(Clone, Debug, PartialEq)]
pub struct EmulatedRun {
    /// Every surviving particle, in global coordinates.
    pub particles: Vec<Particle>,
    /// The global grid assembled from the workers' owned cells.
    pub grid: Grid,
    /// Per-node metrics, indexed by node.
    pub metrics: Vec<ExchangeMetrics>,
}

impl EmulatedRun {
    /// All nodes' metrics merged.
    pub fn total_metrics(&self) -> ExchangeMetrics {
        let mut total = ExchangeMetrics::default();
        for m in &self.metrics {
            total.merge(m);
        }
        total
    }
}

/// In-process distributed environment.
#[derive(Clone, Debug)]
pub struct EmulatedEnvironment {
    config: DistributedConfig,
}

/// Whether an error is only a consequence of another node's failure.
fn is_secondary(e: &NodeError) -> bool {
    matches!(
        e,
        NodeError::Communication(
            CommunicationError::Aborted
                | CommunicationError::Timeout { .. }
                | CommunicationError::Disconnected { .. }
                | CommunicationError::SendFailed { .. }
        )
    )
}

impl EmulatedEnvironment {
    /// An environment for `config`. The config is validated by
    /// [`run`](Self::run).
    pub fn new(config: DistributedConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &DistributedConfig {
        &self.config
    }

    /// Run the simulation of `particles` over `grid` on all nodes.
    ///
    /// When several nodes fail, the first root-cause error (not a
    /// timeout, disconnect or abort caused by another node) is returned.
    pub fn run(&self, particles: Vec<Particle>, grid: Grid) -> Result<EmulatedRun, NodeError> {
        self.config.validate()?;
        let nodes = self.config.nodes;
        tracing::info!(
            "emulated run: {nodes} nodes, {}x{} cells, {} particles",
            self.config.settings.cells_x,
            self.config.settings.cells_y,
            particles.len()
        );

        let mut problem = Some(GlobalProblem { particles, grid });
        let mut handles = Vec::with_capacity(nodes);
        for links in in_process(nodes) {
            let id = links.node;
            let node = Node::new(links, self.config.clone());
            let input = if id.index() == 0 { problem.take() } else { None };
            let name = format!("picnic-node-{id}");
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || node.run(input))
                .map_err(|e| CommunicationError::SpawnFailed {
                    thread: name.clone(),
                    reason: e.to_string(),
                })?;
            handles.push((name, handle));
        }

        let mut outcomes: Vec<NodeOutcome> = Vec::with_capacity(nodes);
        let mut errors: Vec<NodeError> = Vec::new();
        for (name, handle) in handles {
            match handle.join() {
                Ok(Ok(outcome)) => outcomes.push(outcome),
                Ok(Err(e)) => errors.push(e),
                Err(_) => errors.push(CommunicationError::ThreadPanicked { thread: name }.into()),
            }
        }
        if let Some(first) = errors.first() {
            let cause = errors
                .iter()
                .find(|e| !is_secondary(e))
                .unwrap_or(first)
                .clone();
            return Err(cause);
        }

        outcomes.sort_by_key(|o| o.node);
        let metrics = outcomes.iter().map(|o| o.metrics.clone()).collect();
        let assembled = outcomes
            .into_iter()
            .find_map(|o| o.assembled)
            .ok_or(CommunicationError::Disconnected {
                channel: "master result".to_string(),
            })?;
        Ok(EmulatedRun {
            particles: assembled.particles,
            grid: assembled.grid,
            metrics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picnic_core::{ConfigError, ParticleId};
    use picnic_physics::SimulationSettings;

    fn particles() -> Vec<Particle> {
        (0..16u64)
            .map(|i| {
                let x = 0.25 + (i % 4) as f64 * 2.0;
                let y = 0.75 + (i / 4) as f64 * 2.0;
                Particle::new(ParticleId(i), x, y, 0.3, -0.2, 1.0, 1.0)
            })
            .collect()
    }

    #[test]
    fn four_nodes_keep_every_particle() {
        let settings = SimulationSettings::hardwall()
            .with_cells(8, 8)
            .with_iterations(10);
        let env = EmulatedEnvironment::new(DistributedConfig::new(4, settings));
        let grid = Grid::new(8, 8, 1.0, 1.0).unwrap();
        let run = env.run(particles(), grid).unwrap();
        assert_eq!(run.particles.len(), 16);
        assert_eq!(run.metrics.len(), 4);
        assert!(run.metrics.iter().all(|m| m.steps == 10));
        assert!(run.total_metrics().cells_sent > 0);
        assert!(run
            .particles
            .iter()
            .all(|p| (0.0..8.0).contains(&p.x) && (0.0..8.0).contains(&p.y)));
    }

    #[test]
    fn invalid_config_fails_before_spawning() {
        let settings = SimulationSettings::default().with_cells(8, 8);
        let env = EmulatedEnvironment::new(DistributedConfig::new(16, settings));
        let grid = Grid::new(8, 8, 1.0, 1.0).unwrap();
        assert!(matches!(
            env.run(Vec::new(), grid),
            Err(NodeError::Config(ConfigError::PartitionTooSmall { .. }))
        ));
    }

    #[test]
    fn mismatched_grid_is_the_reported_cause() {
        let settings = SimulationSettings::default().with_cells(8, 8);
        let config = DistributedConfig {
            exchange_timeout: std::time::Duration::from_secs(2),
            gather_timeout: std::time::Duration::from_secs(2),
            ..DistributedConfig::new(2, settings)
        };
        let env = EmulatedEnvironment::new(config);
        let grid = Grid::new(16, 16, 1.0, 1.0).unwrap();
        assert!(matches!(
            env.run(Vec::new(), grid),
            Err(NodeError::Config(ConfigError::CellCountMismatch { .. }))
        ));
    }
}
