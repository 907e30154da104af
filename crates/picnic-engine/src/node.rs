//! One node of a distributed run, from problem to result.
//!
//! Every node runs a worker. Node 0 additionally acts as master: it
//! distributes the global problem before its worker starts and gathers
//! every result (its own included) after its worker finished.

use std::sync::Arc;

use picnic_core::{ConfigError, NodeError, NodeId, Particle};
use picnic_space::Grid;

use crate::codec::encode_result;
use crate::config::DistributedConfig;
use crate::master::{self, Assembled};
use crate::metrics::ExchangeMetrics;
use crate::transport::{send, NodeLinks};
use crate::worker::{receive_problem, Worker, WorkerState};

/// The global initial state, handed to the master node.
#[derive(Clone, Debug, PartialEq)]
pub struct GlobalProblem {
    /// Particles in global coordinates.
    pub particles: Vec<Particle>,
    /// The global grid including its halo.
    pub grid: Grid,
}

/// What a node returns when it finishes.
#[derive(Debug)]
pub struct NodeOutcome {
    /// The node.
    pub node: NodeId,
    /// Its exchange metrics.
    pub metrics: ExchangeMetrics,
    /// The gathered result; present on the master only.
    pub assembled: Option<Assembled>,
}

/// A node bound to its links.
#[derive(Debug)]
pub struct Node {
    links: NodeLinks,
    config: DistributedConfig,
}

impl Node {
    /// A node using `links` and `config`.
    pub fn new(links: NodeLinks, config: DistributedConfig) -> Self {
        Self { links, config }
    }

    /// This node's id.
    pub fn id(&self) -> NodeId {
        self.links.node
    }

    /// Run to completion. The master node needs the global problem.
    ///
    /// On any error before the channel setup completed, the setup barrier
    /// is aborted so that the other nodes fail fast as well.
    pub fn run(self, problem: Option<GlobalProblem>) -> Result<NodeOutcome, NodeError> {
        let registry = Arc::clone(&self.links.registry);
        let node = self.links.node;
        let result = self.run_inner(problem);
        if let Err(e) = &result {
            tracing::error!("node {node}: {e}");
            registry.abort();
        }
        result
    }

    fn run_inner(self, problem: Option<GlobalProblem>) -> Result<NodeOutcome, NodeError> {
        let NodeLinks {
            node,
            registry,
            problem: problem_rx,
            result: result_tx,
            master: master_links,
        } = self.links;
        let config = self.config;
        tracing::debug!("node {node}: {}", WorkerState::Idle);

        let mastering = match master_links {
            Some(mut links) => {
                let GlobalProblem { particles, grid } =
                    problem.ok_or(ConfigError::MissingProblem)?;
                let parts = master::distribute_over(&config, &mut links, particles, &grid)?;
                Some((links.results, parts))
            }
            None => None,
        };

        tracing::debug!("node {node}: {}", WorkerState::AwaitingProblem);
        let local = receive_problem(node, &problem_rx, config.gather_timeout)?;
        drop(problem_rx);
        let mut worker = Worker::connect(node, local, &config, &registry)?;
        worker.run()?;
        let (result, metrics) = worker.finish()?;
        send(&result_tx, encode_result(&result)?, "result channel")?;
        drop(result_tx);

        let assembled = match mastering {
            Some((results, parts)) => Some(master::gather(
                &config,
                &results,
                &parts,
                config.gather_timeout,
            )?),
            None => None,
        };
        Ok(NodeOutcome {
            node,
            metrics,
            assembled,
        })
    }
}
