//! The worker side of a node: receive a problem, step, report.
//!
//! A worker moves through [`WorkerState`]:
//!
//! ```text
//!   Idle ──▶ AwaitingProblem ──▶ Ready ──▶ Stepping ──▶ Finished
//! ```
//!
//! One step interleaves the local phases with the exchange:
//!
//! 1. push, then the boundary and border gates (leaving and border
//!    particles are registered with the manager);
//! 2. reset sources, start the particle exchange, deposit the local
//!    particles, then the arriving and the ghost particles as they come
//!    in; arriving particles join the local list;
//! 3. field solve over every stored cell;
//! 4. send border cells, gather inside the zone of local influence, wait
//!    for ghost cells, gather the rest;
//! 5. clean up both exchanges.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use picnic_core::{CommunicationError, ConfigError, NodeError, NodeId, Particle};
use picnic_physics::boundary::clamp_into;
use picnic_physics::{phases, SimulationSettings, WorkerPool};
use picnic_space::{Grid, NeighborMap};

use crate::codec::decode_problem;
use crate::config::DistributedConfig;
use crate::gates::{Gate, Gates};
use crate::manager::SharedDataManager;
use crate::messages::{ProblemMessage, ResultMessage};
use crate::metrics::ExchangeMetrics;
use crate::transport::{Frame, Registry};

/// Lifecycle of a worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    /// Created, nothing received.
    Idle,
    /// Waiting for the master's problem.
    AwaitingProblem,
    /// Problem received and channels connected.
    Ready,
    /// Running steps.
    Stepping,
    /// All steps done; the result can be taken.
    Finished,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkerState::Idle => "idle",
            WorkerState::AwaitingProblem => "awaiting problem",
            WorkerState::Ready => "ready",
            WorkerState::Stepping => "stepping",
            WorkerState::Finished => "finished",
        };
        f.write_str(s)
    }
}

/// Block for the master's problem frame.
pub fn receive_problem(
    node: NodeId,
    problem: &Receiver<Frame>,
    timeout: Duration,
) -> Result<ProblemMessage, NodeError> {
    let frame = problem.recv_timeout(timeout).map_err(|e| match e {
        RecvTimeoutError::Timeout => CommunicationError::Timeout {
            waiting_for: format!("problem for node {node}"),
            elapsed_ms: timeout.as_millis() as u64,
        },
        RecvTimeoutError::Disconnected => CommunicationError::Disconnected {
            channel: format!("problem channel of node {node}"),
        },
    })?;
    Ok(decode_problem(&frame)?)
}

/// One node's share of the simulation.
#[derive(Debug)]
pub struct Worker {
    node: NodeId,
    state: WorkerState,
    settings: SimulationSettings,
    pool: WorkerPool,
    manager: SharedDataManager,
    particles: Vec<Particle>,
    grid: Grid,
    metrics: ExchangeMetrics,
    steps: usize,
}

impl Worker {
    /// Build the worker from its problem and connect its channels.
    ///
    /// Checks the problem against the configuration, clamps the particles
    /// into the partition and runs the two-phase channel setup.
    pub fn connect(
        node: NodeId,
        problem: ProblemMessage,
        config: &DistributedConfig,
        registry: &Registry,
    ) -> Result<Self, NodeError> {
        let ProblemMessage {
            partitions,
            mut particles,
            cells,
        } = problem;
        if partitions.len() != config.nodes {
            return Err(ConfigError::PartitionCountMismatch {
                partitions: partitions.len(),
                nodes: config.nodes,
            }
            .into());
        }
        let own = *partitions
            .get(node.index())
            .ok_or(ConfigError::UnknownNode { node })?;
        let settings = config.settings.local(&own);
        if cells.cells_x() != own.width() || cells.cells_y() != own.height() {
            return Err(ConfigError::CellCountMismatch {
                name: "problem cells",
                expected: own.area(),
                found: (cells.cells_x() * cells.cells_y()) as usize,
            }
            .into());
        }
        if let Some(p) = particles
            .iter()
            .find(|p| !(p.mass.is_finite() && p.mass > 0.0))
        {
            return Err(ConfigError::InvalidMass { particle: p.id }.into());
        }

        let map = NeighborMap::new(node, &partitions, settings.topology())?;
        let gates = Gates::new(map, &settings)?;
        for p in &mut particles {
            clamp_into(p, gates.local_box());
        }
        let manager =
            SharedDataManager::connect(registry, gates, &cells, config.exchange_timeout)?;
        tracing::info!(
            "worker {node}: partition {:?}, {} particles, {} channels",
            own,
            particles.len(),
            manager.channel_count()
        );

        let mut worker = Self {
            node,
            state: WorkerState::AwaitingProblem,
            pool: settings.pool(),
            settings,
            manager,
            particles,
            grid: cells,
            metrics: ExchangeMetrics::default(),
            steps: 0,
        };
        worker.transition(WorkerState::Ready);
        Ok(worker)
    }

    fn transition(&mut self, next: WorkerState) {
        tracing::debug!("worker {}: {} -> {}", self.node, self.state, next);
        self.state = next;
    }

    /// Current state.
    pub fn state(&self) -> WorkerState {
        self.state
    }

    /// Particles currently owned, in partition-local coordinates.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// The local grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Metrics gathered so far.
    pub fn metrics(&self) -> &ExchangeMetrics {
        &self.metrics
    }

    /// Run the configured number of steps, preparing the solver before
    /// the first and completing it after the last.
    pub fn run(&mut self) -> Result<(), NodeError> {
        let s = &self.settings;
        phases::prepare_particles(&self.pool, &mut self.particles, s.solver, &s.force, s.time_step);
        self.transition(WorkerState::Stepping);
        for _ in 0..self.settings.iterations {
            self.step()?;
        }
        let s = &self.settings;
        phases::complete_particles(&self.pool, &mut self.particles, s.solver, &s.force, s.time_step);
        self.transition(WorkerState::Finished);
        tracing::info!(
            "worker {}: {} steps done, {} particles, waited {}us",
            self.node,
            self.steps,
            self.particles.len(),
            self.metrics.total_wait_us()
        );
        Ok(())
    }

    fn apply_gates(&mut self) -> Result<(), NodeError> {
        let gates = self.manager.gates();
        let mut kept = Vec::with_capacity(self.particles.len());
        for mut p in self.particles.drain(..) {
            match gates.boundary_gate(&mut p) {
                Gate::Kept => {
                    self.manager.register_border_copies(&p);
                    kept.push(p);
                }
                Gate::Leaving(d) => self.manager.register_leaving_particle(d, p)?,
                Gate::Removed => {}
            }
        }
        self.particles = kept;
        Ok(())
    }

    /// Advance by one step.
    pub fn step(&mut self) -> Result<(), NodeError> {
        let dt = self.settings.time_step;
        phases::push_particles(
            &self.pool,
            &mut self.particles,
            self.settings.solver,
            &self.settings.force,
            dt,
        );
        self.apply_gates()?;

        // Deposit.
        phases::reset_sources(&self.pool, &mut self.grid);
        self.manager.start_exchange_of_particles()?;
        phases::deposit_all(&mut self.grid, &self.particles);
        let arriving = self.manager.get_arriving_particles(&mut self.metrics)?;
        phases::deposit_all(&mut self.grid, &arriving);
        let ghosts = self.manager.get_ghost_particles(&mut self.metrics)?;
        phases::deposit_all(&mut self.grid, &ghosts);
        self.particles.extend(arriving);

        phases::solve_fields(&self.pool, &mut self.grid, self.settings.field_solver, dt);

        // Gather.
        self.manager.exchange_cells(&self.grid, &mut self.metrics)?;
        let gates = self.manager.gates();
        let early = phases::gather_where(&self.pool, &self.grid, &mut self.particles, |p| {
            gates.in_zone_of_local_influence(p)
        });
        self.manager
            .wait_for_ghost_cells(&mut self.grid, &mut self.metrics)?;
        let gates = self.manager.gates();
        phases::gather_where(&self.pool, &self.grid, &mut self.particles, |p| {
            !gates.in_zone_of_local_influence(p)
        });

        self.manager
            .clean_up_particle_communication(&mut self.metrics)?;
        self.manager.clean_up_cell_communication(&mut self.metrics)?;
        self.steps += 1;
        self.metrics.steps += 1;
        tracing::trace!(
            "worker {}: step {} done, {} particles ({} gathered before ghost cells)",
            self.node,
            self.steps,
            self.particles.len(),
            early
        );
        Ok(())
    }

    /// Close the channels and produce the result for the master.
    pub fn finish(self) -> Result<(ResultMessage, ExchangeMetrics), NodeError> {
        self.manager.shutdown()?;
        Ok((
            ResultMessage {
                worker: self.node,
                particles: self.particles,
                cells: self.grid,
            },
            self.metrics,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picnic_core::ParticleId;

    #[test]
    fn state_names() {
        assert_eq!(WorkerState::AwaitingProblem.to_string(), "awaiting problem");
        assert_eq!(WorkerState::Finished.to_string(), "finished");
    }

    #[test]
    fn missing_problem_times_out() {
        let (_tx, rx) = crossbeam_channel::bounded::<Frame>(1);
        let err = receive_problem(NodeId(1), &rx, Duration::from_millis(10)).unwrap_err();
        assert!(matches!(
            err,
            NodeError::Communication(CommunicationError::Timeout { .. })
        ));
    }

    #[test]
    fn closed_problem_channel_is_a_disconnect() {
        let (tx, rx) = crossbeam_channel::bounded::<Frame>(1);
        drop(tx);
        let err = receive_problem(NodeId(1), &rx, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(
            err,
            NodeError::Communication(CommunicationError::Disconnected { .. })
        ));
    }

    #[test]
    fn single_node_worker_runs() {
        let config = DistributedConfig::new(
            1,
            SimulationSettings::hardwall()
                .with_cells(8, 8)
                .with_iterations(5),
        );
        let particles = vec![
            Particle::new(ParticleId(1), 3.3, 4.1, 0.4, -0.2, 1.0, 1.0),
            Particle::new(ParticleId(2), 7.9, 0.1, 1.0, -1.0, 1.0, -1.0),
        ];
        let problem = ProblemMessage {
            partitions: config.partitions().unwrap(),
            particles,
            cells: Grid::new(8, 8, 1.0, 1.0).unwrap(),
        };
        let registry = Registry::new(1);
        let mut w = Worker::connect(NodeId(0), problem, &config, &registry).unwrap();
        assert_eq!(w.state(), WorkerState::Ready);
        w.run().unwrap();
        assert_eq!(w.state(), WorkerState::Finished);
        assert_eq!(w.metrics().steps, 5);
        let (result, metrics) = w.finish().unwrap();
        assert_eq!(result.worker, NodeId(0));
        assert_eq!(result.particles.len(), 2);
        assert_eq!(metrics.particles_sent, 0);
    }

    #[test]
    fn wrong_partition_count_is_rejected() {
        let config = DistributedConfig::new(2, SimulationSettings::default().with_cells(8, 8));
        let problem = ProblemMessage {
            partitions: vec![picnic_core::IntBox::new(0, 8, 0, 8).unwrap()],
            particles: Vec::new(),
            cells: Grid::new(8, 8, 1.0, 1.0).unwrap(),
        };
        let registry = Registry::new(1);
        assert!(matches!(
            Worker::connect(NodeId(0), problem, &config, &registry),
            Err(NodeError::Config(ConfigError::PartitionCountMismatch { .. }))
        ));
    }
}
