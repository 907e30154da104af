//! The master side of node 0: distribute the problem, gather the results.
//!
//! The master owns the global particle list and grid. It splits them by
//! partition, ships every worker its share in partition-local
//! coordinates, and later reassembles the workers' results in global
//! coordinates. Node 0 runs the master and a worker; the master sends all
//! problems before its own worker starts so that no worker waits on it.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use picnic_core::{CommunicationError, ConfigError, IntBox, NodeError, Particle, ProtocolError};
use picnic_physics::boundary::clamp_into;
use picnic_space::{Grid, IdentityAssigner, PartitionAssigner};

use crate::codec::{decode_result, encode_problem};
use crate::config::DistributedConfig;
use crate::messages::ProblemMessage;
use crate::transport::{send, Frame, MasterLinks};

/// The gathered outcome of a distributed run, in global coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Assembled {
    /// Every surviving particle, ordered by worker.
    pub particles: Vec<Particle>,
    /// The global grid; only owned cells are filled from the workers.
    pub grid: Grid,
}

/// Physical offset of a partition's origin.
fn origin(part: &IntBox, config: &DistributedConfig) -> (f64, f64) {
    (
        f64::from(part.min_x()) * config.settings.cell_width,
        f64::from(part.min_y()) * config.settings.cell_height,
    )
}

/// Index of the partition owning the cell a particle sits in.
fn owner(p: &Particle, parts: &[IntBox], config: &DistributedConfig) -> Option<usize> {
    let s = &config.settings;
    let cx = ((p.x / s.cell_width).floor() as i32).clamp(0, s.cells_x as i32 - 1);
    let cy = ((p.y / s.cell_height).floor() as i32).clamp(0, s.cells_y as i32 - 1);
    parts.iter().position(|b| b.contains(cx, cy))
}

/// Split particles and cells by partition and send every worker its
/// problem. Returns the partition table.
///
/// Particles outside the simulation box are clamped into it first. The
/// problem senders are closed on return.
pub fn distribute(
    config: &DistributedConfig,
    problems: Vec<Sender<Frame>>,
    mut particles: Vec<Particle>,
    grid: &Grid,
) -> Result<Vec<IntBox>, NodeError> {
    config.validate()?;
    let s = &config.settings;
    if grid.cells_x() as usize != s.cells_x || grid.cells_y() as usize != s.cells_y {
        return Err(ConfigError::CellCountMismatch {
            name: "global grid cells",
            expected: s.cells_x * s.cells_y,
            found: (grid.cells_x() * grid.cells_y()) as usize,
        }
        .into());
    }
    if let Some(p) = particles
        .iter()
        .find(|p| !(p.mass.is_finite() && p.mass > 0.0))
    {
        return Err(ConfigError::InvalidMass { particle: p.id }.into());
    }
    let parts = config.partitions()?;
    let nodes = IdentityAssigner.assign(&parts, config.nodes)?;
    if problems.len() != nodes.len() {
        return Err(ConfigError::PartitionCountMismatch {
            partitions: parts.len(),
            nodes: problems.len(),
        }
        .into());
    }

    let sim = s.simulation_box()?;
    let mut shares: Vec<Vec<Particle>> = vec![Vec::new(); parts.len()];
    for mut p in particles.drain(..) {
        clamp_into(&mut p, &sim);
        if let Some(i) = owner(&p, &parts, config) {
            let (ox, oy) = origin(&parts[i], config);
            p.translate(-ox, -oy);
            shares[i].push(p);
        }
    }

    for ((part, node), (share, tx)) in parts.iter().zip(&nodes).zip(shares.into_iter().zip(problems))
    {
        let problem = ProblemMessage {
            partitions: parts.clone(),
            particles: share,
            cells: grid.subgrid(part)?,
        };
        tracing::debug!(
            "master: problem for worker {node}: {} particles",
            problem.particles.len()
        );
        let frame = encode_problem(&problem)?;
        send(&tx, frame, &format!("problem channel of node {node}"))?;
    }
    tracing::info!("master: distributed to {} workers", nodes.len());
    Ok(parts)
}

/// Collect one result per worker and assemble them.
///
/// Fails with [`CommunicationError::Timeout`] when not every worker
/// reported within `timeout`, and with
/// [`CommunicationError::Disconnected`] once every worker is gone without
/// reporting.
pub fn gather(
    config: &DistributedConfig,
    results: &Receiver<Frame>,
    parts: &[IntBox],
    timeout: Duration,
) -> Result<Assembled, NodeError> {
    let s = &config.settings;
    let mut grid = Grid::new(s.cells_x, s.cells_y, s.cell_width, s.cell_height)?;
    let mut reported: Vec<Option<Vec<Particle>>> = vec![None; parts.len()];
    let started = Instant::now();

    while reported.iter().any(Option::is_none) {
        let remaining = timeout.saturating_sub(started.elapsed());
        let frame = results.recv_timeout(remaining).map_err(|e| match e {
            RecvTimeoutError::Timeout => CommunicationError::Timeout {
                waiting_for: format!(
                    "{} worker results",
                    reported.iter().filter(|r| r.is_none()).count()
                ),
                elapsed_ms: started.elapsed().as_millis() as u64,
            },
            RecvTimeoutError::Disconnected => CommunicationError::Disconnected {
                channel: "result channel".to_string(),
            },
        })?;
        let result = decode_result(&frame)?;
        let i = result.worker.index();
        let part = parts
            .get(i)
            .ok_or(ConfigError::UnknownNode {
                node: result.worker,
            })?;
        let slot = &mut reported[i];
        if slot.is_some() {
            return Err(ProtocolError::DuplicateResult {
                worker: result.worker,
            }
            .into());
        }
        if result.cells.cells_x() != part.width() || result.cells.cells_y() != part.height() {
            return Err(ConfigError::CellCountMismatch {
                name: "result cells",
                expected: part.area(),
                found: (result.cells.cells_x() * result.cells.cells_y()) as usize,
            }
            .into());
        }
        let (ox, oy) = origin(part, config);
        grid.insert_owned((part.min_x(), part.min_y()), &result.cells);
        *slot = Some(
            result
                .particles
                .into_iter()
                .map(|p| p.translated(ox, oy))
                .collect(),
        );
        tracing::debug!("master: result from worker {}", result.worker);
    }

    let particles = reported.into_iter().flatten().flatten().collect();
    tracing::info!(
        "master: gathered {} workers in {:?}",
        parts.len(),
        started.elapsed()
    );
    Ok(Assembled { particles, grid })
}

/// Convenience wrapper over [`distribute`] for a node's master links.
pub fn distribute_over(
    config: &DistributedConfig,
    links: &mut MasterLinks,
    particles: Vec<Particle>,
    grid: &Grid,
) -> Result<Vec<IntBox>, NodeError> {
    let problems = std::mem::take(&mut links.problems);
    distribute(config, problems, particles, grid)
}
