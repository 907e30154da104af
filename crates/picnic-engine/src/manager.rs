//! The exchange manager of one node.
//!
//! [`SharedDataManager`] owns the node's channels to its neighbors and
//! drives the per-step exchange:
//!
//! ```text
//!   coordination thread              exchange thread        receive threads
//!   ───────────────────              ───────────────        ───────────────
//!   register_leaving_particle
//!   register_border_particle
//!   start_exchange_of_particles ──▶ send leaving
//!                                   wait all arriving ◀──── ARRIVING (settled,
//!   get_arriving_particles                                   border copies queued)
//!                                   send border copies
//!   get_ghost_particles         ◀─────────────────────────── GHOST_PARTICLES
//!   exchange_cells  (send)
//!   wait_for_ghost_cells        ◀─────────────────────────── GHOST_CELLS
//!   clean_up_particle_communication (join exchange thread)
//!   clean_up_cell_communication
//! ```
//!
//! Every blocking call waits on a [`CountLock`] with the configured
//! deadline. A receive thread that fails stores its error and aborts the
//! locks; the coordination thread then reports that stored error instead
//! of a generic abort.
//!
//! No code path holds two mailbox locks at once, and message processing
//! runs with no mailbox lock held.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use indexmap::IndexMap;

use picnic_core::{
    Cell, CommunicationError, ConfigError, Direction, DoubleBox, IntBox, NodeError, NodeId,
    Particle, ProtocolError,
};
use picnic_space::{BorderRegions, Grid};

use crate::codec::{decode_exchange, encode_exchange};
use crate::gates::{Gate, Gates};
use crate::locks::CountLock;
use crate::messages::{ExchangeKind, ExchangeMessage};
use crate::metrics::ExchangeMetrics;
use crate::shared_data::{lock, Mailbox, SharedData};
use crate::transport::{send, ChannelKey, Frame, Registry};

// ── Shared state ────────────────────────────────────────────────

/// State shared between the coordination, exchange and receive threads.
#[derive(Debug)]
struct Exchange {
    node: NodeId,
    gates: Gates,
    storage: IntBox,
    channels: IndexMap<Direction, Arc<SharedData>>,
    arriving: CountLock,
    ghosts: CountLock,
    cells: CountLock,
    fault: Mutex<Option<NodeError>>,
    particles_received: AtomicU64,
    deferred: AtomicU64,
    timeout: Duration,
}

impl Exchange {
    fn fail(&self, e: NodeError) {
        tracing::error!("node {}: exchange failed: {e}", self.node);
        lock(&self.fault).get_or_insert(e);
        self.arriving.abort();
        self.ghosts.abort();
        self.cells.abort();
        for data in self.channels.values() {
            data.indexes_received().abort();
        }
    }

    fn fault(&self) -> Option<NodeError> {
        lock(&self.fault).clone()
    }

    /// Map an abort to the error that caused it.
    fn resolve(&self, e: CommunicationError) -> NodeError {
        match e {
            CommunicationError::Aborted => self.fault().unwrap_or(e.into()),
            e => e.into(),
        }
    }

    /// Queue ghost copies of a kept particle for every neighbor its
    /// stencil reaches.
    fn register_border(&self, p: &Particle) {
        for &d in self.gates.border_route(p) {
            if let Some(data) = self.channels.get(&d) {
                let (dx, dy) = self.gates.translation(d);
                data.push_border(p.translated(dx, dy));
            }
        }
    }

    fn settle_arrivals(&self, mut particles: Vec<Particle>) -> Vec<Particle> {
        self.particles_received
            .fetch_add(particles.len() as u64, Ordering::Relaxed);
        particles.retain_mut(|p| self.gates.settle(p) != Gate::Removed);
        for p in &particles {
            self.register_border(p);
        }
        particles
    }

    fn check_cells(&self, data: &SharedData, cells: Vec<Cell>) -> Result<Vec<Cell>, NodeError> {
        let expected = data.remote_indexes().map_or(0, <[_]>::len);
        if cells.len() != expected {
            return Err(ProtocolError::GhostIndexMismatch {
                expected,
                found: cells.len(),
            }
            .into());
        }
        Ok(cells)
    }

    /// Deliver a claimed value or queue it behind the slot.
    fn accept<T>(
        &self,
        mailbox: &Mutex<Mailbox<T>>,
        count: &CountLock,
        value: T,
        process: impl FnOnce(T) -> Result<T, NodeError>,
    ) -> Result<(), NodeError> {
        let claimed = lock(mailbox).offer(value);
        match claimed {
            Some(v) => {
                let v = process(v)?;
                lock(mailbox).fill(v);
                count.increment();
            }
            None => {
                self.deferred.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }

    /// Reopen a slot after clean-up, processing a held-back message.
    fn reopen<T>(
        &self,
        mailbox: &Mutex<Mailbox<T>>,
        count: &CountLock,
        process: impl FnOnce(T) -> Result<T, NodeError>,
    ) -> Result<(), NodeError> {
        let held = lock(mailbox).reopen();
        if let Some(v) = held {
            let v = process(v)?;
            lock(mailbox).fill(v);
            count.increment();
        }
        Ok(())
    }

    fn deliver(&self, data: &SharedData, frame: &[u8]) -> Result<(), NodeError> {
        let msg = decode_exchange(frame)?;
        tracing::trace!(
            "node {}: {} from {}",
            self.node,
            msg.kind().name(),
            data.neighbor().node
        );
        match msg {
            ExchangeMessage::ArrivingParticles(ps) => {
                self.accept(&data.arriving, &self.arriving, ps, |ps| {
                    Ok(self.settle_arrivals(ps))
                })
            }
            ExchangeMessage::GhostParticles(ps) => self.accept(&data.ghosts, &self.ghosts, ps, Ok),
            ExchangeMessage::GhostCells(cells) => {
                self.accept(&data.cells, &self.cells, cells, |c| self.check_cells(data, c))
            }
            ExchangeMessage::GhostCellIndexes(indexes) => {
                if let Some(&(x, y)) = indexes.iter().find(|&&(x, y)| !self.storage.contains(x, y))
                {
                    return Err(ProtocolError::GhostIndexOutOfRange { x, y }.into());
                }
                if !data.set_remote_indexes(indexes) {
                    return Err(ProtocolError::UnexpectedMessage {
                        expected: ExchangeKind::GhostCells.name(),
                        found: ExchangeKind::GhostCellIndexes.name(),
                    }
                    .into());
                }
                Ok(())
            }
        }
    }
}

fn receive_loop(exchange: Arc<Exchange>, data: Arc<SharedData>, rx: Receiver<Frame>) {
    for frame in rx.iter() {
        if let Err(e) = exchange.deliver(&data, &frame) {
            exchange.fail(e);
            return;
        }
    }
    tracing::trace!(
        "node {}: channel from {} closed",
        exchange.node,
        data.neighbor().node
    );
}

// ── Exchange thread ─────────────────────────────────────────────

/// What one run of the exchange thread sent.
#[derive(Debug, Default)]
struct ExchangeReport {
    particles_sent: u64,
    ghost_particles_sent: u64,
}

fn exchange_particles(
    exchange: &Exchange,
    outgoing: &IndexMap<Direction, Sender<Frame>>,
) -> Result<ExchangeReport, NodeError> {
    let mut report = ExchangeReport::default();
    for (d, tx) in outgoing {
        let Some(data) = exchange.channels.get(d) else {
            continue;
        };
        let leaving = data.take_leaving();
        report.particles_sent += leaving.len() as u64;
        let frame = encode_exchange(&ExchangeMessage::ArrivingParticles(leaving))?;
        send(tx, frame, data.label())?;
    }

    // Arrivals may queue more border copies until the last one is in.
    exchange
        .arriving
        .wait_for(outgoing.len(), exchange.timeout, "arriving particles")
        .map_err(|e| exchange.resolve(e))?;

    for (d, tx) in outgoing {
        let Some(data) = exchange.channels.get(d) else {
            continue;
        };
        let border = data.take_border();
        report.ghost_particles_sent += border.len() as u64;
        let frame = encode_exchange(&ExchangeMessage::GhostParticles(border))?;
        send(tx, frame, data.label())?;
    }
    Ok(report)
}

fn spawn_named<T, F>(name: String, f: F) -> Result<JoinHandle<T>, CommunicationError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn(f)
        .map_err(|e| CommunicationError::SpawnFailed {
            thread: name,
            reason: e.to_string(),
        })
}

// ── Manager ─────────────────────────────────────────────────────

/// Border cells of every channel, in local and in receiver coordinates.
///
/// Every stored cell, halo included, is classified by its center with an
/// inner box one cell in from each side; the cell goes to every direction
/// the region routes to. Cells are visited x fastest, then y.
fn border_cell_tables(
    gates: &Gates,
    grid: &Grid,
) -> Result<IndexMap<Direction, (Vec<(i32, i32)>, Vec<(i32, i32)>)>, ConfigError> {
    let sim = *gates.local_box();
    let inner = DoubleBox::new(
        sim.min_x() + grid.cell_width(),
        sim.max_x() - grid.cell_width(),
        sim.min_y() + grid.cell_height(),
        sim.max_y() - grid.cell_height(),
    )?;
    let regions = BorderRegions::new(sim, inner)?;
    let map = gates.neighbor_map();
    let mut tables: IndexMap<Direction, (Vec<(i32, i32)>, Vec<(i32, i32)>)> = map
        .neighbors()
        .map(|n| (n.direction, (Vec::new(), Vec::new())))
        .collect();

    let stored = grid.storage_box();
    for y in stored.min_y()..stored.max_y() {
        for x in stored.min_x()..stored.max_x() {
            let (cx, cy) = grid.cell_center(x, y);
            for d in map.route(regions.region(cx, cy)) {
                if let Some((local, remote)) = tables.get_mut(d) {
                    local.push((x, y));
                    remote.push((x - d.dx() * grid.cells_x(), y - d.dy() * grid.cells_y()));
                }
            }
        }
    }
    Ok(tables)
}

/// Per-node owner of all neighbor channels.
#[derive(Debug)]
pub struct SharedDataManager {
    exchange: Arc<Exchange>,
    outgoing: IndexMap<Direction, Sender<Frame>>,
    receivers: Vec<JoinHandle<()>>,
    exchange_thread: Option<JoinHandle<Result<ExchangeReport, NodeError>>>,
    particles_open: bool,
    cells_open: bool,
    deferred_reported: u64,
    received_reported: u64,
}

impl SharedDataManager {
    /// Set up every channel of the node described by `gates` and exchange
    /// the ghost-cell index tables.
    ///
    /// Runs the two-phase setup on `registry`: create and publish the
    /// receivers, meet at the barrier, then take the senders. Returns once
    /// every neighbor's index table has arrived.
    pub fn connect(
        registry: &Registry,
        gates: Gates,
        grid: &Grid,
        timeout: Duration,
    ) -> Result<Self, NodeError> {
        let node = gates.neighbor_map().node();
        let neighbors: Vec<_> = gates.neighbor_map().neighbors().collect();

        let mut incoming = Vec::with_capacity(neighbors.len());
        for n in &neighbors {
            let (tx, rx) = crossbeam_channel::unbounded();
            registry.publish(ChannelKey::incoming(node, n.node, n.direction), tx);
            incoming.push(rx);
        }
        let waited = registry.barrier(timeout)?;
        tracing::debug!("node {node}: setup barrier passed after {waited:?}");

        let mut outgoing = IndexMap::with_capacity(neighbors.len());
        for n in &neighbors {
            let tx = registry.connect(ChannelKey::outgoing(node, n.node, n.direction))?;
            outgoing.insert(n.direction, tx);
        }

        let mut tables = border_cell_tables(&gates, grid)?;
        let mut channels = IndexMap::with_capacity(neighbors.len());
        let mut remote_tables = Vec::with_capacity(neighbors.len());
        for n in &neighbors {
            let (local, remote) = tables.shift_remove(&n.direction).unwrap_or_default();
            let key = ChannelKey::outgoing(node, n.node, n.direction);
            channels.insert(n.direction, Arc::new(SharedData::new(key, *n, local)));
            remote_tables.push(remote);
        }

        let exchange = Arc::new(Exchange {
            node,
            storage: grid.storage_box(),
            gates,
            channels,
            arriving: CountLock::new(),
            ghosts: CountLock::new(),
            cells: CountLock::new(),
            fault: Mutex::new(None),
            particles_received: AtomicU64::new(0),
            deferred: AtomicU64::new(0),
            timeout,
        });

        let mut receivers = Vec::with_capacity(neighbors.len());
        for (n, rx) in neighbors.iter().zip(incoming) {
            let Some(data) = exchange.channels.get(&n.direction).cloned() else {
                continue;
            };
            let shared = Arc::clone(&exchange);
            receivers.push(spawn_named(
                format!("picnic-recv-{node}-{}", n.direction),
                move || receive_loop(shared, data, rx),
            )?);
        }

        let manager = Self {
            exchange,
            outgoing,
            receivers,
            exchange_thread: None,
            particles_open: false,
            cells_open: false,
            deferred_reported: 0,
            received_reported: 0,
        };

        for ((d, tx), remote) in manager.outgoing.iter().zip(remote_tables) {
            let frame = encode_exchange(&ExchangeMessage::GhostCellIndexes(remote))?;
            let label = manager
                .exchange
                .channels
                .get(d)
                .map_or_else(|| d.to_string(), |c| c.label().to_string());
            send(tx, frame, &label)?;
        }
        for data in manager.exchange.channels.values() {
            data.indexes_received()
                .wait(timeout, "ghost cell indexes")
                .map_err(|e| manager.exchange.resolve(e))?;
        }
        tracing::debug!(
            "node {node}: connected to {} channels",
            manager.exchange.channels.len()
        );
        Ok(manager)
    }

    /// This node.
    pub fn node(&self) -> NodeId {
        self.exchange.node
    }

    /// The gates this manager routes with.
    pub fn gates(&self) -> &Gates {
        &self.exchange.gates
    }

    /// Number of (neighbor, direction) channels.
    pub fn channel_count(&self) -> usize {
        self.outgoing.len()
    }

    /// Ghost cells sent to the neighbor in `d` each step.
    pub fn border_cell_count(&self, d: Direction) -> Option<usize> {
        self.exchange.channels.get(&d).map(|c| c.border_cells().len())
    }

    /// Ghost cells received from the neighbor in `d` each step.
    pub fn ghost_cell_count(&self, d: Direction) -> Option<usize> {
        self.exchange
            .channels
            .get(&d)
            .and_then(|c| c.remote_indexes())
            .map(<[_]>::len)
    }

    fn channel(&self, d: Direction) -> Result<&SharedData, NodeError> {
        self.exchange
            .channels
            .get(&d)
            .map(Arc::as_ref)
            .ok_or_else(|| ConfigError::MissingNeighbor { direction: d }.into())
    }

    /// Hand a particle, already translated by the boundary gate, to the
    /// neighbor in `d`.
    pub fn register_leaving_particle(&self, d: Direction, p: Particle) -> Result<(), NodeError> {
        self.channel(d)?.push_leaving(p);
        Ok(())
    }

    /// Queue a ghost copy, already in the receiver's coordinates, for the
    /// neighbor in `d`.
    pub fn register_border_particle(&self, d: Direction, p: Particle) -> Result<(), NodeError> {
        self.channel(d)?.push_border(p);
        Ok(())
    }

    /// Queue ghost copies of a kept particle for every neighbor its
    /// stencil reaches, translated per direction.
    pub fn register_border_copies(&self, p: &Particle) {
        self.exchange.register_border(p);
    }

    /// Start the exchange thread for this step.
    pub fn start_exchange_of_particles(&mut self) -> Result<(), NodeError> {
        if self.exchange_thread.is_some() {
            return Err(ProtocolError::UnexpectedMessage {
                expected: "particle clean-up",
                found: "second particle exchange",
            }
            .into());
        }
        let exchange = Arc::clone(&self.exchange);
        let outgoing = self.outgoing.clone();
        let handle = spawn_named(format!("picnic-exchange-{}", self.node()), move || {
            let result = exchange_particles(&exchange, &outgoing);
            if let Err(e) = &result {
                exchange.fail(e.clone());
            }
            result
        })?;
        self.exchange_thread = Some(handle);
        self.particles_open = true;
        Ok(())
    }

    fn wait(&self, count: &CountLock, what: &str) -> Result<Duration, NodeError> {
        count
            .wait_for(self.outgoing.len(), self.exchange.timeout, what)
            .map_err(|e| self.exchange.resolve(e))
    }

    fn take_all<T>(
        &self,
        mailbox: impl Fn(&SharedData) -> &Mutex<Mailbox<Vec<T>>>,
        kind: ExchangeKind,
    ) -> Result<Vec<Vec<T>>, NodeError> {
        self.exchange
            .channels
            .values()
            .map(|data| {
                lock(mailbox(data.as_ref())).take().ok_or_else(|| {
                    NodeError::from(ProtocolError::UnexpectedMessage {
                        expected: kind.name(),
                        found: "empty slot",
                    })
                })
            })
            .collect()
    }

    /// Block until every neighbor's arriving particles are in and return
    /// them, settled into this partition.
    pub fn get_arriving_particles(
        &mut self,
        metrics: &mut ExchangeMetrics,
    ) -> Result<Vec<Particle>, NodeError> {
        let waited = self.wait(&self.exchange.arriving, "arriving particles")?;
        metrics.arriving_wait_us += ExchangeMetrics::micros(waited);
        let lists = self.take_all(|d| &d.arriving, ExchangeKind::ArrivingParticles)?;
        Ok(lists.into_iter().flatten().collect())
    }

    /// Block until every neighbor's ghost particles are in and return them.
    pub fn get_ghost_particles(
        &mut self,
        metrics: &mut ExchangeMetrics,
    ) -> Result<Vec<Particle>, NodeError> {
        let waited = self.wait(&self.exchange.ghosts, "ghost particles")?;
        metrics.ghost_particles_wait_us += ExchangeMetrics::micros(waited);
        let lists = self.take_all(|d| &d.ghosts, ExchangeKind::GhostParticles)?;
        Ok(lists.into_iter().flatten().collect())
    }

    /// Send this node's border cells to every neighbor.
    ///
    /// Fails while the previous cell exchange has not been cleaned up.
    pub fn exchange_cells(
        &mut self,
        grid: &Grid,
        metrics: &mut ExchangeMetrics,
    ) -> Result<(), NodeError> {
        if self.cells_open {
            return Err(ProtocolError::UnexpectedMessage {
                expected: "cell clean-up",
                found: "second cell exchange",
            }
            .into());
        }
        self.check_shape(grid)?;
        for (d, tx) in &self.outgoing {
            let data = self.channel(*d)?;
            let cells: Vec<Cell> = data
                .border_cells()
                .iter()
                .map(|&(x, y)| *grid.clamped(x, y))
                .collect();
            metrics.cells_sent += cells.len() as u64;
            let frame = encode_exchange(&ExchangeMessage::GhostCells(cells))?;
            send(tx, frame, data.label())?;
        }
        self.cells_open = true;
        Ok(())
    }

    /// Block until every neighbor's border cells are in and write them
    /// into `grid`.
    pub fn wait_for_ghost_cells(
        &mut self,
        grid: &mut Grid,
        metrics: &mut ExchangeMetrics,
    ) -> Result<(), NodeError> {
        self.check_shape(grid)?;
        self.cells_open = true;
        let waited = self.wait(&self.exchange.cells, "ghost cells")?;
        metrics.ghost_cells_wait_us += ExchangeMetrics::micros(waited);
        let lists = self.take_all(|d| &d.cells, ExchangeKind::GhostCells)?;
        for (data, cells) in self.exchange.channels.values().zip(lists) {
            let indexes = data.remote_indexes().unwrap_or(&[]);
            for (&(x, y), cell) in indexes.iter().zip(cells) {
                if !grid.set(x, y, cell) {
                    return Err(ProtocolError::GhostIndexOutOfRange { x, y }.into());
                }
            }
        }
        Ok(())
    }

    /// The grid must have the storage the index tables were built for.
    fn check_shape(&self, grid: &Grid) -> Result<(), NodeError> {
        let storage = grid.storage_box();
        if storage != self.exchange.storage {
            return Err(ConfigError::CellCountMismatch {
                name: "exchange grid cells",
                expected: self.exchange.storage.area(),
                found: storage.area(),
            }
            .into());
        }
        Ok(())
    }

    /// Finish the particle exchange of this step: join the exchange
    /// thread and reopen the particle mailboxes. A no-op when no particle
    /// exchange is outstanding.
    pub fn clean_up_particle_communication(
        &mut self,
        metrics: &mut ExchangeMetrics,
    ) -> Result<(), NodeError> {
        if !self.particles_open {
            return Ok(());
        }
        self.particles_open = false;
        if let Some(handle) = self.exchange_thread.take() {
            let report = handle
                .join()
                .map_err(|_| CommunicationError::ThreadPanicked {
                    thread: format!("picnic-exchange-{}", self.node()),
                })??;
            metrics.particles_sent += report.particles_sent;
            metrics.ghost_particles_sent += report.ghost_particles_sent;
        }

        let ex = &self.exchange;
        ex.arriving.reset();
        ex.ghosts.reset();
        for data in ex.channels.values() {
            ex.reopen(&data.arriving, &ex.arriving, |ps| Ok(ex.settle_arrivals(ps)))?;
            ex.reopen(&data.ghosts, &ex.ghosts, Ok)?;
        }
        self.report_counters(metrics);
        Ok(())
    }

    /// Finish the cell exchange of this step. A no-op when no cell
    /// exchange is outstanding.
    pub fn clean_up_cell_communication(
        &mut self,
        metrics: &mut ExchangeMetrics,
    ) -> Result<(), NodeError> {
        if !self.cells_open {
            return Ok(());
        }
        self.cells_open = false;
        let ex = &self.exchange;
        ex.cells.reset();
        for data in ex.channels.values() {
            ex.reopen(&data.cells, &ex.cells, |c| ex.check_cells(data, c))?;
        }
        self.report_counters(metrics);
        Ok(())
    }

    fn report_counters(&mut self, metrics: &mut ExchangeMetrics) {
        let deferred = self.exchange.deferred.load(Ordering::Relaxed);
        let received = self.exchange.particles_received.load(Ordering::Relaxed);
        metrics.deferred_messages += deferred - self.deferred_reported;
        metrics.particles_received += received - self.received_reported;
        self.deferred_reported = deferred;
        self.received_reported = received;
    }

    /// Close the outgoing channels and join every thread.
    ///
    /// Receive threads end once the neighbors close their side, so this
    /// returns after every neighbor has shut down as well.
    pub fn shutdown(mut self) -> Result<(), NodeError> {
        let mut result = Ok(());
        if let Some(handle) = self.exchange_thread.take() {
            if handle.join().is_err() {
                result = Err(CommunicationError::ThreadPanicked {
                    thread: format!("picnic-exchange-{}", self.node()),
                }
                .into());
            }
        }
        self.outgoing.clear();
        for handle in self.receivers.drain(..) {
            let name = handle.thread().name().unwrap_or("receive").to_string();
            if handle.join().is_err() && result.is_ok() {
                result = Err(CommunicationError::ThreadPanicked { thread: name }.into());
            }
        }
        if let Some(fault) = self.exchange.fault() {
            return Err(fault);
        }
        tracing::debug!("node {}: channels shut down", self.node());
        result
    }
}
