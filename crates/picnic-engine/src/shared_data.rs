//! Per-neighbor exchange state.
//!
//! One [`SharedData`] exists for every (neighbor, direction) pair of a
//! node. It holds the particle lists gathered for the neighbor during a
//! step, the ghost-cell index tables and one
//! [`Mailbox`] per incoming message kind.
//!
//! # Mailbox protocol
//!
//! A mailbox slot moves through `Empty -> Reserved -> Ready -> Taken`.
//! A receive thread only claims an `Empty` slot; anything it receives
//! while the slot is in another state is queued as pending and handled
//! after the current step's clean-up reopens the slot. This is how a
//! message for step `k + 1` that arrives while step `k` is still running
//! is held back without being counted towards step `k`.
//!
//! Processing of a claimed message (gating, length checks) happens with
//! the slot `Reserved` and the lock released.

use std::collections::VecDeque;
use std::mem;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use picnic_core::{Cell, Particle};
use picnic_space::Neighbor;

use crate::locks::BooleanLock;
use crate::transport::ChannelKey;

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Mailbox ─────────────────────────────────────────────────────

#[derive(Debug)]
enum Slot<T> {
    Empty,
    Reserved,
    Ready(T),
    Taken,
}

/// Single-slot inbox with a queue for early messages.
#[derive(Debug)]
pub(crate) struct Mailbox<T> {
    slot: Slot<T>,
    pending: VecDeque<T>,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self {
            slot: Slot::Empty,
            pending: VecDeque::new(),
        }
    }
}

impl<T> Mailbox<T> {
    /// Claim the slot for `value`, or queue it.
    ///
    /// Returns the value back when the slot was claimed; the caller must
    /// process it and then [`fill`](Self::fill) the slot.
    pub(crate) fn offer(&mut self, value: T) -> Option<T> {
        match self.slot {
            Slot::Empty => {
                self.slot = Slot::Reserved;
                Some(value)
            }
            _ => {
                self.pending.push_back(value);
                None
            }
        }
    }

    /// Complete a claim made by [`offer`](Self::offer) or
    /// [`reopen`](Self::reopen).
    pub(crate) fn fill(&mut self, value: T) {
        self.slot = Slot::Ready(value);
    }

    /// Take the delivered value, leaving the slot closed until reopened.
    pub(crate) fn take(&mut self) -> Option<T> {
        match mem::replace(&mut self.slot, Slot::Taken) {
            Slot::Ready(v) => Some(v),
            other => {
                self.slot = other;
                None
            }
        }
    }

    /// Open the slot for the next step. If a message is pending it claims
    /// the slot at once and is returned for processing.
    pub(crate) fn reopen(&mut self) -> Option<T> {
        match self.pending.pop_front() {
            Some(v) => {
                self.slot = Slot::Reserved;
                Some(v)
            }
            None => {
                self.slot = Slot::Empty;
                None
            }
        }
    }

    /// Whether the slot holds an untaken value.
    #[cfg(test)]
    pub(crate) fn is_ready(&self) -> bool {
        matches!(self.slot, Slot::Ready(_))
    }

    /// Messages queued behind the slot.
    #[cfg(test)]
    pub(crate) fn pending(&self) -> usize {
        self.pending.len()
    }
}

// ── SharedData ──────────────────────────────────────────────────

/// Everything a node exchanges with one neighbor in one direction.
#[derive(Debug)]
pub(crate) struct SharedData {
    neighbor: Neighbor,
    label: String,
    /// Local coordinates of the cells sent to this neighbor, in send order.
    border_cells: Vec<(i32, i32)>,
    /// Local coordinates the neighbor's border cells are written to.
    remote_indexes: OnceLock<Vec<(i32, i32)>>,
    indexes_received: BooleanLock,
    leaving: Mutex<Vec<Particle>>,
    border: Mutex<Vec<Particle>>,
    pub(crate) arriving: Mutex<Mailbox<Vec<Particle>>>,
    pub(crate) ghosts: Mutex<Mailbox<Vec<Particle>>>,
    pub(crate) cells: Mutex<Mailbox<Vec<Cell>>>,
}

impl SharedData {
    pub(crate) fn new(
        key: ChannelKey,
        neighbor: Neighbor,
        border_cells: Vec<(i32, i32)>,
    ) -> Self {
        Self {
            neighbor,
            label: key.to_string(),
            border_cells,
            remote_indexes: OnceLock::new(),
            indexes_received: BooleanLock::new(),
            leaving: Mutex::new(Vec::new()),
            border: Mutex::new(Vec::new()),
            arriving: Mutex::new(Mailbox::default()),
            ghosts: Mutex::new(Mailbox::default()),
            cells: Mutex::new(Mailbox::default()),
        }
    }

    pub(crate) fn neighbor(&self) -> Neighbor {
        self.neighbor
    }

    /// Outgoing channel name, for errors and logs.
    pub(crate) fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn border_cells(&self) -> &[(i32, i32)] {
        &self.border_cells
    }

    /// Record where the neighbor's cells go. Only the first call counts.
    pub(crate) fn set_remote_indexes(&self, indexes: Vec<(i32, i32)>) -> bool {
        let first = self.remote_indexes.set(indexes).is_ok();
        self.indexes_received.set();
        first
    }

    pub(crate) fn remote_indexes(&self) -> Option<&[(i32, i32)]> {
        self.remote_indexes.get().map(Vec::as_slice)
    }

    pub(crate) fn indexes_received(&self) -> &BooleanLock {
        &self.indexes_received
    }

    /// Hand a particle over to the neighbor.
    pub(crate) fn push_leaving(&self, p: Particle) {
        lock(&self.leaving).push(p);
    }

    /// Queue a ghost copy for the neighbor.
    pub(crate) fn push_border(&self, p: Particle) {
        lock(&self.border).push(p);
    }

    pub(crate) fn take_leaving(&self) -> Vec<Particle> {
        mem::take(&mut *lock(&self.leaving))
    }

    pub(crate) fn take_border(&self) -> Vec<Particle> {
        mem::take(&mut *lock(&self.border))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use picnic_core::{Direction, NodeId, ParticleId};

    fn particle(id: u64) -> Particle {
        Particle::new(ParticleId(id), 0.5, 0.5, 0.0, 0.0, 1.0, 1.0)
    }

    #[test]
    fn mailbox_claims_only_when_empty() {
        let mut m = Mailbox::default();
        assert_eq!(m.offer(1), Some(1));
        assert_eq!(m.offer(2), None);
        assert_eq!(m.pending(), 1);
        assert_eq!(m.take(), None);
        m.fill(1);
        assert!(m.is_ready());
        assert_eq!(m.take(), Some(1));
        assert_eq!(m.take(), None);
    }

    #[test]
    fn early_message_waits_for_reopen() {
        let mut m = Mailbox::default();
        assert_eq!(m.offer("step 1"), Some("step 1"));
        m.fill("step 1");
        assert_eq!(m.take(), Some("step 1"));
        // Next step's message arrives before clean-up: held back.
        assert_eq!(m.offer("step 2"), None);
        assert_eq!(m.reopen(), Some("step 2"));
        m.fill("step 2");
        assert_eq!(m.take(), Some("step 2"));
        assert_eq!(m.reopen(), None);
        assert_eq!(m.offer("step 3"), Some("step 3"));
    }

    #[test]
    fn particle_lists_drain() {
        let key = ChannelKey::outgoing(NodeId(0), NodeId(1), Direction::PLUS_X);
        let neighbor = Neighbor {
            node: NodeId(1),
            direction: Direction::PLUS_X,
        };
        let s = SharedData::new(key, neighbor, vec![(3, 0), (3, 1)]);
        s.push_leaving(particle(1));
        s.push_border(particle(2));
        s.push_border(particle(3));
        assert_eq!(s.take_leaving().len(), 1);
        assert_eq!(s.take_border().len(), 2);
        assert!(s.take_border().is_empty());
        assert_eq!(s.border_cells().len(), 2);
        assert_eq!(s.neighbor(), neighbor);
        assert!(s.label().contains("->"));
    }

    #[test]
    fn remote_indexes_set_once() {
        let key = ChannelKey::outgoing(NodeId(0), NodeId(0), Direction::PLUS_Y);
        let n = Neighbor {
            node: NodeId(0),
            direction: Direction::PLUS_Y,
        };
        let s = SharedData::new(key, n, Vec::new());
        assert!(!s.indexes_received().is_set());
        assert!(s.set_remote_indexes(vec![(0, -1)]));
        assert!(!s.set_remote_indexes(vec![(1, -1)]));
        assert_eq!(s.remote_indexes(), Some(&[(0, -1)][..]));
        assert!(s.indexes_received().is_set());
    }
}
