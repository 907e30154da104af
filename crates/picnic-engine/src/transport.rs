//! In-process transport and the two-phase channel setup.
//!
//! Every channel carries encoded frames ([`Frame`]). Worker-to-worker
//! channels are created through the [`Registry`]:
//!
//! 1. every node creates one receiver per (neighbor, direction) and
//!    [`publish`](Registry::publish)es the matching sender under a
//!    [`ChannelKey`];
//! 2. all nodes meet at the registry's [`barrier`](Registry::barrier);
//! 3. every node [`connect`](Registry::connect)s, taking the senders
//!    published for it.
//!
//! Because no node asks for a sender before every node has published all
//! of its receivers, setup cannot block on a missing endpoint. A missing
//! key after the barrier is a layout bug and reported as
//! [`CommunicationError::EndpointMissing`]. A node that fails before
//! reaching the barrier [`abort`](Registry::abort)s it so the others do
//! not wait out their deadline.
//!
//! Master traffic uses a bounded one-shot problem channel per worker and
//! a single many-to-one result channel, built by [`in_process`].

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use indexmap::IndexMap;

use picnic_core::{CommunicationError, Direction, NodeId};

use crate::locks::CountLock;

/// An encoded message.
pub type Frame = Vec<u8>;

/// Identifies a worker-to-worker channel.
///
/// `direction` is the direction of `to` as seen from `from`. The receiving
/// node sees the same channel as its neighbor `from` in the opposite
/// direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChannelKey {
    /// Sending node.
    pub from: NodeId,
    /// Receiving node.
    pub to: NodeId,
    /// Direction of the receiver as seen from the sender.
    pub direction: Direction,
}

impl ChannelKey {
    /// Key of the channel `receiver` reads from its neighbor `neighbor`
    /// located in `direction`.
    pub fn incoming(receiver: NodeId, neighbor: NodeId, direction: Direction) -> Self {
        Self {
            from: neighbor,
            to: receiver,
            direction: direction.opposite(),
        }
    }

    /// Key of the channel `sender` writes to its neighbor `neighbor`
    /// located in `direction`.
    pub fn outgoing(sender: NodeId, neighbor: NodeId, direction: Direction) -> Self {
        Self {
            from: sender,
            to: neighbor,
            direction,
        }
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel {} -> {} {}", self.from, self.to, self.direction)
    }
}

/// Rendezvous point for worker-to-worker senders.
#[derive(Debug)]
pub struct Registry {
    endpoints: Mutex<IndexMap<ChannelKey, Sender<Frame>>>,
    participants: usize,
    arrived: CountLock,
}

impl Registry {
    /// A registry for `nodes` participants.
    pub fn new(nodes: usize) -> Self {
        Self {
            endpoints: Mutex::new(IndexMap::new()),
            participants: nodes,
            arrived: CountLock::new(),
        }
    }

    /// Phase 1: publish the sending half of a receive endpoint.
    pub fn publish(&self, key: ChannelKey, sender: Sender<Frame>) {
        self.endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, sender);
    }

    /// Wait until every participant finished publishing.
    pub fn barrier(&self, deadline: Duration) -> Result<Duration, CommunicationError> {
        self.arrived.increment();
        self.arrived
            .wait_for(self.participants, deadline, "channel setup barrier")
    }

    /// Release every node waiting at the barrier with an error.
    pub fn abort(&self) {
        self.arrived.abort();
    }

    /// Phase 2: take the sender published for `key`.
    pub fn connect(&self, key: ChannelKey) -> Result<Sender<Frame>, CommunicationError> {
        self.endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(&key)
            .ok_or_else(|| CommunicationError::EndpointMissing {
                channel: key.to_string(),
            })
    }

    /// Senders published but not yet taken.
    pub fn unclaimed(&self) -> usize {
        self.endpoints
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Send a frame, mapping a closed receiver to an error.
pub fn send(tx: &Sender<Frame>, frame: Frame, channel: &str) -> Result<(), CommunicationError> {
    tx.send(frame)
        .map_err(|_| CommunicationError::SendFailed {
            channel: channel.to_string(),
        })
}

// ── Master links ────────────────────────────────────────────────

/// Master-side ends of the problem and result channels.
#[derive(Debug)]
pub struct MasterLinks {
    /// One bounded problem sender per worker, indexed by node.
    pub problems: Vec<Sender<Frame>>,
    /// The many-to-one result receiver.
    pub results: Receiver<Frame>,
}

/// Everything one node needs to talk to the others.
#[derive(Debug)]
pub struct NodeLinks {
    /// This node.
    pub node: NodeId,
    /// Shared worker-to-worker registry.
    pub registry: Arc<Registry>,
    /// Where this node's problem arrives.
    pub problem: Receiver<Frame>,
    /// Where this node reports its result.
    pub result: Sender<Frame>,
    /// Present on the master node only.
    pub master: Option<MasterLinks>,
}

/// Build the links of `nodes` in-process nodes. Node 0 is the master.
pub fn in_process(nodes: usize) -> Vec<NodeLinks> {
    let registry = Arc::new(Registry::new(nodes));
    let (result_tx, result_rx) = crossbeam_channel::unbounded();
    let (problem_txs, problem_rxs): (Vec<_>, Vec<_>) =
        (0..nodes).map(|_| crossbeam_channel::bounded(1)).unzip();

    let mut master = Some(MasterLinks {
        problems: problem_txs,
        results: result_rx,
    });
    problem_rxs
        .into_iter()
        .enumerate()
        .map(|(i, problem)| NodeLinks {
            node: NodeId(i as u32),
            registry: Arc::clone(&registry),
            problem,
            result: result_tx.clone(),
            master: if i == NodeId::MASTER.index() {
                master.take()
            } else {
                None
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const LONG: Duration = Duration::from_secs(5);

    #[test]
    fn incoming_and_outgoing_keys_match() {
        let (a, b) = (NodeId(0), NodeId(1));
        // b sits at +x of a, so a sits at -x of b.
        let out = ChannelKey::outgoing(a, b, Direction::PLUS_X);
        let inc = ChannelKey::incoming(b, a, Direction::MINUS_X);
        assert_eq!(out, inc);
    }

    #[test]
    fn connect_takes_the_endpoint_once() {
        let reg = Registry::new(1);
        let key = ChannelKey::outgoing(NodeId(0), NodeId(0), Direction::PLUS_Y);
        let (tx, rx) = crossbeam_channel::unbounded();
        reg.publish(key, tx);
        reg.barrier(LONG).unwrap();
        let tx = reg.connect(key).unwrap();
        send(&tx, vec![1, 2], "test").unwrap();
        assert_eq!(rx.recv().unwrap(), vec![1, 2]);
        assert!(matches!(
            reg.connect(key),
            Err(CommunicationError::EndpointMissing { .. })
        ));
    }

    #[test]
    fn two_phase_setup_completes_for_many_nodes() {
        let nodes = 8;
        let reg = Arc::new(Registry::new(nodes));
        let handles: Vec<_> = (0..nodes as u32)
            .map(|n| {
                let reg = Arc::clone(&reg);
                thread::spawn(move || {
                    let me = NodeId(n);
                    let next = NodeId((n + 1) % nodes as u32);
                    let prev = NodeId((n + nodes as u32 - 1) % nodes as u32);
                    let (tx, rx) = crossbeam_channel::unbounded();
                    reg.publish(ChannelKey::incoming(me, prev, Direction::MINUS_X), tx);
                    reg.barrier(LONG).unwrap();
                    let out = reg
                        .connect(ChannelKey::outgoing(me, next, Direction::PLUS_X))
                        .unwrap();
                    send(&out, vec![n as u8], "ring").unwrap();
                    rx.recv().unwrap()
                })
            })
            .collect();
        for (n, h) in handles.into_iter().enumerate() {
            let got = h.join().unwrap();
            assert_eq!(got, vec![((n + nodes - 1) % nodes) as u8]);
        }
        assert_eq!(reg.unclaimed(), 0);
    }

    #[test]
    fn aborted_barrier_releases_waiters() {
        let reg = Arc::new(Registry::new(3));
        let waiter = {
            let reg = Arc::clone(&reg);
            thread::spawn(move || reg.barrier(LONG))
        };
        reg.abort();
        assert_eq!(waiter.join().unwrap(), Err(CommunicationError::Aborted));
    }

    #[test]
    fn barrier_times_out_when_a_node_is_missing() {
        let reg = Registry::new(2);
        assert!(matches!(
            reg.barrier(Duration::from_millis(20)),
            Err(CommunicationError::Timeout { .. })
        ));
    }

    #[test]
    fn only_node_zero_is_master() {
        let links = in_process(4);
        assert!(links[0].master.is_some());
        assert!(links[1..].iter().all(|l| l.master.is_none()));
        assert_eq!(links[0].master.as_ref().unwrap().problems.len(), 4);
    }

    #[test]
    fn send_to_dropped_receiver_fails() {
        let (tx, rx) = crossbeam_channel::unbounded::<Frame>();
        drop(rx);
        assert!(matches!(
            send(&tx, Vec::new(), "gone"),
            Err(CommunicationError::SendFailed { .. })
        ));
    }
}
