//! Distributed exchange runtime for picnic.
//!
//! Runs a particle-in-cell simulation split across nodes. Each node owns
//! one partition of the grid and keeps its halo consistent with its
//! neighbors through four per-step exchanges: particles changing owner,
//! ghost copies of border particles, border cell values, and (once, at
//! setup) the index tables that say where received cells go.
//!
//! - [`manager`]: the per-node [`SharedDataManager`] with its receive and
//!   exchange threads
//! - [`gates`]: boundary and border gates in partition-local coordinates
//! - [`worker`], [`master`], [`node`]: the node protocol
//! - [`transport`], [`codec`], [`messages`]: channels and wire format
//! - [`emulated`]: all nodes as threads of one process

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod config;
pub mod emulated;
pub mod gates;
pub mod locks;
pub mod manager;
pub mod master;
pub mod messages;
pub mod metrics;
pub mod node;
pub(crate) mod shared_data;
pub mod transport;
pub mod worker;

pub use config::DistributedConfig;
pub use emulated::{EmulatedEnvironment, EmulatedRun};
pub use gates::{Gate, Gates};
pub use locks::{BooleanLock, CountLock};
pub use manager::SharedDataManager;
pub use master::Assembled;
pub use messages::{ExchangeKind, ExchangeMessage, ProblemMessage, ResultMessage};
pub use metrics::ExchangeMetrics;
pub use node::{GlobalProblem, Node, NodeOutcome};
pub use transport::{ChannelKey, Registry};
pub use worker::{Worker, WorkerState};
