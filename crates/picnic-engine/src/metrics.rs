//! Per-node exchange metrics.
//!
//! [`ExchangeMetrics`] is owned by the node's coordination thread and
//! passed into the blocking exchange calls, which add the time they spent
//! waiting. It is returned with the node's outcome.

use std::time::Duration;

/// Waiting times and traffic counters of one node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExchangeMetrics {
    /// Steps completed.
    pub steps: u64,
    /// Total time blocked waiting for arriving particles, in microseconds.
    pub arriving_wait_us: u64,
    /// Total time blocked waiting for ghost particles, in microseconds.
    pub ghost_particles_wait_us: u64,
    /// Total time blocked waiting for ghost cells, in microseconds.
    pub ghost_cells_wait_us: u64,
    /// Particles sent as leaving (arriving at a neighbor).
    pub particles_sent: u64,
    /// Border particle copies sent.
    pub ghost_particles_sent: u64,
    /// Border cells sent.
    pub cells_sent: u64,
    /// Particles received as arriving.
    pub particles_received: u64,
    /// Next-step messages that arrived before clean-up and were held back.
    pub deferred_messages: u64,
}

impl ExchangeMetrics {
    pub(crate) fn micros(d: Duration) -> u64 {
        d.as_micros().min(u128::from(u64::MAX)) as u64
    }

    /// Total time spent blocked, in microseconds.
    pub fn total_wait_us(&self) -> u64 {
        self.arriving_wait_us + self.ghost_particles_wait_us + self.ghost_cells_wait_us
    }

    /// Add another node's counters to this one.
    pub fn merge(&mut self, other: &ExchangeMetrics) {
        self.steps = self.steps.max(other.steps);
        self.arriving_wait_us += other.arriving_wait_us;
        self.ghost_particles_wait_us += other.ghost_particles_wait_us;
        self.ghost_cells_wait_us += other.ghost_cells_wait_us;
        self.particles_sent += other.particles_sent;
        self.ghost_particles_sent += other.ghost_particles_sent;
        self.cells_sent += other.cells_sent;
        self.particles_received += other.particles_received;
        self.deferred_messages += other.deferred_messages;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = ExchangeMetrics::default();
        assert_eq!(m.steps, 0);
        assert_eq!(m.total_wait_us(), 0);
        assert_eq!(m.particles_sent, 0);
        assert_eq!(m.cells_sent, 0);
    }

    #[test]
    fn merge_sums_counters_and_keeps_step_count() {
        let mut a = ExchangeMetrics {
            steps: 10,
            arriving_wait_us: 5,
            cells_sent: 100,
            ..Default::default()
        };
        let b = ExchangeMetrics {
            steps: 10,
            ghost_cells_wait_us: 7,
            cells_sent: 50,
            ..Default::default()
        };
        a.merge(&b);
        assert_eq!(a.steps, 10);
        assert_eq!(a.total_wait_us(), 12);
        assert_eq!(a.cells_sent, 150);
    }

    #[test]
    fn micros_saturates() {
        assert_eq!(ExchangeMetrics::micros(Duration::from_millis(3)), 3000);
        assert_eq!(ExchangeMetrics::micros(Duration::MAX), u64::MAX);
    }
}
