//! Blocking primitives for "wait until every neighbor delivered".
//!
//! Both locks are a mutex-protected state plus a condition variable. Any
//! thread may advance them; the coordination thread waits with a deadline
//! and gets [`CommunicationError::Timeout`] instead of hanging. A receive
//! thread that hits a fatal error calls `abort`, which wakes every waiter
//! with [`CommunicationError::Aborted`].

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use picnic_core::CommunicationError;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn timeout(what: &str, started: Instant) -> CommunicationError {
    CommunicationError::Timeout {
        waiting_for: what.to_string(),
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}

// ── BooleanLock ─────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Flag {
    set: bool,
    aborted: bool,
}

/// Blocks until a flag is set.
#[derive(Debug, Default)]
pub struct BooleanLock {
    state: Mutex<Flag>,
    cond: Condvar,
}

impl BooleanLock {
    /// A cleared lock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake all waiters.
    pub fn set(&self) {
        lock(&self.state).set = true;
        self.cond.notify_all();
    }

    /// Clear the flag.
    pub fn reset(&self) {
        lock(&self.state).set = false;
    }

    /// Whether the flag is set.
    pub fn is_set(&self) -> bool {
        lock(&self.state).set
    }

    /// Wake all waiters with an error. Sticky.
    pub fn abort(&self) {
        lock(&self.state).aborted = true;
        self.cond.notify_all();
    }

    /// Block until the flag is set. Returns the time spent waiting.
    pub fn wait(&self, deadline: Duration, what: &str) -> Result<Duration, CommunicationError> {
        let started = Instant::now();
        let mut state = lock(&self.state);
        loop {
            if state.aborted {
                return Err(CommunicationError::Aborted);
            }
            if state.set {
                return Ok(started.elapsed());
            }
            let remaining = deadline
                .checked_sub(started.elapsed())
                .ok_or_else(|| timeout(what, started))?;
            state = self
                .cond
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

// ── CountLock ───────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Counter {
    count: usize,
    aborted: bool,
}

/// Blocks until a counter reaches a required value.
#[derive(Debug, Default)]
pub struct CountLock {
    state: Mutex<Counter>,
    cond: Condvar,
}

impl CountLock {
    /// A lock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one and wake all waiters.
    pub fn increment(&self) {
        lock(&self.state).count += 1;
        self.cond.notify_all();
    }

    /// Set the counter back to zero.
    pub fn reset(&self) {
        lock(&self.state).count = 0;
    }

    /// Current count.
    pub fn count(&self) -> usize {
        lock(&self.state).count
    }

    /// Wake all waiters with an error. Sticky.
    pub fn abort(&self) {
        lock(&self.state).aborted = true;
        self.cond.notify_all();
    }

    /// Block until the count is at least `required`. Returns the time
    /// spent waiting.
    pub fn wait_for(
        &self,
        required: usize,
        deadline: Duration,
        what: &str,
    ) -> Result<Duration, CommunicationError> {
        let started = Instant::now();
        let mut state = lock(&self.state);
        loop {
            if state.aborted {
                return Err(CommunicationError::Aborted);
            }
            if state.count >= required {
                return Ok(started.elapsed());
            }
            let remaining = deadline
                .checked_sub(started.elapsed())
                .ok_or_else(|| timeout(what, started))?;
            state = self
                .cond
                .wait_timeout(state, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}
