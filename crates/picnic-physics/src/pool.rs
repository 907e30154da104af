//! Strided fork-join over particles and cells.
//!
//! [`WorkerPool::for_each`] splits an index space across `T` workers with
//! a stride: worker `t` handles indices `t, t + T, t + 2T, ...`. The call
//! returns only after every worker finished, so results can be read
//! immediately. Workers receive disjoint `&mut` elements; the borrow
//! checker enforces that no two workers write the same element.
//!
//! The pool size is fixed at construction; the threads are not kept
//! alive. Each call spawns that many scoped threads and joins them before
//! returning. With one thread the work runs inline on the caller.

use std::thread;

/// A fork-join pool with a fixed worker count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkerPool {
    threads: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self { threads: 1 }
    }
}

impl WorkerPool {
    /// A pool of `threads` workers. Zero is treated as one.
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
        }
    }

    /// Number of workers.
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// The indices worker `worker` handles for `len` items.
    pub fn stride(&self, worker: usize, len: usize) -> impl Iterator<Item = usize> {
        (worker..len).step_by(self.threads)
    }

    /// Run `f(index, item)` for every item, blocking until all are done.
    ///
    /// A panic in a worker propagates to the caller once all workers
    /// have been joined.
    pub fn for_each<T, F>(&self, items: &mut [T], f: F)
    where
        T: Send,
        F: Fn(usize, &mut T) + Sync,
    {
        if self.threads == 1 || items.len() <= 1 {
            for (i, item) in items.iter_mut().enumerate() {
                f(i, item);
            }
            return;
        }

        let workers = self.threads.min(items.len());
        let mut buckets: Vec<Vec<(usize, &mut T)>> = (0..workers).map(|_| Vec::new()).collect();
        for (i, item) in items.iter_mut().enumerate() {
            buckets[i % workers].push((i, item));
        }

        let f = &f;
        thread::scope(|s| {
            for bucket in buckets {
                s.spawn(move || {
                    for (i, item) in bucket {
                        f(i, item);
                    }
                });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn every_index_visited_once() {
        for threads in [1, 2, 3, 8, 64] {
            let pool = WorkerPool::new(threads);
            let mut items = vec![0usize; 37];
            pool.for_each(&mut items, |i, v| *v += i + 1);
            for (i, v) in items.iter().enumerate() {
                assert_eq!(*v, i + 1, "threads = {threads}");
            }
        }
    }

    #[test]
    fn stride_partitions_indices() {
        let pool = WorkerPool::new(3);
        let mut seen: Vec<usize> = (0..3).flat_map(|t| pool.stride(t, 10)).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert_eq!(pool.stride(1, 10).collect::<Vec<_>>(), vec![1, 4, 7]);
    }

    #[test]
    fn call_joins_before_returning() {
        let counter = AtomicUsize::new(0);
        let mut items = vec![(); 100];
        WorkerPool::new(4).for_each(&mut items, |_, _| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(counter.load(Ordering::Relaxed), 100);
    }

    #[test]
    fn each_call_spawns_its_own_workers() {
        use std::collections::HashSet;
        use std::sync::Mutex;

        let pool = WorkerPool::new(4);
        let run = || {
            let seen = Mutex::new(HashSet::new());
            let mut items = vec![0u8; 16];
            pool.for_each(&mut items, |_, _| {
                seen.lock().unwrap().insert(thread::current().id());
            });
            seen.into_inner().unwrap()
        };
        let first = run();
        let second = run();
        assert_eq!(first.len(), 4);
        assert_eq!(second.len(), 4);
        assert!(first.is_disjoint(&second));
        assert!(!first.contains(&thread::current().id()));
    }

    #[test]
    fn zero_threads_means_one() {
        assert_eq!(WorkerPool::new(0).threads(), 1);
    }

    #[test]
    fn empty_input_is_fine() {
        let mut items: Vec<u8> = Vec::new();
        WorkerPool::new(4).for_each(&mut items, |_, _| unreachable!());
    }
}
