//! `FixedPool`: N OS threads draining one `WorkQueue`.
//!
//! Spawns all workers at creation. Each worker blocks in `dequeue`, runs
//! the handler for one item to completion, and loops until it pops a
//! `Stop`. No dynamic scaling.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{debug, error};

use crate::queue::{Job, WorkQueue};

/// Per-item work executed on a pool thread.
///
/// Implemented for any `Fn(usize, T)` closure; the first argument is the
/// worker id.
pub trait JobHandler<T>: Send + Sync + 'static {
    fn handle(&self, worker_id: usize, item: T);
}

impl<T, F> JobHandler<T> for F
where
    F: Fn(usize, T) + Send + Sync + 'static,
{
    fn handle(&self, worker_id: usize, item: T) {
        self(worker_id, item)
    }
}

/// Shared state between the owner and workers.
struct PoolInner<T> {
    queue: WorkQueue<T>,
    /// Workers currently inside the handler.
    active: AtomicUsize,
    /// Items fully handled (including ones whose handler panicked).
    processed: AtomicU64,
    total: usize,
}

pub struct FixedPool<T: Send + 'static> {
    inner: Arc<PoolInner<T>>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl<T: Send + 'static> FixedPool<T> {
    /// Spawn `n` workers running `handler`.
    ///
    /// If a spawn fails, the workers already started are stopped and
    /// joined before the error is returned.
    pub fn new<H: JobHandler<T>>(n: usize, handler: H) -> io::Result<Self> {
        let n = n.max(1);
        let inner = Arc::new(PoolInner {
            queue: WorkQueue::new(),
            active: AtomicUsize::new(0),
            processed: AtomicU64::new(0),
            total: n,
        });
        let handler = Arc::new(handler);

        let mut pool = FixedPool {
            inner,
            handles: Vec::with_capacity(n),
        };
        for worker_id in 0..n {
            let inner = Arc::clone(&pool.inner);
            let handler = Arc::clone(&handler);
            let spawned = thread::Builder::new()
                .name(format!("fsrv-worker-{}", worker_id))
                .spawn(move || worker_loop(inner, handler, worker_id));
            match spawned {
                Ok(handle) => pool.handles.push(handle),
                Err(e) => {
                    error!(worker_id, error = %e, "failed to spawn worker thread");
                    pool.stop_and_join();
                    return Err(e);
                }
            }
        }
        debug!(workers = n, "worker pool started");
        Ok(pool)
    }

    /// Hand one item to the next free worker.
    pub fn submit(&self, item: T) {
        self.inner.queue.enqueue(Job::Work(item));
    }

    pub fn active_workers(&self) -> usize {
        self.inner.active.load(Ordering::Relaxed)
    }

    pub fn total_workers(&self) -> usize {
        self.inner.total
    }

    pub fn processed(&self) -> u64 {
        self.inner.processed.load(Ordering::Relaxed)
    }

    /// Enqueue one `Stop` per worker behind all submitted work and wait
    /// for every worker to exit. Returns the number of items processed.
    pub fn shutdown(mut self) -> u64 {
        self.stop_and_join();
        self.processed()
    }

    fn stop_and_join(&mut self) {
        if self.handles.is_empty() {
            return;
        }
        for _ in 0..self.handles.len() {
            self.inner.queue.enqueue(Job::Stop);
        }
        for handle in self.handles.drain(..) {
            // Handler panics are caught in the worker; a join error means
            // the loop itself died, which leaves nothing to clean up here.
            if handle.join().is_err() {
                error!("worker thread terminated abnormally");
            }
        }
        debug!(
            processed = self.inner.processed.load(Ordering::Relaxed),
            "worker pool stopped"
        );
    }
}

impl<T: Send + 'static> Drop for FixedPool<T> {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

/// Worker thread main loop.
fn worker_loop<T, H>(inner: Arc<PoolInner<T>>, handler: Arc<H>, worker_id: usize)
where
    H: JobHandler<T>,
{
    debug!(worker_id, "worker started");
    loop {
        match inner.queue.dequeue() {
            Job::Stop => break,
            Job::Work(item) => {
                inner.active.fetch_add(1, Ordering::Relaxed);
                let outcome =
                    panic::catch_unwind(AssertUnwindSafe(|| handler.handle(worker_id, item)));
                inner.active.fetch_sub(1, Ordering::Relaxed);
                inner.processed.fetch_add(1, Ordering::Relaxed);
                if outcome.is_err() {
                    error!(worker_id, "job handler panicked");
                }
            }
        }
    }
    debug!(worker_id, "worker exiting");
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn test_pool_sizing() {
        let pool = FixedPool::<u32>::new(3, |_id: usize, _item: u32| {}).unwrap();
        assert_eq!(pool.total_workers(), 3);
        assert_eq!(pool.active_workers(), 0);
        assert_eq!(pool.shutdown(), 0);

        let pool = FixedPool::<u32>::new(0, |_id: usize, _item: u32| {}).unwrap();
        assert_eq!(pool.total_workers(), 1);
    }

    #[test]
    fn test_shutdown_drains_submitted_work() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pool = {
            let seen = Arc::clone(&seen);
            FixedPool::new(4, move |_id: usize, item: u32| {
                thread::sleep(Duration::from_millis(1));
                seen.lock().unwrap().push(item);
            })
            .unwrap()
        };

        for i in 0..100 {
            pool.submit(i);
        }
        assert_eq!(pool.shutdown(), 100);

        let mut seen = seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_single_worker_preserves_fifo() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let pool = {
            let seen = Arc::clone(&seen);
            FixedPool::new(1, move |_id: usize, item: u32| {
                seen.lock().unwrap().push(item)
            })
            .unwrap()
        };
        for i in 0..50 {
            pool.submit(i);
        }
        pool.shutdown();
        assert_eq!(*seen.lock().unwrap(), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_workers_run_concurrently() {
        // Two workers each hold a job until both have started.
        let (tx, rx) = mpsc::channel();
        let gate = Arc::new(std::sync::Barrier::new(2));
        let pool = {
            let gate = Arc::clone(&gate);
            let tx = Mutex::new(tx);
            FixedPool::new(2, move |id: usize, _item: ()| {
                gate.wait();
                tx.lock().unwrap().send(id).unwrap();
            })
            .unwrap()
        };
        pool.submit(());
        pool.submit(());

        let mut ids = vec![
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
            rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        ];
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1]);
        pool.shutdown();
    }

    #[test]
    fn test_panic_does_not_kill_worker() {
        let done = Arc::new(AtomicUsize::new(0));
        let pool = {
            let done = Arc::clone(&done);
            FixedPool::new(1, move |_id: usize, item: u32| {
                if item == 1 {
                    panic!("boom");
                }
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap()
        };
        pool.submit(0);
        pool.submit(1);
        pool.submit(2);
        assert_eq!(pool.shutdown(), 3);
        assert_eq!(done.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_joins_workers() {
        let done = Arc::new(AtomicUsize::new(0));
        {
            let done = Arc::clone(&done);
            let pool = FixedPool::new(2, move |_id: usize, _item: ()| {
                thread::sleep(Duration::from_millis(5));
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
            for _ in 0..10 {
                pool.submit(());
            }
        }
        assert_eq!(done.load(Ordering::SeqCst), 10);
    }

    struct Summer {
        total: Arc<AtomicU64>,
    }

    impl JobHandler<u64> for Summer {
        fn handle(&self, _worker_id: usize, item: u64) {
            self.total.fetch_add(item, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_struct_handler() {
        let total = Arc::new(AtomicU64::new(0));
        let pool = FixedPool::new(
            3,
            Summer {
                total: Arc::clone(&total),
            },
        )
        .unwrap();
        for i in 1..=10 {
            pool.submit(i);
        }
        pool.shutdown();
        assert_eq!(total.load(Ordering::SeqCst), 55);
    }
}
