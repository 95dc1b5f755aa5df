//! Worker pool - bounded streaming of matches over a rayon thread pool
//!
//! Level 4 - Utilities
//!
//! Results come back in completion order. At most `capacity` jobs are in
//! flight, so the descriptor stream is never fully materialized.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{HarnessError, Result};

/// Logical CPUs visible to this process (1 if unknown)
pub fn available_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// floor(available * fraction), never below 1
pub fn worker_count(available: usize, fraction: f64) -> usize {
    ((available as f64 * fraction).floor() as usize).max(1)
}

/// Fixed-size pool of match workers
pub struct ExecutionPool {
    pool: ThreadPool,
    workers: usize,
    capacity: usize,
}

impl ExecutionPool {
    pub fn new(workers: usize, capacity: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("catanbench-worker-{}", i))
            .build()
            .map_err(|e| {
                HarnessError::PoolInfrastructure(format!("failed to start {} workers: {}", workers, e))
            })?;

        Ok(Self {
            pool,
            workers,
            capacity: capacity.max(1),
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run `work` on every item and hand each result to `sink` as it completes.
    ///
    /// `sink` runs on the calling thread. A job that panics out of `work`
    /// aborts the stream with a pool infrastructure error.
    pub fn stream<I, T, R, F, S>(&self, items: I, work: F, mut sink: S) -> Result<u64>
    where
        I: IntoIterator<Item = T>,
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
        S: FnMut(R),
    {
        let work = Arc::new(work);
        let (tx, rx) = mpsc::channel::<thread::Result<R>>();
        let mut in_flight = 0usize;
        let mut delivered = 0u64;

        for item in items {
            while in_flight >= self.capacity {
                deliver(&rx, &mut sink)?;
                in_flight -= 1;
                delivered += 1;
            }

            let tx = tx.clone();
            let work = Arc::clone(&work);
            self.pool.spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| work(item)));
                // Receiver is gone only if the stream already failed
                let _ = tx.send(result);
            });
            in_flight += 1;
        }
        drop(tx);

        while in_flight > 0 {
            deliver(&rx, &mut sink)?;
            in_flight -= 1;
            delivered += 1;
        }

        Ok(delivered)
    }
}

fn deliver<R, S: FnMut(R)>(rx: &Receiver<thread::Result<R>>, sink: &mut S) -> Result<()> {
    match rx.recv() {
        Ok(Ok(result)) => {
            sink(result);
            Ok(())
        }
        Ok(Err(payload)) => Err(HarnessError::PoolInfrastructure(format!(
            "worker job panicked: {}",
            panic_message(payload.as_ref())
        ))),
        Err(_) => Err(HarnessError::PoolInfrastructure(
            "result channel closed with jobs still in flight".to_string(),
        )),
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_worker_count() {
        assert_eq!(worker_count(16, 0.95), 15);
        assert_eq!(worker_count(1, 0.95), 1);
        assert_eq!(worker_count(8, 1.0), 8);
        assert_eq!(worker_count(4, 0.1), 1);
    }

    #[test]
    fn test_available_workers_is_positive() {
        assert!(available_workers() >= 1);
    }

    #[test]
    fn test_stream_delivers_every_result() {
        let pool = ExecutionPool::new(4, 8).unwrap();
        let mut seen = Vec::new();
        let delivered = pool.stream(0..100u64, |n| n * 2, |r| seen.push(r)).unwrap();

        assert_eq!(delivered, 100);
        seen.sort_unstable();
        assert_eq!(seen, (0..100u64).map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_stream_respects_capacity() {
        let pool = ExecutionPool::new(4, 3).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (r, p) = (Arc::clone(&running), Arc::clone(&peak));
        pool.stream(
            0..50,
            move |_: i32| {
                let now = r.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                thread::sleep(std::time::Duration::from_millis(1));
                r.fetch_sub(1, Ordering::SeqCst);
            },
            |_| {},
        )
        .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[test]
    fn test_empty_stream() {
        let pool = ExecutionPool::new(2, 4).unwrap();
        let delivered = pool
            .stream(std::iter::empty::<u8>(), |n| n, |_| panic!("nothing to deliver"))
            .unwrap();
        assert_eq!(delivered, 0);
    }

    #[test]
    fn test_panicking_job_is_infrastructure_error() {
        let pool = ExecutionPool::new(2, 4).unwrap();
        let result = pool.stream(
            0..10,
            |n: i32| {
                if n == 5 {
                    panic!("worker died");
                }
                n
            },
            |_| {},
        );

        match result {
            Err(HarnessError::PoolInfrastructure(message)) => assert!(message.contains("worker died")),
            other => panic!("expected pool failure, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static text");
        assert_eq!(panic_message(payload.as_ref()), "static text");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned text"));
        assert_eq!(panic_message(payload.as_ref()), "owned text");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
