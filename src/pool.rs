//! Bounded worker pool for one build phase.
//!
//! Each phase (base load, every level) gets its own pool; [`WorkerPool::run_all`]
//! is the barrier between phases.

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tokio_util::sync::CancellationToken;

use crate::error::PyramidError;

/// Result of one job submitted to [`WorkerPool::run_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome<T> {
    Completed(T),
    /// The cancellation token fired before the job started.
    Cancelled,
}

impl<T> JobOutcome<T> {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// A fixed-size rayon pool.
pub struct WorkerPool {
    pool: ThreadPool,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("num_threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl WorkerPool {
    /// Create a pool of `num_threads` workers named `<name>-<i>`.
    ///
    /// # Errors
    /// Returns [`PyramidError::WorkerPool`] if `num_threads` is zero or the
    /// threads cannot be spawned.
    pub fn new(num_threads: usize, name: &str) -> Result<Self, PyramidError> {
        if num_threads == 0 {
            return Err(PyramidError::WorkerPool("thread count must be > 0".into()));
        }
        let prefix = name.to_string();
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()
            .map_err(|e| PyramidError::WorkerPool(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Run `job` once per item and wait for all of them.
    ///
    /// Outcomes are returned in item order. Items whose job had not started
    /// when `cancel` fired come back as [`JobOutcome::Cancelled`]; running
    /// jobs are never interrupted.
    pub fn run_all<I, R, F>(
        &self,
        items: Vec<I>,
        cancel: &CancellationToken,
        job: F,
    ) -> Vec<JobOutcome<R>>
    where
        I: Send,
        R: Send,
        F: Fn(I) -> R + Sync + Send,
    {
        self.pool.install(|| {
            items
                .into_par_iter()
                .map(|item| {
                    if cancel.is_cancelled() {
                        JobOutcome::Cancelled
                    } else {
                        JobOutcome::Completed(job(item))
                    }
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    #[test]
    fn test_zero_threads_rejected() {
        assert!(matches!(WorkerPool::new(0, "test"), Err(PyramidError::WorkerPool(_))));
    }

    #[test]
    fn test_runs_every_job_in_order() {
        let pool = WorkerPool::new(4, "test").unwrap();
        let out = pool.run_all((0..100).collect(), &CancellationToken::new(), |i: u32| i * 2);
        let values: Vec<u32> = out
            .into_iter()
            .map(|o| match o {
                JobOutcome::Completed(v) => v,
                JobOutcome::Cancelled => panic!("nothing was cancelled"),
            })
            .collect();
        assert_eq!(values, (0..100).map(|i| i * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_bounded_concurrency() {
        let pool = WorkerPool::new(2, "bounded").unwrap();
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let names = Mutex::new(HashSet::new());

        pool.run_all((0..32).collect(), &CancellationToken::new(), |_: u32| {
            let now = running.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            if let Some(name) = std::thread::current().name() {
                names.lock().insert(name.to_string());
            }
            std::thread::sleep(std::time::Duration::from_millis(2));
            running.fetch_sub(1, Ordering::SeqCst);
        });

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(names.lock().iter().all(|n| n.starts_with("bounded-")));
    }

    #[test]
    fn test_cancelled_before_start() {
        let pool = WorkerPool::new(2, "test").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let out = pool.run_all(vec![1, 2, 3], &cancel, |i: i32| i);
        assert!(out.iter().all(JobOutcome::is_cancelled));
    }

    #[test]
    fn test_cancel_midway() {
        let pool = WorkerPool::new(1, "test").unwrap();
        let cancel = CancellationToken::new();
        let out = pool.run_all((0..10).collect(), &cancel, |i: i32| {
            if i == 0 {
                cancel.cancel();
            }
            i
        });
        // The job that fired the token finished; at least one later job was skipped
        assert!(out.iter().any(|o| matches!(o, JobOutcome::Completed(_))));
        assert!(out.iter().any(JobOutcome::is_cancelled));
    }
}
