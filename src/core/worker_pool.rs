//! # Bounded Worker Pool
//!
//! A small fixed pool of background threads, each fed through its own
//! channel pair. The pool is the crate's "counting semaphore": every worker
//! accepts at most [`MAX_JOBS_IN_FLIGHT_PER_WORKER`] job at a time, so a pool
//! of N workers holds exactly N permits. Dispatch is non-blocking: when every
//! worker is busy the job is handed back to the caller, which re-queues it and
//! tries again next frame. The main thread never waits on a worker and a
//! worker never calls back into the main thread; completed outcomes are pulled
//! with [`WorkerPool::drain_completed`].

use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::debug;

/// Maximum number of jobs a single worker may own at once.
///
/// Kept at 1 so that the pool behaves exactly like an N-permit semaphore and
/// per-worker FIFO order is trivially preserved.
pub const MAX_JOBS_IN_FLIGHT_PER_WORKER: usize = 1;

/// Communication endpoints for one worker thread.
struct WorkerChannel<J, R> {
    job_sender: Sender<J>,
    result_receiver: Receiver<R>,
    jobs_in_flight: usize,
    _worker: JoinHandle<()>,
}

/// A pool of worker threads running one job function over submitted jobs.
///
/// `J` is the job payload moved to a worker; `R` is the outcome moved back.
/// Both cross thread boundaries, so both must be `Send`.
pub struct WorkerPool<J, R> {
    channels: Vec<WorkerChannel<J, R>>,
    next_channel: usize,
}

impl<J: Send + 'static, R: Send + 'static> WorkerPool<J, R> {
    /// Spawns `worker_count` threads, each running `run` over the jobs it
    /// receives until the pool is dropped.
    ///
    /// A `worker_count` of zero is allowed and produces a pool that rejects
    /// every dispatch; schedulers fall back to their inline paths, which is
    /// also what the deterministic tests rely on.
    ///
    /// # Panics
    /// Panics if the OS refuses to spawn a thread.
    pub fn new<F>(worker_count: usize, thread_name_prefix: &str, run: F) -> Self
    where
        F: Fn(J) -> R + Send + Sync + 'static,
    {
        let run = Arc::new(run);
        let mut channels = Vec::with_capacity(worker_count);

        for worker_index in 0..worker_count {
            let (job_tx, job_rx) = channel::<J>();
            let (result_tx, result_rx) = channel::<R>();
            let run = run.clone();

            let worker = thread::Builder::new()
                .name(format!("{thread_name_prefix}-{worker_index}"))
                .spawn(move || {
                    while let Ok(job) = job_rx.recv() {
                        let result = run(job);
                        if result_tx.send(result).is_err() {
                            // Pool dropped; nobody is listening any more.
                            break;
                        }
                    }
                })
                .expect("failed to spawn worker thread");

            channels.push(WorkerChannel {
                job_sender: job_tx,
                result_receiver: result_rx,
                jobs_in_flight: 0,
                _worker: worker,
            });
        }

        WorkerPool {
            channels,
            next_channel: 0,
        }
    }

    /// Number of worker threads in the pool.
    pub fn worker_count(&self) -> usize {
        self.channels.len()
    }

    /// Total jobs currently owned by workers.
    pub fn jobs_in_flight(&self) -> usize {
        self.channels.iter().map(|c| c.jobs_in_flight).sum()
    }

    /// Whether at least one worker can accept a job right now.
    pub fn has_capacity(&self) -> bool {
        self.channels
            .iter()
            .any(|c| c.jobs_in_flight < MAX_JOBS_IN_FLIGHT_PER_WORKER)
    }

    /// Finds the next free worker, round-robin from the last dispatch point.
    fn find_available_channel(&self) -> Option<usize> {
        if self.channels.is_empty() {
            return None;
        }

        let start = self.next_channel % self.channels.len();
        let mut current = start;
        loop {
            if self.channels[current].jobs_in_flight < MAX_JOBS_IN_FLIGHT_PER_WORKER {
                return Some(current);
            }
            current = (current + 1) % self.channels.len();
            if current == start {
                return None;
            }
        }
    }

    /// Attempts to hand `job` to a free worker without blocking.
    ///
    /// Returns the job back as `Err` when every worker is busy (or the pool
    /// has no workers), so the caller can re-queue it. This is the
    /// "try-acquire, else defer" edge of the whole pipeline: nothing here ever
    /// waits.
    pub fn try_dispatch(&mut self, job: J) -> Result<(), J> {
        let Some(channel_index) = self.find_available_channel() else {
            return Err(job);
        };

        match self.channels[channel_index].job_sender.send(job) {
            Ok(()) => {
                self.channels[channel_index].jobs_in_flight += 1;
                self.next_channel = (channel_index + 1) % self.channels.len();
                Ok(())
            }
            Err(send_error) => {
                debug!("worker channel {channel_index} disconnected; job returned to caller");
                Err(send_error.0)
            }
        }
    }

    /// Collects up to `max` completed outcomes from the workers.
    ///
    /// Outcomes from a single worker arrive in the order that worker finished
    /// them; no order is promised across workers.
    pub fn drain_completed(&mut self, max: usize) -> Vec<R> {
        let mut completed = Vec::new();
        'outer: for channel in &mut self.channels {
            while let Ok(result) = channel.result_receiver.try_recv() {
                channel.jobs_in_flight -= 1;
                completed.push(result);
                if completed.len() >= max {
                    break 'outer;
                }
            }
        }
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn drain_all_within(pool: &mut WorkerPool<u32, u32>, expected: usize) -> Vec<u32> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut collected = Vec::new();
        while collected.len() < expected && Instant::now() < deadline {
            collected.extend(pool.drain_completed(usize::MAX));
            thread::sleep(Duration::from_millis(1));
        }
        collected
    }

    use std::thread;

    #[test]
    fn dispatch_beyond_worker_count_is_rejected_not_blocked() {
        let mut pool: WorkerPool<u32, u32> = WorkerPool::new(2, "test-worker", |n| {
            thread::sleep(Duration::from_millis(50));
            n * 2
        });

        assert!(pool.try_dispatch(1).is_ok());
        assert!(pool.try_dispatch(2).is_ok());
        // Both permits taken; the third job must come straight back.
        assert_eq!(pool.try_dispatch(3), Err(3));
        assert!(!pool.has_capacity());

        let mut results = drain_all_within(&mut pool, 2);
        results.sort_unstable();
        assert_eq!(results, vec![2, 4]);
        assert!(pool.has_capacity());
    }

    #[test]
    fn zero_worker_pool_rejects_everything() {
        let mut pool: WorkerPool<u32, u32> = WorkerPool::new(0, "test-worker", |n| n);
        assert_eq!(pool.worker_count(), 0);
        assert_eq!(pool.try_dispatch(9), Err(9));
    }

    #[test]
    fn in_flight_count_tracks_dispatch_and_drain() {
        let mut pool: WorkerPool<u32, u32> = WorkerPool::new(1, "test-worker", |n| n + 1);
        assert_eq!(pool.jobs_in_flight(), 0);
        pool.try_dispatch(5).unwrap();
        assert_eq!(pool.jobs_in_flight(), 1);

        let results = drain_all_within(&mut pool, 1);
        assert_eq!(results, vec![6]);
        assert_eq!(pool.jobs_in_flight(), 0);
    }
}
