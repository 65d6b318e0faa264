//! # Generation Scheduler
//!
//! Turns "this coordinate has no chunk data" into a resident chunk, off the
//! main thread.
//!
//! The scheduler keeps a FIFO intake queue with a dedupe set covering both
//! queued and in-flight coordinates, enforces a cap on the total backlog
//! (with a near-player override so forward progress around the viewer is
//! never starved by far work), and dispatches to a bounded worker pool with
//! the non-blocking try/defer discipline used everywhere in this crate.
//! Generated block buffers come back as outcome records and are inserted
//! into the chunk store by [`GenerationScheduler::drain_completed`], on the
//! main thread, keeping the store single-writer.

use std::collections::{HashSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, warn};

use crate::config::StreamingConfig;
use crate::core::WorkerPool;
use crate::error::{panic_message, GenerationError};
use crate::voxels::chunk::ChunkData;
use crate::voxels::coords::ChunkPos;
use crate::voxels::store::ChunkStore;

use super::WorldGenerator;

/// Payload moved to a generation worker.
struct GenerationJob {
    position: ChunkPos,
    generator: Arc<dyn WorldGenerator>,
}

/// What a generation worker sends back.
struct GenerationOutcome {
    position: ChunkPos,
    result: Result<Vec<u8>, GenerationError>,
}

/// Counters exposed for tests and debug overlays.
#[derive(Debug, Default, Clone, Copy)]
pub struct GenerationSchedulerStats {
    /// Enqueues declined because the outstanding-job cap was reached.
    pub capacity_rejections: u64,
    /// Chunks successfully inserted into the store.
    pub chunks_generated: u64,
    /// Jobs that ended in a generation error.
    pub failures: u64,
}

/// Bounded background generation of chunk data.
pub struct GenerationScheduler {
    pool: WorkerPool<GenerationJob, GenerationOutcome>,
    generator: Arc<dyn WorldGenerator>,
    queue: VecDeque<ChunkPos>,
    /// Coordinates currently queued or in flight; the dedupe set.
    tracked: HashSet<ChunkPos>,
    in_flight: HashSet<ChunkPos>,
    max_outstanding: usize,
    /// Coordinates whose failure has already been logged, to stop log storms.
    failure_logged: HashSet<ChunkPos>,
    stats: GenerationSchedulerStats,
}

impl GenerationScheduler {
    /// Creates a scheduler sized from `config`, generating through `generator`.
    pub fn new(config: &StreamingConfig, generator: Arc<dyn WorldGenerator>) -> Self {
        let pool = WorkerPool::new(config.chunk_worker_count, "chunk-gen", |job: GenerationJob| {
            let result = catch_unwind(AssertUnwindSafe(|| job.generator.generate(job.position)))
                .map_err(|payload| GenerationError::Panicked(panic_message(payload)));
            GenerationOutcome {
                position: job.position,
                result,
            }
        });

        GenerationScheduler {
            pool,
            generator,
            queue: VecDeque::new(),
            tracked: HashSet::new(),
            in_flight: HashSet::new(),
            max_outstanding: config.max_outstanding_chunk_jobs,
            failure_logged: HashSet::new(),
            stats: GenerationSchedulerStats::default(),
        }
    }

    /// Requests generation of the chunk at `position`.
    ///
    /// A no-op when the coordinate is already queued or in flight. When the
    /// backlog is at the outstanding cap the request is declined unless
    /// `near_player` is set; the active-region manager re-evaluates every
    /// frame, so a declined coordinate is simply retried later.
    pub fn enqueue(&mut self, position: ChunkPos, near_player: bool) -> bool {
        if self.tracked.contains(&position) {
            return false;
        }
        if !near_player && self.tracked.len() >= self.max_outstanding {
            self.stats.capacity_rejections += 1;
            return false;
        }

        self.tracked.insert(position);
        self.queue.push_back(position);
        true
    }

    /// Dispatches up to `budget` queued coordinates to the worker pool.
    ///
    /// Never blocks: when no worker slot is free the coordinate goes back on
    /// the queue front and scheduling stops for this frame.
    pub fn process_budget(&mut self, budget: usize) {
        for _ in 0..budget {
            let Some(position) = self.queue.pop_front() else {
                break;
            };

            let job = GenerationJob {
                position,
                generator: self.generator.clone(),
            };
            match self.pool.try_dispatch(job) {
                Ok(()) => {
                    self.in_flight.insert(position);
                }
                Err(job) => {
                    self.queue.push_front(job.position);
                    break;
                }
            }
        }
    }

    /// Inserts up to `max` completed chunks into `store`. Main thread only.
    ///
    /// Returns the number of chunks actually inserted. Failed jobs are logged
    /// once per coordinate and dropped; the coordinate becomes eligible for
    /// re-enqueue on a later frame.
    pub fn drain_completed(&mut self, store: &mut ChunkStore, max: usize) -> usize {
        let mut inserted = 0;

        for outcome in self.pool.drain_completed(max) {
            self.tracked.remove(&outcome.position);
            self.in_flight.remove(&outcome.position);

            let chunk = outcome
                .result
                .and_then(|blocks| ChunkData::from_blocks(outcome.position, blocks));

            match chunk {
                Ok(chunk) => {
                    if store.insert(chunk) {
                        inserted += 1;
                        self.stats.chunks_generated += 1;
                        self.failure_logged.remove(&outcome.position);
                    } else {
                        debug!(
                            "discarding generated chunk {:?}: already resident",
                            outcome.position
                        );
                    }
                }
                Err(error) => {
                    self.stats.failures += 1;
                    if self.failure_logged.insert(outcome.position) {
                        warn!("chunk generation failed at {:?}: {error}", outcome.position);
                    }
                }
            }
        }

        inserted
    }

    /// Whether `position` is queued or in flight.
    pub fn is_tracked(&self, position: ChunkPos) -> bool {
        self.tracked.contains(&position)
    }

    /// All coordinates currently queued or in flight.
    ///
    /// Eviction composes this into its keep set so an in-flight job's chunk
    /// is never unloaded underneath it.
    pub fn tracked(&self) -> &HashSet<ChunkPos> {
        &self.tracked
    }

    /// Queued plus in-flight job count.
    pub fn outstanding(&self) -> usize {
        self.tracked.len()
    }

    /// Scheduler counters.
    pub fn stats(&self) -> GenerationSchedulerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::FlatGenerator;
    use crate::voxels::block::BlockType;
    use cgmath::Point3;
    use std::time::{Duration, Instant};

    fn test_config(workers: usize, cap: usize) -> StreamingConfig {
        StreamingConfig {
            chunk_worker_count: workers,
            max_outstanding_chunk_jobs: cap,
            ..StreamingConfig::default()
        }
    }

    fn flat_scheduler(workers: usize, cap: usize) -> GenerationScheduler {
        GenerationScheduler::new(
            &test_config(workers, cap),
            Arc::new(FlatGenerator::new(4, BlockType::STONE)),
        )
    }

    #[test]
    fn duplicate_enqueues_are_deduped() {
        let mut scheduler = flat_scheduler(1, 64);
        let position = Point3::new(0, 0, 0);

        assert!(scheduler.enqueue(position, false));
        for _ in 0..100 {
            assert!(!scheduler.enqueue(position, false));
        }
        assert_eq!(scheduler.outstanding(), 1);
    }

    #[test]
    fn cap_rejects_far_work_but_admits_near_player_work() {
        let mut scheduler = flat_scheduler(1, 2);

        assert!(scheduler.enqueue(Point3::new(10, 0, 0), false));
        assert!(scheduler.enqueue(Point3::new(11, 0, 0), false));
        // Backlog full: far work declined, near work still admitted.
        assert!(!scheduler.enqueue(Point3::new(12, 0, 0), false));
        assert!(scheduler.enqueue(Point3::new(0, 0, 0), true));

        assert_eq!(scheduler.stats().capacity_rejections, 1);
        assert_eq!(scheduler.outstanding(), 3);
    }

    #[test]
    fn generated_chunks_land_in_the_store() {
        let mut scheduler = flat_scheduler(2, 64);
        let mut store = ChunkStore::new();
        let position = Point3::new(0, 0, 0);

        scheduler.enqueue(position, true);
        scheduler.process_budget(4);

        let deadline = Instant::now() + Duration::from_secs(5);
        while !store.contains(position) && Instant::now() < deadline {
            scheduler.drain_completed(&mut store, usize::MAX);
            std::thread::sleep(Duration::from_millis(1));
        }

        assert!(store.contains(position));
        assert!(!scheduler.is_tracked(position));
        assert_eq!(scheduler.stats().chunks_generated, 1);
    }

    #[test]
    fn generator_panics_become_logged_failures() {
        struct PanickingGenerator;
        impl WorldGenerator for PanickingGenerator {
            fn generate(&self, _position: ChunkPos) -> Vec<u8> {
                panic!("boom");
            }
        }

        let mut scheduler =
            GenerationScheduler::new(&test_config(1, 64), Arc::new(PanickingGenerator));
        let mut store = ChunkStore::new();
        let position = Point3::new(0, 0, 0);

        scheduler.enqueue(position, true);
        scheduler.process_budget(1);

        let deadline = Instant::now() + Duration::from_secs(5);
        while scheduler.stats().failures == 0 && Instant::now() < deadline {
            scheduler.drain_completed(&mut store, usize::MAX);
            std::thread::sleep(Duration::from_millis(1));
        }

        assert_eq!(scheduler.stats().failures, 1);
        assert!(store.is_empty());
        // The coordinate is free for a retry on a later frame.
        assert!(scheduler.enqueue(position, false));
    }

    #[test]
    fn dispatch_without_free_workers_requeues_and_stops() {
        let mut scheduler = flat_scheduler(0, 64);
        scheduler.enqueue(Point3::new(0, 0, 0), false);
        scheduler.enqueue(Point3::new(1, 0, 0), false);

        scheduler.process_budget(8);

        // Nothing dispatched, nothing lost.
        assert_eq!(scheduler.outstanding(), 2);
        assert_eq!(scheduler.queue.len(), 2);
        assert_eq!(scheduler.queue.front(), Some(&Point3::new(0, 0, 0)));
    }
}
