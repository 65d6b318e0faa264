//! # Mesh Scheduler
//!
//! Two-lane scheduling of mesh builds over a bounded worker pool.
//!
//! The priority lane carries edit-driven remeshes (the player just changed a
//! block and is staring at the hole); the normal lane carries streaming
//! builds for newly resident chunks. Priority work is dispatched first each
//! frame up to its sub-budget, may bypass the outstanding cap, and when every
//! worker slot is busy a small number of priority builds run inline on the
//! main thread rather than wait a frame. Whatever the priority lane does not
//! use of the dispatch budget goes to the normal lane.
//!
//! One dedupe set spans both lanes and the in-flight set, so a coordinate is
//! built at most once at a time no matter how many times it is requested. A
//! normal-lane request that is re-requested with priority is promoted rather
//! than duplicated.
//!
//! Builds capture their inputs on the main thread at dispatch time: a cloned
//! chunk handle and a neighbor snapshot. The built mesh records the chunk
//! version it read; staleness against later edits is the reconciler's
//! problem, not ours, and nothing here cancels an obsolete build.

use std::collections::{HashSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, warn};

use crate::config::StreamingConfig;
use crate::core::{Shared, WorkerPool};
use crate::error::{panic_message, MeshError};
use crate::voxels::chunk::ChunkData;
use crate::voxels::coords::ChunkPos;
use crate::voxels::store::ChunkStore;

use super::{ChunkMesh, MeshBuilder, NeighborChunks, TextureAtlas};

/// Payload moved to a mesh worker. Inputs are captured at dispatch time on
/// the main thread.
struct MeshJob {
    position: ChunkPos,
    priority: bool,
    fast: bool,
    chunk: Shared<ChunkData>,
    neighbors: NeighborChunks,
    builder: Arc<dyn MeshBuilder>,
    atlas: Arc<TextureAtlas>,
}

/// What a mesh worker sends back.
struct MeshOutcome {
    position: ChunkPos,
    priority: bool,
    result: Result<ChunkMesh, MeshError>,
}

/// Counters exposed for tests and debug overlays.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeshSchedulerStats {
    /// Requests declined because the outstanding-job cap was reached.
    pub capacity_rejections: u64,
    /// Meshes built and handed to the reconciler, inline builds included.
    pub meshes_built: u64,
    /// Priority builds that ran inline on the main thread.
    pub inline_builds: u64,
    /// Builds that panicked or produced an invalid mesh.
    pub failures: u64,
}

/// Bounded background mesh building with a priority and a normal lane.
pub struct MeshScheduler {
    pool: WorkerPool<MeshJob, MeshOutcome>,
    builder: Arc<dyn MeshBuilder>,
    atlas: Arc<TextureAtlas>,
    priority_queue: VecDeque<ChunkPos>,
    normal_queue: VecDeque<ChunkPos>,
    /// Coordinates queued in either lane or in flight; the dedupe set.
    tracked: HashSet<ChunkPos>,
    in_flight: HashSet<ChunkPos>,
    /// Finished meshes awaiting the reconciler, per lane of origin.
    completed_priority: VecDeque<ChunkMesh>,
    completed_normal: VecDeque<ChunkMesh>,
    max_outstanding: usize,
    priority_sub_budget: usize,
    max_inline_builds: usize,
    failure_logged: HashSet<ChunkPos>,
    stats: MeshSchedulerStats,
}

fn run_mesh_job(job: MeshJob) -> MeshOutcome {
    let result = catch_unwind(AssertUnwindSafe(|| {
        let chunk = job.chunk.read();
        job.builder.build(&chunk, &job.neighbors, &job.atlas, job.fast)
    }))
    .map_err(|payload| MeshError::Panicked(panic_message(payload)))
    .and_then(|mesh| mesh.validate().map(|()| mesh));

    MeshOutcome {
        position: job.position,
        priority: job.priority,
        result,
    }
}

impl MeshScheduler {
    /// Creates a scheduler sized from `config`, building through `builder`.
    pub fn new(
        config: &StreamingConfig,
        builder: Arc<dyn MeshBuilder>,
        atlas: Arc<TextureAtlas>,
    ) -> Self {
        let pool = WorkerPool::new(config.mesh_worker_count, "mesh-build", run_mesh_job);

        MeshScheduler {
            pool,
            builder,
            atlas,
            priority_queue: VecDeque::new(),
            normal_queue: VecDeque::new(),
            tracked: HashSet::new(),
            in_flight: HashSet::new(),
            completed_priority: VecDeque::new(),
            completed_normal: VecDeque::new(),
            max_outstanding: config.max_outstanding_mesh_jobs,
            priority_sub_budget: config.priority_sub_budget,
            max_inline_builds: config.max_inline_builds,
            failure_logged: HashSet::new(),
            stats: MeshSchedulerStats::default(),
        }
    }

    /// Requests a mesh build for `position`.
    ///
    /// Deduped against both lanes and in-flight work. A coordinate already
    /// waiting in the normal lane is promoted when re-requested with
    /// `priority`. Past the outstanding cap, only priority and near-player
    /// requests are admitted.
    pub fn request(&mut self, position: ChunkPos, priority: bool, near_player: bool) -> bool {
        if self.tracked.contains(&position) {
            if priority && !self.in_flight.contains(&position) {
                let before = self.normal_queue.len();
                self.normal_queue.retain(|queued| *queued != position);
                if self.normal_queue.len() != before {
                    self.priority_queue.push_back(position);
                }
            }
            return false;
        }
        if !priority && !near_player && self.tracked.len() >= self.max_outstanding {
            self.stats.capacity_rejections += 1;
            return false;
        }

        self.tracked.insert(position);
        if priority {
            self.priority_queue.push_back(position);
        } else {
            self.normal_queue.push_back(position);
        }
        true
    }

    /// Dispatches up to `budget` builds, priority lane first.
    ///
    /// The priority lane drains first, up to `priority_sub_budget`; the
    /// normal lane fills whatever the priority lane did not actually use, so
    /// an idle priority lane costs the normal lane nothing. When no worker
    /// slot is free a priority build runs inline on the main thread (degraded
    /// mode, at most `max_inline_builds` per call) while a normal build just
    /// waits for the next frame. `fast` selects degraded meshing for this
    /// frame's dispatches.
    pub fn process_budget(&mut self, budget: usize, store: &ChunkStore, fast: bool) {
        let mut inline_used = 0;
        let mut priority_dispatched = 0;
        let priority_budget = self.priority_sub_budget.min(budget);

        while priority_dispatched < priority_budget {
            let Some(position) = self.priority_queue.pop_front() else {
                break;
            };
            let Some(job) = self.capture_job(position, true, fast, store) else {
                continue;
            };

            match self.pool.try_dispatch(job) {
                Ok(()) => {
                    self.in_flight.insert(position);
                    priority_dispatched += 1;
                }
                Err(job) => {
                    if inline_used < self.max_inline_builds {
                        inline_used += 1;
                        priority_dispatched += 1;
                        self.build_inline(job);
                    } else {
                        self.priority_queue.push_front(position);
                        break;
                    }
                }
            }
        }

        let normal_budget = budget - priority_dispatched;
        for _ in 0..normal_budget {
            let Some(position) = self.normal_queue.pop_front() else {
                break;
            };
            let Some(job) = self.capture_job(position, false, fast, store) else {
                continue;
            };

            match self.pool.try_dispatch(job) {
                Ok(()) => {
                    self.in_flight.insert(position);
                }
                Err(job) => {
                    self.normal_queue.push_front(job.position);
                    break;
                }
            }
        }
    }

    /// Pops the oldest finished mesh, priority-lane results first.
    ///
    /// The reconciler calls this up to its per-frame apply budget. Returns
    /// `None` when nothing has finished.
    pub fn pop_completed(&mut self) -> Option<ChunkMesh> {
        self.pump_completions();
        self.completed_priority
            .pop_front()
            .or_else(|| self.completed_normal.pop_front())
    }

    /// Whether `position` is queued in either lane or in flight.
    pub fn is_tracked(&self, position: ChunkPos) -> bool {
        self.tracked.contains(&position)
    }

    /// All coordinates currently queued or in flight; composed into the
    /// eviction keep set.
    pub fn tracked(&self) -> &HashSet<ChunkPos> {
        &self.tracked
    }

    /// Queued plus in-flight build count.
    pub fn outstanding(&self) -> usize {
        self.tracked.len()
    }

    /// Builds waiting in the normal lane; the degraded-meshing trigger reads
    /// this as its backlog signal.
    pub fn normal_backlog(&self) -> usize {
        self.normal_queue.len()
    }

    /// Scheduler counters.
    pub fn stats(&self) -> MeshSchedulerStats {
        self.stats
    }

    /// Snapshots a build's inputs from the store. Returns `None` (and drops
    /// the request) when the chunk has been evicted since it was queued.
    fn capture_job(
        &mut self,
        position: ChunkPos,
        priority: bool,
        fast: bool,
        store: &ChunkStore,
    ) -> Option<MeshJob> {
        let Some(chunk) = store.try_get(position) else {
            debug!("dropping mesh request {position:?}: chunk no longer resident");
            self.tracked.remove(&position);
            return None;
        };

        Some(MeshJob {
            position,
            priority,
            fast,
            chunk,
            neighbors: NeighborChunks::new(store.neighbor_handles(position)),
            builder: self.builder.clone(),
            atlas: self.atlas.clone(),
        })
    }

    /// Runs a priority build on the main thread when the pool is saturated.
    /// Always degraded: the point is to close an edit hole this frame, not to
    /// stall the frame on seam-perfect geometry.
    fn build_inline(&mut self, mut job: MeshJob) {
        job.fast = true;
        self.stats.inline_builds += 1;
        self.settle(run_mesh_job(job));
    }

    /// Moves finished pool results into the per-lane completion queues.
    fn pump_completions(&mut self) {
        for outcome in self.pool.drain_completed(usize::MAX) {
            self.settle(outcome);
        }
    }

    fn settle(&mut self, outcome: MeshOutcome) {
        self.tracked.remove(&outcome.position);
        self.in_flight.remove(&outcome.position);

        match outcome.result {
            Ok(mesh) => {
                self.stats.meshes_built += 1;
                self.failure_logged.remove(&outcome.position);
                if outcome.priority {
                    self.completed_priority.push_back(mesh);
                } else {
                    self.completed_normal.push_back(mesh);
                }
            }
            Err(error) => {
                self.stats.failures += 1;
                if self.failure_logged.insert(outcome.position) {
                    warn!("mesh build failed at {:?}: {error}", outcome.position);
                }
            }
        }
    }
}
