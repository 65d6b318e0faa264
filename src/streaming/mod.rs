//! # Streaming Module
//!
//! The frame-driven pipeline that keeps the world around the player resident
//! and meshed: region management, the prewarm gate, and the reconciliation of
//! background work back onto the main thread.
//!
//! [`StreamingPipeline`] is the single entry point. The host calls
//! [`frame`](StreamingPipeline::frame) once per render frame with the player
//! position and lets the pipeline budget everything else; edits go through
//! [`set_block`](StreamingPipeline::set_block) and show up remeshed within a
//! frame or two.

pub mod gate;
pub mod reconcile;
pub mod region;

pub use gate::{GateState, PrewarmGate};
pub use reconcile::{MeshCache, Reconciler, ReconcilerStats};
pub use region::ActiveRegionManager;

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use cgmath::Point3;
use log::warn;

use crate::config::StreamingConfig;
use crate::error::panic_message;
use crate::generation::scheduler::{GenerationScheduler, GenerationSchedulerStats};
use crate::generation::WorldGenerator;
use crate::meshing::{ChunkMesh, MeshBuilder, MeshScheduler, MeshSchedulerStats, TextureAtlas};
use crate::persistence::ChunkPersistence;
use crate::voxels::block::{BlockFace, BlockType};
use crate::voxels::chunk::CHUNK_DIMENSION;
use crate::voxels::coords::{block_to_chunk_local, world_to_chunk, ChunkPos};
use crate::voxels::store::ChunkStore;

/// What one call to [`StreamingPipeline::frame`] did.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameReport {
    /// Whether the prewarm gate is open after this frame.
    pub gate_open: bool,
    /// Whether this frame's mesh dispatches used degraded meshing.
    pub fast_meshing: bool,
    /// Generation requests issued (persistence restores included).
    pub generation_issued: usize,
    /// Mesh build requests issued.
    pub mesh_issued: usize,
    /// Meshes installed into the cache.
    pub meshes_applied: usize,
    /// Chunks evicted from the store.
    pub chunks_evicted: usize,
    /// Resident chunk count after the frame.
    pub resident_chunks: usize,
    /// Installed mesh count after the frame.
    pub cached_meshes: usize,
}

/// The whole streaming machine behind one handle.
pub struct StreamingPipeline {
    config: StreamingConfig,
    store: ChunkStore,
    cache: MeshCache,
    generation: GenerationScheduler,
    meshes: MeshScheduler,
    region: ActiveRegionManager,
    reconciler: Reconciler,
    gate: PrewarmGate,
    generator: Arc<dyn WorldGenerator>,
    persistence: Box<dyn ChunkPersistence>,
    /// The most recent view, set by `request_active_region_update`.
    view: Option<(Point3<f32>, i32)>,
    /// Host-reported frame rate, feeding the degraded-meshing trigger.
    measured_fps: f32,
}

impl StreamingPipeline {
    /// Wires up a pipeline from its collaborators.
    pub fn new(
        config: StreamingConfig,
        generator: Arc<dyn WorldGenerator>,
        builder: Arc<dyn MeshBuilder>,
        atlas: TextureAtlas,
        persistence: Box<dyn ChunkPersistence>,
    ) -> Self {
        let generation = GenerationScheduler::new(&config, generator.clone());
        let meshes = MeshScheduler::new(&config, builder, Arc::new(atlas));
        let region = ActiveRegionManager::new(&config);
        let reconciler = Reconciler::new(&config);
        let gate = PrewarmGate::new(config.gate_radius, config.gate_timeout());

        StreamingPipeline {
            config,
            store: ChunkStore::new(),
            cache: MeshCache::new(),
            generation,
            meshes,
            region,
            reconciler,
            gate,
            generator,
            persistence,
            view: None,
            measured_fps: 60.0,
        }
    }

    /// Records where the player is and how far out terrain should stream.
    ///
    /// `radius` is in chunks and is clamped to the configured maximum. Cheap
    /// to call every frame; the work happens in
    /// [`drain_frame_work`](Self::drain_frame_work).
    pub fn request_active_region_update(&mut self, player_position: Point3<f32>, radius: i32) {
        self.view = Some((player_position, radius));
    }

    /// Runs one frame of streaming: the convenience wrapper hosts normally
    /// call, combining a view update with a budgeted drain.
    ///
    /// `fps` is the host's smoothed frame rate, used only to decide whether
    /// degraded meshing should kick in under backlog pressure.
    pub fn frame(&mut self, player_position: Point3<f32>, radius: i32, fps: f32) -> FrameReport {
        self.request_active_region_update(player_position, radius);
        self.measured_fps = fps;
        self.drain_frame_work(
            self.config.generation_requests_per_frame,
            self.config.mesh_requests_per_frame,
        )
    }

    /// Advances every pipeline stage within the given dispatch budgets.
    ///
    /// A no-op until the first
    /// [`request_active_region_update`](Self::request_active_region_update)
    /// has supplied a view. Never blocks on background work.
    pub fn drain_frame_work(
        &mut self,
        generation_budget: usize,
        mesh_budget: usize,
    ) -> FrameReport {
        let Some((player_position, radius)) = self.view else {
            return FrameReport::default();
        };
        let player_chunk = world_to_chunk(player_position);

        if self.gate.state() == GateState::Initializing {
            self.gate
                .begin(player_chunk, self.persistence.as_mut(), &mut self.cache);
        }

        let fast = !self.gate.is_open()
            || (self.meshes.normal_backlog() >= self.config.fast_mesh_backlog
                && self.measured_fps < self.config.fast_mesh_fps_floor);

        self.generation
            .drain_completed(&mut self.store, self.config.max_apply_per_frame);

        let generation_issued = self.region.schedule_generation(
            player_chunk,
            radius,
            &mut self.store,
            &mut self.generation,
            self.persistence.as_mut(),
        );
        let mesh_issued = self.region.schedule_meshing(
            player_chunk,
            radius,
            &self.store,
            &self.cache,
            &mut self.meshes,
        );

        self.generation.process_budget(generation_budget);
        self.meshes.process_budget(mesh_budget, &self.store, fast);

        let meshes_applied = self.reconciler.apply_completed(
            &mut self.meshes,
            &self.store,
            &mut self.cache,
            self.persistence.as_mut(),
        );

        let keep = self
            .region
            .keep_set(player_chunk, radius, &self.generation, &self.meshes);
        let persistence = self.persistence.as_mut();
        let evicted = self
            .store
            .unload_outside(&keep, |position, blocks| {
                persistence.save_chunk(position, blocks)
            });
        self.cache.retain_within(&keep);

        self.gate.update(&self.store, &self.cache);

        FrameReport {
            gate_open: self.gate.is_open(),
            fast_meshing: fast,
            generation_issued,
            mesh_issued,
            meshes_applied,
            chunks_evicted: evicted.len(),
            resident_chunks: self.store.len(),
            cached_meshes: self.cache.len(),
        }
    }

    /// Applies a single-block edit at a world block coordinate.
    ///
    /// The owning chunk is generated synchronously if it is not resident (an
    /// edit must never be dropped on the floor), the edit bumps the chunk's
    /// version, and a priority remesh is requested for the chunk and for any
    /// face neighbor sharing the edited border. Returns `false` when the
    /// edit was a no-op or the chunk could not be generated; a generator
    /// panic declines the edit instead of taking the frame down, matching
    /// the background generation path.
    pub fn set_block(&mut self, block_pos: Point3<i32>, block: BlockType) -> bool {
        let (chunk_pos, _) = block_to_chunk_local(block_pos);

        if !self.store.contains(chunk_pos) {
            let created = catch_unwind(AssertUnwindSafe(|| {
                self.store.get_or_create(chunk_pos, self.generator.as_ref())
            }));
            match created {
                Ok(Ok(_)) => {}
                Ok(Err(error)) => {
                    warn!("refusing edit at {block_pos:?}: {error}");
                    return false;
                }
                Err(payload) => {
                    warn!(
                        "refusing edit at {block_pos:?}: generator panicked: {}",
                        panic_message(payload)
                    );
                    return false;
                }
            }
        }

        if !self.store.set_block(block_pos, block) {
            return false;
        }
        self.notify_block_edited(block_pos);
        true
    }

    /// Reacts to an edit that has already been applied to chunk data.
    ///
    /// Requests a priority remesh of the owning chunk, and for an edit on a
    /// chunk border marks the face neighbor dirty and remeshes it too so the
    /// seam's culled faces are recomputed. [`set_block`](Self::set_block)
    /// calls this itself; hosts that edit through chunk handles directly call
    /// it with the edited coordinate.
    pub fn notify_block_edited(&mut self, block_pos: Point3<i32>) {
        let (chunk_pos, (x, y, z)) = block_to_chunk_local(block_pos);
        self.meshes.request(chunk_pos, true, false);

        let edge = CHUNK_DIMENSION - 1;
        for face in BlockFace::all() {
            let on_border = match face {
                BlockFace::WEST => x == 0,
                BlockFace::EAST => x == edge,
                BlockFace::BOTTOM => y == 0,
                BlockFace::TOP => y == edge,
                BlockFace::SOUTH => z == 0,
                BlockFace::NORTH => z == edge,
            };
            if !on_border {
                continue;
            }
            let neighbor_pos = chunk_pos + face.offset();
            if let Some(neighbor) = self.store.try_get(neighbor_pos) {
                neighbor.write().mark_dirty();
                self.meshes.request(neighbor_pos, true, false);
            }
        }
    }

    /// The block at a world block coordinate, [`BlockType::AIR`] if its chunk
    /// is not resident.
    pub fn block_at(&self, block_pos: Point3<i32>) -> BlockType {
        let (chunk_pos, (x, y, z)) = block_to_chunk_local(block_pos);
        match self.store.try_get(chunk_pos) {
            Some(chunk) => chunk.read().get(x, y, z),
            None => BlockType::AIR,
        }
    }

    /// The installed mesh for a chunk, if any.
    pub fn mesh(&self, position: ChunkPos) -> Option<&ChunkMesh> {
        self.cache.get(position)
    }

    /// Every installed mesh, for the renderer to walk.
    pub fn meshes(&self) -> impl Iterator<Item = &ChunkMesh> {
        self.cache.iter()
    }

    /// The render-visible mesh cache itself.
    pub fn mesh_cache(&self) -> &MeshCache {
        &self.cache
    }

    /// Whether the prewarm gate has opened.
    pub fn is_ready(&self) -> bool {
        self.gate.is_open()
    }

    /// Prewarm progress as `(warm, total)` over the gate's member set.
    /// `(0, 0)` until the first frame fixes the members.
    pub fn gate_progress(&self) -> (usize, usize) {
        let total = self.gate.members().len();
        let missing = self.gate.missing(&self.store, &self.cache);
        (total - missing, total)
    }

    /// The prewarm gate's life-cycle state.
    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    /// The chunk store, for hosts that need direct voxel queries.
    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Coordinates either scheduler still has queued or in flight.
    pub fn outstanding_work(&self) -> HashSet<ChunkPos> {
        self.generation
            .tracked()
            .union(self.meshes.tracked())
            .copied()
            .collect()
    }

    /// Generation scheduler counters.
    pub fn generation_stats(&self) -> GenerationSchedulerStats {
        self.generation.stats()
    }

    /// Mesh scheduler counters.
    pub fn mesh_stats(&self) -> MeshSchedulerStats {
        self.meshes.stats()
    }

    /// Reconciler counters.
    pub fn reconciler_stats(&self) -> ReconcilerStats {
        self.reconciler.stats()
    }
}
