//! # Active Region Manager
//!
//! Decides, every frame, which chunk coordinates should exist, which should
//! have meshes, and which should be let go.
//!
//! The active region is a stack of horizontal rings around the player's
//! chunk: rings are walked near-first in Chebyshev order in the XZ plane, and
//! each ring column carries a vertical band of chunks around the player's
//! altitude, clamped to the world's height. Walking rings 0, 1, 2, … and
//! requesting in that order is the whole prioritization scheme; there is no
//! separate priority value to maintain.
//!
//! Requests are budgeted per frame and go through the schedulers' dedupe
//! sets, so re-walking the same region every frame is cheap and idempotent.
//! Eviction is the mirror image: everything within the region plus a small
//! hysteresis buffer is kept, as is any coordinate the schedulers still
//! track, and the rest is unloaded through persistence.

use std::collections::HashSet;

use cgmath::Point3;

use crate::config::StreamingConfig;
use crate::generation::scheduler::GenerationScheduler;
use crate::meshing::MeshScheduler;
use crate::persistence::ChunkPersistence;
use crate::streaming::reconcile::MeshCache;
use crate::voxels::chunk::ChunkData;
use crate::voxels::coords::{ring_offsets, ChunkPos};
use crate::voxels::store::ChunkStore;

/// Ring-ordered scheduling and eviction policy for the active region.
pub struct ActiveRegionManager {
    max_render_radius: i32,
    keep_buffer: i32,
    near_ring: i32,
    vertical_radius: i32,
    world_height_chunks: i32,
    generation_requests_per_frame: usize,
    mesh_requests_per_frame: usize,
}

impl ActiveRegionManager {
    /// Creates a manager with the region shape and budgets from `config`.
    pub fn new(config: &StreamingConfig) -> Self {
        ActiveRegionManager {
            max_render_radius: config.max_render_radius,
            keep_buffer: config.keep_buffer,
            near_ring: config.near_ring,
            vertical_radius: config.vertical_radius,
            world_height_chunks: config.world_height_chunks,
            generation_requests_per_frame: config.generation_requests_per_frame,
            mesh_requests_per_frame: config.mesh_requests_per_frame,
        }
    }

    /// The vertical chunk band of a region column, centered on the player's
    /// altitude and clamped to the world's height.
    fn band(&self, player_y: i32) -> std::ops::RangeInclusive<i32> {
        let top = self.world_height_chunks - 1;
        let low = (player_y - self.vertical_radius).clamp(0, top);
        let high = (player_y + self.vertical_radius).clamp(0, top);
        low..=high
    }

    /// Every coordinate of the active region in scheduling order: ring by
    /// ring outward, each column bottom to top.
    pub fn active_coords(&self, player_chunk: ChunkPos, radius: i32) -> Vec<ChunkPos> {
        let radius = radius.clamp(0, self.max_render_radius);
        let band = self.band(player_chunk.y);

        let mut coords = Vec::new();
        for ring in 0..=radius {
            for (dx, dz) in ring_offsets(ring) {
                for y in band.clone() {
                    coords.push(Point3::new(player_chunk.x + dx, y, player_chunk.z + dz));
                }
            }
        }
        coords
    }

    /// Requests chunk data for the region's missing coordinates, near-first,
    /// up to the per-frame generation budget.
    ///
    /// A coordinate with an archived copy in `persistence` is restored
    /// directly into the store instead of being regenerated, so edits survive
    /// leaving and re-entering the region. Returns the number of requests
    /// issued (restores included).
    pub fn schedule_generation(
        &self,
        player_chunk: ChunkPos,
        radius: i32,
        store: &mut ChunkStore,
        generation: &mut GenerationScheduler,
        persistence: &mut dyn ChunkPersistence,
    ) -> usize {
        let mut issued = 0;

        for position in self.active_coords(player_chunk, radius) {
            if issued >= self.generation_requests_per_frame {
                break;
            }
            if store.contains(position) || generation.is_tracked(position) {
                continue;
            }

            if let Some(blocks) = persistence.load_chunk(position) {
                if let Ok(chunk) = ChunkData::from_blocks(position, blocks) {
                    store.insert(chunk);
                    issued += 1;
                    continue;
                }
            }

            if generation.enqueue(position, self.is_near(player_chunk, position)) {
                issued += 1;
            }
        }

        issued
    }

    /// Requests mesh builds for resident chunks that are dirty, have no
    /// cached mesh, or whose cached mesh was built from an older version,
    /// near-first, up to the per-frame mesh budget. The dirty check matters
    /// for neighbor-triggered dirtying, which bumps no version, and it is
    /// what retries a chunk whose previous build failed.
    ///
    /// Chunks within the near ring go through the priority lane (which also
    /// admits them past the outstanding cap); the rest queue normally.
    /// Returns the number of requests issued.
    pub fn schedule_meshing(
        &self,
        player_chunk: ChunkPos,
        radius: i32,
        store: &ChunkStore,
        cache: &MeshCache,
        meshes: &mut MeshScheduler,
    ) -> usize {
        let mut issued = 0;

        for position in self.active_coords(player_chunk, radius) {
            if issued >= self.mesh_requests_per_frame {
                break;
            }
            let Some(chunk) = store.try_get(position) else {
                continue;
            };
            if meshes.is_tracked(position) {
                continue;
            }

            let (current_version, dirty) = {
                let chunk = chunk.read();
                (chunk.version(), chunk.is_dirty())
            };
            let needs_mesh = dirty
                || match cache.get(position) {
                    None => true,
                    Some(mesh) => mesh.source_version != current_version,
                };
            if !needs_mesh {
                continue;
            }

            let near = self.is_near(player_chunk, position);
            if meshes.request(position, near, near) {
                issued += 1;
            }
        }

        issued
    }

    /// The set of coordinates eviction must leave alone: the region expanded
    /// by the hysteresis buffer, plus everything either scheduler still has
    /// queued or in flight.
    pub fn keep_set(
        &self,
        player_chunk: ChunkPos,
        radius: i32,
        generation: &GenerationScheduler,
        meshes: &MeshScheduler,
    ) -> HashSet<ChunkPos> {
        let keep_radius = (radius + self.keep_buffer).clamp(0, self.max_render_radius + self.keep_buffer);
        let top = self.world_height_chunks - 1;
        let low = (player_chunk.y - self.vertical_radius - self.keep_buffer).clamp(0, top);
        let high = (player_chunk.y + self.vertical_radius + self.keep_buffer).clamp(0, top);

        let mut keep = HashSet::new();
        for dx in -keep_radius..=keep_radius {
            for dz in -keep_radius..=keep_radius {
                for y in low..=high {
                    keep.insert(Point3::new(player_chunk.x + dx, y, player_chunk.z + dz));
                }
            }
        }
        keep.extend(generation.tracked());
        keep.extend(meshes.tracked());
        keep
    }

    /// Whether `position` counts as near-player work: within the near ring
    /// horizontally, regardless of altitude.
    fn is_near(&self, player_chunk: ChunkPos, position: ChunkPos) -> bool {
        crate::voxels::coords::ring_distance(player_chunk, position) <= self.near_ring
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::FlatGenerator;
    use crate::meshing::{CulledMesher, TextureAtlas};
    use crate::persistence::{MemoryPersistence, NullPersistence};
    use crate::voxels::block::BlockType;
    use crate::voxels::chunk::CHUNK_VOLUME;
    use std::sync::Arc;

    fn config() -> StreamingConfig {
        StreamingConfig {
            vertical_radius: 1,
            world_height_chunks: 4,
            near_ring: 1,
            keep_buffer: 1,
            generation_requests_per_frame: 8,
            mesh_requests_per_frame: 8,
            ..StreamingConfig::default()
        }
    }

    fn generation(workers: usize) -> GenerationScheduler {
        GenerationScheduler::new(
            &StreamingConfig {
                chunk_worker_count: workers,
                ..StreamingConfig::default()
            },
            Arc::new(FlatGenerator::new(4, BlockType::STONE)),
        )
    }

    fn mesh_scheduler() -> MeshScheduler {
        MeshScheduler::new(
            &StreamingConfig {
                mesh_worker_count: 0,
                ..StreamingConfig::default()
            },
            Arc::new(CulledMesher),
            Arc::new(TextureAtlas::default()),
        )
    }

    #[test]
    fn active_coords_walk_rings_near_first() {
        let region = ActiveRegionManager::new(&config());
        let player = Point3::new(0, 1, 0);

        let coords = region.active_coords(player, 2);

        // Ring 0 is the player's own column, bottom to top of the band.
        assert_eq!(coords[0], Point3::new(0, 0, 0));
        assert_eq!(coords[1], Point3::new(0, 1, 0));
        assert_eq!(coords[2], Point3::new(0, 2, 0));

        // Everything after the first column is at ring distance >= 1, and
        // distances never decrease along the walk.
        let mut last_ring = 0;
        for position in &coords {
            let ring = crate::voxels::coords::ring_distance(player, *position);
            assert!(ring >= last_ring);
            last_ring = ring;
        }

        // (2r+1)^2 columns of 3 chunks each.
        assert_eq!(coords.len(), 25 * 3);
    }

    #[test]
    fn vertical_band_clamps_to_world_height() {
        let region = ActiveRegionManager::new(&config());

        // Player at the bottom of the world: the band must not go negative.
        let coords = region.active_coords(Point3::new(0, 0, 0), 0);
        assert_eq!(coords, vec![Point3::new(0, 0, 0), Point3::new(0, 1, 0)]);

        // And at the top it must not leave the world.
        let coords = region.active_coords(Point3::new(0, 3, 0), 0);
        assert_eq!(coords, vec![Point3::new(0, 2, 0), Point3::new(0, 3, 0)]);
    }

    #[test]
    fn generation_requests_go_to_the_nearest_missing_chunks() {
        let region = ActiveRegionManager::new(&config());
        let mut store = ChunkStore::new();
        let mut generation = generation(0);
        let player = Point3::new(0, 1, 0);

        let issued = region.schedule_generation(
            player,
            4,
            &mut store,
            &mut generation,
            &mut NullPersistence,
        );

        // The budget of 8 covers the player column (3) and the start of
        // ring 1; every requested coordinate is near the player.
        assert_eq!(issued, 8);
        assert!(generation.is_tracked(Point3::new(0, 1, 0)));
        assert!(!generation.is_tracked(Point3::new(4, 1, 0)));

        // Re-walking the same region issues the next batch, not duplicates.
        let issued = region.schedule_generation(
            player,
            4,
            &mut store,
            &mut generation,
            &mut NullPersistence,
        );
        assert_eq!(issued, 8);
        assert_eq!(generation.outstanding(), 16);
    }

    #[test]
    fn archived_chunks_are_restored_instead_of_regenerated() {
        let region = ActiveRegionManager::new(&config());
        let mut store = ChunkStore::new();
        let mut generation = generation(0);
        let mut persistence = MemoryPersistence::default();
        let position = Point3::new(0, 1, 0);

        persistence.save_chunk(position, &vec![BlockType::DIRT.id(); CHUNK_VOLUME]);

        region.schedule_generation(
            Point3::new(0, 1, 0),
            0,
            &mut store,
            &mut generation,
            &mut persistence,
        );

        assert!(store.contains(position));
        assert!(!generation.is_tracked(position));
        let chunk = store.try_get(position).unwrap();
        assert_eq!(chunk.read().get(0, 0, 0), BlockType::DIRT);
    }

    #[test]
    fn meshing_skips_chunks_that_are_already_current() {
        let region = ActiveRegionManager::new(&config());
        let mut store = ChunkStore::new();
        let mut cache = MeshCache::new();
        let mut meshes = mesh_scheduler();
        let player = Point3::new(0, 1, 0);

        let position = Point3::new(0, 1, 0);
        let mut chunk = ChunkData::empty(position);
        chunk.apply_edit(0, 0, 0, BlockType::STONE);
        store.insert(chunk);

        let issued = region.schedule_meshing(player, 0, &store, &cache, &mut meshes);
        assert_eq!(issued, 1);
        assert!(meshes.is_tracked(position));

        // Install a current mesh and settle the dirty flag, as the reconciler
        // does; nothing further to request.
        cache.install(crate::meshing::ChunkMesh::empty(position, 1));
        store.try_get(position).unwrap().write().clear_dirty();
        let mut fresh = mesh_scheduler();
        let issued = region.schedule_meshing(player, 0, &store, &cache, &mut fresh);
        assert_eq!(issued, 0);

        // An edit makes the cached mesh stale and re-requestable.
        store.set_block(Point3::new(1, 17, 1), BlockType::DIRT);
        let issued = region.schedule_meshing(player, 0, &store, &cache, &mut fresh);
        assert_eq!(issued, 1);
    }

    #[test]
    fn dirty_chunks_are_remeshed_even_at_a_matching_version() {
        let region = ActiveRegionManager::new(&config());
        let mut store = ChunkStore::new();
        let mut cache = MeshCache::new();
        let mut meshes = mesh_scheduler();
        let player = Point3::new(0, 1, 0);
        let position = Point3::new(0, 1, 0);

        store.insert(ChunkData::empty(position));
        cache.install(crate::meshing::ChunkMesh::empty(position, 0));
        let issued = region.schedule_meshing(player, 0, &store, &cache, &mut meshes);
        assert_eq!(issued, 0);

        // A border edit next door marks this chunk dirty without bumping its
        // version; the walk must still pick it up.
        store.try_get(position).unwrap().write().mark_dirty();
        let issued = region.schedule_meshing(player, 0, &store, &cache, &mut meshes);
        assert_eq!(issued, 1);
        assert!(meshes.is_tracked(position));
    }

    #[test]
    fn keep_set_covers_buffer_and_tracked_work() {
        let region = ActiveRegionManager::new(&config());
        let mut generation = generation(0);
        let meshes = mesh_scheduler();
        let player = Point3::new(0, 1, 0);

        let far = Point3::new(40, 1, 40);
        generation.enqueue(far, true);

        let keep = region.keep_set(player, 2, &generation, &meshes);

        // Region radius 2 plus buffer 1.
        assert!(keep.contains(&Point3::new(3, 1, 3)));
        assert!(!keep.contains(&Point3::new(4, 1, 0)));
        // Vertical buffer extends one chunk past the band.
        assert!(keep.contains(&Point3::new(0, 3, 0)));
        // In-flight work is kept wherever it is.
        assert!(keep.contains(&far));
    }
}
