//! # Result Reconciler
//!
//! The main-thread step that moves finished meshes into the render-visible
//! cache.
//!
//! Builds are never cancelled, so a mesh can arrive for a chunk that has been
//! edited (stale version) or evicted (orphan) since dispatch. The reconciler
//! is the single place that sorts this out: stale meshes are discarded and
//! the chunk is re-requested through the priority lane, orphans are dropped
//! silently, and everything else is installed atomically from the renderer's
//! point of view (the cache never holds a half-applied result).

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::config::StreamingConfig;
use crate::meshing::{ChunkMesh, MeshScheduler};
use crate::persistence::ChunkPersistence;
use crate::voxels::coords::ChunkPos;
use crate::voxels::store::ChunkStore;

/// The render-visible set of installed meshes.
///
/// Read by the renderer, written only by the reconciler and eviction, all on
/// the main thread.
pub struct MeshCache {
    meshes: HashMap<ChunkPos, ChunkMesh>,
}

impl MeshCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        MeshCache {
            meshes: HashMap::new(),
        }
    }

    /// The installed mesh for `position`, if any.
    pub fn get(&self, position: ChunkPos) -> Option<&ChunkMesh> {
        self.meshes.get(&position)
    }

    /// Whether a mesh is installed at `position`.
    pub fn contains(&self, position: ChunkPos) -> bool {
        self.meshes.contains_key(&position)
    }

    /// Number of installed meshes.
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Installs a mesh, replacing any previous mesh at its coordinate.
    pub fn install(&mut self, mesh: ChunkMesh) {
        self.meshes.insert(mesh.position, mesh);
    }

    /// Drops every mesh whose coordinate is not in `keep`.
    pub fn retain_within(&mut self, keep: &HashSet<ChunkPos>) -> usize {
        let before = self.meshes.len();
        self.meshes.retain(|position, _| keep.contains(position));
        before - self.meshes.len()
    }

    /// Iterates the installed meshes in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &ChunkMesh> {
        self.meshes.values()
    }
}

impl Default for MeshCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters exposed for tests and debug overlays.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReconcilerStats {
    /// Meshes installed into the cache.
    pub applied: u64,
    /// Meshes discarded because the chunk was edited after the build read it.
    pub stale_discards: u64,
    /// Meshes discarded because the chunk was evicted mid-build.
    pub orphan_discards: u64,
}

/// Applies completed mesh builds to the cache, discarding obsolete results.
pub struct Reconciler {
    max_apply_per_frame: usize,
    stats: ReconcilerStats,
}

impl Reconciler {
    /// Creates a reconciler with the per-frame apply budget from `config`.
    pub fn new(config: &StreamingConfig) -> Self {
        Reconciler {
            max_apply_per_frame: config.max_apply_per_frame,
            stats: ReconcilerStats::default(),
        }
    }

    /// Pops up to the apply budget of finished meshes and installs the ones
    /// that are still current. Main thread only.
    ///
    /// For each mesh, in priority-first completion order:
    /// - chunk gone from the store: orphan, dropped.
    /// - chunk version newer than the mesh's source version: stale, dropped,
    ///   and a priority rebuild is requested so the edit is never lost to the
    ///   dedupe set having covered the in-flight build.
    /// - otherwise: installed, mirrored to `persistence`, and the chunk's
    ///   dirty flag is cleared.
    ///
    /// Returns the number of meshes installed.
    pub fn apply_completed(
        &mut self,
        scheduler: &mut MeshScheduler,
        store: &ChunkStore,
        cache: &mut MeshCache,
        persistence: &mut dyn ChunkPersistence,
    ) -> usize {
        let mut installed = 0;

        for _ in 0..self.max_apply_per_frame {
            let Some(mesh) = scheduler.pop_completed() else {
                break;
            };

            let Some(chunk) = store.try_get(mesh.position) else {
                self.stats.orphan_discards += 1;
                debug!("dropping mesh for evicted chunk {:?}", mesh.position);
                continue;
            };

            let current_version = chunk.read().version();
            if current_version != mesh.source_version {
                self.stats.stale_discards += 1;
                debug!(
                    "discarding stale mesh {:?} (built v{}, chunk v{current_version})",
                    mesh.position, mesh.source_version
                );
                scheduler.request(mesh.position, true, false);
                continue;
            }

            persistence.store_mesh(&mesh);
            cache.install(mesh);
            chunk.write().clear_dirty();
            installed += 1;
            self.stats.applied += 1;
        }

        installed
    }

    /// Reconciler counters.
    pub fn stats(&self) -> ReconcilerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshing::{CulledMesher, TextureAtlas};
    use crate::persistence::MemoryPersistence;
    use crate::voxels::block::BlockType;
    use crate::voxels::chunk::ChunkData;
    use cgmath::Point3;
    use std::sync::Arc;

    /// A scheduler with no workers: builds only ever finish through the
    /// inline priority path, which makes every test step synchronous.
    fn inline_scheduler() -> MeshScheduler {
        let config = StreamingConfig {
            mesh_worker_count: 0,
            max_inline_builds: 1,
            ..StreamingConfig::default()
        };
        MeshScheduler::new(
            &config,
            Arc::new(CulledMesher),
            Arc::new(TextureAtlas::default()),
        )
    }

    fn edited_store(position: ChunkPos) -> ChunkStore {
        let mut store = ChunkStore::new();
        let mut chunk = ChunkData::empty(position);
        chunk.apply_edit(8, 8, 8, BlockType::STONE);
        store.insert(chunk);
        store
    }

    #[test]
    fn current_meshes_are_installed_and_mirrored() {
        let position = Point3::new(0, 0, 0);
        let mut scheduler = inline_scheduler();
        let store = edited_store(position);
        let mut cache = MeshCache::new();
        let mut persistence = MemoryPersistence::default();
        let mut reconciler = Reconciler::new(&StreamingConfig::default());

        scheduler.request(position, true, false);
        scheduler.process_budget(1, &store, false);

        let installed =
            reconciler.apply_completed(&mut scheduler, &store, &mut cache, &mut persistence);

        assert_eq!(installed, 1);
        assert!(cache.contains(position));
        assert!(persistence.load_mesh(position).is_some());
        assert!(!store.try_get(position).unwrap().read().is_dirty());
    }

    #[test]
    fn stale_meshes_are_discarded_and_rebuilt_with_priority() {
        let position = Point3::new(0, 0, 0);
        let mut scheduler = inline_scheduler();
        let mut store = edited_store(position);
        let mut cache = MeshCache::new();
        let mut persistence = MemoryPersistence::default();
        let mut reconciler = Reconciler::new(&StreamingConfig::default());

        scheduler.request(position, true, false);
        scheduler.process_budget(1, &store, false);

        // Edit lands after the build finished but before it is applied.
        store.set_block(Point3::new(0, 0, 0), BlockType::DIRT);

        let installed =
            reconciler.apply_completed(&mut scheduler, &store, &mut cache, &mut persistence);
        assert_eq!(installed, 0);
        assert_eq!(reconciler.stats().stale_discards, 1);
        assert!(!cache.contains(position));

        // The rebuild was queued with priority; one more frame installs it.
        assert!(scheduler.is_tracked(position));
        scheduler.process_budget(1, &store, false);
        let installed =
            reconciler.apply_completed(&mut scheduler, &store, &mut cache, &mut persistence);
        assert_eq!(installed, 1);
        let mesh = cache.get(position).unwrap();
        assert_eq!(mesh.source_version, 2);
    }

    #[test]
    fn orphaned_meshes_are_dropped_silently() {
        let position = Point3::new(0, 0, 0);
        let mut scheduler = inline_scheduler();
        let mut store = edited_store(position);
        let mut cache = MeshCache::new();
        let mut persistence = MemoryPersistence::default();
        let mut reconciler = Reconciler::new(&StreamingConfig::default());

        scheduler.request(position, true, false);
        scheduler.process_budget(1, &store, false);

        store.unload_outside(&HashSet::new(), |_, _| {});

        let installed =
            reconciler.apply_completed(&mut scheduler, &store, &mut cache, &mut persistence);
        assert_eq!(installed, 0);
        assert_eq!(reconciler.stats().orphan_discards, 1);
        assert!(cache.is_empty());
        assert!(!scheduler.is_tracked(position));
    }

    #[test]
    fn apply_budget_is_respected() {
        let mut scheduler = inline_scheduler();
        let mut store = ChunkStore::new();
        let mut cache = MeshCache::new();
        let mut persistence = MemoryPersistence::default();
        let config = StreamingConfig {
            max_apply_per_frame: 2,
            ..StreamingConfig::default()
        };
        let mut reconciler = Reconciler::new(&config);

        for x in 0..3 {
            let position = Point3::new(x, 0, 0);
            let mut chunk = ChunkData::empty(position);
            chunk.apply_edit(0, 0, 0, BlockType::STONE);
            store.insert(chunk);
            scheduler.request(position, true, false);
            scheduler.process_budget(1, &store, false);
        }

        let installed =
            reconciler.apply_completed(&mut scheduler, &store, &mut cache, &mut persistence);
        assert_eq!(installed, 2);
        assert_eq!(cache.len(), 2);
    }
}
