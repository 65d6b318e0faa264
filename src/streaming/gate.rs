//! # Prewarm Gate
//!
//! Holds the world "not ready" until the chunks the player would be standing
//! in are actually renderable, so the first visible frame is terrain instead
//! of void.
//!
//! The gate's member set is tier 0 of the active region: the ring of columns
//! within the gate radius, at the player's own altitude layer. A member is
//! warm once a mesh is installed for it and its data is accounted for, either
//! resident in the store or restored from the mesh cache on disk. When every
//! member is warm the gate opens; a timeout opens it regardless, because a
//! hung generator must degrade to pop-in, never to an infinite loading
//! screen.

use std::collections::HashSet;

use log::{info, warn};
use web_time::{Duration, Instant};

use crate::persistence::ChunkPersistence;
use crate::voxels::coords::{ring_offsets, ChunkPos};
use crate::voxels::store::ChunkStore;

use super::reconcile::MeshCache;

/// Where the gate is in its life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No member set yet; waiting for the first frame's player position.
    Initializing,
    /// Members chosen, warming in progress.
    Warming,
    /// Open; streaming proceeds normally.
    Ready,
}

/// The readiness gate over initial chunk streaming.
pub struct PrewarmGate {
    state: GateState,
    radius: i32,
    timeout: Duration,
    started: Option<Instant>,
    members: HashSet<ChunkPos>,
    /// Members whose mesh came from persistence; their chunk data may still
    /// be in flight without holding the gate closed.
    preloaded: HashSet<ChunkPos>,
    opened_by_timeout: bool,
}

impl PrewarmGate {
    /// Creates a closed gate with the given tier-0 ring radius and timeout.
    pub fn new(radius: i32, timeout: Duration) -> Self {
        PrewarmGate {
            state: GateState::Initializing,
            radius,
            timeout,
            started: None,
            members: HashSet::new(),
            preloaded: HashSet::new(),
            opened_by_timeout: false,
        }
    }

    /// Fixes the member set around the player's starting chunk and starts the
    /// timeout clock.
    ///
    /// Members with a persisted mesh take the fast path: the mesh is
    /// installed into `cache` immediately and the member counts as warm ahead
    /// of its chunk data arriving.
    pub fn begin(
        &mut self,
        player_chunk: ChunkPos,
        persistence: &mut dyn ChunkPersistence,
        cache: &mut MeshCache,
    ) {
        debug_assert_eq!(self.state, GateState::Initializing);

        self.members.clear();
        for ring in 0..=self.radius {
            for (dx, dz) in ring_offsets(ring) {
                self.members.insert(ChunkPos::new(
                    player_chunk.x + dx,
                    player_chunk.y,
                    player_chunk.z + dz,
                ));
            }
        }

        for position in &self.members {
            if let Some(mesh) = persistence.load_mesh(*position) {
                cache.install(mesh);
                self.preloaded.insert(*position);
            }
        }

        self.started = Some(Instant::now());
        self.state = GateState::Warming;
    }

    /// Re-evaluates readiness. Call once per frame after reconciliation.
    pub fn update(&mut self, store: &ChunkStore, cache: &MeshCache) {
        if self.state != GateState::Warming {
            return;
        }

        if self.missing(store, cache) == 0 {
            info!("prewarm complete: {} chunks warm", self.members.len());
            self.state = GateState::Ready;
            return;
        }

        let started = self.started.unwrap_or_else(Instant::now);
        if started.elapsed() >= self.timeout {
            warn!(
                "prewarm timed out with {} of {} chunks cold; opening anyway",
                self.missing(store, cache),
                self.members.len()
            );
            self.opened_by_timeout = true;
            self.state = GateState::Ready;
        }
    }

    /// Whether streaming may present frames.
    pub fn is_open(&self) -> bool {
        self.state == GateState::Ready
    }

    /// Current life-cycle state.
    pub fn state(&self) -> GateState {
        self.state
    }

    /// Whether the gate opened on the timeout rather than on completion.
    pub fn opened_by_timeout(&self) -> bool {
        self.opened_by_timeout
    }

    /// The tier-0 member set, empty until [`begin`](Self::begin).
    pub fn members(&self) -> &HashSet<ChunkPos> {
        &self.members
    }

    /// Members not yet warm.
    pub fn missing(&self, store: &ChunkStore, cache: &MeshCache) -> usize {
        self.members
            .iter()
            .filter(|position| !self.is_warm(**position, store, cache))
            .count()
    }

    fn is_warm(&self, position: ChunkPos, store: &ChunkStore, cache: &MeshCache) -> bool {
        cache.contains(position)
            && (store.contains(position) || self.preloaded.contains(&position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshing::ChunkMesh;
    use crate::persistence::{MemoryPersistence, NullPersistence};
    use crate::voxels::chunk::ChunkData;
    use cgmath::Point3;

    fn warm(store: &mut ChunkStore, cache: &mut MeshCache, position: ChunkPos) {
        store.insert(ChunkData::empty(position));
        cache.install(ChunkMesh::empty(position, 0));
    }

    #[test]
    fn gate_opens_when_every_member_is_warm() {
        let mut gate = PrewarmGate::new(1, Duration::from_secs(60));
        let mut store = ChunkStore::new();
        let mut cache = MeshCache::new();

        gate.begin(Point3::new(0, 1, 0), &mut NullPersistence, &mut cache);
        assert_eq!(gate.members().len(), 9);
        assert_eq!(gate.state(), GateState::Warming);

        // Warm all but one member: still closed.
        let members: Vec<ChunkPos> = gate.members().iter().copied().collect();
        for position in &members[..8] {
            warm(&mut store, &mut cache, *position);
        }
        gate.update(&store, &cache);
        assert!(!gate.is_open());
        assert_eq!(gate.missing(&store, &cache), 1);

        warm(&mut store, &mut cache, members[8]);
        gate.update(&store, &cache);
        assert!(gate.is_open());
        assert!(!gate.opened_by_timeout());
    }

    #[test]
    fn persisted_meshes_take_the_fast_path() {
        let position = Point3::new(0, 1, 0);
        let store = ChunkStore::new();
        let mut cache = MeshCache::new();
        let mut persistence = MemoryPersistence::default();
        persistence.store_mesh(&ChunkMesh::empty(position, 0));

        let mut gate = PrewarmGate::new(0, Duration::from_secs(60));
        gate.begin(position, &mut persistence, &mut cache);

        // The mesh was installed from persistence and counts as warm even
        // though no chunk data is resident.
        assert!(cache.contains(position));
        gate.update(&store, &cache);
        assert!(gate.is_open());
        assert!(!gate.opened_by_timeout());
    }

    #[test]
    fn a_mesh_without_data_does_not_count_unless_preloaded() {
        let mut gate = PrewarmGate::new(0, Duration::from_secs(60));
        let store = ChunkStore::new();
        let mut cache = MeshCache::new();
        let position = Point3::new(0, 1, 0);

        gate.begin(position, &mut NullPersistence, &mut cache);
        cache.install(ChunkMesh::empty(position, 0));
        gate.update(&store, &cache);
        assert!(!gate.is_open());
    }

    #[test]
    fn timeout_opens_the_gate_cold() {
        let mut gate = PrewarmGate::new(1, Duration::from_millis(0));
        let store = ChunkStore::new();
        let mut cache = MeshCache::new();

        gate.begin(Point3::new(0, 1, 0), &mut NullPersistence, &mut cache);
        gate.update(&store, &cache);

        assert!(gate.is_open());
        assert!(gate.opened_by_timeout());
    }
}
