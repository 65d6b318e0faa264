//! # Streaming Configuration
//!
//! Every tunable of the pipeline in one place, passed into the pipeline's
//! constructor. There is no global state: hardware-adaptive sizing happens
//! once, in [`StreamingConfig::detect`], and the result is plain data from
//! then on. Configs deserialize from JSON, with every missing field falling
//! back to its default.

use serde::{Deserialize, Serialize};
use web_time::Duration;

/// Tunable parameters of the streaming pipeline.
///
/// The defaults are sensible for a 4-to-8-core desktop; [`detect`] adapts the
/// worker counts and per-frame budgets to the actual hardware.
///
/// [`detect`]: StreamingConfig::detect
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingConfig {
    /// Worker threads for terrain generation.
    pub chunk_worker_count: usize,
    /// Worker threads for mesh building.
    pub mesh_worker_count: usize,

    /// Cap on queued + in-flight generation jobs (near-player work is exempt).
    pub max_outstanding_chunk_jobs: usize,
    /// Cap on queued + in-flight mesh jobs (near-player and priority work is
    /// exempt).
    pub max_outstanding_mesh_jobs: usize,

    /// Generation requests the region manager may issue per frame.
    pub generation_requests_per_frame: usize,
    /// Mesh requests the region manager may issue per frame.
    pub mesh_requests_per_frame: usize,
    /// Completed results the reconciler applies per frame.
    pub max_apply_per_frame: usize,

    /// Most of the mesh dispatch budget the priority lane may take in one
    /// frame; the normal lane fills whatever is left.
    pub priority_sub_budget: usize,
    /// Priority mesh builds allowed inline on the main thread per frame when
    /// no worker slot is free.
    pub max_inline_builds: usize,

    /// Hard ceiling on the render radius, in chunks.
    pub max_render_radius: i32,
    /// Extra rings beyond the render radius within which chunks are kept
    /// resident before eviction.
    pub keep_buffer: i32,
    /// Ring distance within which work is "near player": admitted past the
    /// outstanding caps and meshed through the priority lane.
    pub near_ring: i32,
    /// Chunks above and below the player's chunk included in the active band.
    pub vertical_radius: i32,
    /// World height in chunks; the active band never leaves `[0, this)`.
    pub world_height_chunks: i32,

    /// Ring radius of the prewarm gate's tier-0 set.
    pub gate_radius: i32,
    /// Milliseconds before the gate opens regardless of progress.
    pub gate_timeout_ms: u64,

    /// Normal-lane backlog beyond which degraded meshing may kick in.
    pub fast_mesh_backlog: usize,
    /// Frame-rate floor under which a large backlog selects degraded meshing.
    pub fast_mesh_fps_floor: f32,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        StreamingConfig {
            chunk_worker_count: 2,
            mesh_worker_count: 3,
            max_outstanding_chunk_jobs: 64,
            max_outstanding_mesh_jobs: 64,
            generation_requests_per_frame: 12,
            mesh_requests_per_frame: 12,
            max_apply_per_frame: 16,
            priority_sub_budget: 4,
            max_inline_builds: 1,
            max_render_radius: 32,
            keep_buffer: 2,
            near_ring: 2,
            vertical_radius: 2,
            world_height_chunks: 8,
            gate_radius: 1,
            gate_timeout_ms: 12_000,
            fast_mesh_backlog: 48,
            fast_mesh_fps_floor: 30.0,
        }
    }
}

impl StreamingConfig {
    /// Builds a config adapted to the machine's core count.
    ///
    /// Generation gets roughly a third of the cores (it is bursty), meshing
    /// roughly half (it is the steady load); both are clamped so a tiny or a
    /// huge machine still behaves. Per-frame request budgets scale with the
    /// core count so wide machines fill their pools.
    pub fn detect() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        StreamingConfig {
            chunk_worker_count: (cores / 3).clamp(1, 4),
            mesh_worker_count: (cores / 2).clamp(2, 6),
            generation_requests_per_frame: (cores * 2).clamp(8, 32),
            mesh_requests_per_frame: (cores * 2).clamp(8, 32),
            ..StreamingConfig::default()
        }
    }

    /// Parses a config from JSON, defaulting any missing field.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The gate timeout as a duration.
    pub fn gate_timeout(&self) -> Duration {
        Duration::from_millis(self.gate_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_stays_within_worker_clamps() {
        let config = StreamingConfig::detect();
        assert!((1..=4).contains(&config.chunk_worker_count));
        assert!((2..=6).contains(&config.mesh_worker_count));
    }

    #[test]
    fn json_overrides_only_named_fields() {
        let config =
            StreamingConfig::from_json(r#"{ "gate_radius": 3, "gate_timeout_ms": 500 }"#).unwrap();
        assert_eq!(config.gate_radius, 3);
        assert_eq!(config.gate_timeout_ms, 500);
        assert_eq!(
            config.near_ring,
            StreamingConfig::default().near_ring
        );
    }

    #[test]
    fn gate_timeout_converts_to_duration() {
        let mut config = StreamingConfig::default();
        config.gate_timeout_ms = 1_500;
        assert_eq!(config.gate_timeout(), Duration::from_millis(1_500));
    }
}
