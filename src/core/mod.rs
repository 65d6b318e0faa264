//! Core utilities shared by every part of the streaming pipeline.
//!
//! * [`Shared`] is the many-reader/one-writer handle used to expose chunk
//!   data to background workers.
//! * [`WorkerPool`] is the bounded, non-blocking worker pool both schedulers
//!   are built on.

mod shared;
mod worker_pool;

pub use shared::Shared;
pub use worker_pool::{WorkerPool, MAX_JOBS_IN_FLIGHT_PER_WORKER};
