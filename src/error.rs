//! Error taxonomy for background jobs.
//!
//! Worker-side failures never cross a thread boundary as panics: every job is
//! wrapped in `catch_unwind` and its failure travels back to the main thread
//! as a value inside the job's outcome record. The reconciler decides what to
//! do with it (usually: log once for the coordinate and let the next active
//! pass retry).

use std::any::Any;

use thiserror::Error;

/// Failure of a terrain-generation job.
///
/// The coordinate stays "missing" after any of these, which makes it eligible
/// for re-enqueue on a later frame.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The generator panicked; the payload message is preserved for the log.
    #[error("terrain generator panicked: {0}")]
    Panicked(String),

    /// The generator returned a block buffer of the wrong size.
    #[error("terrain generator produced {got} block bytes, expected {expected}")]
    WrongLength {
        /// Number of bytes the generator actually produced.
        got: usize,
        /// Number of bytes a chunk requires.
        expected: usize,
    },
}

/// Failure of a mesh-build job.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MeshError {
    /// A vertex list length was not a whole number of triangles.
    #[error("{category} vertex list length {len} is not a whole number of triangles")]
    PartialTriangle {
        /// Which vertex list was malformed ("opaque", "transparent", "liquid").
        category: &'static str,
        /// The offending list length.
        len: usize,
    },

    /// A vertex carried a NaN or infinite coordinate.
    #[error("mesh contains a non-finite vertex coordinate")]
    NonFiniteVertex,

    /// The mesh builder panicked.
    #[error("mesh builder panicked: {0}")]
    Panicked(String),
}

/// Extracts a readable message from a `catch_unwind` payload.
pub fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_handles_common_payload_types() {
        let from_str = std::panic::catch_unwind(|| panic!("static message")).unwrap_err();
        assert_eq!(panic_message(from_str), "static message");

        let from_string =
            std::panic::catch_unwind(|| panic!("formatted {}", 42)).unwrap_err();
        assert_eq!(panic_message(from_string), "formatted 42");
    }

    #[test]
    fn errors_render_their_context() {
        let error = GenerationError::WrongLength {
            got: 12,
            expected: 4096,
        };
        assert!(error.to_string().contains("12"));
        assert!(error.to_string().contains("4096"));
    }
}
