use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A thread-safe, reference-counted handle to a shared value.
///
/// `Shared` wraps an `Arc<RwLock<T>>` and is the ownership primitive the
/// pipeline uses to let background workers read chunk data while the main
/// thread keeps exclusive write access. Many readers may hold the value at
/// once; writers are exclusive.
///
/// The pipeline's locking discipline keeps contention trivial: worker threads
/// only ever take short read locks, and all write locks happen on the main
/// thread between frames.
///
/// # Examples
///
/// ```
/// use voxel_streaming::core::Shared;
///
/// let value = Shared::new(41);
/// *value.write() += 1;
/// assert_eq!(*value.read(), 42);
/// ```
pub struct Shared<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> Shared<T> {
    /// Wraps `value` in a new shared handle.
    pub fn new(value: T) -> Self {
        Shared {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Takes a read lock on the value.
    ///
    /// # Panics
    /// Panics if the lock is poisoned, which can only happen after a panic
    /// while a write lock was held on the main thread.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.inner.read().unwrap()
    }

    /// Takes an exclusive write lock on the value.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    pub fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.inner.write().unwrap()
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared {
            inner: self.inner.clone(),
        }
    }
}
