//! Lock-guarded registry for hosts that drive pools from several threads.
//!
//! A single mutex covers the pools map, every pool's idle/active state, and
//! the reverse map, so each operation observes and leaves them consistent.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::error::PoolError;
use crate::factory::{Factory, InstanceId};
use crate::registry::PoolRegistry;

/// Cloneable handle to a registry behind a mutex.
pub struct SharedRegistry<F: Factory> {
    inner: Arc<Mutex<PoolRegistry<F>>>,
}

impl<F: Factory> SharedRegistry<F> {
    /// Wrap a registry.
    pub fn new(registry: PoolRegistry<F>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Run `f` with exclusive access to the registry.
    pub fn with<R>(&self, f: impl FnOnce(&mut PoolRegistry<F>) -> R) -> R {
        f(&mut *self.inner.lock())
    }

    /// See [`PoolRegistry::acquire`].
    pub fn acquire(
        &self,
        identity: &str,
        placement: &F::Placement,
    ) -> Result<Option<InstanceId>, PoolError> {
        self.inner.lock().acquire(identity, placement)
    }

    /// See [`PoolRegistry::release`].
    pub fn release(&self, id: InstanceId) -> bool {
        self.inner.lock().release(id)
    }

    /// See [`PoolRegistry::release_all`].
    pub fn release_all(&self) -> usize {
        self.inner.lock().release_all()
    }

    /// See [`PoolRegistry::maintain`].
    pub fn maintain(&self, now: Instant) -> usize {
        self.inner.lock().maintain(now)
    }
}

impl<F: Factory> Clone for SharedRegistry<F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: Factory> From<PoolRegistry<F>> for SharedRegistry<F> {
    fn from(registry: PoolRegistry<F>) -> Self {
        Self::new(registry)
    }
}
