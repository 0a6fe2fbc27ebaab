//! Boundary traits between the pooling engine and the pooled resource.
//!
//! `Factory` builds and tears down instances from a template. `Poolable` is the
//! optional capability an instance can expose to hear about acquire/release
//! transitions.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque handle identifying one constructed instance.
///
/// Ids are unique for the lifetime of the process and never reused, so two
/// handles are equal only when they name the same constructed instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    pub(crate) fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value of the handle.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Optional lifecycle callbacks for pooled instances.
///
/// Each callback fires exactly once per transition. A forced eviction under
/// [`OverflowPolicy::RecycleOldest`](crate::config::OverflowPolicy::RecycleOldest)
/// counts as a release followed by an acquire.
pub trait Poolable {
    /// Called after the instance has been handed out.
    fn on_acquire(&mut self) {}

    /// Called before the instance goes back to idle storage.
    fn on_release(&mut self) {}
}

/// Constructs, validates, and destroys instances for a pool.
///
/// Only `create` is required. Implementations must be cheap and synchronous:
/// no network or disk I/O.
pub trait Factory {
    /// Descriptor a pool hands to `create` (a prefab, a size class, ...).
    type Template;
    /// The pooled resource.
    type Instance;
    /// Per-acquire placement data applied before the instance is handed out.
    type Placement;

    /// Build one new instance from `template`.
    fn create(&mut self, template: &Self::Template) -> Self::Instance;

    /// Whether an idle instance is still usable. Instances torn down by an
    /// external owner should report `false`; the pool then discards them.
    fn is_valid(&self, _instance: &Self::Instance) -> bool {
        true
    }

    /// Apply placement data to an instance about to be handed out.
    fn place(&mut self, _instance: &mut Self::Instance, _placement: &Self::Placement) {}

    /// Put the instance into its in-use state.
    fn activate(&mut self, _instance: &mut Self::Instance) {}

    /// Put the instance into its parked state.
    fn deactivate(&mut self, _instance: &mut Self::Instance) {}

    /// Tear the instance down for good.
    fn destroy(&mut self, instance: Self::Instance) {
        drop(instance);
    }

    /// Expose the [`Poolable`] capability if the instance has one.
    ///
    /// Probed once per instance when it is constructed; the answer is cached,
    /// so this must be stable for the instance's lifetime.
    fn poolable<'a>(&self, _instance: &'a mut Self::Instance) -> Option<&'a mut dyn Poolable> {
        None
    }
}
