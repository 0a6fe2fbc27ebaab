//! Per-pool usage counters.

use serde::Serialize;

/// Counters describing how a pool has been used.
///
/// `hits + misses + recycled` equals the number of successful acquisitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Acquisitions served from idle storage.
    pub hits: u64,
    /// Acquisitions that constructed a new instance.
    pub misses: u64,
    /// Acquisitions served by forcibly reclaiming the oldest active instance.
    pub recycled: u64,
    /// Acquisitions that returned nothing.
    pub rejected: u64,
    /// Successful releases back to idle storage (forced ones included).
    pub releases: u64,
    /// Instances constructed, prewarming and expansion included.
    pub created: u64,
    /// Instances destroyed, invalid idle entries included.
    pub destroyed: u64,
    /// Idle entries found invalid and discarded.
    pub invalid: u64,
}

impl PoolStats {
    /// Successful acquisitions.
    #[must_use]
    pub fn acquisitions(&self) -> u64 {
        self.hits + self.misses + self.recycled
    }

    /// Fraction of acquisitions served from idle storage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.acquisitions();
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub(crate) fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub(crate) fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub(crate) fn record_recycle(&mut self) {
        self.recycled += 1;
    }

    pub(crate) fn record_reject(&mut self) {
        self.rejected += 1;
    }

    pub(crate) fn record_release(&mut self) {
        self.releases += 1;
    }

    pub(crate) fn record_created(&mut self) {
        self.created += 1;
    }

    pub(crate) fn record_destroyed(&mut self) {
        self.destroyed += 1;
    }

    pub(crate) fn record_invalid(&mut self) {
        self.invalid += 1;
    }

    /// Zero every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
