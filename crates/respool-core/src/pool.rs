//! Per-template pooling engine.
//!
//! A [`Pool`] owns every instance it has constructed. Each instance is either
//! idle (parked on a LIFO stack, ready for reuse) or active (checked out by a
//! caller), never both. When idle storage runs dry the configured
//! [`OverflowPolicy`] decides whether to construct, to reclaim the oldest
//! active instance, or to hand out nothing.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::{OverflowPolicy, PoolConfig, PoolTemplate};
use crate::factory::{Factory, InstanceId};
use crate::stats::PoolStats;

/// Stale entries tolerated in the acquisition queue beyond twice the active
/// count before it is compacted.
const ORDER_COMPACT_SLACK: usize = 64;

struct Slot<T> {
    instance: T,
    /// Whether the factory exposed a `Poolable` view when this was built.
    poolable: bool,
}

/// A pool of reusable instances built from one template.
pub struct Pool<F: Factory> {
    identity: Arc<str>,
    config: PoolConfig<F::Template>,
    factory: F,
    slots: HashMap<InstanceId, Slot<F::Instance>>,
    idle: Vec<InstanceId>,
    /// Active instances, keyed to the sequence number of their acquisition.
    active: HashMap<InstanceId, u64>,
    /// Acquisitions in order. An entry is live only while `active` still maps
    /// its id to the same sequence number.
    active_order: VecDeque<(InstanceId, u64)>,
    next_seq: u64,
    stats: PoolStats,
}

impl<F: Factory> Pool<F> {
    /// Build a pool and prewarm `config.initial_size` instances.
    pub fn new(config: PoolConfig<F::Template>, factory: F) -> Self
    where
        F::Template: PoolTemplate,
    {
        let identity: Arc<str> = config.resolved_identity().into();
        if !config.is_sane() {
            warn!(
                pool = %identity,
                initial_size = config.initial_size,
                max_size = config.max_size,
                "initial size exceeds max size; prewarming stops at the bound"
            );
        }
        let initial = config.initial_size;
        let mut pool = Self {
            identity,
            config,
            factory,
            slots: HashMap::new(),
            idle: Vec::with_capacity(initial),
            active: HashMap::new(),
            active_order: VecDeque::new(),
            next_seq: 0,
            stats: PoolStats::default(),
        };
        pool.prewarm(initial);
        pool
    }

    /// Identity this pool is registered under.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub(crate) fn shared_identity(&self) -> &Arc<str> {
        &self.identity
    }

    /// The configuration the pool was built with.
    #[must_use]
    pub fn config(&self) -> &PoolConfig<F::Template> {
        &self.config
    }

    /// Number of idle instances.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Number of checked-out instances.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Idle plus active instances.
    #[must_use]
    pub fn total(&self) -> usize {
        self.idle.len() + self.active.len()
    }

    /// Usage counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Zero the usage counters.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Whether `id` is currently checked out of this pool.
    #[must_use]
    pub fn is_active(&self, id: InstanceId) -> bool {
        self.active.contains_key(&id)
    }

    /// Whether `id` is parked in this pool's idle storage.
    #[must_use]
    pub fn is_idle(&self, id: InstanceId) -> bool {
        self.idle.contains(&id)
    }

    /// Whether this pool owns `id` at all.
    #[must_use]
    pub fn contains(&self, id: InstanceId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Idle ids, bottom of the stack first. The last one is reused next.
    #[must_use]
    pub fn idle_ids(&self) -> &[InstanceId] {
        &self.idle
    }

    /// Active ids in acquisition order, oldest first.
    #[must_use]
    pub fn active_ids(&self) -> Vec<InstanceId> {
        let mut ids: Vec<(InstanceId, u64)> =
            self.active.iter().map(|(&id, &seq)| (id, seq)).collect();
        ids.sort_unstable_by_key(|&(_, seq)| seq);
        ids.into_iter().map(|(id, _)| id).collect()
    }

    /// Borrow an active instance.
    #[must_use]
    pub fn get(&self, id: InstanceId) -> Option<&F::Instance> {
        if !self.is_active(id) {
            return None;
        }
        self.slots.get(&id).map(|slot| &slot.instance)
    }

    /// Mutably borrow an active instance.
    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut F::Instance> {
        if !self.active.contains_key(&id) {
            return None;
        }
        self.slots.get_mut(&id).map(|slot| &mut slot.instance)
    }

    /// Construct up to `count` idle instances, stopping at `max_size`.
    ///
    /// Returns how many were built.
    pub fn prewarm(&mut self, count: usize) -> usize {
        let mut created = 0;
        while created < count && self.has_room() {
            let id = self.construct();
            self.park(id);
            created += 1;
        }
        created
    }

    /// Check out an instance, placing it with `placement`.
    ///
    /// Returns `None` when idle storage is empty and the overflow policy
    /// cannot produce one.
    pub fn acquire(&mut self, placement: &F::Placement) -> Option<InstanceId> {
        let id = if let Some(id) = self.pop_valid_idle() {
            self.stats.record_hit();
            id
        } else {
            let overflowed = match self.config.overflow {
                OverflowPolicy::Expand => self.expand(),
                OverflowPolicy::RecycleOldest if !self.below_max() => self.recycle_oldest(),
                OverflowPolicy::RejectNull if !self.below_max() => None,
                // Bounded pools grow to their bound before the policy applies.
                OverflowPolicy::RecycleOldest | OverflowPolicy::RejectNull => {
                    Some(self.construct_miss())
                }
            };
            let Some(id) = overflowed else {
                self.stats.record_reject();
                debug!(pool = %self.identity, policy = ?self.config.overflow, "acquire rejected");
                return None;
            };
            id
        };
        self.hand_out(id, placement);
        Some(id)
    }

    /// Return an active instance to idle storage.
    ///
    /// Returns `false` and changes nothing if `id` is not checked out of this
    /// pool, which covers double releases and foreign instances.
    pub fn release(&mut self, id: InstanceId) -> bool {
        if !self.transition_to_idle(id) {
            debug!(pool = %self.identity, instance = %id, "ignoring release of inactive instance");
            return false;
        }
        self.idle.push(id);
        true
    }

    /// Release every active instance, oldest first. Returns how many.
    pub fn release_all(&mut self) -> usize {
        self.active_ids()
            .into_iter()
            .filter(|&id| self.release(id))
            .count()
    }

    /// Destroy idle instances until at most `keep_count` remain.
    ///
    /// Active instances are never touched. Returns how many were destroyed.
    pub fn shrink(&mut self, keep_count: usize) -> usize {
        let mut destroyed = 0;
        while self.idle.len() > keep_count {
            let Some(id) = self.idle.pop() else { break };
            self.destroy_slot(id);
            destroyed += 1;
        }
        if destroyed > 0 {
            debug!(pool = %self.identity, destroyed, kept = self.idle.len(), "shrunk idle storage");
        }
        destroyed
    }

    /// [`shrink`](Self::shrink) down to the configured keep count.
    pub fn shrink_default(&mut self) -> usize {
        self.shrink(self.config.shrink_keep_count)
    }

    /// Destroy an instance owned by this pool without returning it to idle
    /// storage, whatever state it is in. Returns `false` if not owned.
    pub fn destroy_instance(&mut self, id: InstanceId) -> bool {
        if self.active.remove(&id).is_none() {
            let Some(pos) = self.idle.iter().position(|&idle| idle == id) else {
                return false;
            };
            self.idle.remove(pos);
        }
        self.destroy_slot(id);
        true
    }

    /// Release everything, destroy every instance, and drop the pool.
    ///
    /// Returns how many instances were destroyed.
    pub fn clear(mut self) -> usize {
        self.teardown()
    }

    fn teardown(&mut self) -> usize {
        self.release_all();
        let mut destroyed = 0;
        while let Some(id) = self.idle.pop() {
            self.destroy_slot(id);
            destroyed += 1;
        }
        // Anything left here escaped the idle/active bookkeeping.
        for (id, slot) in self.slots.drain() {
            error!(pool = %self.identity, instance = %id, "destroying untracked instance");
            self.factory.destroy(slot.instance);
            self.stats.record_destroyed();
            destroyed += 1;
        }
        self.active.clear();
        self.active_order.clear();
        destroyed
    }

    fn has_room(&self) -> bool {
        self.config.admits(self.total() + 1)
    }

    fn below_max(&self) -> bool {
        self.config.max_size > 0 && self.total() < self.config.max_size
    }

    fn construct(&mut self) -> InstanceId {
        let mut instance = self.factory.create(&self.config.template);
        let poolable = self.factory.poolable(&mut instance).is_some();
        let id = InstanceId::next();
        self.slots.insert(id, Slot { instance, poolable });
        self.stats.record_created();
        id
    }

    fn construct_miss(&mut self) -> InstanceId {
        self.stats.record_miss();
        self.construct()
    }

    /// Deactivate a freshly built instance and push it onto idle storage.
    fn park(&mut self, id: InstanceId) {
        if let Some(slot) = self.slots.get_mut(&id) {
            self.factory.deactivate(&mut slot.instance);
        }
        self.idle.push(id);
    }

    fn destroy_slot(&mut self, id: InstanceId) {
        if let Some(slot) = self.slots.remove(&id) {
            self.factory.destroy(slot.instance);
            self.stats.record_destroyed();
        }
    }

    fn pop_valid_idle(&mut self) -> Option<InstanceId> {
        while let Some(id) = self.idle.pop() {
            let valid = self
                .slots
                .get(&id)
                .is_some_and(|slot| self.factory.is_valid(&slot.instance));
            if valid {
                return Some(id);
            }
            debug!(pool = %self.identity, instance = %id, "discarding invalid idle instance");
            self.stats.record_invalid();
            self.destroy_slot(id);
        }
        None
    }

    /// Build one instance to hand out plus `batch - 1` spares for idle storage.
    fn expand(&mut self) -> Option<InstanceId> {
        if !self.has_room() {
            return None;
        }
        let id = self.construct_miss();
        // The instance being handed out is not counted in `total` yet.
        let spares = self.config.effective_batch_size() - 1;
        let mut built = 0;
        while built < spares && self.config.admits(self.total() + 2) {
            let spare = self.construct();
            self.park(spare);
            built += 1;
        }
        Some(id)
    }

    fn recycle_oldest(&mut self) -> Option<InstanceId> {
        while let Some((id, seq)) = self.active_order.pop_front() {
            if self.active.get(&id) != Some(&seq) {
                continue;
            }
            self.transition_to_idle(id);
            self.stats.record_recycle();
            debug!(pool = %self.identity, instance = %id, "recycled oldest active instance");
            return Some(id);
        }
        if !self.active.is_empty() {
            error!(
                pool = %self.identity,
                active = self.active.len(),
                "acquisition queue exhausted with live instances outstanding"
            );
        }
        if !self.has_room() {
            return None;
        }
        Some(self.construct_miss())
    }

    fn hand_out(&mut self, id: InstanceId, placement: &F::Placement) {
        if let Some(slot) = self.slots.get_mut(&id) {
            self.factory.place(&mut slot.instance, placement);
            self.factory.activate(&mut slot.instance);
            if slot.poolable {
                if let Some(hooks) = self.factory.poolable(&mut slot.instance) {
                    hooks.on_acquire();
                }
            }
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.active.insert(id, seq);
        self.active_order.push_back((id, seq));
        self.compact_order();
    }

    /// Active to idle-bound. Shared by `release` and forced recycling so the
    /// release hook fires exactly once per transition.
    fn transition_to_idle(&mut self, id: InstanceId) -> bool {
        if self.active.remove(&id).is_none() {
            return false;
        }
        if let Some(slot) = self.slots.get_mut(&id) {
            if slot.poolable {
                if let Some(hooks) = self.factory.poolable(&mut slot.instance) {
                    hooks.on_release();
                }
            }
            self.factory.deactivate(&mut slot.instance);
        }
        self.stats.record_release();
        true
    }

    fn compact_order(&mut self) {
        if self.active_order.len() <= self.active.len() * 2 + ORDER_COMPACT_SLACK {
            return;
        }
        let active = &self.active;
        self.active_order
            .retain(|(id, seq)| active.get(id) == Some(seq));
    }
}

impl<F: Factory> Drop for Pool<F> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<F: Factory> std::fmt::Debug for Pool<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("identity", &self.identity)
            .field("idle", &self.idle.len())
            .field("active", &self.active.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}
