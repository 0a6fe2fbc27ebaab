//! Named pools and instance routing.
//!
//! The registry owns every pool, keyed by identity, and remembers which pool
//! each instance it handed out came from, so callers can release an instance
//! without naming its pool. The reverse map is a routing table only: the
//! owning pool alone decides whether an instance is idle or active.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::config::{PoolConfig, PoolTemplate};
use crate::error::PoolError;
use crate::factory::{Factory, InstanceId};
use crate::pool::Pool;
use crate::stats::PoolStats;

/// Owner of a set of named pools.
pub struct PoolRegistry<F: Factory> {
    factory: F,
    pools: HashMap<Arc<str>, Pool<F>>,
    owner: HashMap<InstanceId, Arc<str>>,
    last_shrink: HashMap<Arc<str>, Instant>,
}

impl<F: Factory> PoolRegistry<F> {
    /// Create an empty registry. `factory` is cloned into every pool built
    /// through [`create_pool`](Self::create_pool).
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            pools: HashMap::new(),
            owner: HashMap::new(),
            last_shrink: HashMap::new(),
        }
    }

    /// Remove a pool: forget its instances, release and destroy all of them.
    ///
    /// Returns `false` if no pool has that identity.
    pub fn destroy_pool(&mut self, identity: &str) -> bool {
        let Some(pool) = self.pools.remove(identity) else {
            return false;
        };
        self.owner.retain(|_, owner| &**owner != identity);
        self.last_shrink.remove(identity);
        let destroyed = pool.clear();
        info!(pool = identity, destroyed, "pool destroyed");
        true
    }

    /// Check out an instance from the named pool.
    ///
    /// `Ok(None)` is a policy outcome (the pool rejected the request). An
    /// unregistered identity is a caller bug and yields
    /// [`PoolError::UnknownPool`].
    pub fn acquire(
        &mut self,
        identity: &str,
        placement: &F::Placement,
    ) -> Result<Option<InstanceId>, PoolError> {
        let Some(pool) = self.pools.get_mut(identity) else {
            error!(pool = identity, "acquire from unregistered pool");
            return Err(PoolError::UnknownPool(identity.to_string()));
        };
        let acquired = pool.acquire(placement);
        if let Some(id) = acquired {
            self.owner.insert(id, Arc::clone(pool.shared_identity()));
        }
        Ok(acquired)
    }

    /// Return an instance to the pool it came from.
    ///
    /// Returns `true` exactly once per registry acquisition. An instance the
    /// registry never handed out is not pooled: if a registered pool still
    /// holds it, idle or active, that pool destroys it outright. Either way
    /// the result is `false`.
    pub fn release(&mut self, id: InstanceId) -> bool {
        let Some(identity) = self.owner.remove(&id) else {
            self.destroy_orphan(id);
            return false;
        };
        let released = self
            .pools
            .get_mut(&*identity)
            .is_some_and(|pool| pool.release(id));
        if !released {
            debug!(pool = %identity, instance = %id, "dropped stale owner entry");
        }
        released
    }

    /// Like [`release`](Self::release), reporting failure as an error.
    pub fn try_release(&mut self, id: InstanceId) -> Result<(), PoolError> {
        if self.release(id) {
            Ok(())
        } else {
            Err(PoolError::UnknownInstance(id))
        }
    }

    /// Release every active instance in every pool.
    ///
    /// Intended for host environment teardown. Returns how many instances
    /// were released.
    pub fn release_all(&mut self) -> usize {
        let released: usize = self.pools.values_mut().map(Pool::release_all).sum();
        self.owner.clear();
        debug!(released, "released all pools");
        released
    }

    /// Periodic maintenance: shrink every auto-shrinking pool whose interval
    /// has elapsed since its last shrink.
    ///
    /// The first sweep that sees a pool only starts its clock. Returns how many
    /// idle instances were destroyed.
    pub fn maintain(&mut self, now: Instant) -> usize {
        let mut destroyed = 0;
        for (identity, pool) in &mut self.pools {
            if !pool.config().auto_shrink {
                continue;
            }
            let last = self
                .last_shrink
                .entry(Arc::clone(identity))
                .or_insert(now);
            if now.saturating_duration_since(*last) >= pool.config().shrink_interval {
                destroyed += pool.shrink_default();
                *last = now;
            }
        }
        destroyed
    }

    /// The named pool.
    #[must_use]
    pub fn pool(&self, identity: &str) -> Option<&Pool<F>> {
        self.pools.get(identity)
    }

    /// The named pool, mutably.
    ///
    /// Instances acquired directly on the pool bypass the reverse map; the
    /// registry will destroy rather than pool them if they are released
    /// through it. Releasing a registry-acquired instance directly on the
    /// pool (`Pool::release`, `Pool::release_all`) leaves its reverse-map
    /// entry behind; the entry is dropped by the next registry release of
    /// that instance, which then returns `false`.
    pub fn pool_mut(&mut self, identity: &str) -> Option<&mut Pool<F>> {
        self.pools.get_mut(identity)
    }

    /// Whether a pool is registered under `identity`.
    #[must_use]
    pub fn contains_pool(&self, identity: &str) -> bool {
        self.pools.contains_key(identity)
    }

    /// Number of registered pools.
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Registered identities, sorted.
    #[must_use]
    pub fn identities(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.pools.keys().map(|id| &**id).collect();
        ids.sort_unstable();
        ids
    }

    /// Identity of the pool an instance was acquired from.
    #[must_use]
    pub fn owner_of(&self, id: InstanceId) -> Option<&str> {
        self.owner.get(&id).map(|owner| &**owner)
    }

    /// Number of instances currently routed through the reverse map.
    #[must_use]
    pub fn tracked_count(&self) -> usize {
        self.owner.len()
    }

    /// Borrow an instance acquired through the registry.
    #[must_use]
    pub fn get(&self, id: InstanceId) -> Option<&F::Instance> {
        let owner = self.owner.get(&id)?;
        self.pools.get(owner)?.get(id)
    }

    /// Mutably borrow an instance acquired through the registry.
    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut F::Instance> {
        let owner = self.owner.get(&id)?;
        self.pools.get_mut(owner)?.get_mut(id)
    }

    /// Usage counters per pool, keyed by identity.
    #[must_use]
    pub fn stats(&self) -> BTreeMap<String, PoolStats> {
        self.pools
            .iter()
            .map(|(id, pool)| (id.to_string(), pool.stats()))
            .collect()
    }

    fn destroy_orphan(&mut self, id: InstanceId) {
        match self.pools.values_mut().find(|pool| pool.contains(id)) {
            Some(pool) => {
                warn!(
                    pool = pool.identity(),
                    instance = %id,
                    "release of instance not acquired through the registry; destroying it"
                );
                pool.destroy_instance(id);
            }
            None => debug!(instance = %id, "release of unknown instance ignored"),
        }
    }
}

impl<F> PoolRegistry<F>
where
    F: Factory + Clone,
    F::Template: PoolTemplate,
{
    /// Build, prewarm, and register a pool.
    ///
    /// If the identity is already taken the existing pool is returned as is;
    /// the new configuration is ignored.
    pub fn create_pool(&mut self, config: PoolConfig<F::Template>) -> &mut Pool<F> {
        let factory = self.factory.clone();
        self.create_pool_with(config, factory)
    }
}

impl<F> PoolRegistry<F>
where
    F: Factory,
    F::Template: PoolTemplate,
{
    /// [`create_pool`](PoolRegistry::create_pool) with a dedicated factory.
    pub fn create_pool_with(
        &mut self,
        config: PoolConfig<F::Template>,
        factory: F,
    ) -> &mut Pool<F> {
        let identity: Arc<str> = config.resolved_identity().into();
        match self.pools.entry(identity) {
            Entry::Occupied(entry) => {
                warn!(pool = %entry.key(), "pool already registered; keeping existing configuration");
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                let pool = Pool::new(config, factory);
                info!(
                    pool = %entry.key(),
                    prewarmed = pool.idle_count(),
                    max_size = pool.config().max_size,
                    policy = ?pool.config().overflow,
                    "pool created"
                );
                entry.insert(pool)
            }
        }
    }
}

impl<F: Factory + Default> Default for PoolRegistry<F> {
    fn default() -> Self {
        Self::new(F::default())
    }
}

impl<F: Factory> std::fmt::Debug for PoolRegistry<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("pools", &self.identities())
            .field("tracked", &self.owner.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::OverflowPolicy;

    #[derive(Clone, Default)]
    struct Tokens;

    impl Factory for Tokens {
        type Template = String;
        type Instance = Vec<u8>;
        type Placement = u8;

        fn create(&mut self, _template: &String) -> Vec<u8> {
            Vec::with_capacity(16)
        }

        fn place(&mut self, instance: &mut Vec<u8>, placement: &u8) {
            instance.push(*placement);
        }

        fn deactivate(&mut self, instance: &mut Vec<u8>) {
            instance.clear();
        }
    }

    fn cfg(name: &str) -> PoolConfig<String> {
        PoolConfig::new(name.to_string()).with_initial_size(2)
    }

    fn registry() -> PoolRegistry<Tokens> {
        PoolRegistry::new(Tokens)
    }

    #[test]
    fn create_pool_prewarms_and_registers() {
        let mut reg = registry();
        let pool = reg.create_pool(cfg("a"));
        assert_eq!(pool.idle_count(), 2);
        assert!(reg.contains_pool("a"));
        assert_eq!(reg.pool_count(), 1);
    }

    #[test]
    fn create_pool_is_idempotent() {
        let mut reg = registry();
        reg.create_pool(cfg("a"));
        let total = reg.pool("a").unwrap().total();
        let again = reg.create_pool(cfg("a").with_initial_size(9).with_max_size(1));
        assert_eq!(again.total(), total);
        assert_eq!(again.config().max_size, 0);
        assert_eq!(reg.pool_count(), 1);
    }

    #[test]
    fn identity_override() {
        let mut reg = registry();
        reg.create_pool(cfg("bullet").with_identity("enemy-bullet"));
        assert!(reg.contains_pool("enemy-bullet"));
        assert!(!reg.contains_pool("bullet"));
    }

    #[test]
    fn acquire_records_owner() {
        let mut reg = registry();
        reg.create_pool(cfg("a"));
        let id = reg.acquire("a", &7).unwrap().unwrap();
        assert_eq!(reg.owner_of(id), Some("a"));
        assert_eq!(reg.get(id), Some(&vec![7]));
        reg.get_mut(id).unwrap().push(8);
        assert_eq!(reg.get(id), Some(&vec![7, 8]));
    }

    #[test]
    fn acquire_unknown_pool_is_error() {
        let mut reg = registry();
        let err = reg.acquire("missing", &0).unwrap_err();
        assert_eq!(err, PoolError::UnknownPool("missing".into()));
        assert_eq!(reg.tracked_count(), 0);
    }

    #[test]
    fn acquire_rejected_records_nothing() {
        let mut reg = registry();
        reg.create_pool(
            cfg("a")
                .with_initial_size(1)
                .with_max_size(1)
                .with_overflow(OverflowPolicy::RejectNull),
        );
        assert!(reg.acquire("a", &0).unwrap().is_some());
        assert_eq!(reg.acquire("a", &0).unwrap(), None);
        assert_eq!(reg.tracked_count(), 1);
    }

    #[test]
    fn release_once() {
        let mut reg = registry();
        reg.create_pool(cfg("a"));
        let id = reg.acquire("a", &1).unwrap().unwrap();
        assert!(reg.release(id));
        assert!(reg.pool("a").unwrap().is_idle(id));
        assert!(!reg.release(id));
        assert_eq!(reg.owner_of(id), None);
        assert!(!reg.pool("a").unwrap().contains(id));
        assert_eq!(
            reg.try_release(id).unwrap_err(),
            PoolError::UnknownInstance(id)
        );
    }

    #[test]
    fn release_routes_to_owning_pool() {
        let mut reg = registry();
        reg.create_pool(cfg("a"));
        reg.create_pool(cfg("b"));
        let from_a = reg.acquire("a", &0).unwrap().unwrap();
        let from_b = reg.acquire("b", &0).unwrap().unwrap();
        assert!(reg.release(from_b));
        assert!(reg.pool("b").unwrap().is_idle(from_b));
        assert!(reg.pool("a").unwrap().is_active(from_a));
    }

    #[test]
    fn release_of_direct_acquisition_destroys_it() {
        let mut reg = registry();
        reg.create_pool(cfg("a"));
        let id = reg.pool_mut("a").unwrap().acquire(&0).unwrap();
        assert!(!reg.release(id));
        let pool = reg.pool("a").unwrap();
        assert!(!pool.contains(id));
        assert_eq!(pool.stats().destroyed, 1);
    }

    #[test]
    fn release_of_direct_idle_instance_destroys_it() {
        let mut reg = registry();
        reg.create_pool(cfg("a"));
        let pool = reg.pool_mut("a").unwrap();
        let id = pool.acquire(&0).unwrap();
        assert!(pool.release(id));
        assert!(pool.is_idle(id));
        let destroyed = pool.stats().destroyed;

        assert!(!reg.release(id));
        let pool = reg.pool("a").unwrap();
        assert!(!pool.contains(id));
        assert_eq!(pool.stats().destroyed, destroyed + 1);
        assert_eq!(pool.total(), 1);
    }

    #[test]
    fn release_after_direct_pool_release_is_false() {
        let mut reg = registry();
        reg.create_pool(cfg("a"));
        let id = reg.acquire("a", &0).unwrap().unwrap();
        assert!(reg.pool_mut("a").unwrap().release(id));
        assert_eq!(reg.owner_of(id), Some("a"));
        assert!(!reg.release(id));
        assert_eq!(reg.tracked_count(), 0);
        assert!(reg.pool("a").unwrap().is_idle(id));
    }

    #[test]
    fn recycled_instance_keeps_single_owner_entry() {
        let mut reg = registry();
        reg.create_pool(
            cfg("a")
                .with_initial_size(0)
                .with_max_size(1)
                .with_overflow(OverflowPolicy::RecycleOldest),
        );
        let first = reg.acquire("a", &0).unwrap().unwrap();
        let second = reg.acquire("a", &0).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(reg.tracked_count(), 1);
        assert!(reg.release(second));
        assert!(!reg.release(first));
    }

    #[test]
    fn destroy_pool_prunes_reverse_map() {
        let mut reg = registry();
        reg.create_pool(cfg("a"));
        reg.create_pool(cfg("b"));
        let a = reg.acquire("a", &0).unwrap().unwrap();
        let b = reg.acquire("b", &0).unwrap().unwrap();
        assert!(reg.destroy_pool("a"));
        assert!(!reg.destroy_pool("a"));
        assert_eq!(reg.owner_of(a), None);
        assert_eq!(reg.owner_of(b), Some("b"));
        assert!(!reg.release(a));
        assert!(reg.acquire("a", &0).is_err());
    }

    #[test]
    fn release_all_clears_every_pool() {
        let mut reg = registry();
        reg.create_pool(cfg("a"));
        reg.create_pool(cfg("b"));
        for _ in 0..3 {
            reg.acquire("a", &0).unwrap();
            reg.acquire("b", &0).unwrap();
        }
        assert_eq!(reg.release_all(), 6);
        assert_eq!(reg.tracked_count(), 0);
        assert_eq!(reg.pool("a").unwrap().active_count(), 0);
        assert_eq!(reg.pool("b").unwrap().active_count(), 0);
    }

    #[test]
    fn maintain_waits_for_interval() {
        let mut reg = registry();
        reg.create_pool(
            cfg("a")
                .with_initial_size(8)
                .with_auto_shrink(Duration::from_secs(10), 3),
        );
        reg.create_pool(cfg("manual").with_initial_size(8));
        let t0 = Instant::now();

        assert_eq!(reg.maintain(t0), 0);
        assert_eq!(reg.maintain(t0 + Duration::from_secs(5)), 0);
        assert_eq!(reg.pool("a").unwrap().idle_count(), 8);

        assert_eq!(reg.maintain(t0 + Duration::from_secs(10)), 5);
        assert_eq!(reg.pool("a").unwrap().idle_count(), 3);
        assert_eq!(reg.pool("manual").unwrap().idle_count(), 8);

        reg.pool_mut("a").unwrap().prewarm(4);
        assert_eq!(reg.maintain(t0 + Duration::from_secs(15)), 0);
        assert_eq!(reg.maintain(t0 + Duration::from_secs(20)), 4);
    }

    #[test]
    fn stats_by_identity() {
        let mut reg = registry();
        reg.create_pool(cfg("a"));
        reg.create_pool(cfg("b"));
        reg.acquire("a", &0).unwrap();
        let stats = reg.stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["a"].hits, 1);
        assert_eq!(stats["b"].hits, 0);
        assert_eq!(reg.identities(), vec!["a", "b"]);
    }
}
