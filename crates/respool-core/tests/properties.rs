//! Property-based tests for pool and registry bookkeeping.
//!
//! Random operation sequences are replayed against a registry and the
//! idle/active/reverse-map invariants are checked after every step.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use proptest::prelude::*;

use respool_core::{
    Factory, InstanceId, OverflowPolicy, Pool, PoolConfig, PoolRegistry, Poolable,
};

#[derive(Debug, Default)]
struct Token {
    acquired: u32,
    released: u32,
}

impl Poolable for Token {
    fn on_acquire(&mut self) {
        self.acquired += 1;
    }

    fn on_release(&mut self) {
        self.released += 1;
    }
}

#[derive(Clone)]
struct Tokens;

impl Factory for Tokens {
    type Template = String;
    type Instance = Token;
    type Placement = ();

    fn create(&mut self, _template: &String) -> Token {
        Token::default()
    }

    fn poolable<'a>(&self, instance: &'a mut Token) -> Option<&'a mut dyn Poolable> {
        Some(instance)
    }
}

#[derive(Debug, Clone)]
enum Op {
    Acquire(usize),
    Release(usize),
    ReleaseUnknown,
    Shrink(usize, usize),
    Prewarm(usize, usize),
    Maintain(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..3).prop_map(Op::Acquire),
        3 => (0usize..64).prop_map(Op::Release),
        1 => Just(Op::ReleaseUnknown),
        1 => ((0usize..3), (0usize..4)).prop_map(|(p, k)| Op::Shrink(p, k)),
        1 => ((0usize..3), (0usize..6)).prop_map(|(p, n)| Op::Prewarm(p, n)),
        1 => (0u64..20).prop_map(Op::Maintain),
    ]
}

fn policy() -> impl Strategy<Value = OverflowPolicy> {
    prop_oneof![
        Just(OverflowPolicy::Expand),
        Just(OverflowPolicy::RecycleOldest),
        Just(OverflowPolicy::RejectNull),
    ]
}

const NAMES: [&str; 3] = ["p0", "p1", "p2"];

fn check_invariants(reg: &PoolRegistry<Tokens>, held: &[InstanceId]) {
    let mut seen = HashSet::new();
    for name in NAMES {
        let pool = reg.pool(name).unwrap();
        let max = pool.config().max_size;
        assert!(max == 0 || pool.total() <= max, "{name} over capacity");

        let active: HashSet<_> = pool.active_ids().into_iter().collect();
        assert_eq!(active.len(), pool.active_count());
        for id in pool.idle_ids() {
            assert!(!active.contains(id), "{id} idle and active in {name}");
            assert!(seen.insert(*id), "{id} appears twice");
        }
        for id in &active {
            assert!(seen.insert(*id), "{id} appears twice");
        }
    }
    for id in held {
        let owner = reg.owner_of(*id).expect("held instance lost its owner");
        assert!(reg.pool(owner).unwrap().is_active(*id));
    }
    assert_eq!(reg.tracked_count(), held.len());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Idle and active stay disjoint, bounded pools stay bounded, and the
    /// reverse map tracks exactly the instances callers hold.
    #[test]
    fn bookkeeping_survives_random_ops(
        policies in proptest::collection::vec(policy(), 3),
        sizes in proptest::collection::vec((0usize..4, 0usize..6, 1usize..4), 3),
        ops in proptest::collection::vec(op(), 1..120),
    ) {
        let mut reg = PoolRegistry::new(Tokens);
        for (i, name) in NAMES.iter().enumerate() {
            let (initial, max, batch) = sizes[i];
            reg.create_pool(
                PoolConfig::new((*name).to_string())
                    .with_initial_size(initial)
                    .with_max_size(max)
                    .with_expand_batch_size(batch)
                    .with_overflow(policies[i])
                    .with_auto_shrink(Duration::from_secs(5), 1),
            );
        }

        // An instance from a pool the registry has never seen.
        let mut stray = Pool::new(PoolConfig::new("stray".to_string()).with_initial_size(1), Tokens);
        let stray_id = stray.acquire(&()).unwrap();

        let t0 = Instant::now();
        let mut held: Vec<InstanceId> = Vec::new();
        for op in ops {
            match op {
                Op::Acquire(p) => {
                    if let Some(id) = reg.acquire(NAMES[p], &()).unwrap() {
                        // A recycled instance is re-acquired under the same handle.
                        held.retain(|h| *h != id);
                        held.push(id);
                    }
                }
                Op::Release(i) => {
                    if !held.is_empty() {
                        let id = held.remove(i % held.len());
                        prop_assert!(reg.release(id));
                        prop_assert!(!reg.release(id));
                    }
                }
                Op::ReleaseUnknown => {
                    prop_assert!(!reg.release(stray_id));
                    prop_assert!(stray.is_active(stray_id));
                }
                Op::Shrink(p, keep) => {
                    let pool = reg.pool_mut(NAMES[p]).unwrap();
                    let active = pool.active_count();
                    pool.shrink(keep);
                    prop_assert!(pool.idle_count() <= keep);
                    prop_assert_eq!(pool.active_count(), active);
                }
                Op::Prewarm(p, n) => {
                    reg.pool_mut(NAMES[p]).unwrap().prewarm(n);
                }
                Op::Maintain(secs) => {
                    reg.maintain(t0 + Duration::from_secs(secs));
                }
            }
            check_invariants(&reg, &held);
        }
    }

    /// Every acquire is matched by exactly one acquire hook, every release
    /// (forced recycling included) by exactly one release hook.
    #[test]
    fn hooks_balance(max in 1usize..5, rounds in 1usize..40) {
        let mut reg = PoolRegistry::new(Tokens);
        reg.create_pool(
            PoolConfig::new("ring".to_string())
                .with_initial_size(0)
                .with_max_size(max)
                .with_overflow(OverflowPolicy::RecycleOldest),
        );
        let mut last = None;
        for _ in 0..rounds {
            last = reg.acquire("ring", &()).unwrap();
        }
        let id = last.unwrap();
        let token = reg.get(id).unwrap();
        prop_assert_eq!(token.acquired, token.released + 1);

        let stats = reg.pool("ring").unwrap().stats();
        prop_assert_eq!(stats.acquisitions(), rounds as u64);
        prop_assert_eq!(stats.recycled, rounds.saturating_sub(max) as u64);
    }
}

/// Capacity example: RecycleOldest with two slots evicts the first holder.
#[test]
fn recycle_oldest_two_slots() {
    let mut reg = PoolRegistry::new(Tokens);
    reg.create_pool(
        PoolConfig::new("fx".to_string())
            .with_max_size(2)
            .with_overflow(OverflowPolicy::RecycleOldest),
    );
    let a1 = reg.acquire("fx", &()).unwrap().unwrap();
    let a2 = reg.acquire("fx", &()).unwrap().unwrap();
    let a3 = reg.acquire("fx", &()).unwrap().unwrap();
    assert_eq!(a3, a1);
    assert_ne!(a3, a2);
    assert_eq!(reg.get(a1).unwrap().released, 1);
    assert_eq!(reg.pool("fx").unwrap().total(), 2);
}
