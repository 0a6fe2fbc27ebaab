#![no_main]

use libfuzzer_sys::fuzz_target;
use std::time::{Duration, Instant};

use respool_core::{Factory, InstanceId, OverflowPolicy, PoolConfig, PoolRegistry};

#[derive(Clone)]
struct Bytes;

impl Factory for Bytes {
    type Template = String;
    type Instance = Vec<u8>;
    type Placement = u8;

    fn create(&mut self, _template: &String) -> Vec<u8> {
        Vec::with_capacity(16)
    }

    fn place(&mut self, instance: &mut Vec<u8>, placement: &u8) {
        instance.push(*placement);
    }
}

const NAMES: [&str; 2] = ["left", "right"];

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    // First four bytes shape the two pools
    let mut reg = PoolRegistry::new(Bytes);
    for (i, name) in NAMES.iter().enumerate() {
        let policy = match data[i] % 3 {
            0 => OverflowPolicy::Expand,
            1 => OverflowPolicy::RecycleOldest,
            _ => OverflowPolicy::RejectNull,
        };
        reg.create_pool(
            PoolConfig::new((*name).to_string())
                .with_initial_size(usize::from(data[i + 2] % 4))
                .with_max_size(usize::from(data[i + 2] >> 4))
                .with_expand_batch_size(usize::from(data[i] >> 6))
                .with_overflow(policy)
                .with_auto_shrink(Duration::from_secs(1), 1),
        );
    }

    let t0 = Instant::now();
    let mut held: Vec<InstanceId> = Vec::new();
    for (step, &byte) in data[4..].iter().enumerate() {
        let pool = NAMES[usize::from(byte & 1)];
        match byte >> 5 {
            0..=2 => {
                if let Ok(Some(id)) = reg.acquire(pool, &byte) {
                    held.retain(|h| *h != id);
                    held.push(id);
                }
            }
            3 | 4 => {
                if !held.is_empty() {
                    let id = held.remove(usize::from(byte) % held.len());
                    assert!(reg.release(id));
                }
            }
            5 => {
                if let Some(pool) = reg.pool_mut(pool) {
                    pool.shrink(usize::from(byte & 3));
                }
            }
            6 => {
                reg.maintain(t0 + Duration::from_millis(step as u64 * 250));
            }
            _ => {
                reg.release_all();
                held.clear();
            }
        }

        // Should never lose track of a held instance
        assert_eq!(reg.tracked_count(), held.len());
        for id in &held {
            let owner = reg.owner_of(*id).expect("held instance lost its owner");
            assert!(reg.pool(owner).is_some_and(|p| p.is_active(*id)));
        }
    }
});
