#![no_main]

use libfuzzer_sys::fuzz_target;

use respool_core::{Factory, PoolConfig, PoolRegistry};

#[derive(Clone)]
struct Unit;

impl Factory for Unit {
    type Template = String;
    type Instance = ();
    type Placement = ();

    fn create(&mut self, _template: &String) {}
}

fuzz_target!(|data: &[u8]| {
    let Ok(mut config) = serde_json::from_slice::<PoolConfig<String>>(data) else {
        return;
    };
    // Keep prewarming cheap
    config.initial_size %= 256;
    config.max_size %= 512;
    config.expand_batch_size %= 64;

    let mut reg = PoolRegistry::new(Unit);
    let identity = config.resolved_identity();
    reg.create_pool(config);

    // Should not panic whatever the configuration
    for _ in 0..64 {
        let _ = reg.acquire(&identity, &());
    }
    let pool = reg.pool(&identity).expect("pool registered");
    let max = pool.config().max_size;
    assert!(max == 0 || pool.total() <= max);
    reg.release_all();
});
