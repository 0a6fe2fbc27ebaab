//! Deterministic churn simulation over a pool registry.
//!
//! Every tick each emitter acquires a burst of particles, releases particles
//! whose lifetime ran out, advances the rest, and lets the registry run its
//! maintenance sweep against a simulated clock.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

use respool_core::{Factory, InstanceId, OverflowPolicy, PoolRegistry, PoolStats, Poolable};

use crate::config::AppConfig;
use crate::errors::AppError;

/// A pooled particle.
#[derive(Debug, Default)]
pub struct Particle {
    /// Current position.
    pub position: (f32, f32),
    /// Per-tick displacement.
    pub velocity: (f32, f32),
    /// Ticks since the last acquisition.
    pub age: u32,
    /// Times this particle has been handed out.
    pub uses: u32,
    /// Whether the particle is being drawn.
    pub visible: bool,
}

impl Poolable for Particle {
    fn on_acquire(&mut self) {
        self.age = 0;
        self.uses += 1;
    }

    fn on_release(&mut self) {
        self.velocity = (0.0, 0.0);
    }
}

/// Where a particle is emitted.
#[derive(Debug, Clone, Copy)]
pub struct Emission {
    /// Spawn position.
    pub origin: (f32, f32),
    /// Initial velocity.
    pub velocity: (f32, f32),
}

/// Builds particles for every emitter.
#[derive(Debug, Clone, Default)]
pub struct ParticleFactory;

impl Factory for ParticleFactory {
    type Template = String;
    type Instance = Particle;
    type Placement = Emission;

    fn create(&mut self, _template: &String) -> Particle {
        Particle::default()
    }

    fn place(&mut self, particle: &mut Particle, emission: &Emission) {
        particle.position = emission.origin;
        particle.velocity = emission.velocity;
    }

    fn activate(&mut self, particle: &mut Particle) {
        particle.visible = true;
    }

    fn deactivate(&mut self, particle: &mut Particle) {
        particle.visible = false;
    }

    fn poolable<'a>(&self, particle: &'a mut Particle) -> Option<&'a mut dyn Poolable> {
        Some(particle)
    }
}

/// Final state of one pool.
#[derive(Debug, Clone, Serialize)]
pub struct PoolReport {
    /// Pool identity.
    pub name: String,
    /// Overflow policy.
    pub policy: OverflowPolicy,
    /// Idle instances after teardown.
    pub idle: usize,
    /// Most instances out at once.
    pub peak_active: usize,
    /// Usage counters.
    pub stats: PoolStats,
}

/// Outcome of a simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Ticks simulated.
    pub ticks: u64,
    /// Idle instances destroyed by maintenance sweeps.
    pub shrunk: usize,
    /// Instances released by the final teardown.
    pub torn_down: usize,
    /// Per-pool results, in identity order.
    pub pools: Vec<PoolReport>,
}

/// Instances an emitter currently holds.
#[derive(Default)]
struct Emitter {
    /// Acquisition tick per held instance.
    held: HashMap<InstanceId, u64>,
    /// Acquisitions in order; entries whose tick no longer matches `held` are
    /// stale (the instance was recycled and reacquired).
    order: VecDeque<(InstanceId, u64)>,
    peak: usize,
}

/// Churn simulation driving a registry.
pub struct Simulation {
    registry: PoolRegistry<ParticleFactory>,
    emitters: Vec<(String, Emitter)>,
    burst: usize,
    lifetime: u64,
    tick: Duration,
    epoch: Instant,
    shrunk: usize,
}

impl Simulation {
    /// Build the registry and one pool per emitter.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        let mut registry = PoolRegistry::new(ParticleFactory);
        let mut emitters = Vec::with_capacity(config.pools);
        for index in 0..config.pools {
            let pool = registry.create_pool(config.pool_config(index));
            emitters.push((pool.identity().to_string(), Emitter::default()));
        }
        Self {
            registry,
            emitters,
            burst: config.burst,
            lifetime: config.lifetime,
            tick: config.tick_duration(),
            epoch: Instant::now(),
            shrunk: 0,
        }
    }

    /// Registry being driven.
    #[must_use]
    pub fn registry(&self) -> &PoolRegistry<ParticleFactory> {
        &self.registry
    }

    /// Advance one tick.
    pub fn step(&mut self, tick: u64) -> Result<(), AppError> {
        for (index, (name, emitter)) in self.emitters.iter_mut().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let emission = Emission {
                origin: (index as f32 * 10.0, 0.0),
                velocity: (0.5, 1.0),
            };
            for _ in 0..self.burst {
                if let Some(id) = self.registry.acquire(name, &emission)? {
                    emitter.held.insert(id, tick);
                    emitter.order.push_back((id, tick));
                }
            }
            emitter.peak = emitter.peak.max(emitter.held.len());

            while let Some(&(id, born)) = emitter.order.front() {
                if born.saturating_add(self.lifetime) > tick {
                    break;
                }
                emitter.order.pop_front();
                if emitter.held.get(&id) == Some(&born) {
                    emitter.held.remove(&id);
                    self.registry.release(id);
                }
            }

            for id in emitter.held.keys() {
                if let Some(particle) = self.registry.get_mut(*id) {
                    particle.age += 1;
                    particle.position.0 += particle.velocity.0;
                    particle.position.1 += particle.velocity.1;
                }
            }
        }

        let now = self.clock(tick);
        let destroyed = self.registry.maintain(now);
        if destroyed > 0 {
            debug!(tick, destroyed, "maintenance shrink");
        }
        self.shrunk += destroyed;
        Ok(())
    }

    /// Run `ticks` ticks, tear everything down, and report.
    pub fn run(mut self, ticks: u64) -> Result<Report, AppError> {
        for tick in 0..ticks {
            self.step(tick)?;
        }
        let torn_down = self.registry.release_all();
        for (_, emitter) in &mut self.emitters {
            emitter.held.clear();
            emitter.order.clear();
        }
        Ok(self.report(ticks, torn_down))
    }

    fn clock(&self, tick: u64) -> Instant {
        let nanos = self.tick.as_nanos().saturating_mul(u128::from(tick));
        let offset = Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX));
        self.epoch + offset
    }

    fn report(&self, ticks: u64, torn_down: usize) -> Report {
        let mut pools: Vec<PoolReport> = self
            .emitters
            .iter()
            .filter_map(|(name, emitter)| {
                let pool = self.registry.pool(name)?;
                Some(PoolReport {
                    name: name.clone(),
                    policy: pool.config().overflow,
                    idle: pool.idle_count(),
                    peak_active: emitter.peak,
                    stats: pool.stats(),
                })
            })
            .collect();
        pools.sort_by(|a, b| a.name.cmp(&b.name));
        Report {
            ticks,
            shrunk: self.shrunk,
            torn_down,
            pools,
        }
    }
}
