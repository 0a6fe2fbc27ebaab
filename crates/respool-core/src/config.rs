//! Pool configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of instances constructed when a pool is created.
pub const DEFAULT_INITIAL_SIZE: usize = 10;

/// Default minimum idle count kept by a shrink.
pub const DEFAULT_SHRINK_KEEP_COUNT: usize = 5;

/// Default interval between automatic shrinks.
pub const DEFAULT_SHRINK_INTERVAL: Duration = Duration::from_secs(30);

/// What a pool does when asked for an instance while idle storage is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Construct new instances, `expand_batch_size` at a time.
    #[default]
    Expand,
    /// Forcibly reclaim the longest-held active instance.
    RecycleOldest,
    /// Hand out nothing.
    RejectNull,
}

/// Template types that can name a pool when the config carries no identity.
pub trait PoolTemplate {
    /// Identity derived from the template.
    fn default_identity(&self) -> String;
}

impl PoolTemplate for String {
    fn default_identity(&self) -> String {
        self.clone()
    }
}

impl PoolTemplate for &'static str {
    fn default_identity(&self) -> String {
        (*self).to_string()
    }
}

impl PoolTemplate for () {
    fn default_identity(&self) -> String {
        "pool".to_string()
    }
}

/// Parameters for one pool. Immutable once the pool is built.
///
/// `max_size == 0 || max_size >= initial_size` is expected but not enforced;
/// see [`PoolConfig::is_sane`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig<K> {
    /// Explicit pool identity. Falls back to the template's default when unset.
    #[serde(default)]
    pub identity: Option<String>,
    /// Descriptor passed to the factory.
    pub template: K,
    /// Instances constructed up front.
    pub initial_size: usize,
    /// Upper bound on idle + active instances (0 = unbounded).
    pub max_size: usize,
    /// Instances constructed per expansion under [`OverflowPolicy::Expand`].
    pub expand_batch_size: usize,
    /// Behaviour when idle storage is empty.
    pub overflow: OverflowPolicy,
    /// Whether the registry's maintenance sweep shrinks this pool.
    pub auto_shrink: bool,
    /// Minimum time between automatic shrinks.
    #[serde(with = "duration_secs")]
    pub shrink_interval: Duration,
    /// Idle instances kept by a shrink.
    pub shrink_keep_count: usize,
}

impl<K> PoolConfig<K> {
    /// Config with default sizing for the given template.
    pub fn new(template: K) -> Self {
        Self {
            identity: None,
            template,
            initial_size: DEFAULT_INITIAL_SIZE,
            max_size: 0,
            expand_batch_size: 1,
            overflow: OverflowPolicy::Expand,
            auto_shrink: false,
            shrink_interval: DEFAULT_SHRINK_INTERVAL,
            shrink_keep_count: DEFAULT_SHRINK_KEEP_COUNT,
        }
    }

    /// Set an explicit identity.
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Set the number of prewarmed instances.
    #[must_use]
    pub fn with_initial_size(mut self, initial_size: usize) -> Self {
        self.initial_size = initial_size;
        self
    }

    /// Set the capacity bound (0 = unbounded).
    #[must_use]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the expansion batch size.
    #[must_use]
    pub fn with_expand_batch_size(mut self, batch: usize) -> Self {
        self.expand_batch_size = batch;
        self
    }

    /// Set the overflow policy.
    #[must_use]
    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Enable automatic shrinking.
    #[must_use]
    pub fn with_auto_shrink(mut self, interval: Duration, keep_count: usize) -> Self {
        self.auto_shrink = true;
        self.shrink_interval = interval;
        self.shrink_keep_count = keep_count;
        self
    }

    /// Expansion batch size, never less than one.
    #[must_use]
    pub fn effective_batch_size(&self) -> usize {
        self.expand_batch_size.max(1)
    }

    /// Whether the capacity bound admits `total` instances.
    #[must_use]
    pub fn admits(&self, total: usize) -> bool {
        self.max_size == 0 || total <= self.max_size
    }

    /// `max_size == 0 || max_size >= initial_size`.
    #[must_use]
    pub fn is_sane(&self) -> bool {
        self.max_size == 0 || self.max_size >= self.initial_size
    }
}

impl<K: PoolTemplate> PoolConfig<K> {
    /// The identity the pool is registered under.
    #[must_use]
    pub fn resolved_identity(&self) -> String {
        match &self.identity {
            Some(id) if !id.is_empty() => id.clone(),
            _ => self.template.default_identity(),
        }
    }
}

impl<K: Default> Default for PoolConfig<K> {
    fn default() -> Self {
        Self::new(K::default())
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
