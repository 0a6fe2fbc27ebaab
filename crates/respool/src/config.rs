//! Application configuration from CLI flags and environment.

use std::time::Duration;

use clap::{Parser, ValueEnum};

use respool_core::{OverflowPolicy, PoolConfig};

/// respool: churn simulator for typed instance pools.
#[derive(Parser, Debug)]
#[command(name = "respool", version, about)]
pub struct AppConfig {
    /// Number of pools (one particle emitter each).
    #[arg(short, long, default_value = "3", env = "RESPOOL_POOLS")]
    pub pools: usize,

    /// Number of simulated ticks.
    #[arg(short, long, default_value = "600", env = "RESPOOL_TICKS")]
    pub ticks: u64,

    /// Instances acquired per pool per tick.
    #[arg(short, long, default_value = "4")]
    pub burst: usize,

    /// Ticks an instance stays out before it is released.
    #[arg(short, long, default_value = "30")]
    pub lifetime: u64,

    /// Overflow policy when a pool has no idle instance.
    #[arg(long, value_enum, default_value = "expand", env = "RESPOOL_POLICY")]
    pub policy: PolicyArg,

    /// Instances constructed when each pool is created.
    #[arg(long, default_value = "16")]
    pub initial_size: usize,

    /// Capacity bound per pool (0 = unbounded).
    #[arg(long, default_value = "0")]
    pub max_size: usize,

    /// Instances constructed per expansion.
    #[arg(long, default_value = "4")]
    pub expand_batch: usize,

    /// Interval between automatic shrinks (e.g., "500ms", "2s"). Empty disables.
    #[arg(long, default_value = "2s")]
    pub shrink_interval: String,

    /// Idle instances kept by each shrink.
    #[arg(long, default_value = "8")]
    pub shrink_keep: usize,

    /// Simulated duration of one tick (e.g., "16ms").
    #[arg(long, default_value = "16ms")]
    pub tick: String,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Generate shell completion.
    #[arg(long, value_enum)]
    pub completion: Option<clap_complete::Shell>,
}

/// Overflow policy as spelled on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Construct more instances.
    Expand,
    /// Reclaim the oldest active instance.
    RecycleOldest,
    /// Hand out nothing.
    Reject,
}

impl From<PolicyArg> for OverflowPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Expand => OverflowPolicy::Expand,
            PolicyArg::RecycleOldest => OverflowPolicy::RecycleOldest,
            PolicyArg::Reject => OverflowPolicy::RejectNull,
        }
    }
}

impl AppConfig {
    /// Parse CLI arguments.
    #[must_use]
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    /// Simulated tick length, 16ms when unparseable.
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        self.tick_duration_checked()
            .unwrap_or(Duration::from_millis(16))
    }

    /// Simulated tick length, `None` when unparseable.
    #[must_use]
    pub fn tick_duration_checked(&self) -> Option<Duration> {
        parse_duration(&self.tick)
    }

    /// Shrink interval, `None` when auto-shrink is disabled.
    #[must_use]
    pub fn shrink_duration(&self) -> Option<Duration> {
        if self.shrink_interval.trim().is_empty() {
            return None;
        }
        parse_duration(&self.shrink_interval)
    }

    /// Pool configuration for the emitter at `index`.
    #[must_use]
    pub fn pool_config(&self, index: usize) -> PoolConfig<String> {
        let config = PoolConfig::new(format!("particle-{index}"))
            .with_identity(format!("emitter-{index}"))
            .with_initial_size(self.initial_size)
            .with_max_size(self.max_size)
            .with_expand_batch_size(self.expand_batch)
            .with_overflow(self.policy.into());
        match self.shrink_duration() {
            Some(interval) => config.with_auto_shrink(interval, self.shrink_keep),
            None => config,
        }
    }
}

/// Parse a duration string like "16ms", "2s", "5m", "1h".
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        let n: u64 = ms.parse().ok()?;
        Some(Duration::from_millis(n))
    } else if let Some(mins) = s.strip_suffix('m') {
        let n: u64 = mins.parse().ok()?;
        Some(Duration::from_secs(n * 60))
    } else if let Some(hours) = s.strip_suffix('h') {
        let n: u64 = hours.parse().ok()?;
        Some(Duration::from_secs(n * 3600))
    } else if let Some(secs) = s.strip_suffix('s') {
        let n: u64 = secs.parse().ok()?;
        Some(Duration::from_secs(n))
    } else {
        let n: u64 = s.parse().ok()?;
        Some(Duration::from_secs(n))
    }
}
