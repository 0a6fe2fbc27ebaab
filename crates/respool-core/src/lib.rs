//! # respool-core
//!
//! Typed pools of reusable instances for high-churn workloads.
//!
//! A [`Pool`] hands out previously constructed instances and takes them back
//! for reuse, under a capacity bound and an [`OverflowPolicy`]. A
//! [`PoolRegistry`] owns many named pools, routes releases back to the pool an
//! instance came from, and shrinks idle storage on a schedule.
//!
//! # Example
//! ```
//! use respool_core::{Factory, OverflowPolicy, PoolConfig, PoolRegistry};
//!
//! #[derive(Clone)]
//! struct Buffers;
//!
//! impl Factory for Buffers {
//!     type Template = &'static str;
//!     type Instance = Vec<u8>;
//!     type Placement = ();
//!
//!     fn create(&mut self, _template: &&'static str) -> Vec<u8> {
//!         Vec::with_capacity(4096)
//!     }
//! }
//!
//! let mut registry = PoolRegistry::new(Buffers);
//! registry.create_pool(
//!     PoolConfig::new("frames")
//!         .with_initial_size(2)
//!         .with_max_size(2)
//!         .with_overflow(OverflowPolicy::RejectNull),
//! );
//!
//! let a = registry.acquire("frames", &()).unwrap().unwrap();
//! let _b = registry.acquire("frames", &()).unwrap().unwrap();
//! assert!(registry.acquire("frames", &()).unwrap().is_none());
//! assert!(registry.release(a));
//! ```
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod factory;
pub mod pool;
pub mod registry;
pub mod shared;
pub mod stats;

pub use config::{OverflowPolicy, PoolConfig, PoolTemplate};
pub use error::PoolError;
pub use factory::{Factory, InstanceId, Poolable};
pub use pool::Pool;
pub use registry::PoolRegistry;
pub use shared::SharedRegistry;
pub use stats::PoolStats;
