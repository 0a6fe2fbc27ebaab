//! Error type for registry operations.

use crate::factory::InstanceId;

/// Caller mistakes reported by the registry.
///
/// Policy outcomes (a rejected acquire, a duplicate pool registration) are
/// ordinary return values and never show up here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    /// No pool is registered under this identity.
    #[error("no pool registered as `{0}`")]
    UnknownPool(String),

    /// The instance is not currently checked out of any registered pool.
    #[error("instance {0} is not owned by any registered pool")]
    UnknownInstance(InstanceId),
}
