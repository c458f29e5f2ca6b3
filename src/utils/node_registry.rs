//! Process-wide registry of [`IdGenerator`]s, one per node id.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use crate::utils::snowflake::{Clock, IdError, IdGenerator, SystemClock, validate_node_id};

/// Lazily creates and memoizes one [`IdGenerator`] per node id.
///
/// Lookups and first-time construction go through the map's entry API, which
/// holds the shard lock for the key while the generator is built. Concurrent
/// first callers for the same node therefore converge on a single instance.
/// Construction failures are returned and never stored.
pub struct NodeRegistry {
    generators: DashMap<u16, Arc<IdGenerator>>,
    clock: Arc<dyn Clock>,
}

impl NodeRegistry {
    /// Creates an empty registry whose generators use the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty registry whose generators read time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            generators: DashMap::new(),
            clock,
        }
    }

    /// Returns the generator for `node_id`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`IdError::InvalidNodeId`] if `node_id` is outside `0..=1023`.
    /// Nothing is cached in that case.
    pub fn get_generator(&self, node_id: i64) -> Result<Arc<IdGenerator>, IdError> {
        let key = validate_node_id(node_id)?;

        if let Some(existing) = self.generators.get(&key) {
            return Ok(Arc::clone(existing.value()));
        }

        let entry = self.generators.entry(key).or_try_insert_with(|| {
            info!(node_id = key, "Creating ID generator");
            IdGenerator::with_clock(i64::from(key), Arc::clone(&self.clock)).map(Arc::new)
        })?;

        Ok(Arc::clone(entry.value()))
    }

    /// Number of node ids with a live generator.
    pub fn len(&self) -> usize {
        self.generators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
