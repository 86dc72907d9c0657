//! Table configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::spatial::DistanceMode;

/// Smallest allowed spatial node capacity.
pub const MIN_NODE_CAPACITY: usize = 4;

/// Largest allowed spatial node capacity.
pub const MAX_NODE_CAPACITY: usize = 256;

/// Table configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Maximum children per spatial-tree node (default: 16).
    pub spatial_node_capacity: usize,

    /// Distance used by `nearby` (default: box distance).
    pub nearby_distance: DistanceMode,

    /// Sleep between expiry-reaper sweeps (default: 1s).
    pub reaper_interval: Duration,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            spatial_node_capacity: 16,
            nearby_distance: DistanceMode::Box,
            reaper_interval: Duration::from_secs(1),
        }
    }
}

impl TableConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set spatial node capacity (builder pattern).
    pub fn with_spatial_node_capacity(mut self, capacity: usize) -> Self {
        self.spatial_node_capacity = capacity;
        self
    }

    /// Set the `nearby` distance mode (builder pattern).
    pub fn with_nearby_distance(mut self, mode: DistanceMode) -> Self {
        self.nearby_distance = mode;
        self
    }

    /// Set the reaper interval (builder pattern).
    pub fn with_reaper_interval(mut self, interval: Duration) -> Self {
        self.reaper_interval = interval;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_NODE_CAPACITY..=MAX_NODE_CAPACITY).contains(&self.spatial_node_capacity) {
            return Err(ConfigError::NodeCapacityOutOfRange(self.spatial_node_capacity));
        }
        if self.reaper_interval.is_zero() {
            return Err(ConfigError::ZeroReaperInterval);
        }
        Ok(())
    }

    /// Create a configuration for tests: small nodes, fast reaper.
    pub fn for_testing() -> Self {
        TableConfig {
            spatial_node_capacity: MIN_NODE_CAPACITY,
            nearby_distance: DistanceMode::Box,
            reaper_interval: Duration::from_millis(10),
        }
    }
}

/// Table configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Spatial node capacity outside 4..=256.
    #[error("spatial node capacity must be between 4 and 256, got {0}")]
    NodeCapacityOutOfRange(usize),

    /// Reaper interval of zero would spin.
    #[error("reaper interval must be non-zero")]
    ZeroReaperInterval,
}
