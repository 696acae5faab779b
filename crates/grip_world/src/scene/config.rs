//! Scene-level configuration: grid dimensions plus gameplay rules.
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::GridConfig;

/// Default tick interval of looped `move` actions.
pub const DEFAULT_ACTION_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration of a scene.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SceneConfig {
    /// Grid dimensions, step size and overlap rule.
    pub grid: GridConfig,
    /// On release, relocate fractionally positioned objects to a legal whole cell.
    pub snap_to_grid: bool,
    /// Objects that exactly cover a matching target can no longer be moved.
    pub lock_on_target: bool,
    /// Tick interval of looped `move` actions.
    pub action_interval: Duration,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            snap_to_grid: false,
            lock_on_target: false,
            action_interval: DEFAULT_ACTION_INTERVAL,
        }
    }
}

impl SceneConfig {
    /// Creates a new [`SceneConfig`] with the given grid and default rules.
    pub fn new(grid: GridConfig) -> Self {
        Self {
            grid,
            ..Default::default()
        }
    }

    pub fn with_snap_to_grid(mut self, snap_to_grid: bool) -> Self {
        self.snap_to_grid = snap_to_grid;
        self
    }

    pub fn with_lock_on_target(mut self, lock_on_target: bool) -> Self {
        self.lock_on_target = lock_on_target;
        self
    }

    pub fn with_action_interval(mut self, action_interval: Duration) -> Self {
        self.action_interval = action_interval;
        self
    }

    /// Validates the configuration, returning an error if invalid.
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        if self.action_interval.is_zero() {
            return Err(Error::InvalidConfig("action_interval must be > 0".into()));
        }
        Ok(())
    }
}
