//! Planner Configuration
//!
//! Fixed policy inputs of the planner: where brick mount points live,
//! the minimum brick size and the loop-back brick size cap.

use crate::error::{Error, Result};
use crate::planner::sizing::{DEFAULT_MAX_LOOP_BRICK_SIZE, KIB, MIN_BRICK_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default runtime directory; bricks are mounted below `<rundir>/bricks`
pub const DEFAULT_RUNDIR: &str = "/var/run/glusterd2";

/// Configuration for the bricks planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Runtime directory of the cluster daemon
    pub rundir: String,
    /// Smallest brick the planner will emit (bytes)
    pub min_brick_size: u64,
    /// Max brick size for loop-back bricks, also their default (bytes)
    pub default_loop_max_brick_size: u64,
    /// Snapshot reserve factor used when a request does not set one
    pub default_snapshot_reserve_factor: f64,
    /// Average file size assumed when sizing arbiter bricks (bytes)
    pub default_average_file_size: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            rundir: DEFAULT_RUNDIR.to_string(),
            min_brick_size: MIN_BRICK_SIZE,
            default_loop_max_brick_size: DEFAULT_MAX_LOOP_BRICK_SIZE,
            default_snapshot_reserve_factor: 1.0,
            default_average_file_size: 64 * KIB,
        }
    }
}

impl PlannerConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: PlannerConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Root directory for brick mount points
    pub fn bricks_root(&self) -> String {
        format!("{}/bricks", self.rundir.trim_end_matches('/'))
    }

    /// Check the configuration for inconsistent values
    pub fn validate(&self) -> Result<()> {
        if self.rundir.trim().is_empty() {
            return Err(Error::Configuration("rundir must not be empty".into()));
        }
        if self.min_brick_size == 0 {
            return Err(Error::Configuration(
                "min_brick_size must be greater than zero".into(),
            ));
        }
        if self.default_loop_max_brick_size < self.min_brick_size {
            return Err(Error::Configuration(format!(
                "default_loop_max_brick_size ({}) is below min_brick_size ({})",
                self.default_loop_max_brick_size, self.min_brick_size
            )));
        }
        if !self.default_snapshot_reserve_factor.is_finite()
            || self.default_snapshot_reserve_factor < 1.0
        {
            return Err(Error::Configuration(format!(
                "default_snapshot_reserve_factor must be >= 1.0, got {}",
                self.default_snapshot_reserve_factor
            )));
        }
        if self.default_average_file_size == 0 {
            return Err(Error::Configuration(
                "default_average_file_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
