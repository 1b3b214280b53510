//! Worker pool configuration types

use crate::{parse_env, ConfigResult};

/// WorkerPool sizing and timing configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum number of concurrently running worker tasks
    pub worker_count: usize,

    /// Idle sleep between claim attempts when no work was found, in milliseconds
    pub poll_interval_ms: u64,

    /// Interval between `reset_stale_analyzing` sweeps, in seconds
    pub stale_sweep_interval_secs: u64,
}

impl WorkerConfig {
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            worker_count: parse_env("WTS_WORKER_COUNT", 4)?,
            poll_interval_ms: parse_env("WTS_WORKER_POLL_INTERVAL_MS", 500)?,
            stale_sweep_interval_secs: parse_env("WTS_STALE_SWEEP_INTERVAL_SECS", 60)?,
        })
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            poll_interval_ms: 500,
            stale_sweep_interval_secs: 60,
        }
    }
}
