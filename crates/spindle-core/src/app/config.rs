//! Configuration.

use std::time::Duration;

use crate::domain::ConfigError;

/// Runtime configuration for the coordinator and the HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpindleConfig {
    /// Maximum number of tasks executing at once.
    pub max_concurrent: usize,
    /// Per-task execution budget enforced by the watchdog.
    pub watchdog: Duration,
    /// Number of progress ticks per task.
    pub ticks: u32,
    /// Duration of one simulated tick.
    pub tick_duration: Duration,
    /// Name of the task queue.
    pub task_queue: String,
    /// HTTP listen address.
    pub listen_addr: String,
    /// Terminal entries older than this are purged. `None` keeps them forever.
    pub retention: Option<Duration>,
    /// How often the retention sweep runs.
    pub gc_interval: Duration,
}

impl Default for SpindleConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 50,
            watchdog: Duration::from_secs(50),
            ticks: 10,
            tick_duration: Duration::from_secs(1),
            task_queue: "task_queue".to_string(),
            listen_addr: "0.0.0.0:8080".to_string(),
            retention: None,
            gc_interval: Duration::from_secs(60),
        }
    }
}

impl SpindleConfig {
    /// Read `SPINDLE_*` environment variables over the defaults.
    ///
    /// | variable                   | field           |
    /// |----------------------------|-----------------|
    /// | `SPINDLE_MAX_CONCURRENT`   | max_concurrent  |
    /// | `SPINDLE_WATCHDOG_MS`      | watchdog        |
    /// | `SPINDLE_TICKS`            | ticks           |
    /// | `SPINDLE_TICK_MS`          | tick_duration   |
    /// | `SPINDLE_TASK_QUEUE`       | task_queue      |
    /// | `SPINDLE_LISTEN_ADDR`      | listen_addr     |
    /// | `SPINDLE_RETENTION_SECS`   | retention       |
    /// | `SPINDLE_GC_INTERVAL_SECS` | gc_interval     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = parse::<usize>(&lookup, "SPINDLE_MAX_CONCURRENT")? {
            config.max_concurrent = v;
        }
        if let Some(v) = parse::<u64>(&lookup, "SPINDLE_WATCHDOG_MS")? {
            config.watchdog = Duration::from_millis(v);
        }
        if let Some(v) = parse::<u32>(&lookup, "SPINDLE_TICKS")? {
            config.ticks = v;
        }
        if let Some(v) = parse::<u64>(&lookup, "SPINDLE_TICK_MS")? {
            config.tick_duration = Duration::from_millis(v);
        }
        if let Some(v) = lookup("SPINDLE_TASK_QUEUE") {
            config.task_queue = v;
        }
        if let Some(v) = lookup("SPINDLE_LISTEN_ADDR") {
            config.listen_addr = v;
        }
        if let Some(v) = parse::<u64>(&lookup, "SPINDLE_RETENTION_SECS")? {
            config.retention = Some(Duration::from_secs(v));
        }
        if let Some(v) = parse::<u64>(&lookup, "SPINDLE_GC_INTERVAL_SECS")? {
            config.gc_interval = Duration::from_secs(v);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the coordinator cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::invalid("max_concurrent", "must be at least 1"));
        }
        if self.ticks == 0 || self.ticks > 100 {
            return Err(ConfigError::invalid("ticks", "must be within 1..=100"));
        }
        if self.watchdog.is_zero() {
            return Err(ConfigError::invalid("watchdog", "must be greater than zero"));
        }
        if self.task_queue.trim().is_empty() {
            return Err(ConfigError::invalid("task_queue", "must not be empty"));
        }
        if self.gc_interval.is_zero() {
            return Err(ConfigError::invalid("gc_interval", "must be greater than zero"));
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::invalid(key, format!("cannot parse {raw:?}"))),
    }
}
