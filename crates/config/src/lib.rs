//! Splay - Configuration
//!
//! Environment-driven configuration for the distributor. The analyzer set
//! comes from `ANALYZERS_CONFIG`; the remaining tunables each have their own
//! variable and a sensible default. Configuration errors are fatal at
//! startup - the process refuses to start rather than guessing.
//!
//! | Variable | Effect | Default |
//! |---|---|---|
//! | `ANALYZERS_CONFIG` | `id:endpoint:weight,...` | four local analyzers, weights 0.1-0.4 |
//! | `MAX_CONSECUTIVE_FAILURES` | failures before Offline | 3 |
//! | `OFFLINE_TIMEOUT` | cooldown before recovery (seconds) | 30 |
//! | `DEFICIT_THRESHOLD` | emergency catch-up trigger (messages) | 1000 |
//! | `QUEUE_CAPACITY` | dispatch queue size | 10000 |
//! | `WORKER_MIN` / `WORKER_MAX` | worker pool bounds | 20 / 50 |
//! | `REQUEST_TIMEOUT` | per-POST timeout (seconds) | 30 |
//! | `SWEEP_INTERVAL` | recovery sweeper period (seconds) | 5 |

mod analyzers;
mod error;

pub use analyzers::{default_analyzers, parse_analyzers_config, AnalyzerSpec};
pub use error::{ConfigError, Result};

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Full distributor configuration.
#[derive(Debug, Clone)]
pub struct DistributorConfig {
    /// Analyzer set, fixed for the process lifetime
    pub analyzers: Vec<AnalyzerSpec>,

    /// Consecutive failures before an analyzer goes Offline
    pub max_consecutive_failures: u32,

    /// How long an analyzer stays Offline before the sweeper restores it
    pub offline_timeout: Duration,

    /// Positive deficit (in messages) that triggers emergency catch-up
    pub deficit_threshold: f64,

    /// Total dispatch queue capacity across all workers
    pub queue_capacity: usize,

    /// Lower bound on worker pool size
    pub worker_min: usize,

    /// Upper bound on worker pool size (the pool runs at this size)
    pub worker_max: usize,

    /// Per-outbound-POST timeout
    pub request_timeout: Duration,

    /// Recovery sweeper period
    pub sweep_interval: Duration,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            analyzers: default_analyzers(),
            max_consecutive_failures: 3,
            offline_timeout: Duration::from_secs(30),
            deficit_threshold: 1000.0,
            queue_capacity: 10_000,
            worker_min: 20,
            worker_max: 50,
            request_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(5),
        }
    }
}

impl DistributorConfig {
    /// Load configuration from the process environment.
    ///
    /// Absent variables fall back to defaults; present-but-invalid values
    /// are errors.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = non_empty_var("ANALYZERS_CONFIG") {
            config.analyzers = parse_analyzers_config(&raw)?;
        }

        if let Some(v) = non_empty_var("MAX_CONSECUTIVE_FAILURES") {
            config.max_consecutive_failures =
                parse_tunable("MAX_CONSECUTIVE_FAILURES", &v, "expected a positive integer")?;
        }
        if let Some(v) = non_empty_var("OFFLINE_TIMEOUT") {
            config.offline_timeout = parse_secs("OFFLINE_TIMEOUT", &v)?;
        }
        if let Some(v) = non_empty_var("DEFICIT_THRESHOLD") {
            let threshold: f64 =
                parse_tunable("DEFICIT_THRESHOLD", &v, "expected a positive number")?;
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(ConfigError::InvalidTunable {
                    var: "DEFICIT_THRESHOLD",
                    value: v,
                    reason: "expected a positive number",
                });
            }
            config.deficit_threshold = threshold;
        }
        if let Some(v) = non_empty_var("QUEUE_CAPACITY") {
            let capacity: usize =
                parse_tunable("QUEUE_CAPACITY", &v, "expected a positive integer")?;
            if capacity == 0 {
                return Err(ConfigError::InvalidTunable {
                    var: "QUEUE_CAPACITY",
                    value: v,
                    reason: "expected a positive integer",
                });
            }
            config.queue_capacity = capacity;
        }
        if let Some(v) = non_empty_var("WORKER_MIN") {
            config.worker_min = parse_tunable("WORKER_MIN", &v, "expected a positive integer")?;
        }
        if let Some(v) = non_empty_var("WORKER_MAX") {
            config.worker_max = parse_tunable("WORKER_MAX", &v, "expected a positive integer")?;
        }
        if let Some(v) = non_empty_var("REQUEST_TIMEOUT") {
            config.request_timeout = parse_secs("REQUEST_TIMEOUT", &v)?;
        }
        if let Some(v) = non_empty_var("SWEEP_INTERVAL") {
            config.sweep_interval = parse_secs("SWEEP_INTERVAL", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.worker_min > self.worker_max || self.worker_max == 0 {
            return Err(ConfigError::PoolSizing {
                min: self.worker_min,
                max: self.worker_max,
            });
        }
        Ok(())
    }
}

/// Read an environment variable, treating blank values as absent.
fn non_empty_var(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn parse_tunable<T: FromStr>(
    var: &'static str,
    value: &str,
    reason: &'static str,
) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidTunable {
            var,
            value: value.to_string(),
            reason,
        })
}

fn parse_secs(var: &'static str, value: &str) -> Result<Duration> {
    let secs: u64 = parse_tunable(var, value, "expected whole seconds")?;
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DistributorConfig::default();

        assert_eq!(config.analyzers.len(), 4);
        assert_eq!(config.max_consecutive_failures, 3);
        assert_eq!(config.offline_timeout, Duration::from_secs(30));
        assert_eq!(config.deficit_threshold, 1000.0);
        assert_eq!(config.queue_capacity, 10_000);
        assert_eq!(config.worker_min, 20);
        assert_eq!(config.worker_max, 50);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.sweep_interval, Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_pool_sizing() {
        let config = DistributorConfig {
            worker_min: 10,
            worker_max: 5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::PoolSizing { min: 10, max: 5 })
        ));
    }

    #[test]
    fn test_parse_secs() {
        assert_eq!(
            parse_secs("OFFLINE_TIMEOUT", "45").unwrap(),
            Duration::from_secs(45)
        );
        assert!(parse_secs("OFFLINE_TIMEOUT", "30s").is_err());
    }

    #[test]
    fn test_parse_tunable_rejects_garbage() {
        let err = parse_tunable::<u32>("MAX_CONSECUTIVE_FAILURES", "three", "expected an integer")
            .unwrap_err();
        assert!(err.to_string().contains("MAX_CONSECUTIVE_FAILURES"));
    }
}
