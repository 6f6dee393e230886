//! Configuration error types

use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration.
///
/// All of these are fatal at startup: the process refuses to start rather
/// than running with a half-understood analyzer set.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An `ANALYZERS_CONFIG` record is not `id:endpoint:weight`
    #[error("malformed analyzer record '{entry}': expected id:endpoint:weight")]
    MalformedAnalyzer {
        /// The offending record
        entry: String,
    },

    /// Weight could not be parsed as a number
    #[error("analyzer '{id}' has unparsable weight '{value}'")]
    InvalidWeight {
        /// Analyzer id
        id: String,
        /// The raw weight string
        value: String,
    },

    /// Weight outside (0, 1]
    #[error("analyzer '{id}' has weight {weight} outside (0, 1]")]
    WeightOutOfRange {
        /// Analyzer id
        id: String,
        /// The parsed weight
        weight: f64,
    },

    /// Two records share an id
    #[error("duplicate analyzer id '{id}'")]
    DuplicateAnalyzer {
        /// The repeated id
        id: String,
    },

    /// A tunable environment variable holds an unparsable value
    #[error("invalid value '{value}' for {var}: {reason}")]
    InvalidTunable {
        /// Environment variable name
        var: &'static str,
        /// The raw value
        value: String,
        /// What was expected
        reason: &'static str,
    },

    /// Worker pool bounds are inconsistent
    #[error("WORKER_MIN ({min}) exceeds WORKER_MAX ({max})")]
    PoolSizing {
        /// Configured minimum
        min: usize,
        /// Configured maximum
        max: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_analyzer_display() {
        let err = ConfigError::MalformedAnalyzer {
            entry: "no-colons-here".into(),
        };
        assert!(err.to_string().contains("no-colons-here"));
        assert!(err.to_string().contains("id:endpoint:weight"));
    }

    #[test]
    fn test_weight_out_of_range_display() {
        let err = ConfigError::WeightOutOfRange {
            id: "analyzer-1".into(),
            weight: 1.5,
        };
        assert!(err.to_string().contains("analyzer-1"));
        assert!(err.to_string().contains("1.5"));
    }

    #[test]
    fn test_invalid_tunable_display() {
        let err = ConfigError::InvalidTunable {
            var: "QUEUE_CAPACITY",
            value: "lots".into(),
            reason: "expected a positive integer",
        };
        assert!(err.to_string().contains("QUEUE_CAPACITY"));
        assert!(err.to_string().contains("lots"));
    }
}
