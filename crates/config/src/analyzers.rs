//! Analyzer set parsing
//!
//! The canonical configuration surface is a single environment variable:
//!
//! ```text
//! ANALYZERS_CONFIG="id1:endpoint1:weight1,id2:endpoint2:weight2,..."
//! ```
//!
//! Endpoints contain colons (`http://host:port/path`), so the **last** colon
//! of each record separates the weight and the **first** colon separates the
//! id from the endpoint.

use crate::error::{ConfigError, Result};

/// Static description of one analyzer, fixed for the process lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerSpec {
    /// Unique analyzer id
    pub id: String,

    /// URL the distributor POSTs packets to
    pub endpoint: String,

    /// Target long-run fraction of total messages, in (0, 1]
    pub weight: f64,
}

impl AnalyzerSpec {
    /// Create a spec from parts
    pub fn new(id: impl Into<String>, endpoint: impl Into<String>, weight: f64) -> Self {
        Self {
            id: id.into(),
            endpoint: endpoint.into(),
            weight,
        }
    }
}

/// Parse an `ANALYZERS_CONFIG` string into analyzer specs.
///
/// Records are comma-separated; whitespace around records and fields is
/// trimmed. Weights must be finite and in (0, 1]; ids must be unique.
/// Weights are ratios - they do not have to sum to 1.
///
/// # Errors
///
/// Any malformed record is fatal; there is no partial acceptance.
pub fn parse_analyzers_config(config: &str) -> Result<Vec<AnalyzerSpec>> {
    let mut specs: Vec<AnalyzerSpec> = Vec::new();

    for entry in config.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let (id_and_endpoint, weight_str) =
            entry
                .rsplit_once(':')
                .ok_or_else(|| ConfigError::MalformedAnalyzer {
                    entry: entry.to_string(),
                })?;

        let (id, endpoint) =
            id_and_endpoint
                .split_once(':')
                .ok_or_else(|| ConfigError::MalformedAnalyzer {
                    entry: entry.to_string(),
                })?;

        let id = id.trim();
        let endpoint = endpoint.trim();
        if id.is_empty() || endpoint.is_empty() {
            return Err(ConfigError::MalformedAnalyzer {
                entry: entry.to_string(),
            });
        }

        let weight: f64 =
            weight_str
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidWeight {
                    id: id.to_string(),
                    value: weight_str.trim().to_string(),
                })?;

        if !weight.is_finite() || weight <= 0.0 || weight > 1.0 {
            return Err(ConfigError::WeightOutOfRange {
                id: id.to_string(),
                weight,
            });
        }

        if specs.iter().any(|s| s.id == id) {
            return Err(ConfigError::DuplicateAnalyzer { id: id.to_string() });
        }

        specs.push(AnalyzerSpec::new(id, endpoint, weight));
    }

    Ok(specs)
}

/// The default four-analyzer set used when `ANALYZERS_CONFIG` is absent.
pub fn default_analyzers() -> Vec<AnalyzerSpec> {
    vec![
        AnalyzerSpec::new("analyzer-1", "http://localhost:8081/api/v1/analyze", 0.1),
        AnalyzerSpec::new("analyzer-2", "http://localhost:8082/api/v1/analyze", 0.2),
        AnalyzerSpec::new("analyzer-3", "http://localhost:8083/api/v1/analyze", 0.3),
        AnalyzerSpec::new("analyzer-4", "http://localhost:8084/api/v1/analyze", 0.4),
    ]
}
