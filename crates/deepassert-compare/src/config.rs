use serde::{Deserialize, Serialize};

use crate::error::{CompareError, CompareResult};

/// Configuration for comparisons.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssertConfig {
    /// Largest absolute difference at which two floats still compare equal.
    pub float_tolerance: f64,
    /// Compare text ignoring ASCII case.
    pub ignore_text_case: bool,
    /// Record a comment for every passing comparison. Failures are always recorded.
    pub record_successes: bool,
}

impl Default for AssertConfig {
    fn default() -> Self {
        Self {
            float_tolerance: 0.0,
            ignore_text_case: false,
            record_successes: true,
        }
    }
}

impl AssertConfig {
    /// Parse a TOML document. Missing keys take their default values.
    pub fn from_toml_str(raw: &str) -> CompareResult<Self> {
        toml::from_str(raw).map_err(|e| CompareError::Config(e.to_string()))
    }

    /// Only failures are recorded on reports.
    pub fn failures_only() -> Self {
        Self {
            record_successes: false,
            ..Default::default()
        }
    }
}
