//! Engine tunable defaults.
//!
//! Each tunable the wire layer accepts has a registry entry. If a value
//! is missing from a request and the registry carries a default, the
//! default applies. If no default exists, resolution MUST fail-closed
//! rather than guess.

use std::fmt;

/// Engine tunables resolvable from request payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigParam {
    /// Fraction of a bucket above which a partial bundle rounds up.
    Threshold,
    /// Minimum fraction of the first bucket that counts at all.
    MinThreshold,
    /// Units per bundle.
    UnitCount,
    /// Pointer-walk iteration cap.
    MaxDistributionSteps,
    /// Quantity of one unit. No default: every offer must state it.
    UnitSize,
}

/// Error when a required parameter is missing and has no registry default.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingConfigError {
    pub param_name: &'static str,
    pub reason: &'static str,
}

impl fmt::Display for MissingConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "config fail-closed: '{}' cannot be resolved ({})",
            self.param_name, self.reason
        )
    }
}

impl std::error::Error for MissingConfigError {}

/// Returns the registry default for a parameter, or `None` if no default
/// exists.
///
/// Parameters without defaults require fail-closed behavior when missing.
pub fn registry_default(param: ConfigParam) -> Option<f64> {
    match param {
        ConfigParam::Threshold => Some(0.6),
        ConfigParam::MinThreshold => Some(0.75),
        ConfigParam::UnitCount => Some(1.0),
        ConfigParam::MaxDistributionSteps => Some(100.0),
        ConfigParam::UnitSize => None,
    }
}

/// Returns the snake_case name for a parameter (matches wire naming).
pub fn param_name(param: ConfigParam) -> &'static str {
    match param {
        ConfigParam::Threshold => "threshold",
        ConfigParam::MinThreshold => "min_threshold",
        ConfigParam::UnitCount => "unit_count",
        ConfigParam::MaxDistributionSteps => "max_distribution_steps",
        ConfigParam::UnitSize => "unit_size",
    }
}

/// Expected number of ConfigParam variants. Update when adding new variants.
/// This constant enables a compile-time-adjacent check that ALL_PARAMS is
/// complete (since Rust stable lacks variant_count for enums).
pub const EXPECTED_PARAM_COUNT: usize = 5;

/// All known `ConfigParam` variants (for exhaustive iteration in tests).
pub const ALL_PARAMS: &[ConfigParam] = &[
    ConfigParam::Threshold,
    ConfigParam::MinThreshold,
    ConfigParam::UnitCount,
    ConfigParam::MaxDistributionSteps,
    ConfigParam::UnitSize,
];

/// Resolve a configuration value with fail-safe semantics.
///
/// - If `value` is `Some`, returns that value (explicit config takes precedence).
/// - If `value` is `None` and the parameter has a registry default, returns the default.
/// - If `value` is `None` and no registry default exists, returns `Err` (fail-closed).
pub fn resolve_config_value(
    param: ConfigParam,
    value: Option<f64>,
) -> Result<f64, MissingConfigError> {
    if let Some(v) = value {
        if !v.is_finite() {
            return Err(MissingConfigError {
                param_name: param_name(param),
                reason: "value is non-finite (NaN or Infinity); fail-closed",
            });
        }
        if v < 0.0 {
            return Err(MissingConfigError {
                param_name: param_name(param),
                reason: "value is negative; all config params must be non-negative",
            });
        }
        return Ok(v);
    }
    registry_default(param).ok_or_else(|| MissingConfigError {
        param_name: param_name(param),
        reason: "no registry default; resolution must fail-closed",
    })
}
