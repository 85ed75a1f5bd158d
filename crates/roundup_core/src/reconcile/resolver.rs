//! Bundle-count resolution: how many whole bundles the demand supports.

use super::error::ReconcileError;
use super::offer::OfferTerms;
use crate::steps;

/// Slack applied to ratio comparisons so demand sitting a hair off an
/// exact bundle boundary does not flip the resolution.
const RATIO_EPS: f64 = 1e-9;

/// Rounding posture when demand is not a whole number of buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Always round up; any positive demand yields at least one bundle.
    Ceiling,
    /// Round by threshold; thin demand can resolve to zero bundles.
    Threshold,
}

impl ResolveMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolveMode::Ceiling => "ceiling",
            ResolveMode::Threshold => "threshold",
        }
    }
}

/// Resolved bundle target for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BundleTarget {
    /// Number of whole bundles to fill.
    pub bundles: u32,
    /// `bundles * bucket_size`, or the explicit override when present.
    pub target_total: f64,
    /// True when an explicit total override bypassed resolution.
    pub overridden: bool,
}

/// Resolve the bundle target from total demand (locked included).
///
/// An explicit `total_override` on the offer wins outright: it skips
/// both the ratio math and the zero-target check.
///
/// Threshold mode: demand under one bucket must reach `min_threshold`
/// of it to count at all; above one bucket, the fractional part must
/// exceed `threshold` to round up. A zero resolution is reported as
/// infeasible rather than silently producing an empty run.
pub fn resolve_bundle_count(
    total_demand: f64,
    terms: &OfferTerms,
    mode: ResolveMode,
    threshold: f64,
    min_threshold: f64,
) -> Result<BundleTarget, ReconcileError> {
    if let Some(total) = terms.total_override {
        let bundles = steps::nearest_steps(total, terms.bucket_size).max(0) as u32;
        return Ok(BundleTarget {
            bundles,
            target_total: total,
            overridden: true,
        });
    }

    let bundles: i64 = match mode {
        ResolveMode::Ceiling => steps::ceil_steps(total_demand, terms.bucket_size),
        ResolveMode::Threshold => {
            let ratio = total_demand / terms.bucket_size;
            if ratio < 1.0 {
                if ratio >= min_threshold - RATIO_EPS { 1 } else { 0 }
            } else {
                let whole = steps::floor_steps(total_demand, terms.bucket_size);
                let fraction = ratio - whole as f64;
                if fraction > threshold + RATIO_EPS {
                    whole + 1
                } else {
                    whole
                }
            }
        }
    };

    if bundles <= 0 {
        return Err(ReconcileError::NotEnoughForOneBundle);
    }

    let bundles = bundles as u32;
    Ok(BundleTarget {
        bundles,
        target_total: f64::from(bundles) * terms.bucket_size,
        overridden: false,
    })
}
