//! Offer terms: the packaging parameters shared by every order in a run.
//!
//! An offer arrives with optional fields and loose invariants. Before
//! any arithmetic happens it is normalized into [`OfferTerms`], whose
//! construction enforces the divisibility chain
//! `rounding_step_size | step_size | unit_size` and a positive bucket.

use super::error::ReconcileError;
use crate::steps;

/// Which offer field seeds `rounding_step_size` when the offer omits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingStepDefault {
    /// Distribute on the `step_size` grid.
    StepSize,
    /// Distribute in whole units.
    UnitSize,
}

impl RoundingStepDefault {
    pub fn as_str(self) -> &'static str {
        match self {
            RoundingStepDefault::StepSize => "step_size",
            RoundingStepDefault::UnitSize => "unit_size",
        }
    }
}

/// Raw offer fields as supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferSpec {
    pub unit_size: f64,
    /// Units per bundle; defaults to 1.
    pub unit_count: Option<u32>,
    /// Order granularity; defaults to `unit_size`.
    pub step_size: Option<f64>,
    /// Distribution granularity; default depends on the run family.
    pub rounding_step_size: Option<f64>,
    /// Explicit target total that bypasses bundle resolution.
    pub total_override: Option<f64>,
}

impl OfferSpec {
    pub fn new(unit_size: f64) -> Self {
        Self {
            unit_size,
            unit_count: None,
            step_size: None,
            rounding_step_size: None,
            total_override: None,
        }
    }
}

/// Normalized packaging terms.
///
/// Once constructed, `rounding_step_size <= step_size`, both divide
/// `unit_size` within tolerance, and `bucket_size > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferTerms {
    pub unit_count: u32,
    pub unit_size: f64,
    pub step_size: f64,
    pub rounding_step_size: f64,
    /// `unit_count * unit_size`: the quantity one bundle represents.
    pub bucket_size: f64,
    pub total_override: Option<f64>,
}

impl OfferTerms {
    /// Fill defaults and check the divisibility chain.
    ///
    /// Checks run in a fixed order so the first broken invariant wins;
    /// callers match on the resulting error wording.
    pub fn normalize(
        spec: &OfferSpec,
        rounding_default: RoundingStepDefault,
    ) -> Result<Self, ReconcileError> {
        if !spec.unit_size.is_finite() || spec.unit_size <= 0.0 {
            return Err(ReconcileError::InvalidOfferField { field: "unit_size" });
        }
        let unit_count = spec.unit_count.unwrap_or(1);
        let step_size = spec.step_size.unwrap_or(spec.unit_size);
        if !step_size.is_finite() || step_size <= 0.0 {
            return Err(ReconcileError::InvalidOfferField { field: "step_size" });
        }
        let rounding_step_size = spec.rounding_step_size.unwrap_or(match rounding_default {
            RoundingStepDefault::StepSize => step_size,
            RoundingStepDefault::UnitSize => spec.unit_size,
        });
        if !rounding_step_size.is_finite() || rounding_step_size <= 0.0 {
            return Err(ReconcileError::InvalidOfferField {
                field: "rounding_step_size",
            });
        }

        if rounding_step_size > step_size {
            return Err(ReconcileError::RoundingStepExceedsStep);
        }
        if !steps::is_step_multiple(step_size, rounding_step_size) {
            return Err(ReconcileError::RoundingStepNotDividingStep);
        }
        if !steps::is_step_multiple(spec.unit_size, step_size) {
            return Err(ReconcileError::StepNotDividingUnit);
        }
        if !steps::is_step_multiple(spec.unit_size, rounding_step_size) {
            return Err(ReconcileError::RoundingStepNotDividingUnit);
        }

        let bucket_size = f64::from(unit_count) * spec.unit_size;
        if bucket_size <= 0.0 {
            return Err(ReconcileError::ZeroBucket);
        }

        let total_override = match spec.total_override {
            None => None,
            Some(total) => {
                if !total.is_finite()
                    || total < 0.0
                    || !steps::is_step_multiple(total, rounding_step_size)
                {
                    return Err(ReconcileError::InvalidOverride { total });
                }
                Some(total)
            }
        };

        Ok(Self {
            unit_count,
            unit_size: spec.unit_size,
            step_size,
            rounding_step_size,
            bucket_size,
            total_override,
        })
    }
}
