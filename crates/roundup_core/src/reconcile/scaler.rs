//! Proportional scaling of unlocked demand onto the rounding grid.

use super::offer::OfferTerms;
use super::order::Order;
use crate::steps;

/// Per-order working state between scaling and final assembly.
///
/// Adjustable orders are tracked as whole rounding steps so that
/// distribution is pure integer arithmetic; floats only reappear at
/// assembly.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkingValue {
    /// Locked or zero-quantity order; carries its quantity untouched.
    Fixed { value: f64, locked: bool },
    /// Unlocked order in rounding-step units. `correction` holds the
    /// off-grid residue a lump adjustment may add on top.
    Scaled {
        steps: i64,
        correction: f64,
        below_zero: bool,
    },
}

impl WorkingValue {
    /// Current quantity this entry stands for.
    pub fn quantity(&self, rounding_step: f64) -> f64 {
        match self {
            WorkingValue::Fixed { value, .. } => *value,
            WorkingValue::Scaled {
                steps, correction, ..
            } => *steps as f64 * rounding_step + correction,
        }
    }

    /// Whether distribution may touch this entry at all.
    pub fn is_adjustable(&self) -> bool {
        matches!(self, WorkingValue::Scaled { .. })
    }
}

/// Result of the scaling pass. Entries line up 1:1 with input orders.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledSet {
    pub values: Vec<WorkingValue>,
    /// `target_total / total_unlocked`.
    pub scale_factor: f64,
}

/// Scale every unlocked, non-zero order by `target_total / total_unlocked`
/// and snap the result to the nearest rounding step.
///
/// Locked and zero-quantity orders pass through as `Fixed`. A negative
/// scaled value is clamped to zero and flagged; callers surface the flag
/// on the affected order.
pub fn scale_orders(
    orders: &[Order],
    terms: &OfferTerms,
    target_total: f64,
    total_unlocked: f64,
) -> ScaledSet {
    let scale_factor = target_total / total_unlocked;
    let values = orders
        .iter()
        .map(|order| {
            if order.locked || order.quantity == 0.0 {
                WorkingValue::Fixed {
                    value: order.quantity,
                    locked: order.locked,
                }
            } else {
                let raw = order.quantity * scale_factor;
                let steps = steps::nearest_steps(raw, terms.rounding_step_size);
                WorkingValue::Scaled {
                    steps: steps.max(0),
                    correction: 0.0,
                    below_zero: steps < 0,
                }
            }
        })
        .collect();
    ScaledSet {
        values,
        scale_factor,
    }
}
