//! Orders: the demand lines submitted for reconciliation.

use std::collections::HashSet;

use super::error::ReconcileError;
use super::offer::OfferTerms;
use crate::steps;

/// One demand line keyed by caller-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: String,
    pub quantity: f64,
    /// Locked orders keep their quantity; the engine works around them.
    pub locked: bool,
}

impl Order {
    pub fn new(id: impl Into<String>, quantity: f64) -> Self {
        Self {
            id: id.into(),
            quantity,
            locked: false,
        }
    }

    pub fn locked(id: impl Into<String>, quantity: f64) -> Self {
        Self {
            id: id.into(),
            quantity,
            locked: true,
        }
    }
}

/// Per-order result row.
///
/// `quantity` echoes the input the engine worked from and
/// `quantity_adjusted` is the reconciled value. On rejected runs the two
/// are equal.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustedOrder {
    pub id: String,
    pub quantity: f64,
    pub quantity_adjusted: f64,
    pub locked: bool,
    /// Proximity of the original quantity to a whole bundle, in `[0, 1]`.
    pub weight: f64,
    /// Set when the adjusted value had to be clamped up to zero.
    pub below_zero: bool,
}

/// Check ids and quantities before any arithmetic touches them.
pub fn validate_orders(orders: &[Order]) -> Result<(), ReconcileError> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(orders.len());
    for order in orders {
        if order.id.is_empty() {
            return Err(ReconcileError::EmptyOrderId);
        }
        if !seen.insert(order.id.as_str()) {
            return Err(ReconcileError::DuplicateOrderId {
                id: order.id.clone(),
            });
        }
        if !order.quantity.is_finite() || order.quantity < 0.0 {
            return Err(ReconcileError::InvalidQuantity {
                id: order.id.clone(),
                quantity: order.quantity,
            });
        }
    }
    Ok(())
}

/// Enforce that every quantity sits on the `step_size` grid.
///
/// Locked orders are held to the same grid; their quantities feed the
/// bundle target even though they are never adjusted.
pub fn validate_stepped_quantities(
    orders: &[Order],
    terms: &OfferTerms,
) -> Result<(), ReconcileError> {
    for order in orders {
        if !steps::is_step_multiple(order.quantity, terms.step_size) {
            return Err(ReconcileError::QuantityNotStepMultiple {
                id: order.id.clone(),
            });
        }
    }
    Ok(())
}
