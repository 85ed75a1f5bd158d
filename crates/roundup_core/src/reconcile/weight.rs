//! Bundle-proximity weight.
//!
//! Scores how close a quantity sits to a whole number of units. Small
//! values are measured against the unit above them, since only rounding
//! up can complete a bundle there; larger values use the nearer edge.
//! Weights are informational and echoed per order in every report.

use crate::steps;

/// Weight in `[0, 1]`; `1.0` means the quantity already is a whole
/// number of units.
///
/// `threshold` is the same fraction that drives threshold bundle
/// resolution. Quantities below `unit_size * threshold` can only reach
/// a bundle by growing, so their distance is to the unit above.
pub fn proximity_weight(quantity: f64, unit_size: f64, threshold: f64) -> f64 {
    let remainder = steps::step_remainder(quantity, unit_size);
    let distance = if quantity < unit_size * threshold {
        unit_size - remainder
    } else {
        remainder.min(unit_size - remainder)
    };
    1.0 - distance / unit_size
}
