//! Grid arithmetic over fractional step sizes.
//!
//! Every quantity the engine touches lives on a grid of some step
//! (`unit_size`, `step_size` or `rounding_step_size`), but the grid
//! points themselves are rarely exact in binary floating point
//! (`0.5 % 0.1` is not `0`). All divisibility and rounding decisions
//! therefore go through the helpers below, which convert a value to an
//! integer step count with a small drift correction instead of
//! comparing raw remainders.

const BOUNDARY_EPS: f64 = 1e-9;
const BOUNDARY_STEP_FRACTION_CAP: f64 = 0.005;
const BOUNDARY_ULP_MULTIPLIER: f64 = 8.0;

/// Tolerance for deciding that a value sits exactly on a grid point.
///
/// Correct one-step drift caused by floating-point division, but keep the
/// correction well below half a step so directional floor/ceil semantics hold.
pub fn grid_tolerance(raw: f64, step: f64) -> f64 {
    let step_abs = step.abs();
    let ulp_scaled = raw.abs().max(1.0) * f64::EPSILON * BOUNDARY_ULP_MULTIPLIER;
    let step_capped = step_abs * BOUNDARY_STEP_FRACTION_CAP;
    ulp_scaled.min(step_capped).max(step_abs * BOUNDARY_EPS)
}

fn ratio_to_i64(raw: f64, step: f64, round_up: bool) -> i64 {
    let ratio = raw / step;
    let mut steps = if round_up {
        ratio.ceil() as i64
    } else {
        ratio.floor() as i64
    };
    let tol = grid_tolerance(raw, step);

    if round_up {
        if steps > i64::MIN {
            let prev = steps - 1;
            let prev_value = prev as f64 * step;
            if (raw - prev_value).abs() <= tol {
                steps = prev;
            }
        }
    } else if steps < i64::MAX {
        let next = steps + 1;
        let next_value = next as f64 * step;
        if (raw - next_value).abs() <= tol {
            steps = next;
        }
    }

    steps
}

/// Number of whole steps at or below `value`, drift-corrected.
pub fn floor_steps(value: f64, step: f64) -> i64 {
    ratio_to_i64(value, step, false)
}

/// Number of whole steps at or above `value`, drift-corrected.
pub fn ceil_steps(value: f64, step: f64) -> i64 {
    ratio_to_i64(value, step, true)
}

/// Nearest whole number of steps (ties round away from zero).
pub fn nearest_steps(value: f64, step: f64) -> i64 {
    (value / step).round() as i64
}

/// `value` rounded to the nearest grid point.
pub fn round_to_step(value: f64, step: f64) -> f64 {
    nearest_steps(value, step) as f64 * step
}

/// Whether `value` is an integer multiple of `step` within tolerance.
pub fn is_step_multiple(value: f64, step: f64) -> bool {
    let snapped = round_to_step(value, step);
    (value - snapped).abs() <= grid_tolerance(value, step)
}

/// Remainder of `value` on the `step` grid, snapped to zero when the
/// value sits on (or within drift of) a grid point.
pub fn step_remainder(value: f64, step: f64) -> f64 {
    let rem = value - floor_steps(value, step) as f64 * step;
    if rem < 0.0 || rem.abs() <= grid_tolerance(value, step) {
        0.0
    } else {
        rem
    }
}
