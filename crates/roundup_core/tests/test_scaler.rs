//! Tests for the proportional scaling pass.

use roundup_core::reconcile::{
    OfferSpec, OfferTerms, Order, RoundingStepDefault, WorkingValue, scale_orders,
};

fn half_step_terms() -> OfferTerms {
    let spec = OfferSpec {
        step_size: Some(0.5),
        ..OfferSpec::new(5.0)
    };
    OfferTerms::normalize(&spec, RoundingStepDefault::StepSize).unwrap()
}

/// Unlocked orders scale by `target / unlocked` and land on the nearest
/// rounding step; locked orders pass through untouched.
#[test]
fn test_unlocked_orders_scale_to_steps() {
    let orders = vec![
        Order::locked("a", 1.0),
        Order::new("b", 2.0),
        Order::new("c", 1.5),
    ];
    let set = scale_orders(&orders, &half_step_terms(), 5.0, 3.5);

    assert!((set.scale_factor - 5.0 / 3.5).abs() < 1e-12);
    assert_eq!(
        set.values[0],
        WorkingValue::Fixed {
            value: 1.0,
            locked: true
        }
    );
    // 2.0 * 1.4285.. = 2.857.. -> 6 half-steps; 1.5 * 1.4285.. -> 4.
    assert_eq!(
        set.values[1],
        WorkingValue::Scaled {
            steps: 6,
            correction: 0.0,
            below_zero: false
        }
    );
    assert_eq!(
        set.values[2],
        WorkingValue::Scaled {
            steps: 4,
            correction: 0.0,
            below_zero: false
        }
    );
}

/// Zero-quantity orders are fixed even when unlocked; scaling has
/// nothing to work with and distribution must not touch them.
#[test]
fn test_zero_quantity_order_is_fixed() {
    let orders = vec![Order::new("a", 0.0), Order::new("b", 2.0)];
    let set = scale_orders(&orders, &half_step_terms(), 2.0, 2.0);

    assert_eq!(
        set.values[0],
        WorkingValue::Fixed {
            value: 0.0,
            locked: false
        }
    );
    assert!(!set.values[0].is_adjustable());
    assert!(set.values[1].is_adjustable());
}

/// A negative scaled value clamps to zero steps and raises the flag.
#[test]
fn test_negative_scale_clamps_and_flags() {
    let orders = vec![Order::new("a", 2.0)];
    let set = scale_orders(&orders, &half_step_terms(), -5.0, 2.0);

    assert_eq!(
        set.values[0],
        WorkingValue::Scaled {
            steps: 0,
            correction: 0.0,
            below_zero: true
        }
    );
}

/// `quantity` reassembles steps and correction on the rounding grid.
#[test]
fn test_working_value_quantity() {
    let scaled = WorkingValue::Scaled {
        steps: 6,
        correction: 0.25,
        below_zero: false,
    };
    assert!((scaled.quantity(0.5) - 3.25).abs() < 1e-12);

    let fixed = WorkingValue::Fixed {
        value: 1.3,
        locked: true,
    };
    assert!((fixed.quantity(0.5) - 1.3).abs() < 1e-12);
}

/// Totals after scaling sit near the target before distribution runs.
#[test]
fn test_scaled_total_approximates_target() {
    let orders = vec![
        Order::new("a", 1.0),
        Order::new("b", 2.0),
        Order::new("c", 1.5),
    ];
    let set = scale_orders(&orders, &half_step_terms(), 5.0, 4.5);
    let total: f64 = set
        .values
        .iter()
        .map(|v| v.quantity(0.5))
        .sum();
    assert!((total - 5.0).abs() <= 0.5 * orders.len() as f64);
}
