//! End-to-end tests for the weighted reconciliation family: threshold
//! resolution with seeded pointer-walk distribution and stepped inputs.

use roundup_core::reconcile::{
    EngineMetrics, EngineOptions, NonConvergenceReason, OfferSpec, Order, ReconcileError,
    ReconcileOutcome, ReconcileReport, reconcile, reconcile_non_convergence_total,
};

fn unit_offer(unit_size: f64) -> OfferSpec {
    OfferSpec {
        step_size: Some(1.0),
        rounding_step_size: Some(1.0),
        ..OfferSpec::new(unit_size)
    }
}

fn mixed_orders() -> Vec<Order> {
    vec![
        Order::locked("a", 1.0),
        Order::new("b", 2.0),
        Order::new("c", 1.5),
        Order::locked("d", 1.5),
        Order::new("e", 1.0),
        Order::new("f", 0.5),
    ]
}

fn half_step_offer() -> OfferSpec {
    OfferSpec {
        step_size: Some(0.5),
        rounding_step_size: Some(0.5),
        ..OfferSpec::new(5.0)
    }
}

fn run_weighted(orders: &[Order], offer: &OfferSpec, seed: u64) -> ReconcileOutcome {
    let options = EngineOptions {
        seed: Some(seed),
        ..EngineOptions::weighted()
    };
    let mut metrics = EngineMetrics::new();
    reconcile(orders, offer, &options, &mut metrics)
}

fn reconciled(outcome: ReconcileOutcome) -> ReconcileReport {
    match outcome {
        ReconcileOutcome::Reconciled(report) => report,
        other => panic!("expected reconciled run, got {other:?}"),
    }
}

// ─── Threshold resolution ──────────────────────────────────────────────

/// Demand below the minimum threshold of the first bucket rejects the
/// run outright; the report echoes the input.
#[test]
fn test_thin_demand_rejects() {
    let orders = vec![Order::new("a", 7.0)];
    match run_weighted(&orders, &unit_offer(10.0), 1) {
        ReconcileOutcome::Rejected { error, report } => {
            assert_eq!(error, ReconcileError::NotEnoughForOneBundle);
            assert_eq!(report.bundles, 0);
            assert_eq!(report.target_total, 0.0);
            assert!((report.adjusted_total - 7.0).abs() < 1e-9);
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

/// Demand at 0.8 of a bucket clears the 0.75 floor and scales up to a
/// whole bundle.
#[test]
fn test_min_threshold_admits_first_bundle() {
    let orders = vec![Order::new("a", 8.0)];
    let report = reconciled(run_weighted(&orders, &unit_offer(10.0), 1));

    assert_eq!(report.bundles, 1);
    assert!((report.target_total - 10.0).abs() < 1e-9);
    assert!((report.adjusted_total - 10.0).abs() < 1e-9);
    assert_eq!(report.iterations, 0);
}

/// Above one bucket, a fraction past the threshold rounds the bundle
/// count up and demand stretches to fill it.
#[test]
fn test_fraction_past_threshold_rounds_up() {
    let orders = vec![Order::new("a", 9.0), Order::new("b", 8.0)];
    let report = reconciled(run_weighted(&orders, &unit_offer(10.0), 1));

    assert_eq!(report.bundles, 2);
    assert!((report.target_total - 20.0).abs() < 1e-9);
    assert!((report.orders[0].quantity_adjusted - 11.0).abs() < 1e-9);
    assert!((report.orders[1].quantity_adjusted - 9.0).abs() < 1e-9);
}

/// A fraction at the threshold rounds down and demand shrinks.
#[test]
fn test_fraction_at_threshold_rounds_down() {
    let orders = vec![Order::new("a", 8.0), Order::new("b", 8.0)];
    let report = reconciled(run_weighted(&orders, &unit_offer(10.0), 1));

    assert_eq!(report.bundles, 1);
    assert!((report.target_total - 10.0).abs() < 1e-9);
    assert!((report.adjusted_total - 10.0).abs() < 1e-9);
}

// ─── Stepped inputs ────────────────────────────────────────────────────

/// The weighted family rejects quantities off the `step_size` grid
/// instead of quietly scaling them.
#[test]
fn test_off_grid_quantity_rejects() {
    let orders = vec![Order::new("a", 1.3)];
    match run_weighted(&orders, &half_step_offer(), 1) {
        ReconcileOutcome::Rejected { error, .. } => {
            assert_eq!(
                error,
                ReconcileError::QuantityNotStepMultiple { id: "a".into() }
            );
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

/// Without an explicit rounding step the weighted family distributes in
/// whole units.
#[test]
fn test_whole_unit_default_grid() {
    let orders = vec![Order::new("a", 5.0), Order::new("b", 10.0)];
    let report = reconciled(run_weighted(&orders, &OfferSpec::new(5.0), 1));

    assert_eq!(report.bundles, 3);
    assert!((report.adjusted_total - 15.0).abs() < 1e-9);
    assert_eq!(report.iterations, 0);
}

// ─── Pointer walk ──────────────────────────────────────────────────────

/// A mixed book reduces down to one bundle; locked orders hold still
/// and the walk closes the rest.
#[test]
fn test_mixed_book_reduces_to_bundle() {
    let report = reconciled(run_weighted(&mixed_orders(), &half_step_offer(), 1));

    assert_eq!(report.bundles, 1);
    assert!((report.total - 7.5).abs() < 1e-9);
    assert!((report.adjusted_total - 5.0).abs() < 1e-9);
    assert_eq!(report.iterations, 5);
    assert!((report.orders[0].quantity_adjusted - 1.0).abs() < 1e-9);
    assert!((report.orders[3].quantity_adjusted - 1.5).abs() < 1e-9);
}

/// Identical seeds reproduce the full report, row for row.
#[test]
fn test_same_seed_reproduces_run() {
    let first = reconciled(run_weighted(&mixed_orders(), &half_step_offer(), 9));
    let second = reconciled(run_weighted(&mixed_orders(), &half_step_offer(), 9));

    assert_eq!(first, second);
}

/// A walk that hits the iteration cap reports how far it got.
#[test]
fn test_iteration_cap_reports_partial_progress() {
    let options = EngineOptions {
        seed: Some(3),
        max_distribution_steps: 3,
        ..EngineOptions::weighted()
    };
    let mut metrics = EngineMetrics::new();
    let before = reconcile_non_convergence_total();
    let outcome = reconcile(&mixed_orders(), &half_step_offer(), &options, &mut metrics);

    match outcome {
        ReconcileOutcome::NonConverged { reason, report } => {
            assert_eq!(reason, NonConvergenceReason::IterationCapReached);
            assert_eq!(report.iterations, 3);
            assert!((report.adjusted_total - 6.0).abs() < 1e-9);
            assert!((report.target_total - 5.0).abs() < 1e-9);
        }
        other => panic!("expected non-convergence, got {other:?}"),
    }
    assert_eq!(metrics.distribution.exhausted_walks_total(), 1);
    assert!(reconcile_non_convergence_total() >= before + 1);
}

/// When the walk runs out of reducible orders the run rejects and the
/// report echoes the resolved target.
#[test]
fn test_walk_exhaustion_rejects_with_target() {
    let orders = vec![Order::locked("a", 3.0), Order::new("b", 2.0)];
    let offer = OfferSpec {
        total_override: Some(0.0),
        ..OfferSpec::new(1.0)
    };
    match run_weighted(&orders, &offer, 1) {
        ReconcileOutcome::Rejected { error, report } => {
            assert_eq!(error, ReconcileError::NoEligibleOrders { all_locked: false });
            assert_eq!(report.bundles, 0);
            assert_eq!(report.target_total, 0.0);
            assert!((report.adjusted_total - 5.0).abs() < 1e-9);
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}
