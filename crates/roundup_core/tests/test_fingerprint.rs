//! Tests for run fingerprints: stable across reruns, sensitive to the
//! request, blind to the seed.

use roundup_core::fingerprint::{
    RunFingerprintInput, compute_run_fingerprint, format_run_fingerprint,
};
use roundup_core::reconcile::{
    EngineMetrics, EngineOptions, OfferSpec, Order, reconcile,
};

fn sample_orders() -> Vec<Order> {
    vec![Order::locked("a", 1.0), Order::new("b", 2.0)]
}

fn sample_offer() -> OfferSpec {
    OfferSpec {
        step_size: Some(0.5),
        ..OfferSpec::new(5.0)
    }
}

fn input<'a>(orders: &'a [Order], offer: &'a OfferSpec) -> RunFingerprintInput<'a> {
    RunFingerprintInput {
        orders,
        offer,
        resolve_mode: "ceiling",
        strategy: "round_robin",
        threshold: 0.6,
        min_threshold: 0.75,
        max_distribution_steps: 100,
        enforce_stepped_quantities: false,
        rounding_step_default: "step_size",
    }
}

/// The same request always hashes the same.
#[test]
fn test_fingerprint_is_stable() {
    let orders = sample_orders();
    let offer = sample_offer();
    let first = compute_run_fingerprint(&input(&orders, &offer));
    let second = compute_run_fingerprint(&input(&orders, &offer));
    assert_eq!(first, second);
}

/// Any change to an order changes the hash.
#[test]
fn test_fingerprint_tracks_orders() {
    let orders = sample_orders();
    let offer = sample_offer();
    let base = compute_run_fingerprint(&input(&orders, &offer));

    let mut bumped = sample_orders();
    bumped[1].quantity = 2.5;
    assert_ne!(base, compute_run_fingerprint(&input(&bumped, &offer)));

    let mut unlocked = sample_orders();
    unlocked[0].locked = false;
    assert_ne!(base, compute_run_fingerprint(&input(&unlocked, &offer)));
}

/// Offer fields are part of the identity, present or absent.
#[test]
fn test_fingerprint_tracks_offer() {
    let orders = sample_orders();
    let base = compute_run_fingerprint(&input(&orders, &sample_offer()));

    let coarser = OfferSpec {
        step_size: Some(1.0),
        ..OfferSpec::new(5.0)
    };
    assert_ne!(base, compute_run_fingerprint(&input(&orders, &coarser)));

    let bare = OfferSpec::new(5.0);
    assert_ne!(base, compute_run_fingerprint(&input(&orders, &bare)));
}

/// Run shape tokens distinguish otherwise identical requests.
#[test]
fn test_fingerprint_tracks_run_shape() {
    let orders = sample_orders();
    let offer = sample_offer();
    let base = compute_run_fingerprint(&input(&orders, &offer));

    let mut walk = input(&orders, &offer);
    walk.strategy = "pointer_walk";
    assert_ne!(base, compute_run_fingerprint(&walk));

    let mut stepped = input(&orders, &offer);
    stepped.enforce_stepped_quantities = true;
    assert_ne!(base, compute_run_fingerprint(&stepped));
}

/// The pointer-walk seed never enters the hash: reruns of one request
/// report the same fingerprint wherever the walk started.
#[test]
fn test_seed_does_not_enter_fingerprint() {
    let orders = vec![Order::new("a", 2.0), Order::new("b", 2.0)];
    let offer = OfferSpec {
        step_size: Some(0.5),
        rounding_step_size: Some(0.5),
        ..OfferSpec::new(5.0)
    };

    let mut first_options = EngineOptions::weighted();
    first_options.seed = Some(1);
    let mut second_options = EngineOptions::weighted();
    second_options.seed = Some(2);

    let mut metrics = EngineMetrics::new();
    let first = reconcile(&orders, &offer, &first_options, &mut metrics);
    let second = reconcile(&orders, &offer, &second_options, &mut metrics);

    assert!(first.is_reconciled());
    assert_eq!(first.report().fingerprint, second.report().fingerprint);
}

/// Hex formatting is sixteen zero-padded lowercase digits.
#[test]
fn test_fingerprint_format() {
    assert_eq!(format_run_fingerprint(0), "0000000000000000");
    assert_eq!(format_run_fingerprint(0x0123_4567_89ab_cdef), "0123456789abcdef");
    assert_eq!(format_run_fingerprint(u64::MAX), "ffffffffffffffff");

    let orders = sample_orders();
    let offer = sample_offer();
    let formatted = format_run_fingerprint(compute_run_fingerprint(&input(&orders, &offer)));
    assert_eq!(formatted.len(), 16);
    assert!(formatted.chars().all(|c| c.is_ascii_hexdigit()));
}
