//! Run fingerprint computation.
//!
//! `run_fingerprint = xxhash64(orders + offer + run shape)`
//!
//! The fingerprint identifies a request, not a result. The pointer-walk
//! seed is excluded, so reruns of the same request compare equal no
//! matter where the walk started. No wall-clock timestamps.

use xxhash_rust::xxh64::xxh64;

use crate::reconcile::offer::OfferSpec;
use crate::reconcile::order::Order;

/// Input fields for computing a run fingerprint.
///
/// Mode and strategy enter as their stable string tokens so the hash
/// does not depend on enum layout.
#[derive(Debug, Clone, PartialEq)]
pub struct RunFingerprintInput<'a> {
    pub orders: &'a [Order],
    pub offer: &'a OfferSpec,
    /// `ResolveMode::as_str()` token.
    pub resolve_mode: &'a str,
    /// `DistributionStrategy::as_str()` token.
    pub strategy: &'a str,
    pub threshold: f64,
    pub min_threshold: f64,
    pub max_distribution_steps: u32,
    pub enforce_stepped_quantities: bool,
    /// `RoundingStepDefault::as_str()` token.
    pub rounding_step_default: &'a str,
}

fn push_f64(buf: &mut Vec<u8>, value: f64) {
    buf.extend_from_slice(&value.to_bits().to_le_bytes());
    buf.push(0xFF);
}

fn push_opt_f64(buf: &mut Vec<u8>, value: Option<f64>) {
    match value {
        None => buf.push(0x00),
        Some(v) => {
            buf.push(0x01);
            buf.extend_from_slice(&v.to_bits().to_le_bytes());
        }
    }
    buf.push(0xFF);
}

fn push_opt_u32(buf: &mut Vec<u8>, value: Option<u32>) {
    match value {
        None => buf.push(0x00),
        Some(v) => {
            buf.push(0x01);
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }
    buf.push(0xFF);
}

/// Compute the fingerprint over the canonical request fields.
///
/// Builds a deterministic byte buffer with a separator byte (0xFF) that
/// cannot appear in UTF-8 strings, preventing field-boundary ambiguity.
/// Floats enter as raw bit patterns, so the hash keys on exact binary
/// values rather than display text.
pub fn compute_run_fingerprint(input: &RunFingerprintInput<'_>) -> u64 {
    let mut buf = Vec::with_capacity(64 + input.orders.len() * 32);

    for order in input.orders {
        buf.extend_from_slice(order.id.as_bytes());
        buf.push(0xFF);
        buf.extend_from_slice(&order.quantity.to_bits().to_le_bytes());
        buf.push(0xFF);
        buf.push(u8::from(order.locked));
        buf.push(0xFF);
    }

    push_f64(&mut buf, input.offer.unit_size);
    push_opt_u32(&mut buf, input.offer.unit_count);
    push_opt_f64(&mut buf, input.offer.step_size);
    push_opt_f64(&mut buf, input.offer.rounding_step_size);
    push_opt_f64(&mut buf, input.offer.total_override);

    buf.extend_from_slice(input.resolve_mode.as_bytes());
    buf.push(0xFF);
    buf.extend_from_slice(input.strategy.as_bytes());
    buf.push(0xFF);
    push_f64(&mut buf, input.threshold);
    push_f64(&mut buf, input.min_threshold);
    buf.extend_from_slice(&input.max_distribution_steps.to_le_bytes());
    buf.push(0xFF);
    buf.push(u8::from(input.enforce_stepped_quantities));
    buf.push(0xFF);
    buf.extend_from_slice(input.rounding_step_default.as_bytes());

    xxh64(&buf, 0)
}

/// Format a run fingerprint as a hex string.
pub fn format_run_fingerprint(hash: u64) -> String {
    format!("{hash:016x}")
}
