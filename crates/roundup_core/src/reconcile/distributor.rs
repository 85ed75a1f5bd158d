//! Remainder distribution: close the gap between scaled and target totals.
//!
//! Scaling lands each unlocked order on the rounding grid, but the sum
//! rarely equals the bundle target on the first try. The two strategies
//! below move that remainder onto individual orders, one rounding step
//! at a time.

use rand::Rng;
use rand::rngs::StdRng;

use super::error::ReconcileError;
use super::scaler::WorkingValue;
use crate::steps;

// --- Metrics -------------------------------------------------------------

/// Observability metrics for distribution passes.
#[derive(Debug)]
pub struct DistributionMetrics {
    steps_total: u64,
    lump_corrections_total: u64,
    exhausted_walks_total: u64,
}

impl DistributionMetrics {
    /// Create a new metrics tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            steps_total: 0,
            lump_corrections_total: 0,
            exhausted_walks_total: 0,
        }
    }

    /// Record distribution steps performed.
    pub fn record_steps(&mut self, n: u64) {
        self.steps_total += n;
    }

    /// Record a lump correction applied to the first adjustable order.
    pub fn record_lump_correction(&mut self) {
        self.lump_corrections_total += 1;
    }

    /// Record a pointer walk stopped by the iteration cap.
    pub fn record_exhausted_walk(&mut self) {
        self.exhausted_walks_total += 1;
    }

    /// Total distribution steps across all runs.
    pub fn steps_total(&self) -> u64 {
        self.steps_total
    }

    /// Total lump corrections applied.
    pub fn lump_corrections_total(&self) -> u64 {
        self.lump_corrections_total
    }

    /// Total pointer walks that hit the cap.
    pub fn exhausted_walks_total(&self) -> u64 {
        self.exhausted_walks_total
    }
}

impl Default for DistributionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

// --- Strategy ------------------------------------------------------------

/// How the remainder is spread across adjustable orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionStrategy {
    /// Whole-step round-robin plus one lump correction. Single pass,
    /// always converges.
    RoundRobin,
    /// Randomly seeded pointer walk, one step per iteration, bounded by
    /// an iteration cap.
    PointerWalk,
}

impl DistributionStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            DistributionStrategy::RoundRobin => "round_robin",
            DistributionStrategy::PointerWalk => "pointer_walk",
        }
    }
}

/// Result of one distribution pass over the working values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionPass {
    /// Single-step moves performed (or represented, for round-robin).
    pub iterations: u64,
    /// False when a pointer walk hit its cap before totals matched.
    pub converged: bool,
}

// --- Round-robin ---------------------------------------------------------

/// Spread the remainder evenly across adjustable orders.
///
/// The gap is converted to whole rounding steps and dealt out
/// round-robin starting from the first adjustable order, so earlier
/// orders receive at most one step more than later ones. Whatever
/// off-grid residue is left afterwards lands as a single lump on the
/// first adjustable order; that one order may end up off the rounding
/// grid, but the total matches the target exactly.
pub fn distribute_round_robin(
    values: &mut [WorkingValue],
    target_total: f64,
    rounding_step: f64,
    metrics: &mut DistributionMetrics,
) -> Result<DistributionPass, ReconcileError> {
    let adjustable: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, value)| value.is_adjustable())
        .map(|(idx, _)| idx)
        .collect();

    let current: f64 = values.iter().map(|v| v.quantity(rounding_step)).sum();
    let diff = target_total - current;
    let move_steps = steps::nearest_steps(diff.abs(), rounding_step);

    if move_steps > 0 {
        if adjustable.is_empty() {
            return Err(ReconcileError::NoEligibleOrders { all_locked: true });
        }
        let count = adjustable.len() as u64;
        let base = move_steps as u64 / count;
        let extra = move_steps as u64 % count;
        let sign: i64 = if diff < 0.0 { -1 } else { 1 };
        for (slot, &idx) in adjustable.iter().enumerate() {
            let share = base + u64::from((slot as u64) < extra);
            if let WorkingValue::Scaled { steps, .. } = &mut values[idx] {
                *steps += sign * share as i64;
            }
        }
        metrics.record_steps(move_steps as u64);
    }

    let settled: f64 = values.iter().map(|v| v.quantity(rounding_step)).sum();
    let residue = target_total - settled;
    if residue.abs() > steps::grid_tolerance(target_total, rounding_step) {
        let Some(&first) = adjustable.first() else {
            return Err(ReconcileError::NoEligibleOrders { all_locked: true });
        };
        if let WorkingValue::Scaled { correction, .. } = &mut values[first] {
            *correction += residue;
        }
        metrics.record_lump_correction();
        tracing::debug!("LumpCorrection residue={residue} order_index={first}");
    }

    Ok(DistributionPass {
        iterations: move_steps.max(0) as u64,
        converged: true,
    })
}

// --- Pointer walk --------------------------------------------------------

/// Walk the remainder one rounding step at a time.
///
/// Eligibility is recomputed every iteration: raising walks may push any
/// adjustable order up, reducing walks only draw from orders still
/// holding at least one whole step. The pointer starts at a random
/// position in the eligible list and advances cyclically from there, so
/// no order is systematically favored across runs. The walk stops
/// unconverged after `max_steps` moves.
pub fn distribute_pointer_walk(
    values: &mut [WorkingValue],
    target_total: f64,
    rounding_step: f64,
    max_steps: u32,
    rng: &mut StdRng,
    metrics: &mut DistributionMetrics,
) -> Result<DistributionPass, ReconcileError> {
    let tol = steps::grid_tolerance(target_total, rounding_step);
    let mut pointer: Option<usize> = None;
    let mut iterations: u64 = 0;

    loop {
        let current: f64 = values.iter().map(|v| v.quantity(rounding_step)).sum();
        let diff = target_total - current;
        if diff.abs() <= tol {
            return Ok(DistributionPass {
                iterations,
                converged: true,
            });
        }
        if iterations >= u64::from(max_steps) {
            metrics.record_exhausted_walk();
            return Ok(DistributionPass {
                iterations,
                converged: false,
            });
        }

        let raising = diff > 0.0;
        let eligible: Vec<usize> = values
            .iter()
            .enumerate()
            .filter_map(|(idx, value)| match value {
                WorkingValue::Scaled { steps, .. } if raising || *steps >= 1 => Some(idx),
                _ => None,
            })
            .collect();
        if eligible.is_empty() {
            let all_locked = !values.iter().any(WorkingValue::is_adjustable);
            return Err(ReconcileError::NoEligibleOrders { all_locked });
        }

        let slot = match pointer {
            None => rng.gen_range(0..eligible.len()),
            Some(prev) => (prev + 1) % eligible.len(),
        };
        pointer = Some(slot);
        if let WorkingValue::Scaled { steps, .. } = &mut values[eligible[slot]] {
            *steps += if raising { 1 } else { -1 };
        }
        iterations += 1;
        metrics.record_steps(1);
    }
}
