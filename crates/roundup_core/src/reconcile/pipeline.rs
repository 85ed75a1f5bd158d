//! End-to-end reconciliation: validate, resolve, scale, distribute, report.
//!
//! The pipeline is fail-soft at the boundary: every path, including hard
//! rejections, produces a [`ReconcileOutcome`] carrying a full report.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::fingerprint::{RunFingerprintInput, compute_run_fingerprint, format_run_fingerprint};
use crate::steps;

use super::distributor::{
    DistributionMetrics, DistributionPass, DistributionStrategy, distribute_pointer_walk,
    distribute_round_robin,
};
use super::error::ReconcileError;
use super::offer::{OfferSpec, OfferTerms, RoundingStepDefault};
use super::order::{AdjustedOrder, Order, validate_orders, validate_stepped_quantities};
use super::outcome::{
    NonConvergenceReason, OutcomeMetrics, ReconcileOutcome, ReconcileReport, record_outcome,
};
use super::resolver::{BundleTarget, ResolveMode, resolve_bundle_count};
use super::scaler::{WorkingValue, scale_orders};
use super::weight::proximity_weight;

pub const DEFAULT_THRESHOLD: f64 = 0.6;
pub const DEFAULT_MIN_THRESHOLD: f64 = 0.75;
pub const DEFAULT_MAX_DISTRIBUTION_STEPS: u32 = 100;

// --- Options -------------------------------------------------------------

/// Tunable knobs for a reconciliation run.
///
/// The two presets cover the shipped behaviors; the fields stay public
/// so callers can mix, say, threshold resolution with round-robin
/// distribution when an integration needs it.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub resolve_mode: ResolveMode,
    pub strategy: DistributionStrategy,
    /// Fraction of a bucket above which a partial bundle rounds up. Also
    /// the pivot for proximity weights.
    pub threshold: f64,
    /// Minimum fraction of the first bucket that counts at all.
    pub min_threshold: f64,
    /// Pointer-walk iteration cap.
    pub max_distribution_steps: u32,
    /// Fixed seed for the pointer-walk start; `None` draws from entropy.
    pub seed: Option<u64>,
    /// Reject quantities off the `step_size` grid instead of scaling them.
    pub enforce_stepped_quantities: bool,
    /// Default source for `rounding_step_size` when the offer omits it.
    pub rounding_step_default: RoundingStepDefault,
}

impl EngineOptions {
    /// Linear preset: ceiling resolution, round-robin distribution on the
    /// `step_size` grid.
    pub fn linear() -> Self {
        Self {
            resolve_mode: ResolveMode::Ceiling,
            strategy: DistributionStrategy::RoundRobin,
            threshold: DEFAULT_THRESHOLD,
            min_threshold: DEFAULT_MIN_THRESHOLD,
            max_distribution_steps: DEFAULT_MAX_DISTRIBUTION_STEPS,
            seed: None,
            enforce_stepped_quantities: false,
            rounding_step_default: RoundingStepDefault::StepSize,
        }
    }

    /// Weighted preset: threshold resolution, pointer-walk distribution in
    /// whole units, stepped inputs enforced.
    pub fn weighted() -> Self {
        Self {
            resolve_mode: ResolveMode::Threshold,
            strategy: DistributionStrategy::PointerWalk,
            enforce_stepped_quantities: true,
            rounding_step_default: RoundingStepDefault::UnitSize,
            ..Self::linear()
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::linear()
    }
}

// --- Metrics -------------------------------------------------------------

/// Aggregated metrics for the reconciliation engine.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    pub distribution: DistributionMetrics,
    pub outcomes: OutcomeMetrics,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}

// --- Pipeline ------------------------------------------------------------

/// Reconcile order quantities against the offer's bundle target.
///
/// Stages, in order: offer normalization, order validation, optional
/// stepped-input enforcement, bundle resolution, proportional scaling,
/// remainder distribution, assembly. The first failing stage wins and
/// the remaining stages are skipped.
pub fn reconcile(
    orders: &[Order],
    offer: &OfferSpec,
    options: &EngineOptions,
    metrics: &mut EngineMetrics,
) -> ReconcileOutcome {
    let fingerprint_input = RunFingerprintInput {
        orders,
        offer,
        resolve_mode: options.resolve_mode.as_str(),
        strategy: options.strategy.as_str(),
        threshold: options.threshold,
        min_threshold: options.min_threshold,
        max_distribution_steps: options.max_distribution_steps,
        enforce_stepped_quantities: options.enforce_stepped_quantities,
        rounding_step_default: options.rounding_step_default.as_str(),
    };
    let fingerprint = format_run_fingerprint(compute_run_fingerprint(&fingerprint_input));

    let outcome = run(orders, offer, options, metrics, fingerprint);
    record_outcome(&outcome, &mut metrics.outcomes);
    outcome
}

fn run(
    orders: &[Order],
    offer: &OfferSpec,
    options: &EngineOptions,
    metrics: &mut EngineMetrics,
    fingerprint: String,
) -> ReconcileOutcome {
    let terms = match OfferTerms::normalize(offer, options.rounding_step_default) {
        Ok(terms) => terms,
        Err(error) => return rejected(orders, None, options, fingerprint, error, None),
    };
    if let Err(error) = validate_orders(orders) {
        return rejected(orders, Some(&terms), options, fingerprint, error, None);
    }
    if options.enforce_stepped_quantities
        && let Err(error) = validate_stepped_quantities(orders, &terms)
    {
        return rejected(orders, Some(&terms), options, fingerprint, error, None);
    }

    let total: f64 = orders.iter().map(|o| o.quantity).sum();
    let total_unlocked: f64 = orders
        .iter()
        .filter(|o| !o.locked)
        .map(|o| o.quantity)
        .sum();

    // Nothing adjustable: every order passes through and the input total
    // stands as its own target.
    if total_unlocked == 0.0 {
        let rows = passthrough_rows(orders, Some(&terms), options);
        return ReconcileOutcome::Reconciled(ReconcileReport {
            orders: rows,
            total,
            adjusted_total: total,
            target_total: total,
            bundles: 0,
            iterations: 0,
            fingerprint,
        });
    }

    let target = match resolve_bundle_count(
        total,
        &terms,
        options.resolve_mode,
        options.threshold,
        options.min_threshold,
    ) {
        Ok(target) => target,
        Err(error) => return rejected(orders, Some(&terms), options, fingerprint, error, None),
    };

    let mut scaled = scale_orders(orders, &terms, target.target_total, total_unlocked);

    let pass = match options.strategy {
        DistributionStrategy::RoundRobin => distribute_round_robin(
            &mut scaled.values,
            target.target_total,
            terms.rounding_step_size,
            &mut metrics.distribution,
        ),
        DistributionStrategy::PointerWalk => {
            let mut rng = match options.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            distribute_pointer_walk(
                &mut scaled.values,
                target.target_total,
                terms.rounding_step_size,
                options.max_distribution_steps,
                &mut rng,
                &mut metrics.distribution,
            )
        }
    };
    let pass = match pass {
        Ok(pass) => pass,
        Err(error) => {
            return rejected(orders, Some(&terms), options, fingerprint, error, Some(target));
        }
    };

    assemble(
        orders,
        &terms,
        options,
        &scaled.values,
        target,
        pass,
        total,
        fingerprint,
        metrics,
    )
}

/// Turn final working values into the caller-facing report and classify
/// the run.
///
/// A negative final value (possible after a large negative lump
/// correction) is clamped to zero here; since nothing re-absorbs the
/// difference, the run degrades to non-convergence when that moves the
/// total off target.
fn assemble(
    orders: &[Order],
    terms: &OfferTerms,
    options: &EngineOptions,
    values: &[WorkingValue],
    target: BundleTarget,
    pass: DistributionPass,
    total: f64,
    fingerprint: String,
    metrics: &mut EngineMetrics,
) -> ReconcileOutcome {
    let mut clamped = false;
    let mut rows = Vec::with_capacity(orders.len());
    for (order, value) in orders.iter().zip(values) {
        let raw = value.quantity(terms.rounding_step_size);
        let mut below_zero = match value {
            WorkingValue::Scaled { below_zero, .. } => *below_zero,
            WorkingValue::Fixed { .. } => false,
        };
        let quantity_adjusted = if raw < 0.0 {
            below_zero = true;
            clamped = true;
            metrics.outcomes.record_below_zero_clamp();
            tracing::warn!("AdjustedBelowZero id={} raw={raw}", order.id);
            0.0
        } else {
            raw
        };
        rows.push(AdjustedOrder {
            id: order.id.clone(),
            quantity: order.quantity,
            quantity_adjusted,
            locked: order.locked,
            weight: proximity_weight(order.quantity, terms.unit_size, options.threshold),
            below_zero,
        });
    }

    let adjusted_total: f64 = rows.iter().map(|r| r.quantity_adjusted).sum();
    let report = ReconcileReport {
        orders: rows,
        total,
        adjusted_total,
        target_total: target.target_total,
        bundles: target.bundles,
        iterations: pass.iterations,
        fingerprint,
    };

    let on_target = (report.adjusted_total - report.target_total).abs()
        <= steps::grid_tolerance(report.target_total, terms.rounding_step_size);

    if clamped && !on_target {
        return ReconcileOutcome::NonConverged {
            reason: NonConvergenceReason::BelowZeroClamped,
            report,
        };
    }
    if !pass.converged && !on_target {
        return ReconcileOutcome::NonConverged {
            reason: NonConvergenceReason::IterationCapReached,
            report,
        };
    }
    ReconcileOutcome::Reconciled(report)
}

fn passthrough_rows(
    orders: &[Order],
    terms: Option<&OfferTerms>,
    options: &EngineOptions,
) -> Vec<AdjustedOrder> {
    orders
        .iter()
        .map(|order| AdjustedOrder {
            id: order.id.clone(),
            quantity: order.quantity,
            quantity_adjusted: order.quantity,
            locked: order.locked,
            weight: terms.map_or(0.0, |t| {
                proximity_weight(order.quantity, t.unit_size, options.threshold)
            }),
            below_zero: false,
        })
        .collect()
}

fn rejected(
    orders: &[Order],
    terms: Option<&OfferTerms>,
    options: &EngineOptions,
    fingerprint: String,
    error: ReconcileError,
    target: Option<BundleTarget>,
) -> ReconcileOutcome {
    let total: f64 = orders.iter().map(|o| o.quantity).sum();
    let report = ReconcileReport {
        orders: passthrough_rows(orders, terms, options),
        total,
        adjusted_total: total,
        target_total: target.map_or(0.0, |t| t.target_total),
        bundles: target.map_or(0, |t| t.bundles),
        iterations: 0,
        fingerprint,
    };
    ReconcileOutcome::Rejected { error, report }
}
