//! Run outcomes: the engine always answers with a full report.
//!
//! Failures are data, not panics. A rejected run still carries a report
//! echoing the input orders so callers render one shape everywhere.

use std::sync::atomic::{AtomicU64, Ordering};

use super::error::{ErrorCategory, ReconcileError};
use super::order::AdjustedOrder;

/// Why a run ended with totals that do not match the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NonConvergenceReason {
    /// The pointer walk stopped at its iteration cap.
    IterationCapReached,
    /// A negative adjusted value was clamped to zero, breaking the total.
    BelowZeroClamped,
}

/// Everything a caller learns from one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileReport {
    /// One row per input order, same ordering.
    pub orders: Vec<AdjustedOrder>,
    /// Sum of input quantities, locked included.
    pub total: f64,
    /// Sum of adjusted quantities.
    pub adjusted_total: f64,
    /// The total the run aimed for.
    pub target_total: f64,
    /// Whole bundles behind `target_total` (zero when short-circuited).
    pub bundles: u32,
    /// Distribution steps performed.
    pub iterations: u64,
    /// Stable request fingerprint, hex formatted.
    pub fingerprint: String,
}

/// Terminal state of a reconciliation run.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Totals match the bundle target exactly.
    Reconciled(ReconcileReport),
    /// The run completed but the totals do not match.
    NonConverged {
        reason: NonConvergenceReason,
        report: ReconcileReport,
    },
    /// The run was aborted; orders are echoed unchanged.
    Rejected {
        error: ReconcileError,
        report: ReconcileReport,
    },
}

impl ReconcileOutcome {
    pub fn report(&self) -> &ReconcileReport {
        match self {
            ReconcileOutcome::Reconciled(report) => report,
            ReconcileOutcome::NonConverged { report, .. } => report,
            ReconcileOutcome::Rejected { report, .. } => report,
        }
    }

    pub fn error(&self) -> Option<&ReconcileError> {
        match self {
            ReconcileOutcome::Rejected { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_reconciled(&self) -> bool {
        matches!(self, ReconcileOutcome::Reconciled(_))
    }
}

// --- Metrics -------------------------------------------------------------

/// Observability metrics for run classification.
#[derive(Debug)]
pub struct OutcomeMetrics {
    reconciled_total: u64,
    non_converged_total: u64,
    rejected_configuration_total: u64,
    rejected_data_total: u64,
    rejected_infeasibility_total: u64,
    below_zero_clamps_total: u64,
}

impl OutcomeMetrics {
    /// Create a new metrics tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            reconciled_total: 0,
            non_converged_total: 0,
            rejected_configuration_total: 0,
            rejected_data_total: 0,
            rejected_infeasibility_total: 0,
            below_zero_clamps_total: 0,
        }
    }

    /// Record one order clamped up to zero during assembly.
    pub fn record_below_zero_clamp(&mut self) {
        self.below_zero_clamps_total += 1;
    }

    /// Runs that met their target exactly.
    pub fn reconciled_total(&self) -> u64 {
        self.reconciled_total
    }

    /// Runs that finished without meeting their target.
    pub fn non_converged_total(&self) -> u64 {
        self.non_converged_total
    }

    /// Rejections by failure category.
    pub fn rejected_total(&self, category: ErrorCategory) -> u64 {
        match category {
            ErrorCategory::Configuration => self.rejected_configuration_total,
            ErrorCategory::Data => self.rejected_data_total,
            ErrorCategory::Infeasibility => self.rejected_infeasibility_total,
        }
    }

    /// Orders clamped up to zero across all runs.
    pub fn below_zero_clamps_total(&self) -> u64 {
        self.below_zero_clamps_total
    }
}

impl Default for OutcomeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static RECONCILE_REJECT_TOTAL: AtomicU64 = AtomicU64::new(0);
static RECONCILE_NON_CONVERGENCE_TOTAL: AtomicU64 = AtomicU64::new(0);

pub fn reconcile_reject_total() -> u64 {
    RECONCILE_REJECT_TOTAL.load(Ordering::Relaxed)
}

pub fn reconcile_non_convergence_total() -> u64 {
    RECONCILE_NON_CONVERGENCE_TOTAL.load(Ordering::Relaxed)
}

/// Classify a finished run into the metrics counters.
pub fn record_outcome(outcome: &ReconcileOutcome, metrics: &mut OutcomeMetrics) {
    match outcome {
        ReconcileOutcome::Reconciled(_) => {
            metrics.reconciled_total += 1;
        }
        ReconcileOutcome::NonConverged { reason, .. } => {
            metrics.non_converged_total += 1;
            RECONCILE_NON_CONVERGENCE_TOTAL.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("ReconcileNonConvergence reason={reason:?}");
        }
        ReconcileOutcome::Rejected { error, .. } => {
            match error.category() {
                ErrorCategory::Configuration => metrics.rejected_configuration_total += 1,
                ErrorCategory::Data => metrics.rejected_data_total += 1,
                ErrorCategory::Infeasibility => metrics.rejected_infeasibility_total += 1,
            }
            RECONCILE_REJECT_TOTAL.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                "ReconcileReject code={} category={:?}",
                error.code().as_str(),
                error.category()
            );
        }
    }
}
