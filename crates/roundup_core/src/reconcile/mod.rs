//! Order-quantity reconciliation against bundle-sized targets.

pub mod distributor;
pub mod error;
pub mod offer;
pub mod order;
pub mod outcome;
pub mod pipeline;
pub mod resolver;
pub mod scaler;
pub mod weight;

pub use distributor::{
    DistributionMetrics, DistributionPass, DistributionStrategy, distribute_pointer_walk,
    distribute_round_robin,
};
pub use error::{
    ErrorCategory, ReconcileError, ReconcileErrorCode, error_code_registry,
    error_code_registry_contains,
};
pub use offer::{OfferSpec, OfferTerms, RoundingStepDefault};
pub use order::{AdjustedOrder, Order, validate_orders, validate_stepped_quantities};
pub use outcome::{
    NonConvergenceReason, OutcomeMetrics, ReconcileOutcome, ReconcileReport,
    reconcile_non_convergence_total, reconcile_reject_total,
};
pub use pipeline::{
    DEFAULT_MAX_DISTRIBUTION_STEPS, DEFAULT_MIN_THRESHOLD, DEFAULT_THRESHOLD, EngineMetrics,
    EngineOptions, reconcile,
};
pub use resolver::{BundleTarget, ResolveMode, resolve_bundle_count};
pub use scaler::{ScaledSet, WorkingValue, scale_orders};
pub use weight::proximity_weight;
