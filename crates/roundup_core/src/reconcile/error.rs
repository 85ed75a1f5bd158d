//! Error taxonomy for reconciliation rejections.
//!
//! Every hard failure carries a stable code token so callers can branch
//! on the cause without parsing display text. Display wording for the
//! long-standing failures is kept exactly as downstream consumers
//! already match on it.

use std::fmt;

/// Hard failure that aborts a reconciliation run.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileError {
    /// An offer field is non-finite or non-positive.
    InvalidOfferField { field: &'static str },
    /// `rounding_step_size` is coarser than `step_size`.
    RoundingStepExceedsStep,
    RoundingStepNotDividingStep,
    StepNotDividingUnit,
    RoundingStepNotDividingUnit,
    /// `unit_count * unit_size` collapsed to zero.
    ZeroBucket,
    /// Explicit total override is negative, non-finite or off the rounding grid.
    InvalidOverride { total: f64 },
    EmptyOrderId,
    DuplicateOrderId { id: String },
    InvalidQuantity { id: String, quantity: f64 },
    /// Stepped-input enforcement found a quantity off the `step_size` grid.
    QuantityNotStepMultiple { id: String },
    /// Threshold resolution produced a zero bundle target.
    NotEnoughForOneBundle,
    /// Distribution ran out of candidates before the totals matched.
    NoEligibleOrders { all_locked: bool },
}

/// Coarse grouping of failure causes, used for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The offer terms themselves are unusable.
    Configuration,
    /// An individual order is malformed.
    Data,
    /// Terms and orders are valid but no target can be met.
    Infeasibility,
}

/// Stable token for a rejection cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconcileErrorCode {
    InvalidOfferField,
    RoundingStepExceedsStep,
    RoundingStepNotDividingStep,
    StepNotDividingUnit,
    RoundingStepNotDividingUnit,
    ZeroBucket,
    InvalidOverride,
    EmptyOrderId,
    DuplicateOrderId,
    InvalidQuantity,
    QuantityNotStepMultiple,
    NotEnoughForOneBundle,
    NoEligibleOrders,
}

impl ReconcileErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ReconcileErrorCode::InvalidOfferField => "InvalidOfferField",
            ReconcileErrorCode::RoundingStepExceedsStep => "RoundingStepExceedsStep",
            ReconcileErrorCode::RoundingStepNotDividingStep => "RoundingStepNotDividingStep",
            ReconcileErrorCode::StepNotDividingUnit => "StepNotDividingUnit",
            ReconcileErrorCode::RoundingStepNotDividingUnit => "RoundingStepNotDividingUnit",
            ReconcileErrorCode::ZeroBucket => "ZeroBucket",
            ReconcileErrorCode::InvalidOverride => "InvalidOverride",
            ReconcileErrorCode::EmptyOrderId => "EmptyOrderId",
            ReconcileErrorCode::DuplicateOrderId => "DuplicateOrderId",
            ReconcileErrorCode::InvalidQuantity => "InvalidQuantity",
            ReconcileErrorCode::QuantityNotStepMultiple => "QuantityNotStepMultiple",
            ReconcileErrorCode::NotEnoughForOneBundle => "NotEnoughForOneBundle",
            ReconcileErrorCode::NoEligibleOrders => "NoEligibleOrders",
        }
    }

    pub fn category(self) -> ErrorCategory {
        match self {
            ReconcileErrorCode::InvalidOfferField
            | ReconcileErrorCode::RoundingStepExceedsStep
            | ReconcileErrorCode::RoundingStepNotDividingStep
            | ReconcileErrorCode::StepNotDividingUnit
            | ReconcileErrorCode::RoundingStepNotDividingUnit
            | ReconcileErrorCode::ZeroBucket
            | ReconcileErrorCode::InvalidOverride => ErrorCategory::Configuration,
            ReconcileErrorCode::EmptyOrderId
            | ReconcileErrorCode::DuplicateOrderId
            | ReconcileErrorCode::InvalidQuantity
            | ReconcileErrorCode::QuantityNotStepMultiple => ErrorCategory::Data,
            ReconcileErrorCode::NotEnoughForOneBundle | ReconcileErrorCode::NoEligibleOrders => {
                ErrorCategory::Infeasibility
            }
        }
    }
}

const REGISTRY: &[ReconcileErrorCode] = &[
    ReconcileErrorCode::InvalidOfferField,
    ReconcileErrorCode::RoundingStepExceedsStep,
    ReconcileErrorCode::RoundingStepNotDividingStep,
    ReconcileErrorCode::StepNotDividingUnit,
    ReconcileErrorCode::RoundingStepNotDividingUnit,
    ReconcileErrorCode::ZeroBucket,
    ReconcileErrorCode::InvalidOverride,
    ReconcileErrorCode::EmptyOrderId,
    ReconcileErrorCode::DuplicateOrderId,
    ReconcileErrorCode::InvalidQuantity,
    ReconcileErrorCode::QuantityNotStepMultiple,
    ReconcileErrorCode::NotEnoughForOneBundle,
    ReconcileErrorCode::NoEligibleOrders,
];

pub fn error_code_registry() -> &'static [ReconcileErrorCode] {
    REGISTRY
}

pub fn error_code_registry_contains(code: ReconcileErrorCode) -> bool {
    REGISTRY.contains(&code)
}

impl ReconcileError {
    /// Registry token for this failure.
    pub fn code(&self) -> ReconcileErrorCode {
        match self {
            ReconcileError::InvalidOfferField { .. } => ReconcileErrorCode::InvalidOfferField,
            ReconcileError::RoundingStepExceedsStep => ReconcileErrorCode::RoundingStepExceedsStep,
            ReconcileError::RoundingStepNotDividingStep => {
                ReconcileErrorCode::RoundingStepNotDividingStep
            }
            ReconcileError::StepNotDividingUnit => ReconcileErrorCode::StepNotDividingUnit,
            ReconcileError::RoundingStepNotDividingUnit => {
                ReconcileErrorCode::RoundingStepNotDividingUnit
            }
            ReconcileError::ZeroBucket => ReconcileErrorCode::ZeroBucket,
            ReconcileError::InvalidOverride { .. } => ReconcileErrorCode::InvalidOverride,
            ReconcileError::EmptyOrderId => ReconcileErrorCode::EmptyOrderId,
            ReconcileError::DuplicateOrderId { .. } => ReconcileErrorCode::DuplicateOrderId,
            ReconcileError::InvalidQuantity { .. } => ReconcileErrorCode::InvalidQuantity,
            ReconcileError::QuantityNotStepMultiple { .. } => {
                ReconcileErrorCode::QuantityNotStepMultiple
            }
            ReconcileError::NotEnoughForOneBundle => ReconcileErrorCode::NotEnoughForOneBundle,
            ReconcileError::NoEligibleOrders { .. } => ReconcileErrorCode::NoEligibleOrders,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.code().category()
    }
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::InvalidOfferField { field } => {
                write!(f, "offer field '{field}' must be a positive finite number")
            }
            ReconcileError::RoundingStepExceedsStep => {
                write!(f, "rounding_step_size must not be greater than step_size")
            }
            ReconcileError::RoundingStepNotDividingStep => {
                write!(f, "rounding_step_size must be a divider of step_size")
            }
            ReconcileError::StepNotDividingUnit => {
                write!(f, "step_size must be a divider of unit_size")
            }
            ReconcileError::RoundingStepNotDividingUnit => {
                write!(f, "rounding_step_size must be a divider of unit_size")
            }
            ReconcileError::ZeroBucket => write!(f, "bucket_size must be greater than 0"),
            ReconcileError::InvalidOverride { total } => {
                write!(
                    f,
                    "total override {total} must be a non-negative multiple of rounding_step_size"
                )
            }
            ReconcileError::EmptyOrderId => write!(f, "all orders must have a non-empty id"),
            ReconcileError::DuplicateOrderId { id } => {
                write!(f, "duplicate order id '{id}': order ids must be unique")
            }
            ReconcileError::InvalidQuantity { id, quantity } => {
                write!(
                    f,
                    "order '{id}' has quantity {quantity}; quantities must be finite and non-negative"
                )
            }
            ReconcileError::QuantityNotStepMultiple { id } => {
                write!(f, "the quantity of order '{id}' must be a multiple of step_size")
            }
            ReconcileError::NotEnoughForOneBundle => {
                write!(f, "not enough orders to complete at least one bundle.")
            }
            ReconcileError::NoEligibleOrders { all_locked } => {
                if *all_locked {
                    write!(f, "Not enough orders to round. Try to unlock locked orders.")
                } else {
                    write!(
                        f,
                        "no adjustable order can give up another rounding step; totals cannot meet the target"
                    )
                }
            }
        }
    }
}

impl std::error::Error for ReconcileError {}
