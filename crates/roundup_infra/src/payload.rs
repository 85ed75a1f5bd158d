//! JSON request/response boundary for the reconciliation engine.
//!
//! Callers hand in one JSON document (`{ orders, offer, options? }`) and get
//! one JSON document back. Shape problems, unusable offer terms and engine
//! rejections all come back as data in the response; nothing panics and
//! nothing is thrown across this boundary, so a batch caller survives a bad
//! request and moves on to the next one.

use crate::config::{self, ConfigParam};
use roundup_core::reconcile::{
    DistributionStrategy, EngineMetrics, EngineOptions, NonConvergenceReason, OfferSpec, Order,
    ReconcileOutcome, ResolveMode, reconcile,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// --- Payload errors -----------------------------------------------------

/// A request that never reached the engine: malformed JSON, a wrong-typed
/// field, or an option token the layer does not know.
#[derive(Debug, Clone, PartialEq)]
pub struct PayloadError {
    pub message: String,
}

impl PayloadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PayloadError {}

// --- Wire shapes --------------------------------------------------------

/// Order identifier as it appears on the wire. Numbers and strings are both
/// accepted; the engine works on the canonical string form and responses
/// echo the original shape back.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum WireId {
    Int(i64),
    Float(f64),
    Text(String),
}

impl WireId {
    /// Canonical string form used as the engine-side order id.
    pub fn canonical(&self) -> String {
        match self {
            WireId::Int(n) => n.to_string(),
            WireId::Float(x) => x.to_string(),
            WireId::Text(s) => s.clone(),
        }
    }
}

/// One order row as received.
///
/// `locked` also deserializes from the older `quantity_adjusted_locked`
/// spelling. An incoming `quantity_adjusted` is ignored unless the request
/// opts into chaining (see [`WireOptions::use_adjusted_quantities`]).
#[derive(Debug, Clone, Deserialize)]
pub struct WireOrder {
    pub id: WireId,
    #[serde(default)]
    pub name: Option<String>,
    pub quantity: f64,
    #[serde(default)]
    pub quantity_adjusted: Option<f64>,
    #[serde(default, alias = "quantity_adjusted_locked")]
    pub locked: bool,
}

/// Offer terms as received. Only `unit_size` is required; the rest default
/// through the config registry or the engine's normalization.
#[derive(Debug, Clone, Deserialize)]
pub struct WireOffer {
    #[serde(default)]
    pub id: Option<WireId>,
    pub unit_size: f64,
    #[serde(default)]
    pub unit_count: Option<f64>,
    #[serde(default)]
    pub step_size: Option<f64>,
    #[serde(default)]
    pub rounding_step_size: Option<f64>,
    /// Explicit target total. The older `total_amount_adjusted` spelling is
    /// accepted as an alias.
    #[serde(default, alias = "total_amount_adjusted")]
    pub total_amount: Option<f64>,
}

/// Optional run options.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WireOptions {
    /// Family preset: `"linear"` (default) or `"weighted"`.
    pub family: Option<String>,
    /// Resolver override: `"ceiling"` or `"threshold"`.
    pub resolve_mode: Option<String>,
    /// Distributor override: `"round_robin"` or `"pointer_walk"`.
    pub strategy: Option<String>,
    pub threshold: Option<f64>,
    pub min_threshold: Option<f64>,
    pub max_distribution_steps: Option<f64>,
    /// Fixed pointer-walk seed for reproducible runs.
    pub seed: Option<u64>,
    /// Reconcile on top of each order's `quantity_adjusted` instead of its
    /// `quantity` (re-running after a partial edit).
    pub use_adjusted_quantities: bool,
}

/// A fully parsed request: typed rows plus the raw `orders` / `offer`
/// values, kept for the response echo.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub orders: Vec<WireOrder>,
    pub offer: WireOffer,
    pub options: WireOptions,
    pub origin_orders: Value,
    pub origin_offer: Value,
}

// --- Response shapes ----------------------------------------------------

/// One adjusted order row. Field names follow the order shape callers
/// already store (`quantity_adjusted_locked`, `quantity_adjusted_below_zero`).
#[derive(Debug, Clone, Serialize)]
pub struct WireAdjustedOrder {
    pub id: WireId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub quantity: f64,
    pub quantity_adjusted: f64,
    #[serde(rename = "quantity_adjusted_locked")]
    pub locked: bool,
    pub weight: f64,
    #[serde(rename = "quantity_adjusted_below_zero", skip_serializing_if = "is_false")]
    pub below_zero: bool,
}

fn is_false(flag: &bool) -> bool {
    !flag
}

#[derive(Debug, Clone, Serialize)]
pub struct WireResponseOrders {
    /// The `orders` value exactly as received.
    pub origin: Value,
    pub adjusted: Vec<WireAdjustedOrder>,
}

/// Full engine response.
#[derive(Debug, Clone, Serialize)]
pub struct WireResponse {
    /// The `offer` value exactly as received.
    pub offer: Value,
    pub orders: WireResponseOrders,
    pub total: f64,
    pub rounded_total: f64,
    pub target_total: f64,
    pub bundles: u32,
    pub iterations: u64,
    pub fingerprint: String,
    /// `"reconciled"`, `"non_converged"` or `"rejected"`.
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_convergence: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
}

/// Response for requests that never reached the engine. Echoes whatever was
/// recoverable from the input.
#[derive(Debug, Clone, Serialize)]
pub struct WireErrorResponse {
    pub outcome: &'static str,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders: Option<Value>,
}

// --- Parsing ------------------------------------------------------------

/// Parse and shape-check a request document.
///
/// Shape checks run against the raw JSON before any typed extraction, so
/// the messages name the offending field rather than a serde path. Orders
/// are checked before the offer.
pub fn parse_request(input: &str) -> Result<WireRequest, PayloadError> {
    let root: Value =
        serde_json::from_str(input).map_err(|_| PayloadError::new("Input must be an object"))?;
    let top = root
        .as_object()
        .ok_or_else(|| PayloadError::new("Input must be an object"))?;

    let origin_orders = top.get("orders").cloned().unwrap_or(Value::Null);
    let rows = origin_orders
        .as_array()
        .ok_or_else(|| PayloadError::new("Orders must be an array"))?;
    for row in rows {
        let order = row
            .as_object()
            .ok_or_else(|| PayloadError::new("Each order must have an id of type number or string"))?;
        match order.get("id") {
            Some(Value::Number(_)) | Some(Value::String(_)) => {}
            _ => {
                return Err(PayloadError::new(
                    "Each order must have an id of type number or string",
                ));
            }
        }
        if !matches!(order.get("quantity"), Some(Value::Number(_))) {
            return Err(PayloadError::new(
                "Each order must have a quantity of type number",
            ));
        }
        for key in ["locked", "quantity_adjusted_locked"] {
            if let Some(flag) = order.get(key)
                && !flag.is_boolean()
            {
                return Err(PayloadError::new(
                    "quantity_adjusted_locked must be a boolean if defined",
                ));
            }
        }
        if let Some(adjusted) = order.get("quantity_adjusted")
            && !adjusted.is_number()
        {
            return Err(PayloadError::new(
                "quantity_adjusted must be a number if defined",
            ));
        }
    }

    let origin_offer = top.get("offer").cloned().unwrap_or(Value::Null);
    if !origin_offer.is_object() {
        return Err(PayloadError::new("Offer must be an object"));
    }
    if !matches!(origin_offer.get("unit_size"), Some(Value::Number(_))) {
        return Err(PayloadError::new(
            "Offer must have a unit_size of type number",
        ));
    }

    let orders: Vec<WireOrder> = serde_json::from_value(origin_orders.clone())
        .map_err(|e| PayloadError::new(format!("Orders are malformed: {e}")))?;
    let offer: WireOffer = serde_json::from_value(origin_offer.clone())
        .map_err(|e| PayloadError::new(format!("Offer is malformed: {e}")))?;
    let options = match top.get("options") {
        None | Some(Value::Null) => WireOptions::default(),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| PayloadError::new(format!("Options are malformed: {e}")))?,
    };

    Ok(WireRequest {
        orders,
        offer,
        options,
        origin_orders,
        origin_offer,
    })
}

// --- Option resolution --------------------------------------------------

/// Build engine options from the wire options: family preset first, axis
/// overrides second, tunables through the config registry last.
fn engine_options(options: &WireOptions) -> Result<EngineOptions, PayloadError> {
    let mut resolved = match options.family.as_deref() {
        None | Some("linear") => EngineOptions::linear(),
        Some("weighted") => EngineOptions::weighted(),
        Some(other) => {
            return Err(PayloadError::new(format!(
                "Options family '{other}' is unknown; use 'linear' or 'weighted'"
            )));
        }
    };
    if let Some(mode) = options.resolve_mode.as_deref() {
        resolved.resolve_mode = match mode {
            "ceiling" => ResolveMode::Ceiling,
            "threshold" => ResolveMode::Threshold,
            other => {
                return Err(PayloadError::new(format!(
                    "Options resolve_mode '{other}' is unknown; use 'ceiling' or 'threshold'"
                )));
            }
        };
    }
    if let Some(strategy) = options.strategy.as_deref() {
        resolved.strategy = match strategy {
            "round_robin" => DistributionStrategy::RoundRobin,
            "pointer_walk" => DistributionStrategy::PointerWalk,
            other => {
                return Err(PayloadError::new(format!(
                    "Options strategy '{other}' is unknown; use 'round_robin' or 'pointer_walk'"
                )));
            }
        };
    }
    resolved.threshold = resolve_param(ConfigParam::Threshold, options.threshold)?;
    resolved.min_threshold = resolve_param(ConfigParam::MinThreshold, options.min_threshold)?;
    let max_steps = resolve_param(ConfigParam::MaxDistributionSteps, options.max_distribution_steps)?;
    resolved.max_distribution_steps = max_steps as u32;
    resolved.seed = options.seed;
    Ok(resolved)
}

fn resolve_param(param: ConfigParam, value: Option<f64>) -> Result<f64, PayloadError> {
    config::resolve_config_value(param, value).map_err(|e| PayloadError::new(e.to_string()))
}

fn core_orders(orders: &[WireOrder], use_adjusted: bool) -> Vec<Order> {
    orders
        .iter()
        .map(|order| {
            let quantity = if use_adjusted {
                order.quantity_adjusted.unwrap_or(order.quantity)
            } else {
                order.quantity
            };
            Order {
                id: order.id.canonical(),
                quantity,
                locked: order.locked,
            }
        })
        .collect()
}

// --- Execution ----------------------------------------------------------

/// Run one parsed request through the engine.
pub fn run_request(request: &WireRequest) -> Result<WireResponse, PayloadError> {
    // Registry resolution rejects non-finite unit sizes before the engine
    // sees them; a missing unit_size never gets here (parse_request requires
    // the field).
    let unit_size = resolve_param(ConfigParam::UnitSize, Some(request.offer.unit_size))?;
    let unit_count_raw = resolve_param(ConfigParam::UnitCount, request.offer.unit_count)?;
    if unit_count_raw.fract() != 0.0 || unit_count_raw > f64::from(u32::MAX) {
        return Err(PayloadError::new("Offer unit_count must be a whole number"));
    }

    let options = engine_options(&request.options)?;
    let orders = core_orders(&request.orders, request.options.use_adjusted_quantities);
    let offer = OfferSpec {
        unit_size,
        unit_count: Some(unit_count_raw as u32),
        step_size: request.offer.step_size,
        rounding_step_size: request.offer.rounding_step_size,
        total_override: request.offer.total_amount,
    };

    let mut metrics = EngineMetrics::new();
    let outcome = reconcile(&orders, &offer, &options, &mut metrics);
    Ok(response_from_outcome(request, &outcome))
}

fn response_from_outcome(request: &WireRequest, outcome: &ReconcileOutcome) -> WireResponse {
    let report = outcome.report();
    // Engine rows come back in input order, so pairing by index keeps the
    // caller's id shape and name on each adjusted row.
    let adjusted = request
        .orders
        .iter()
        .zip(report.orders.iter())
        .map(|(wire, row)| WireAdjustedOrder {
            id: wire.id.clone(),
            name: wire.name.clone(),
            quantity: row.quantity,
            quantity_adjusted: row.quantity_adjusted,
            locked: row.locked,
            weight: row.weight,
            below_zero: row.below_zero,
        })
        .collect();

    let (outcome_token, non_convergence, error, error_code) = match outcome {
        ReconcileOutcome::Reconciled(_) => ("reconciled", None, None, None),
        ReconcileOutcome::NonConverged { reason, .. } => {
            ("non_converged", Some(non_convergence_token(*reason)), None, None)
        }
        ReconcileOutcome::Rejected { error, .. } => (
            "rejected",
            None,
            Some(error.to_string()),
            Some(error.code().as_str()),
        ),
    };

    WireResponse {
        offer: request.origin_offer.clone(),
        orders: WireResponseOrders {
            origin: request.origin_orders.clone(),
            adjusted,
        },
        total: report.total,
        rounded_total: report.adjusted_total,
        target_total: report.target_total,
        bundles: report.bundles,
        iterations: report.iterations,
        fingerprint: report.fingerprint.clone(),
        outcome: outcome_token,
        non_convergence,
        error,
        error_code,
    }
}

fn non_convergence_token(reason: NonConvergenceReason) -> &'static str {
    match reason {
        NonConvergenceReason::IterationCapReached => "iteration_cap_reached",
        NonConvergenceReason::BelowZeroClamped => "below_zero_clamped",
    }
}

/// One-shot entry point: JSON in, JSON out.
///
/// Never panics. Requests the layer cannot parse or resolve come back as a
/// `"rejected"` document with the failure message; everything else is the
/// full engine response.
pub fn execute(input: &str) -> String {
    let request = match parse_request(input) {
        Ok(request) => request,
        Err(error) => return error_text(None, &error),
    };
    match run_request(&request) {
        Ok(response) => match serde_json::to_string(&response) {
            Ok(text) => text,
            Err(_) => fallback_error_text(),
        },
        Err(error) => error_text(Some(&request), &error),
    }
}

fn error_text(request: Option<&WireRequest>, error: &PayloadError) -> String {
    let response = WireErrorResponse {
        outcome: "rejected",
        error: error.message.clone(),
        offer: request.map(|r| r.origin_offer.clone()),
        orders: request.map(|r| r.origin_orders.clone()),
    };
    match serde_json::to_string(&response) {
        Ok(text) => text,
        Err(_) => fallback_error_text(),
    }
}

fn fallback_error_text() -> String {
    String::from("{\"outcome\":\"rejected\",\"error\":\"response serialization failed\"}")
}
