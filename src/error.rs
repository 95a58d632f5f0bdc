//! Crate-wide error taxonomy.
//!
//! Only [`RoutingError::InputError`] is meant to be surfaced to a caller of
//! the orchestration API (`api::run_simple`, `api::run_a_star`, ...) before
//! any routing work begins. The other kinds are recovered locally by the
//! oracles/provider that produce them and show up, if at all, as advisory
//! diagnostics on a `RouteResult` rather than as an `Err`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoutingError {
    /// Invalid coordinates, vessel fields, or algorithm parameters. The
    /// core never attempts to coerce these; it rejects synchronously.
    #[error("invalid input: {field}: {message}")]
    InputError { field: String, message: String },

    /// A required dataset could not be loaded. Oracles fall back to
    /// permissive defaults; this variant is used for the one-time log event
    /// and for the diagnostic message attached to a degraded result.
    #[error("dataset unavailable: {0}")]
    DatasetUnavailable(String),

    /// A* exhausted its iteration cap before reaching the goal cell.
    #[error("search exhausted after {iterations} iterations: {message}")]
    SearchExhausted { iterations: u64, message: String },

    /// An internal precondition failed (e.g. negative depth at a cell the
    /// oracle had classified as sea). Logged with context; the affected
    /// waypoint is treated as if it were land.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, RoutingError>;

impl RoutingError {
    pub fn input(field: impl Into<String>, message: impl Into<String>) -> Self {
        RoutingError::InputError { field: field.into(), message: message.into() }
    }
}
