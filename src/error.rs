//! Errors surfaced by [`ConquestEngine`](crate::engine::ConquestEngine).

use crate::accounting::AccountingError;
use crate::claim::ClaimError;
use crate::protocol::geojson::DecodeError;
use crate::route::RouteError;
use crate::store::StoreError;
use crate::territory::UserId;

#[derive(Debug, thiserror::Error)]
pub enum ConquestError {
    /// Malformed or too-short input. Not retried.
    #[error("invalid route: {0}")]
    InvalidRoute(#[from] RouteError),

    #[error("invalid route payload: {0}")]
    InvalidPayload(#[from] DecodeError),

    /// Buffering produced no usable polygon. Nothing is persisted.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(#[from] ClaimError),

    /// A negative or NaN area, or an impossible delta. Nothing is persisted.
    #[error("geometry accounting failed: {0}")]
    GeometryAccounting(#[from] AccountingError),

    /// Every commit attempt lost a version race. Nothing is persisted.
    #[error("gave up after {attempts} conflicting commit attempts")]
    ConflictExhausted { attempts: usize },

    #[error("unknown user {0}")]
    UnknownUser(UserId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ConquestError {
    /// Stable tag for the line protocol.
    pub fn kind(&self) -> &'static str {
        match self {
            ConquestError::InvalidRoute(_) | ConquestError::InvalidPayload(_) => "invalid_route",
            ConquestError::DegenerateGeometry(_) => "degenerate_geometry",
            ConquestError::GeometryAccounting(_) => "geometry_accounting",
            ConquestError::ConflictExhausted { .. } => "conflict_exhausted",
            ConquestError::UnknownUser(_) => "unknown_user",
            ConquestError::Store(_) => "store",
        }
    }

    /// Whether the caller may resubmit the same route unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConquestError::ConflictExhausted { .. })
    }
}
