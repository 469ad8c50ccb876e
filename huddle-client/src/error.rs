use crate::negotiation::{NegotiationState, Transition};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    #[error("illegal transition {via:?} from {from}")]
    IllegalTransition {
        from: NegotiationState,
        via: Transition,
    },
}

/// Failures of a single peer connection operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeerError {
    /// Local and remote descriptions disagree on media-line ordering. The
    /// connection cannot recover; the peer must be recreated.
    #[error("description mismatch: {0}")]
    DescriptionMismatch(String),

    #[error("invalid connection state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error("connection closed")]
    Closed,

    #[error("{0}")]
    Operation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    /// The device is missing or held by another process.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayClientError {
    /// The relay answered with a non-success status.
    #[error("relay rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid response: {0}")]
    Decode(String),
}
