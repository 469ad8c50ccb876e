//! Error types for the signaling relay and membership operations.
//!
//! Both map to HTTP responses with a `{"message": ...}` body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors raised by the relay, the channel authorizer and the ICE issuer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Meeting not found")]
    MeetingNotFound,

    #[error("Meeting is not active")]
    MeetingNotActive,

    #[error("Unauthenticated")]
    Unauthenticated,
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Unauthorized | RelayError::MeetingNotActive => StatusCode::FORBIDDEN,
            RelayError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RelayError::MeetingNotFound => StatusCode::NOT_FOUND,
            RelayError::Unauthenticated => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

/// Errors raised by join/leave/kick/role/media operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MembershipError {
    #[error("Meeting not found")]
    MeetingNotFound,

    #[error("This meeting has ended")]
    MeetingEnded,

    #[error("Meeting is full")]
    MeetingFull,

    #[error("You are not in this meeting")]
    NotInMeeting,

    #[error("Participant not found")]
    ParticipantNotFound,

    #[error("You do not have permission to manage participants")]
    NotPermitted,

    #[error("Cannot perform this action on the host")]
    CannotTargetHost,

    #[error("Someone else is already sharing their screen")]
    ScreenShareBusy,

    #[error("{0}")]
    InvalidState(String),
}

impl MembershipError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MembershipError::MeetingNotFound | MembershipError::ParticipantNotFound => {
                StatusCode::NOT_FOUND
            }
            MembershipError::MeetingEnded
            | MembershipError::MeetingFull
            | MembershipError::NotPermitted => StatusCode::FORBIDDEN,
            MembershipError::NotInMeeting
            | MembershipError::CannotTargetHost
            | MembershipError::ScreenShareBusy
            | MembershipError::InvalidState(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for MembershipError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
