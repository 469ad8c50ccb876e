//! Signaling handlers.
//!
//! - `POST /meetings/{meeting}/signal` - relay an offer or answer
//! - `POST /meetings/{meeting}/ice-candidate` - relay an ICE candidate
//! - `GET /meetings/{meeting}/ice-servers` - STUN/TURN list for the caller

use crate::errors::RelayError;
use crate::middleware::AuthUser;
use crate::routes::AppState;
use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
};
use huddle_core::{IceCandidateRequest, IceServersResponse, MeetingId, SignalRequest};
use serde_json::{Value, json};

pub async fn send_signal(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(meeting_id): Path<u64>,
    payload: Result<Json<SignalRequest>, JsonRejection>,
) -> Result<Json<Value>, RelayError> {
    let Json(request) = payload.map_err(|e| RelayError::InvalidRequest(e.body_text()))?;

    state
        .relay
        .relay_signal(MeetingId(meeting_id), user_id, request)
        .await?;

    Ok(Json(json!({ "message": "Signal sent successfully" })))
}

pub async fn send_ice_candidate(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(meeting_id): Path<u64>,
    payload: Result<Json<IceCandidateRequest>, JsonRejection>,
) -> Result<Json<Value>, RelayError> {
    let Json(request) = payload.map_err(|e| RelayError::InvalidRequest(e.body_text()))?;

    state
        .relay
        .relay_ice_candidate(MeetingId(meeting_id), user_id, request)
        .await?;

    Ok(Json(json!({ "message": "ICE candidate sent successfully" })))
}

pub async fn ice_servers(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(meeting_id): Path<u64>,
) -> Result<Json<IceServersResponse>, RelayError> {
    let ice_servers = state
        .ice
        .issue_ice_servers(MeetingId(meeting_id), user_id)
        .await?;
    Ok(Json(IceServersResponse { ice_servers }))
}
