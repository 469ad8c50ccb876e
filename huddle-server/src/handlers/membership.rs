//! Membership handlers: join, leave, end, media flags and the host/co-host
//! participant actions. Each one publishes the resulting roster events.

use crate::errors::MembershipError;
use crate::membership::MediaUpdate;
use crate::middleware::AuthUser;
use crate::routes::AppState;
use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    response::{IntoResponse, Response},
};
use huddle_core::{MeetingId, ParticipantId};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Default, Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    pub display_name: Option<String>,
}

pub async fn join_meeting(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(meeting_id): Path<u64>,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> Result<Response, MembershipError> {
    // the body is optional; without one the default name is used
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let display_name = request
        .display_name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("User {user_id}"));

    let change = state
        .membership
        .join(MeetingId(meeting_id), user_id, &display_name)
        .await?;

    let participant = change.participant;
    let body = if participant.is_in_waiting_room {
        json!({
            "participant": participant,
            "in_waiting_room": true,
            "message": "You are in the waiting room",
        })
    } else {
        json!({
            "participant": participant,
            "in_waiting_room": false,
            "message": "Joined meeting successfully",
        })
    };
    Ok(Json(body).into_response())
}

pub async fn leave_meeting(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(meeting_id): Path<u64>,
) -> Result<Response, MembershipError> {
    state.membership.leave(MeetingId(meeting_id), user_id).await?;
    Ok(Json(json!({ "message": "Left meeting successfully" })).into_response())
}

pub async fn end_meeting(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(meeting_id): Path<u64>,
) -> Result<Response, MembershipError> {
    let meeting = state
        .membership
        .end_meeting(MeetingId(meeting_id), user_id)
        .await?;
    Ok(Json(json!({ "meeting": meeting, "message": "Meeting ended successfully" })).into_response())
}

pub async fn update_media(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path(meeting_id): Path<u64>,
    payload: Result<Json<MediaUpdate>, JsonRejection>,
) -> Result<Response, MembershipError> {
    let Json(update) = payload.map_err(|e| MembershipError::InvalidState(e.body_text()))?;

    let change = state
        .membership
        .update_media(MeetingId(meeting_id), user_id, update)
        .await?;
    Ok(Json(json!({ "participant": change.participant })).into_response())
}

pub async fn kick_participant(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path((meeting_id, participant_id)): Path<(u64, u64)>,
) -> Result<Response, MembershipError> {
    state
        .membership
        .kick(MeetingId(meeting_id), user_id, ParticipantId(participant_id))
        .await?;
    Ok(Json(json!({ "message": "Participant removed from meeting" })).into_response())
}

pub async fn promote_participant(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path((meeting_id, participant_id)): Path<(u64, u64)>,
) -> Result<Response, MembershipError> {
    let change = state
        .membership
        .promote(MeetingId(meeting_id), user_id, ParticipantId(participant_id))
        .await?;
    Ok(Json(json!({
        "participant": change.participant,
        "message": "Participant promoted to co-host",
    }))
    .into_response())
}

pub async fn demote_participant(
    State(state): State<AppState>,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    Path((meeting_id, participant_id)): Path<(u64, u64)>,
) -> Result<Response, MembershipError> {
    let change = state
        .membership
        .demote(MeetingId(meeting_id), user_id, ParticipantId(participant_id))
        .await?;
    Ok(Json(json!({
        "participant": change.participant,
        "message": "Participant demoted",
    }))
    .into_response())
}
