use axum::http::StatusCode;
use huddle_core::{PARTICIPANT_JOINED_EVENT, PARTICIPANT_KICKED_EVENT, Topic, UserId};
use huddle_server::{Config, MembershipRegistry};
use serde_json::json;

use super::test_app;
use crate::integration::init_tracing;
use crate::utils::{ANA, BEN, HOST, read_body_json, send_request};

#[tokio::test]
async fn test_join_announces_to_presence_subscribers() -> anyhow::Result<()> {
    init_tracing();

    let (app, state, meeting) = test_app(&Config::default());
    let (_conn, mut presence_rx) = state.broadcaster.subscribe(Topic::presence(meeting), HOST);

    let response = send_request(
        &app,
        "POST",
        &format!("/meetings/{meeting}/join"),
        Some(UserId(7)),
        Some(json!({"display_name": "Cleo"})),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body_json(response).await?;
    assert_eq!(body["in_waiting_room"], false);
    assert_eq!(body["participant"]["display_name"], "Cleo");

    let frame = presence_rx.try_recv()?;
    assert_eq!(frame.event, PARTICIPANT_JOINED_EVENT);
    assert_eq!(frame.data["participant"]["user_id"], 7);
    Ok(())
}

#[tokio::test]
async fn test_join_without_body_uses_default_name() -> anyhow::Result<()> {
    init_tracing();

    let (app, _state, meeting) = test_app(&Config::default());
    let response = send_request(
        &app,
        "POST",
        &format!("/meetings/{meeting}/join"),
        Some(UserId(8)),
        None,
    )
    .await?;

    let body = read_body_json(response).await?;
    assert_eq!(body["participant"]["display_name"], "User 8");
    Ok(())
}

#[tokio::test]
async fn test_leave_twice_is_rejected() -> anyhow::Result<()> {
    init_tracing();

    let (app, state, meeting) = test_app(&Config::default());
    let uri = format!("/meetings/{meeting}/leave");

    let response = send_request(&app, "POST", &uri, Some(ANA), None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(!state.registry.is_active_participant(meeting, ANA).await);

    let response = send_request(&app, "POST", &uri, Some(ANA), None).await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    Ok(())
}

#[tokio::test]
async fn test_kick_rules_over_http() -> anyhow::Result<()> {
    init_tracing();

    let (app, state, meeting) = test_app(&Config::default());
    let (_conn, mut private_rx) = state.broadcaster.subscribe(Topic::private(meeting), BEN);
    let host = state.registry.participant(meeting, HOST).expect("host row");
    let ana = state.registry.participant(meeting, ANA).expect("ana row");

    let response = send_request(
        &app,
        "POST",
        &format!("/meetings/{meeting}/participants/{}/kick", ana.id),
        Some(BEN),
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send_request(
        &app,
        "POST",
        &format!("/meetings/{meeting}/participants/{}/promote", ana.id),
        Some(HOST),
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send_request(
        &app,
        "POST",
        &format!("/meetings/{meeting}/participants/{}/kick", host.id),
        Some(ANA),
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = send_request(
        &app,
        "POST",
        &format!("/meetings/{meeting}/participants/{}/kick", ana.id),
        Some(HOST),
        None,
    )
    .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body_json(response).await?;
    assert_eq!(body["message"], "Participant removed from meeting");

    let mut kicked = Vec::new();
    while let Ok(frame) = private_rx.try_recv() {
        if frame.event == PARTICIPANT_KICKED_EVENT {
            kicked.push(frame);
        }
    }
    assert_eq!(kicked.len(), 1);
    assert_eq!(kicked[0].data["user_id"], 2);
    Ok(())
}

#[tokio::test]
async fn test_second_screen_share_is_rejected() -> anyhow::Result<()> {
    init_tracing();

    let (app, _state, meeting) = test_app(&Config::default());
    let uri = format!("/meetings/{meeting}/media");

    let response = send_request(&app, "POST", &uri, Some(ANA), Some(json!({"is_screen_sharing": true}))).await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send_request(&app, "POST", &uri, Some(BEN), Some(json!({"is_screen_sharing": true}))).await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_body_json(response).await?;
    assert_eq!(body["message"], "Someone else is already sharing their screen");
    Ok(())
}

#[tokio::test]
async fn test_end_meeting_ends_everyone() -> anyhow::Result<()> {
    init_tracing();

    let (app, state, meeting) = test_app(&Config::default());

    let response = send_request(&app, "POST", &format!("/meetings/{meeting}/end"), Some(ANA), None).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send_request(&app, "POST", &format!("/meetings/{meeting}/end"), Some(HOST), None).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.registry.active_participants(meeting).await.is_empty());
    Ok(())
}
