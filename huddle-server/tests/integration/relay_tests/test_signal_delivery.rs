use huddle_core::{SIGNAL_EVENT, SdpType, SignalRequest, Topic, utils::encode_sdp};
use huddle_server::{SignalingRelay, TopicBroadcaster};
use std::sync::Arc;

use crate::integration::{create_test_relay, init_tracing};
use crate::utils::{ANA, BEN, HOST, active_meeting_with, default_members};

#[tokio::test]
async fn test_signal_is_published_with_sender_identity() {
    init_tracing();

    let (relay, output, _registry, meeting) = create_test_relay();
    let sdp = encode_sdp("v=0\r\no=- 1 1 IN IP4 0.0.0.0\r\n");

    relay
        .relay_signal(meeting, ANA, SignalRequest::new(BEN, SdpType::Offer, sdp.clone()))
        .await
        .expect("relay should accept the offer");

    let published = output.events_named(SIGNAL_EVENT).await;
    assert_eq!(published.len(), 1);

    let event = &published[0];
    assert_eq!(event.topic, Topic::private(meeting));
    assert_eq!(event.exclude, Some(ANA));
    assert_eq!(event.data["from_user_id"], 2);
    assert_eq!(event.data["to_user_id"], 3);
    assert_eq!(event.data["from_user_name"], "Ana");
    assert_eq!(event.data["type"], "offer");
    assert_eq!(event.data["sdp"], sdp);
}

#[tokio::test]
async fn test_signal_reaches_every_other_connection_once() {
    init_tracing();

    let (registry, meeting) = active_meeting_with(&default_members());
    let broadcaster = TopicBroadcaster::new();
    let relay = SignalingRelay::new(registry, Arc::new(broadcaster.clone()));
    let topic = Topic::private(meeting);

    let (_, mut host_rx) = broadcaster.subscribe(topic, HOST);
    let (_, mut ana_rx) = broadcaster.subscribe(topic, ANA);
    let (_, mut ben_rx) = broadcaster.subscribe(topic, BEN);

    let reached = relay
        .relay_signal(meeting, ANA, SignalRequest::new(BEN, SdpType::Answer, "YQ==".into()))
        .await
        .expect("relay should accept the answer");

    assert_eq!(reached, 2);
    assert_eq!(ben_rx.try_recv().expect("ben gets the frame").data["type"], "answer");
    // delivery is topic-wide; the receiver filters by to_user_id
    assert!(host_rx.try_recv().is_ok());
    assert!(ana_rx.try_recv().is_err());
    assert!(ben_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_invalid_signal_type_or_empty_sdp_is_rejected() {
    init_tracing();

    let (relay, output, _registry, meeting) = create_test_relay();

    let bad_type = SignalRequest {
        target_user_id: BEN,
        kind: "pranswer".into(),
        sdp: "YQ==".into(),
    };
    let err = relay.relay_signal(meeting, ANA, bad_type).await.unwrap_err();
    assert_eq!(err.to_string(), "The selected type is invalid.");

    let empty_sdp = SignalRequest::new(BEN, SdpType::Offer, String::new());
    let err = relay.relay_signal(meeting, ANA, empty_sdp).await.unwrap_err();
    assert_eq!(err.to_string(), "The sdp field is required.");

    assert!(output.all().await.is_empty());
}
