use huddle_client::session::RECONNECT_DELAY;
use huddle_client::{
    ConnectionState, MediaTrack, NegotiationState, PeerError, RelayClientError, SessionEvent,
};
use huddle_core::utils::DEFAULT_STUN_SERVERS;
use huddle_core::{IceServerConfig, Role, RosterEvent, SdpType, Topic, UserId};

use crate::integration::{
    MEETING, OFFER_SDP, candidate, candidate_frame, deliver, init_tracing, isolated,
    roster_frame, roster_participant, signal_frame,
};

const LOCAL: UserId = UserId(2);
const REMOTE: UserId = UserId(3);

#[tokio::test]
async fn test_candidates_for_unknown_peer_are_held_until_it_exists() {
    init_tracing();
    let mut t = isolated(LOCAL);

    deliver(&mut t.session, candidate_frame(UserId(5), LOCAL, candidate(1))).await;
    deliver(&mut t.session, candidate_frame(UserId(5), LOCAL, candidate(2))).await;

    assert_eq!(t.session.early_candidates(UserId(5)), 2);
    assert!(t.session.peer(UserId(5)).is_none());

    deliver(
        &mut t.session,
        signal_frame(UserId(5), LOCAL, SdpType::Offer, OFFER_SDP),
    )
    .await;

    let peer = t.session.peer(UserId(5)).expect("peer created by the offer");
    assert_eq!(
        peer.connection().applied_candidates(),
        vec![candidate(1), candidate(2)]
    );
    assert_eq!(t.session.early_candidates(UserId(5)), 0);

    let answers: Vec<_> = t
        .relay
        .signals()
        .into_iter()
        .filter(|s| s.kind == "answer")
        .collect();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].target_user_id, UserId(5));
}

#[tokio::test]
async fn test_frames_addressed_to_someone_else_are_ignored() {
    let mut t = isolated(LOCAL);

    deliver(
        &mut t.session,
        signal_frame(UserId(5), UserId(9), SdpType::Offer, OFFER_SDP),
    )
    .await;
    deliver(&mut t.session, candidate_frame(UserId(5), UserId(9), candidate(1))).await;

    assert!(t.session.peer_ids().is_empty());
    assert_eq!(t.session.early_candidates(UserId(5)), 0);
    assert!(t.relay.signals().is_empty());
}

#[tokio::test]
async fn test_undecodable_sdp_is_dropped() {
    let mut t = isolated(LOCAL);
    let mut frame = signal_frame(REMOTE, LOCAL, SdpType::Offer, OFFER_SDP);
    frame.data["sdp"] = "not base64!".into();

    deliver(&mut t.session, frame).await;

    assert!(t.session.peer(REMOTE).is_none());
    assert!(t.relay.signals().is_empty());
}

#[tokio::test]
async fn test_local_offer_and_candidates_go_out_through_the_relay() {
    let mut t = isolated(LOCAL);
    t.session.init_local_media(true, false).await.unwrap();

    t.session.connect_to(REMOTE);
    t.session.pump().await;

    let signals = t.relay.signals();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].kind, "offer");
    assert_eq!(signals[0].target_user_id, REMOTE);

    let candidates = t.relay.candidates();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].target_user_id, REMOTE);
    assert!(!t.session.peer(REMOTE).unwrap().is_making_offer());
}

#[tokio::test]
async fn test_connect_to_is_idempotent_and_skips_self() {
    let mut t = isolated(LOCAL);

    t.session.connect_to(REMOTE);
    t.session.connect_to(REMOTE);
    t.session.connect_to(LOCAL);

    assert_eq!(t.session.peer_ids(), vec![REMOTE]);
    assert_eq!(t.platform.connections().len(), 1);
}

#[tokio::test]
async fn test_teardown_releases_everything_once() {
    init_tracing();
    let mut t = isolated(LOCAL);
    t.session.init_local_media(true, true).await.unwrap();
    t.session.connect_to(REMOTE);
    t.session.connect_to(UserId(4));
    t.session.pump().await;
    t.session.start_screen_share().await.unwrap();

    let tracks = t.session.local_tracks().to_vec();
    let screen = t.session.screen_track().cloned().unwrap();

    t.session.teardown();
    t.session.teardown();

    assert!(t.session.is_destroyed());
    assert!(t.session.peer_ids().is_empty());
    assert!(tracks.iter().all(|track| track.is_stopped()));
    assert!(screen.is_stopped());
    assert!(t.platform.connections().iter().all(|c| c.is_closed()));

    // late events are dropped
    let joined = RosterEvent::Joined(roster_participant(UserId(5), Role::Participant));
    deliver(&mut t.session, roster_frame(Topic::presence(MEETING), &joined)).await;
    t.session.connect_to(UserId(6));

    assert!(t.session.peer_ids().is_empty());
    assert_eq!(t.platform.connections().len(), 2);
}

#[tokio::test]
async fn test_dropping_the_session_stops_local_tracks() {
    let t = isolated(LOCAL);
    let (mut session, platform) = (t.session, t.platform);
    session.init_local_media(true, true).await.unwrap();
    session.connect_to(REMOTE);
    let tracks = session.local_tracks().to_vec();

    drop(session);

    assert!(tracks.iter().all(|track| track.is_stopped()));
    assert!(platform.connections()[0].is_closed());
}

#[tokio::test]
async fn test_failed_connection_restarts_ice() {
    let mut t = isolated(LOCAL);
    t.session.init_local_media(true, false).await.unwrap();
    t.session.connect_to(REMOTE);
    t.session.pump().await;

    let connection = t.platform.connections_to(REMOTE)[0].clone();
    connection.transition_to(ConnectionState::Failed);
    t.session.pump().await;

    assert_eq!(connection.ice_restarts(), 1);
    assert_eq!(t.session.peer(REMOTE).unwrap().counters().ice_restarts, 1);
}

#[tokio::test]
async fn test_events_from_a_replaced_connection_are_ignored() {
    let mut t = isolated(LOCAL);
    t.session.connect_to(REMOTE);
    let old = t.platform.connections_to(REMOTE)[0].clone();

    t.session.disconnect_from(REMOTE);
    t.session.connect_to(REMOTE);
    let current = t.session.peer(REMOTE).unwrap().handle();
    assert!(current.connection > old.handle().connection);

    old.transition_to(ConnectionState::Failed);
    t.session.pump().await;

    assert_eq!(t.session.peer(REMOTE).unwrap().counters().ice_restarts, 0);
    assert_eq!(old.ice_restarts(), 0);
}

#[tokio::test]
async fn test_description_mismatch_recreates_peer_after_delay() {
    init_tracing();
    let mut t = isolated(LOCAL);
    t.session.init_local_media(true, false).await.unwrap();
    t.session.connect_to(REMOTE);
    t.session.pump().await;

    let broken = t.platform.connections_to(REMOTE)[0].clone();
    broken.fail_next_remote_description(PeerError::DescriptionMismatch(
        "m-lines order differs".to_string(),
    ));
    deliver(
        &mut t.session,
        signal_frame(REMOTE, LOCAL, SdpType::Offer, OFFER_SDP),
    )
    .await;

    assert!(t.session.peer(REMOTE).is_none());
    assert!(broken.is_closed());
    assert_eq!(*t.observer.reconnecting.borrow(), vec![REMOTE]);
    assert_eq!(t.platform.scheduled_delays(), vec![RECONNECT_DELAY]);

    assert_eq!(t.platform.fire_scheduled(), 1);
    t.session.pump().await;

    let peer = t.session.peer(REMOTE).expect("peer recreated");
    assert!(peer.handle().connection > broken.handle().connection);
    assert_eq!(t.platform.connections_to(REMOTE).len(), 2);
}

#[tokio::test]
async fn test_reconnect_is_skipped_when_user_left_meanwhile() {
    let mut t = isolated(LOCAL);
    t.session.connect_to(REMOTE);
    t.session.disconnect_from(REMOTE);

    t.session
        .handle_event(SessionEvent::Reconnect(REMOTE))
        .await;

    assert!(t.session.peer(REMOTE).is_none());
    assert_eq!(t.platform.connections().len(), 1);
}

#[tokio::test]
async fn test_remote_tracks_reach_the_observer() {
    let mut t = isolated(LOCAL);

    deliver(
        &mut t.session,
        signal_frame(REMOTE, LOCAL, SdpType::Offer, OFFER_SDP),
    )
    .await;

    let tracks = t.observer.remote_tracks.borrow().clone();
    assert_eq!(tracks, vec![(REMOTE, "remote-far-mic".to_string())]);
}

#[tokio::test]
async fn test_ice_servers_fall_back_to_defaults() {
    let mut t = isolated(LOCAL);
    assert_eq!(t.session.ice_servers().len(), DEFAULT_STUN_SERVERS.len());

    t.relay
        .respond_to_ice_servers(Err(RelayClientError::Transport("offline".to_string())));
    t.session.load_ice_servers().await;
    assert_eq!(t.session.ice_servers().len(), DEFAULT_STUN_SERVERS.len());

    t.relay.respond_to_ice_servers(Ok(Vec::new()));
    t.session.load_ice_servers().await;
    assert_eq!(t.session.ice_servers().len(), DEFAULT_STUN_SERVERS.len());

    let turn = IceServerConfig {
        urls: "turn:turn.example.org:3478".to_string(),
        username: Some("1700000000:2".to_string()),
        credential: Some("c2VjcmV0".to_string()),
    };
    t.relay.respond_to_ice_servers(Ok(vec![
        IceServerConfig::stun("stun:stun.example.org:3478"),
        turn.clone(),
    ]));
    t.session.load_ice_servers().await;
    assert_eq!(t.session.ice_servers().len(), 2);

    t.session.connect_to(REMOTE);
    let used = t.platform.last_ice_servers().unwrap();
    assert_eq!(used[1], turn);
}

#[tokio::test]
async fn test_screen_share_end_for_unknown_track_is_ignored() {
    let mut t = isolated(LOCAL);
    t.session.init_local_media(true, true).await.unwrap();
    t.session.start_screen_share().await.unwrap();

    t.session
        .handle_event(SessionEvent::ScreenShareEnded("someone-else".to_string()))
        .await;

    let screen = t.session.screen_track().expect("still sharing");
    assert!(!screen.is_stopped());
    assert!(screen.id().contains("screen"));
}

#[tokio::test]
async fn test_offer_from_a_rebuilt_remote_connection_replaces_the_peer() {
    init_tracing();
    // local is the impolite side towards user 1
    let remote = UserId(1);
    let mut t = isolated(LOCAL);
    t.session.init_local_media(true, false).await.unwrap();
    deliver(
        &mut t.session,
        signal_frame(remote, LOCAL, SdpType::Offer, OFFER_SDP),
    )
    .await;
    let first = t.platform.connections_to(remote)[0].clone();
    // answered, then sent its own offer for the microphone
    assert_eq!(
        t.session.peer(remote).unwrap().state(),
        NegotiationState::HaveLocalOffer
    );

    // a colliding offer from the same remote connection is ignored
    deliver(
        &mut t.session,
        signal_frame(remote, LOCAL, SdpType::Offer, OFFER_SDP),
    )
    .await;
    assert_eq!(t.session.peer(remote).unwrap().counters().offers_ignored, 1);
    assert!(!first.is_closed());

    // one from a fresh remote connection replaces ours and is answered
    let rebuilt_offer = "v=0\r\no=remote 2 1 IN IP4 127.0.0.1\r\na=track:audio:far-mic-2\r\n";
    deliver(
        &mut t.session,
        signal_frame(remote, LOCAL, SdpType::Offer, rebuilt_offer),
    )
    .await;

    assert!(first.is_closed());
    let peer = t.session.peer(remote).expect("peer rebuilt");
    assert!(peer.handle().connection > first.handle().connection);
    assert_eq!(peer.counters().offers_ignored, 0);
    assert_eq!(peer.counters().answers_sent, 1);
    let answers = t
        .relay
        .signals()
        .into_iter()
        .filter(|s| s.kind == "answer")
        .count();
    assert_eq!(answers, 2);
}
