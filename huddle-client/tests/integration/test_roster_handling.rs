use huddle_client::{EndReason, SessionEvent};
use huddle_core::{
    MEETING_ENDED_EVENT, MediaFlags, PresenceMember, Role, RosterEvent, ServerFrame, Topic,
    UserId,
};
use serde_json::json;

use crate::integration::{
    MEETING, candidate, candidate_frame, deliver, init_tracing, isolated, participant_ref,
    roster_frame, roster_participant,
};

const LOCAL: UserId = UserId(2);

fn member(user: UserId) -> PresenceMember {
    PresenceMember {
        id: user,
        name: format!("User {user}"),
        role: Role::Participant,
        avatar: None,
        flags: MediaFlags::default(),
    }
}

#[tokio::test]
async fn test_join_seen_on_both_topics_creates_one_peer() {
    init_tracing();
    let mut t = isolated(LOCAL);
    let joined = RosterEvent::Joined(roster_participant(UserId(3), Role::Participant));

    deliver(&mut t.session, roster_frame(Topic::presence(MEETING), &joined)).await;
    deliver(&mut t.session, roster_frame(Topic::private(MEETING), &joined)).await;

    assert_eq!(t.session.peer_ids(), vec![UserId(3)]);
    assert_eq!(t.platform.connections().len(), 1);
    assert_eq!(
        t.session.participant(UserId(3)).unwrap().display_name,
        "User 3"
    );
}

#[tokio::test]
async fn test_own_join_is_ignored() {
    let mut t = isolated(LOCAL);
    let joined = RosterEvent::Joined(roster_participant(LOCAL, Role::Participant));

    deliver(&mut t.session, roster_frame(Topic::presence(MEETING), &joined)).await;

    assert!(t.session.peer_ids().is_empty());
}

#[tokio::test]
async fn test_subscription_members_are_connected() {
    let mut t = isolated(LOCAL);
    let members = [member(UserId(1)), member(LOCAL), member(UserId(3))];
    let frame = ServerFrame::subscription_succeeded(
        Topic::presence(MEETING).to_string(),
        Some(members.as_slice()),
    );

    deliver(&mut t.session, frame).await;

    assert_eq!(t.session.peer_ids(), vec![UserId(1), UserId(3)]);
}

#[tokio::test]
async fn test_role_change_keeps_the_connection() {
    let mut t = isolated(LOCAL);
    let joined = RosterEvent::Joined(roster_participant(UserId(3), Role::Participant));
    deliver(&mut t.session, roster_frame(Topic::presence(MEETING), &joined)).await;
    let handle = t.session.peer(UserId(3)).unwrap().handle();

    let updated = RosterEvent::Updated(roster_participant(UserId(3), Role::CoHost));
    deliver(&mut t.session, roster_frame(Topic::private(MEETING), &updated)).await;

    assert_eq!(t.session.peer(UserId(3)).unwrap().handle(), handle);
    assert_eq!(t.session.participant(UserId(3)).unwrap().role, Role::CoHost);
    assert_eq!(t.observer.updated.borrow().len(), 1);
    assert!(t.observer.removed.borrow().is_empty());
}

#[tokio::test]
async fn test_leave_is_handled_once() {
    let mut t = isolated(LOCAL);
    let joined = RosterEvent::Joined(roster_participant(UserId(3), Role::Participant));
    deliver(&mut t.session, roster_frame(Topic::presence(MEETING), &joined)).await;
    let connection = t.platform.connections_to(UserId(3))[0].clone();

    let left = RosterEvent::Left(participant_ref(UserId(3)));
    deliver(&mut t.session, roster_frame(Topic::presence(MEETING), &left)).await;
    deliver(&mut t.session, roster_frame(Topic::private(MEETING), &left)).await;

    assert!(t.session.peer(UserId(3)).is_none());
    assert!(t.session.participant(UserId(3)).is_none());
    assert!(connection.is_closed());
    assert_eq!(*t.observer.removed.borrow(), vec![UserId(3)]);
}

#[tokio::test]
async fn test_kicking_someone_else_drops_their_peer() {
    let mut t = isolated(LOCAL);
    t.session.connect_to(UserId(4));

    let kicked = RosterEvent::Kicked(participant_ref(UserId(4)));
    deliver(&mut t.session, roster_frame(Topic::private(MEETING), &kicked)).await;

    assert!(t.session.peer(UserId(4)).is_none());
    assert!(!t.session.is_destroyed());
}

#[tokio::test]
async fn test_being_kicked_ends_the_session() {
    let mut t = isolated(LOCAL);
    t.session.init_local_media(true, true).await.unwrap();
    t.session.connect_to(UserId(3));
    let tracks = t.session.local_tracks().to_vec();

    let kicked = RosterEvent::Kicked(participant_ref(LOCAL));
    deliver(&mut t.session, roster_frame(Topic::private(MEETING), &kicked)).await;

    assert!(t.session.is_destroyed());
    assert!(tracks.iter().all(|track| track.is_stopped()));
    assert_eq!(*t.observer.ended.borrow(), vec![EndReason::Kicked]);
}

#[tokio::test]
async fn test_meeting_end_ends_the_session_once() {
    let mut t = isolated(LOCAL);
    t.session.connect_to(UserId(3));
    let frame = ServerFrame::new(
        MEETING_ENDED_EVENT,
        Topic::private(MEETING).to_string(),
        json!({ "meeting_id": MEETING.0, "ended_at": "2026-03-01T10:00:00Z" }),
    );

    deliver(&mut t.session, frame.clone()).await;
    t.session.handle_event(SessionEvent::Channel(frame)).await;

    assert!(t.session.is_destroyed());
    assert!(t.session.peer_ids().is_empty());
    assert_eq!(*t.observer.ended.borrow(), vec![EndReason::MeetingEnded]);
}

#[tokio::test]
async fn test_unknown_and_malformed_frames_are_skipped() {
    let mut t = isolated(LOCAL);
    let topic = Topic::private(MEETING).to_string();

    deliver(
        &mut t.session,
        ServerFrame::new("chat.message", topic.clone(), json!({ "text": "hi" })),
    )
    .await;
    deliver(
        &mut t.session,
        ServerFrame::new("participant.joined", topic, json!({ "nope": true })),
    )
    .await;

    assert!(t.session.peer_ids().is_empty());
    assert!(!t.session.is_destroyed());
}

#[tokio::test]
async fn test_held_candidates_are_dropped_when_the_user_goes() {
    let mut t = isolated(LOCAL);
    deliver(&mut t.session, candidate_frame(UserId(5), LOCAL, candidate(1))).await;
    deliver(&mut t.session, candidate_frame(UserId(6), LOCAL, candidate(2))).await;
    assert_eq!(t.session.early_candidates(UserId(5)), 1);
    assert_eq!(t.session.early_candidates(UserId(6)), 1);

    let left = RosterEvent::Left(participant_ref(UserId(5)));
    deliver(&mut t.session, roster_frame(Topic::presence(MEETING), &left)).await;
    let kicked = RosterEvent::Kicked(participant_ref(UserId(6)));
    deliver(&mut t.session, roster_frame(Topic::private(MEETING), &kicked)).await;

    assert_eq!(t.session.early_candidates(UserId(5)), 0);
    assert_eq!(t.session.early_candidates(UserId(6)), 0);
    assert!(t.session.peer_ids().is_empty());
    assert!(t.observer.removed.borrow().is_empty());
}
