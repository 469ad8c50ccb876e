use huddle_core::{Role, RosterEvent};
use huddle_server::MembershipRegistry;

use crate::integration::init_tracing;
use crate::utils::{ANA, BEN, HOST, active_meeting_with, default_members};

#[tokio::test]
async fn test_host_leaves_and_co_host_takes_over() {
    init_tracing();

    let (registry, meeting) = active_meeting_with(&default_members());
    let ben = registry.participant(meeting, BEN).unwrap();
    registry.promote(meeting, HOST, ben.id).expect("promote ben");

    let change = registry.leave(meeting, HOST).expect("host leaves");

    let updated: Vec<_> = change
        .events
        .iter()
        .filter_map(|e| match e {
            RosterEvent::Updated(p) => Some(p),
            _ => None,
        })
        .collect();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].user_id, BEN);
    assert_eq!(updated[0].role, Role::Host);

    assert_eq!(registry.role(meeting, BEN).await, Some(Role::Host));
    assert_eq!(registry.role(meeting, ANA).await, Some(Role::Participant));
    assert!(registry.meeting(meeting).await.unwrap().is_active());
}

#[tokio::test]
async fn test_host_leaves_without_co_host_promotes_earliest_participant() {
    init_tracing();

    let (registry, meeting) = active_meeting_with(&default_members());

    registry.leave(meeting, HOST).expect("host leaves");

    assert_eq!(registry.role(meeting, ANA).await, Some(Role::Host));
    assert_eq!(registry.role(meeting, BEN).await, Some(Role::Participant));
}

#[tokio::test]
async fn test_last_host_leaving_ends_meeting() {
    init_tracing();

    let (registry, meeting) = active_meeting_with(&[(HOST, "Host")]);

    let change = registry.leave(meeting, HOST).expect("host leaves");

    assert!(matches!(change.events.last(), Some(RosterEvent::MeetingEnded(_))));
    assert!(registry.meeting(meeting).await.unwrap().is_ended());
}

#[tokio::test]
async fn test_role_change_keeps_everyone_in_meeting() {
    init_tracing();

    let (registry, meeting) = active_meeting_with(&default_members());
    let before = registry.active_participants(meeting).await.len();

    let ana = registry.participant(meeting, ANA).unwrap();
    registry.promote(meeting, HOST, ana.id).expect("promote");
    registry.demote(meeting, HOST, ana.id).expect("demote");

    assert_eq!(registry.active_participants(meeting).await.len(), before);
    assert_eq!(registry.role(meeting, ANA).await, Some(Role::Participant));
}
