use huddle_core::{MeetingFeatures, MeetingId, UserId};
use huddle_server::InMemoryRegistry;
use std::sync::Arc;

pub const HOST: UserId = UserId(1);
pub const ANA: UserId = UserId(2);
pub const BEN: UserId = UserId(3);
pub const OUTSIDER: UserId = UserId(99);

/// Registry with one active meeting hosted by `HOST`; `members` have joined
/// in the given order.
pub fn active_meeting_with(members: &[(UserId, &str)]) -> (Arc<InMemoryRegistry>, MeetingId) {
    let registry = Arc::new(InMemoryRegistry::new());
    let meeting = registry.create_meeting(HOST, MeetingFeatures::default(), 50);
    registry
        .start_meeting(meeting.id, HOST)
        .expect("meeting should start");

    for (user, name) in members {
        registry
            .join(meeting.id, *user, name)
            .expect("join should succeed");
    }
    (registry, meeting.id)
}

pub fn default_members() -> Vec<(UserId, &'static str)> {
    vec![(HOST, "Host"), (ANA, "Ana"), (BEN, "Ben")]
}
