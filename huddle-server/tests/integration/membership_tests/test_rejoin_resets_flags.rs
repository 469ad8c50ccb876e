use huddle_core::MediaFlags;
use huddle_server::{MediaUpdate, MembershipRegistry};

use crate::integration::init_tracing;
use crate::utils::{ANA, active_meeting_with, default_members};

#[tokio::test]
async fn test_rejoin_starts_with_clean_media_state() {
    init_tracing();

    let (registry, meeting) = active_meeting_with(&default_members());

    registry
        .update_media(
            meeting,
            ANA,
            MediaUpdate {
                is_muted: Some(true),
                is_video_off: Some(true),
                is_hand_raised: Some(true),
                is_screen_sharing: Some(true),
            },
        )
        .expect("flags update");

    // drop out without a clean leave, then come back
    registry.leave(meeting, ANA).expect("ana leaves");
    registry.join(meeting, ANA, "Ana again").expect("ana rejoins");

    let participant = registry
        .active_participant(meeting, ANA)
        .await
        .expect("ana is active again");
    assert_eq!(participant.flags, MediaFlags::default());
    assert!(participant.left_at.is_none());
    // the row is reused, so the original display name stays
    assert_eq!(participant.display_name, "Ana");
}

#[tokio::test]
async fn test_rejoin_while_still_active_resets_flags() {
    init_tracing();

    let (registry, meeting) = active_meeting_with(&default_members());
    registry
        .update_media(
            meeting,
            ANA,
            MediaUpdate {
                is_muted: Some(true),
                ..MediaUpdate::default()
            },
        )
        .expect("mute");

    registry.join(meeting, ANA, "Ana").expect("page reload rejoin");

    let participant = registry.active_participant(meeting, ANA).await.unwrap();
    assert!(!participant.flags.is_muted);
    assert_eq!(registry.active_participants(meeting).await.len(), 3);
}
