use async_trait::async_trait;
use huddle_core::{Meeting, MeetingId, Participant, Role, UserId};

/// Read side of meeting membership. The relay, the channel authorizer and
/// the ICE issuer only ever look at membership through this trait.
#[async_trait]
pub trait MembershipRegistry: Send + Sync {
    async fn meeting(&self, meeting_id: MeetingId) -> Option<Meeting>;

    /// The participant row for `user_id`, only if it is currently active
    /// (joined and not left).
    async fn active_participant(
        &self,
        meeting_id: MeetingId,
        user_id: UserId,
    ) -> Option<Participant>;

    /// Active participants in join order.
    async fn active_participants(&self, meeting_id: MeetingId) -> Vec<Participant>;

    async fn role(&self, meeting_id: MeetingId, user_id: UserId) -> Option<Role> {
        self.active_participant(meeting_id, user_id)
            .await
            .map(|p| p.role)
    }

    async fn is_active_participant(&self, meeting_id: MeetingId, user_id: UserId) -> bool {
        self.active_participant(meeting_id, user_id).await.is_some()
    }

    fn can_manage(&self, participant: &Participant) -> bool {
        participant.can_manage()
    }
}
