use crate::errors::MembershipError;
use crate::membership::{InMemoryRegistry, MediaUpdate, MembershipChange};
use crate::signaling::SignalingOutput;
use huddle_core::{Meeting, MeetingId, ParticipantId, RosterEvent, Topic, UserId};
use std::sync::Arc;
use tracing::error;

/// Runs membership operations against the registry and publishes the
/// resulting roster events. Joined/left go out on the presence topic and
/// the private topic; everything else on the private topic only.
#[derive(Clone)]
pub struct MembershipService {
    registry: Arc<InMemoryRegistry>,
    output: Arc<dyn SignalingOutput>,
}

impl MembershipService {
    pub fn new(registry: Arc<InMemoryRegistry>, output: Arc<dyn SignalingOutput>) -> Self {
        Self { registry, output }
    }

    pub fn registry(&self) -> &Arc<InMemoryRegistry> {
        &self.registry
    }

    async fn publish(&self, meeting_id: MeetingId, events: &[RosterEvent], exclude: Option<UserId>) {
        for event in events {
            let data = match event.payload() {
                Ok(data) => data,
                Err(e) => {
                    error!("Failed to serialize {} payload: {}", event.event_name(), e);
                    continue;
                }
            };

            if event.is_presence_event() {
                self.output
                    .publish(
                        &Topic::presence(meeting_id),
                        event.event_name(),
                        data.clone(),
                        exclude,
                    )
                    .await;
            }
            self.output
                .publish(&Topic::private(meeting_id), event.event_name(), data, exclude)
                .await;
        }
    }

    async fn publish_change(
        &self,
        meeting_id: MeetingId,
        actor: UserId,
        change: Result<MembershipChange, MembershipError>,
    ) -> Result<MembershipChange, MembershipError> {
        let change = change?;
        self.publish(meeting_id, &change.events, Some(actor)).await;
        Ok(change)
    }

    pub async fn join(
        &self,
        meeting_id: MeetingId,
        user_id: UserId,
        display_name: &str,
    ) -> Result<MembershipChange, MembershipError> {
        let change = self.registry.join(meeting_id, user_id, display_name);
        self.publish_change(meeting_id, user_id, change).await
    }

    pub async fn leave(
        &self,
        meeting_id: MeetingId,
        user_id: UserId,
    ) -> Result<MembershipChange, MembershipError> {
        let change = self.registry.leave(meeting_id, user_id);
        self.publish_change(meeting_id, user_id, change).await
    }

    pub async fn kick(
        &self,
        meeting_id: MeetingId,
        actor: UserId,
        target: ParticipantId,
    ) -> Result<MembershipChange, MembershipError> {
        let change = self.registry.kick(meeting_id, actor, target);
        self.publish_change(meeting_id, actor, change).await
    }

    pub async fn promote(
        &self,
        meeting_id: MeetingId,
        actor: UserId,
        target: ParticipantId,
    ) -> Result<MembershipChange, MembershipError> {
        let change = self.registry.promote(meeting_id, actor, target);
        self.publish_change(meeting_id, actor, change).await
    }

    pub async fn demote(
        &self,
        meeting_id: MeetingId,
        actor: UserId,
        target: ParticipantId,
    ) -> Result<MembershipChange, MembershipError> {
        let change = self.registry.demote(meeting_id, actor, target);
        self.publish_change(meeting_id, actor, change).await
    }

    pub async fn update_media(
        &self,
        meeting_id: MeetingId,
        user_id: UserId,
        update: MediaUpdate,
    ) -> Result<MembershipChange, MembershipError> {
        let change = self.registry.update_media(meeting_id, user_id, update);
        self.publish_change(meeting_id, user_id, change).await
    }

    /// Ending a meeting is announced to everyone, the actor included.
    pub async fn end_meeting(
        &self,
        meeting_id: MeetingId,
        actor: UserId,
    ) -> Result<Meeting, MembershipError> {
        let (meeting, event) = self.registry.end_meeting(meeting_id, actor)?;
        self.publish(meeting_id, std::slice::from_ref(&event), None)
            .await;
        Ok(meeting)
    }
}
