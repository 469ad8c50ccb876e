use crate::errors::RelayError;
use crate::membership::MembershipRegistry;
use huddle_core::{PresenceMember, Topic, UserId};
use std::sync::Arc;
use tracing::debug;

/// Extra data handed to a presence-topic subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceGrant {
    /// The subscriber's own public member info.
    pub member: PresenceMember,
    /// Everyone currently in the meeting, the subscriber included.
    pub members: Vec<PresenceMember>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub topic: Topic,
    pub presence: Option<PresenceGrant>,
}

/// Decides who may subscribe to a meeting topic. Read-only.
#[derive(Clone)]
pub struct ChannelAuthorizer {
    registry: Arc<dyn MembershipRegistry>,
}

impl ChannelAuthorizer {
    pub fn new(registry: Arc<dyn MembershipRegistry>) -> Self {
        Self { registry }
    }

    pub async fn authorize(
        &self,
        user_id: UserId,
        topic_name: &str,
    ) -> Result<Authorization, RelayError> {
        let topic: Topic = topic_name
            .parse()
            .map_err(|e: huddle_core::TopicError| RelayError::InvalidRequest(e.to_string()))?;
        let meeting_id = topic.meeting_id();

        if self.registry.meeting(meeting_id).await.is_none() {
            debug!("User {} denied {}: no such meeting", user_id, topic);
            return Err(RelayError::Unauthorized);
        }

        let Some(participant) = self.registry.active_participant(meeting_id, user_id).await
        else {
            debug!("User {} denied {}: not an active participant", user_id, topic);
            return Err(RelayError::Unauthorized);
        };

        let presence = if topic.is_presence() {
            let members = self
                .registry
                .active_participants(meeting_id)
                .await
                .iter()
                .map(|p| p.presence_member())
                .collect();
            Some(PresenceGrant {
                member: participant.presence_member(),
                members,
            })
        } else {
            None
        };

        Ok(Authorization { topic, presence })
    }
}
