use crate::model::ids::{MeetingId, ParticipantId, UserId};
use crate::model::participant::RosterParticipant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const PARTICIPANT_JOINED_EVENT: &str = "participant.joined";
pub const PARTICIPANT_LEFT_EVENT: &str = "participant.left";
pub const PARTICIPANT_KICKED_EVENT: &str = "participant.kicked";
pub const PARTICIPANT_UPDATED_EVENT: &str = "participant.updated";
pub const MEETING_ENDED_EVENT: &str = "meeting.ended";

/// Identity block carried by `participant.left` and `participant.kicked`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantRef {
    pub participant_id: ParticipantId,
    pub user_id: UserId,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MeetingEnded {
    pub meeting_id: MeetingId,
    pub ended_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ParticipantEnvelope {
    participant: RosterParticipant,
}

/// Membership change notifications delivered over the meeting topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterEvent {
    Joined(RosterParticipant),
    Left(ParticipantRef),
    Kicked(ParticipantRef),
    Updated(RosterParticipant),
    MeetingEnded(MeetingEnded),
}

impl RosterEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            RosterEvent::Joined(_) => PARTICIPANT_JOINED_EVENT,
            RosterEvent::Left(_) => PARTICIPANT_LEFT_EVENT,
            RosterEvent::Kicked(_) => PARTICIPANT_KICKED_EVENT,
            RosterEvent::Updated(_) => PARTICIPANT_UPDATED_EVENT,
            RosterEvent::MeetingEnded(_) => MEETING_ENDED_EVENT,
        }
    }

    /// Only `participant.joined` and `participant.left` go out on the
    /// presence topic; everything goes out on the private topic.
    pub fn is_presence_event(&self) -> bool {
        matches!(self, RosterEvent::Joined(_) | RosterEvent::Left(_))
    }

    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            RosterEvent::Joined(p) | RosterEvent::Updated(p) => Ok(json!({ "participant": p })),
            RosterEvent::Left(r) | RosterEvent::Kicked(r) => serde_json::to_value(r),
            RosterEvent::MeetingEnded(m) => serde_json::to_value(m),
        }
    }

    /// Decodes a roster event; `Ok(None)` when `event` is not a roster event.
    pub fn decode(event: &str, data: &Value) -> Result<Option<Self>, serde_json::Error> {
        let decoded = match event {
            PARTICIPANT_JOINED_EVENT => {
                let env: ParticipantEnvelope = serde_json::from_value(data.clone())?;
                RosterEvent::Joined(env.participant)
            }
            PARTICIPANT_UPDATED_EVENT => {
                let env: ParticipantEnvelope = serde_json::from_value(data.clone())?;
                RosterEvent::Updated(env.participant)
            }
            PARTICIPANT_LEFT_EVENT => RosterEvent::Left(serde_json::from_value(data.clone())?),
            PARTICIPANT_KICKED_EVENT => RosterEvent::Kicked(serde_json::from_value(data.clone())?),
            MEETING_ENDED_EVENT => RosterEvent::MeetingEnded(serde_json::from_value(data.clone())?),
            _ => return Ok(None),
        };
        Ok(Some(decoded))
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            RosterEvent::Joined(p) | RosterEvent::Updated(p) => Some(p.user_id),
            RosterEvent::Left(r) | RosterEvent::Kicked(r) => Some(r.user_id),
            RosterEvent::MeetingEnded(_) => None,
        }
    }
}
