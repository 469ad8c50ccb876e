use crate::model::ids::{MeetingId, ParticipantId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Role {
    #[serde(rename = "host")]
    Host,
    #[serde(rename = "co-host")]
    CoHost,
    #[serde(rename = "participant")]
    Participant,
}

impl Role {
    pub fn can_manage(self) -> bool {
        matches!(self, Role::Host | Role::CoHost)
    }
}

/// Transient per-session media state. `Default` is the clean state a
/// participant gets on every (re)join.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaFlags {
    pub is_muted: bool,
    pub is_video_off: bool,
    pub is_screen_sharing: bool,
    pub is_hand_raised: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub id: ParticipantId,
    pub meeting_id: MeetingId,
    pub user_id: UserId,
    pub display_name: String,
    pub role: Role,
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub flags: MediaFlags,
    pub is_in_waiting_room: bool,
    pub joined_at: Option<DateTime<Utc>>,
    pub left_at: Option<DateTime<Utc>>,
}

impl Participant {
    pub fn is_active(&self) -> bool {
        self.joined_at.is_some() && self.left_at.is_none()
    }

    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }

    pub fn can_manage(&self) -> bool {
        self.role.can_manage()
    }

    pub fn roster_entry(&self) -> RosterParticipant {
        RosterParticipant {
            id: self.id,
            user_id: self.user_id,
            display_name: self.display_name.clone(),
            role: self.role,
            avatar: self.avatar.clone(),
            flags: self.flags,
        }
    }

    pub fn presence_member(&self) -> PresenceMember {
        PresenceMember {
            id: self.user_id,
            name: self.display_name.clone(),
            role: self.role,
            avatar: self.avatar.clone(),
            flags: self.flags,
        }
    }
}

/// Participant as carried by `participant.joined` / `participant.updated`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterParticipant {
    pub id: ParticipantId,
    pub user_id: UserId,
    pub display_name: String,
    pub role: Role,
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub flags: MediaFlags,
}

/// Public member info handed out when a presence topic subscription is
/// authorized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenceMember {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    pub avatar: Option<String>,
    #[serde(flatten)]
    pub flags: MediaFlags,
}
