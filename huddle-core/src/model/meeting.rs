use crate::model::ids::{MeetingId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Scheduled,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MeetingFeatures {
    pub is_chat_enabled: bool,
    pub is_whiteboard_enabled: bool,
    pub is_recording_enabled: bool,
    pub waiting_room_enabled: bool,
}

impl Default for MeetingFeatures {
    fn default() -> Self {
        Self {
            is_chat_enabled: true,
            is_whiteboard_enabled: true,
            is_recording_enabled: true,
            waiting_room_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Meeting {
    pub id: MeetingId,
    pub host_id: UserId,
    pub status: MeetingStatus,
    #[serde(flatten)]
    pub features: MeetingFeatures,
    pub max_participants: u32,
}

impl Meeting {
    /// Signaling traffic is only accepted while the meeting is running.
    pub fn is_active(&self) -> bool {
        self.status == MeetingStatus::Active
    }

    pub fn is_ended(&self) -> bool {
        self.status == MeetingStatus::Ended
    }

    pub fn is_host(&self, user_id: UserId) -> bool {
        self.host_id == user_id
    }
}
