use huddle_core::MediaFlags;
use serde::{Deserialize, Serialize};

/// Partial update of a participant's media flags. `None` leaves the flag
/// untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUpdate {
    #[serde(default)]
    pub is_muted: Option<bool>,
    #[serde(default)]
    pub is_video_off: Option<bool>,
    #[serde(default)]
    pub is_hand_raised: Option<bool>,
    #[serde(default)]
    pub is_screen_sharing: Option<bool>,
}

impl MediaUpdate {
    pub fn is_empty(&self) -> bool {
        self.is_muted.is_none()
            && self.is_video_off.is_none()
            && self.is_hand_raised.is_none()
            && self.is_screen_sharing.is_none()
    }

    pub fn starts_screen_share(&self) -> bool {
        self.is_screen_sharing == Some(true)
    }

    pub fn apply(&self, flags: &mut MediaFlags) {
        if let Some(v) = self.is_muted {
            flags.is_muted = v;
        }
        if let Some(v) = self.is_video_off {
            flags.is_video_off = v;
        }
        if let Some(v) = self.is_hand_raised {
            flags.is_hand_raised = v;
        }
        if let Some(v) = self.is_screen_sharing {
            flags.is_screen_sharing = v;
        }
    }
}
