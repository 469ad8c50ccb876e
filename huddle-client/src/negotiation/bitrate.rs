use serde::Serialize;
use std::fmt;

/// How prominently a remote participant is shown locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Visibility {
    #[default]
    Hidden,
    Visible,
    /// Active speaker, screen sharer or raised hand.
    Priority,
}

/// Outgoing video quality tiers, ordered `Minimal < Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum BitrateTier {
    Minimal,
    Low,
    Medium,
    #[default]
    High,
}

/// Sender encoding parameters, serialized in the browser's
/// `RTCRtpEncodingParameters` shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEncoding {
    pub max_bitrate: u32,
    pub max_framerate: u32,
    pub scale_resolution_down_by: f64,
}

impl BitrateTier {
    pub const ALL: [BitrateTier; 4] = [
        BitrateTier::Minimal,
        BitrateTier::Low,
        BitrateTier::Medium,
        BitrateTier::High,
    ];

    pub fn for_visibility(visibility: Visibility) -> Self {
        match visibility {
            Visibility::Priority => BitrateTier::High,
            Visibility::Visible => BitrateTier::Medium,
            Visibility::Hidden => BitrateTier::Minimal,
        }
    }

    pub fn encoding(self) -> VideoEncoding {
        let (max_bitrate, max_framerate, scale_resolution_down_by) = match self {
            BitrateTier::High => (2_500_000, 30, 1.0),
            BitrateTier::Medium => (1_000_000, 24, 1.0),
            BitrateTier::Low => (500_000, 15, 2.0),
            BitrateTier::Minimal => (150_000, 10, 4.0),
        };
        VideoEncoding {
            max_bitrate,
            max_framerate,
            scale_resolution_down_by,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BitrateTier::Minimal => "minimal",
            BitrateTier::Low => "low",
            BitrateTier::Medium => "medium",
            BitrateTier::High => "high",
        }
    }
}

impl fmt::Display for BitrateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
