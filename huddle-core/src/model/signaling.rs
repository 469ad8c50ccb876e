use crate::model::ids::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SIGNAL_EVENT: &str = "webrtc.signal";
pub const ICE_CANDIDATE_EVENT: &str = "webrtc.ice-candidate";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: url.into(),
            username: None,
            credential: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServersResponse {
    #[serde(rename = "iceServers")]
    pub ice_servers: Vec<IceServerConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

impl SdpType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "offer" => Some(Self::Offer),
            "answer" => Some(Self::Answer),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Answer => "answer",
        }
    }
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Candidate descriptor in the browser's `RTCIceCandidateInit` JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IceCandidateInit {
    #[serde(default)]
    pub candidate: String,
    #[serde(rename = "sdpMid", default)]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_m_line_index: Option<u16>,
}

impl IceCandidateInit {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
        }
    }
}

/// Body of `POST /meetings/{id}/signal`. `kind` and `sdp` stay loosely typed
/// so the relay can reject bad values with its own validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRequest {
    pub target_user_id: UserId,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub sdp: String,
}

impl SignalRequest {
    pub fn new(target_user_id: UserId, kind: SdpType, sdp: String) -> Self {
        Self {
            target_user_id,
            kind: kind.as_str().to_string(),
            sdp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidateRequest {
    pub target_user_id: UserId,
    pub candidate: IceCandidateInit,
}

/// Payload of a `webrtc.signal` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPayload {
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub from_user_name: String,
    #[serde(rename = "type")]
    pub kind: SdpType,
    pub sdp: String,
}

/// Payload of a `webrtc.ice-candidate` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidatePayload {
    pub from_user_id: UserId,
    pub to_user_id: UserId,
    pub candidate: IceCandidateInit,
}
