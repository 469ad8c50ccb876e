use crate::model::participant::PresenceMember;
use crate::model::roster::RosterEvent;
use crate::model::signaling::{
    ICE_CANDIDATE_EVENT, IceCandidatePayload, SIGNAL_EVENT, SignalPayload,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const SUBSCRIPTION_SUCCEEDED_EVENT: &str = "subscription_succeeded";
pub const SUBSCRIPTION_ERROR_EVENT: &str = "subscription_error";

/// Frames a client sends over the realtime socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ClientFrame {
    Subscribe { topic: String },
    Unsubscribe { topic: String },
}

/// Every server-to-client frame: an event name, the topic it was published
/// on and the event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFrame {
    pub event: String,
    pub topic: String,
    #[serde(default)]
    pub data: Value,
}

impl ServerFrame {
    pub fn new(event: impl Into<String>, topic: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            topic: topic.into(),
            data,
        }
    }

    pub fn subscription_succeeded(topic: impl Into<String>, members: Option<&[PresenceMember]>) -> Self {
        let data = match members {
            Some(members) => json!({ "members": members }),
            None => json!({}),
        };
        Self::new(SUBSCRIPTION_SUCCEEDED_EVENT, topic, data)
    }

    pub fn subscription_error(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            SUBSCRIPTION_ERROR_EVENT,
            topic,
            json!({ "message": message.into() }),
        )
    }
}

#[derive(Debug, Deserialize)]
struct SubscribedData {
    #[serde(default)]
    members: Vec<PresenceMember>,
}

#[derive(Debug, Deserialize)]
struct ErrorData {
    #[serde(default)]
    message: String,
}

/// Typed view of a [`ServerFrame`] as seen by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Signal(SignalPayload),
    IceCandidate(IceCandidatePayload),
    Roster(RosterEvent),
    Subscribed {
        topic: String,
        members: Vec<PresenceMember>,
    },
    SubscriptionFailed {
        topic: String,
        message: String,
    },
}

impl ChannelEvent {
    /// `Ok(None)` for events this side does not understand.
    pub fn from_frame(frame: &ServerFrame) -> Result<Option<Self>, serde_json::Error> {
        let event = match frame.event.as_str() {
            SIGNAL_EVENT => ChannelEvent::Signal(serde_json::from_value(frame.data.clone())?),
            ICE_CANDIDATE_EVENT => {
                ChannelEvent::IceCandidate(serde_json::from_value(frame.data.clone())?)
            }
            SUBSCRIPTION_SUCCEEDED_EVENT => {
                let data: SubscribedData = serde_json::from_value(frame.data.clone())?;
                ChannelEvent::Subscribed {
                    topic: frame.topic.clone(),
                    members: data.members,
                }
            }
            SUBSCRIPTION_ERROR_EVENT => {
                let data: ErrorData = serde_json::from_value(frame.data.clone())?;
                ChannelEvent::SubscriptionFailed {
                    topic: frame.topic.clone(),
                    message: data.message,
                }
            }
            other => match RosterEvent::decode(other, &frame.data)? {
                Some(roster) => ChannelEvent::Roster(roster),
                None => return Ok(None),
            },
        };
        Ok(Some(event))
    }
}
