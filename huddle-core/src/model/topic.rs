use crate::model::ids::MeetingId;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const PRIVATE_PREFIX: &str = "meeting.";
const PRESENCE_PREFIX: &str = "presence-meeting.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopicError {
    #[error("unknown topic: {0}")]
    Unknown(String),

    #[error("invalid meeting id in topic: {0}")]
    InvalidMeetingId(String),
}

/// Per-meeting broadcast topics. `Private` carries signaling and roster
/// events, `Presence` additionally exposes the member list on subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Private(MeetingId),
    Presence(MeetingId),
}

impl Topic {
    pub fn private(meeting_id: MeetingId) -> Self {
        Topic::Private(meeting_id)
    }

    pub fn presence(meeting_id: MeetingId) -> Self {
        Topic::Presence(meeting_id)
    }

    pub fn meeting_id(&self) -> MeetingId {
        match self {
            Topic::Private(id) | Topic::Presence(id) => *id,
        }
    }

    pub fn is_presence(&self) -> bool {
        matches!(self, Topic::Presence(_))
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Private(id) => write!(f, "{PRIVATE_PREFIX}{id}"),
            Topic::Presence(id) => write!(f, "{PRESENCE_PREFIX}{id}"),
        }
    }
}

impl FromStr for Topic {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ctor, rest): (fn(MeetingId) -> Topic, &str) =
            if let Some(rest) = s.strip_prefix(PRESENCE_PREFIX) {
                (Topic::Presence, rest)
            } else if let Some(rest) = s.strip_prefix(PRIVATE_PREFIX) {
                (Topic::Private, rest)
            } else {
                return Err(TopicError::Unknown(s.to_string()));
            };

        let id = rest
            .parse::<u64>()
            .map_err(|_| TopicError::InvalidMeetingId(s.to_string()))?;
        Ok(ctor(MeetingId(id)))
    }
}
