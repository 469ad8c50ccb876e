use crate::platform::ConnectionState;
use futures::channel::mpsc;
use huddle_core::{IceCandidateInit, ServerFrame, UserId};
use std::fmt;

/// Identifies one connection attempt to one remote user. A peer that is
/// discarded and recreated gets a new `connection` number, so events still
/// in flight from the old connection can be told apart and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerHandle {
    pub remote_user: UserId,
    pub connection: u64,
}

impl fmt::Display for PeerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer {}#{}", self.remote_user, self.connection)
    }
}

/// Everything the session loop reacts to. Platform callbacks and the
/// meeting channel feed this queue; the session drains it one event at a
/// time.
#[derive(Debug)]
pub enum SessionEvent<T> {
    /// A frame from one of the meeting topics.
    Channel(ServerFrame),
    NegotiationNeeded(PeerHandle),
    LocalCandidate(PeerHandle, IceCandidateInit),
    ConnectionStateChanged(PeerHandle, ConnectionState),
    RemoteTrack(PeerHandle, T),
    /// The screen share with this track id was ended outside the app.
    ScreenShareEnded(String),
    /// Scheduled reconnect after a desynchronized peer was discarded.
    Reconnect(UserId),
}

pub type EventSender<T> = mpsc::UnboundedSender<SessionEvent<T>>;
pub type EventReceiver<T> = mpsc::UnboundedReceiver<SessionEvent<T>>;

pub fn event_queue<T>() -> (EventSender<T>, EventReceiver<T>) {
    mpsc::unbounded()
}
