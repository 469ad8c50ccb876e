//! Seams between the session logic and the runtime it drives.
//!
//! The browser backend lives in `crate::web`; tests supply their own.

use crate::error::{MediaError, PeerError, RelayClientError};
use crate::event::{EventSender, PeerHandle, SessionEvent};
use crate::negotiation::{NegotiationState, VideoEncoding};
use async_trait::async_trait;
use huddle_core::{
    IceCandidateInit, IceCandidateRequest, IceServerConfig, MeetingId, SdpType, SignalRequest,
};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// A decoded (plain text) session description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub kind: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn new(kind: SdpType, sdp: impl Into<String>) -> Self {
        Self {
            kind,
            sdp: sdp.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalDescription {
    /// Offer in `stable`, answer in `have-remote-offer`.
    Implicit,
    Rollback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

pub trait MediaTrack {
    fn id(&self) -> String;
    fn kind(&self) -> TrackKind;
    fn enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool);
    /// Releases the capture device. A stopped track cannot be restarted.
    fn stop(&self);
}

/// One underlying peer connection, owned by exactly one peer session.
///
/// Implementations report asynchronous happenings (negotiation needed,
/// local candidates, connection state, remote tracks) through the event
/// sender handed to [`Platform::create_connection`].
#[async_trait(?Send)]
pub trait PeerConnection {
    type Track: MediaTrack;

    fn connection_state(&self) -> ConnectionState;

    /// Offer/answer state as the connection itself reports it.
    fn signaling_state(&self) -> NegotiationState;

    /// Applies a local description. Returns the description that was set,
    /// or `None` for a rollback.
    async fn set_local_description(
        &self,
        action: LocalDescription,
    ) -> Result<Option<SessionDescription>, PeerError>;

    async fn set_remote_description(&self, description: SessionDescription)
    -> Result<(), PeerError>;

    async fn add_ice_candidate(&self, candidate: &IceCandidateInit) -> Result<(), PeerError>;

    fn restart_ice(&self);

    fn add_track(&self, track: &Self::Track) -> Result<(), PeerError>;

    fn has_sender(&self, kind: TrackKind) -> bool;

    /// Swaps the track on the existing sender of `kind` without
    /// renegotiating.
    async fn replace_track(
        &self,
        kind: TrackKind,
        track: Option<&Self::Track>,
    ) -> Result<(), PeerError>;

    /// Returns `false` when there is no video sender to apply it to.
    async fn set_video_encoding(&self, encoding: VideoEncoding) -> Result<bool, PeerError>;

    fn close(&self);
}

#[async_trait(?Send)]
pub trait Platform {
    type Track: MediaTrack + Clone + 'static;
    type Connection: PeerConnection<Track = Self::Track>;

    fn create_connection(
        &self,
        handle: PeerHandle,
        ice_servers: &[IceServerConfig],
        events: EventSender<Self::Track>,
    ) -> Result<Self::Connection, PeerError>;

    async fn user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Vec<Self::Track>, MediaError>;

    /// Captures a screen. The platform reports the OS-level end of the
    /// share as [`SessionEvent::ScreenShareEnded`].
    async fn display_media(
        &self,
        events: EventSender<Self::Track>,
    ) -> Result<Self::Track, MediaError>;

    async fn sleep(&self, duration: Duration);

    /// Delivers `event` to `events` after `delay`.
    fn schedule(
        &self,
        delay: Duration,
        events: EventSender<Self::Track>,
        event: SessionEvent<Self::Track>,
    );
}

/// Client side of the HTTP signaling relay.
#[async_trait(?Send)]
pub trait RelayClient {
    async fn send_signal(
        &self,
        meeting_id: MeetingId,
        request: SignalRequest,
    ) -> Result<(), RelayClientError>;

    async fn send_ice_candidate(
        &self,
        meeting_id: MeetingId,
        request: IceCandidateRequest,
    ) -> Result<(), RelayClientError>;

    async fn ice_servers(
        &self,
        meeting_id: MeetingId,
    ) -> Result<Vec<IceServerConfig>, RelayClientError>;
}
