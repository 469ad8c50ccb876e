//! Client side of huddle: per-peer perfect negotiation and the session
//! orchestrator that owns one negotiation engine per remote participant.
//!
//! Runtime specifics sit behind the traits in [`platform`]; the browser
//! implementation is in [`web`] (wasm32 only).

pub mod error;
pub mod event;
pub mod negotiation;
pub mod platform;
pub mod session;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use error::{MediaError, NegotiationError, PeerError, RelayClientError};
pub use event::{EventReceiver, EventSender, PeerHandle, SessionEvent, event_queue};
pub use negotiation::{
    BitrateTier, NegotiationCounters, NegotiationState, PeerSession, Transition, VideoEncoding,
    Visibility, is_polite,
};
pub use platform::{
    ConnectionState, LocalDescription, MediaConstraints, MediaTrack, PeerConnection, Platform,
    RelayClient, SessionDescription, TrackKind,
};
pub use session::{EndReason, NoopObserver, Session, SessionConfig, SessionObserver};
