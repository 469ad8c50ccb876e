use huddle_client::{MediaTrack, TrackKind};
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug)]
struct TrackState {
    id: String,
    kind: TrackKind,
    enabled: Cell<bool>,
    stopped: Cell<bool>,
}

/// Capture track stand-in. Clones share state, so a test can keep one and
/// watch what the session does to it.
#[derive(Debug, Clone)]
pub struct MockTrack {
    state: Rc<TrackState>,
}

impl MockTrack {
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            state: Rc::new(TrackState {
                id: id.into(),
                kind,
                enabled: Cell::new(true),
                stopped: Cell::new(false),
            }),
        }
    }

    pub fn audio(id: impl Into<String>) -> Self {
        Self::new(id, TrackKind::Audio)
    }

    pub fn video(id: impl Into<String>) -> Self {
        Self::new(id, TrackKind::Video)
    }

    pub fn is_stopped(&self) -> bool {
        self.state.stopped.get()
    }
}

impl MediaTrack for MockTrack {
    fn id(&self) -> String {
        self.state.id.clone()
    }

    fn kind(&self) -> TrackKind {
        self.state.kind
    }

    fn enabled(&self) -> bool {
        self.state.enabled.get()
    }

    fn set_enabled(&self, enabled: bool) {
        self.state.enabled.set(enabled);
    }

    fn stop(&self) {
        self.state.stopped.set(true);
    }
}
