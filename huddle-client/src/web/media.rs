use crate::error::MediaError;
use crate::event::{EventSender, SessionEvent};
use crate::platform::{MediaConstraints, MediaTrack, TrackKind};
use crate::web::{js_error_message, js_error_name, window};
use serde::Serialize;
use serde_json::json;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{MediaDevices, MediaStream, MediaStreamConstraints, MediaStreamTrack};

/// A browser track together with the stream it travels in.
#[derive(Debug, Clone)]
pub struct WebMediaTrack {
    track: MediaStreamTrack,
    stream: MediaStream,
}

impl WebMediaTrack {
    pub fn new(track: MediaStreamTrack, stream: MediaStream) -> Self {
        Self { track, stream }
    }

    pub fn track(&self) -> &MediaStreamTrack {
        &self.track
    }

    pub fn stream(&self) -> &MediaStream {
        &self.stream
    }
}

impl MediaTrack for WebMediaTrack {
    fn id(&self) -> String {
        self.track.id()
    }

    fn kind(&self) -> TrackKind {
        if self.track.kind() == "audio" {
            TrackKind::Audio
        } else {
            TrackKind::Video
        }
    }

    fn enabled(&self) -> bool {
        self.track.enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        self.track.set_enabled(enabled);
    }

    fn stop(&self) {
        self.track.stop();
    }
}

fn media_error(err: JsValue) -> MediaError {
    let message = js_error_message(&err);
    match js_error_name(&err).as_deref() {
        Some("NotReadableError" | "NotFoundError" | "OverconstrainedError") => {
            MediaError::DeviceUnavailable(message)
        }
        Some("NotAllowedError" | "SecurityError") => MediaError::PermissionDenied(message),
        _ => MediaError::Other(message),
    }
}

fn to_js(value: &serde_json::Value) -> Result<JsValue, MediaError> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| MediaError::Other(e.to_string()))
}

fn audio_constraints(enabled: bool) -> Result<JsValue, MediaError> {
    if !enabled {
        return Ok(JsValue::FALSE);
    }
    to_js(&json!({
        "echoCancellation": true,
        "noiseSuppression": true,
        "autoGainControl": true,
    }))
}

fn video_constraints(enabled: bool) -> Result<JsValue, MediaError> {
    if !enabled {
        return Ok(JsValue::FALSE);
    }
    to_js(&json!({
        "width": { "ideal": 1280, "max": 1920 },
        "height": { "ideal": 720, "max": 1080 },
        "frameRate": { "ideal": 30, "max": 30 },
        "facingMode": "user",
    }))
}

fn media_devices() -> Result<MediaDevices, MediaError> {
    window()
        .and_then(|w| w.navigator().media_devices())
        .map_err(media_error)
}

async fn await_stream(promise: js_sys::Promise) -> Result<MediaStream, MediaError> {
    JsFuture::from(promise)
        .await
        .map_err(media_error)?
        .dyn_into::<MediaStream>()
        .map_err(media_error)
}

pub(crate) async fn user_media(
    constraints: MediaConstraints,
) -> Result<Vec<WebMediaTrack>, MediaError> {
    let devices = media_devices()?;
    let request = MediaStreamConstraints::new();
    request.set_audio(&audio_constraints(constraints.audio)?);
    request.set_video(&video_constraints(constraints.video)?);

    let promise = devices
        .get_user_media_with_constraints(&request)
        .map_err(media_error)?;
    let stream = await_stream(promise).await?;

    Ok(stream
        .get_tracks()
        .iter()
        .filter_map(|t| t.dyn_into::<MediaStreamTrack>().ok())
        .map(|track| WebMediaTrack::new(track, stream.clone()))
        .collect())
}

pub(crate) async fn display_media(
    events: EventSender<WebMediaTrack>,
) -> Result<WebMediaTrack, MediaError> {
    let devices = media_devices()?;
    let promise = devices.get_display_media().map_err(media_error)?;
    let stream = await_stream(promise).await?;

    let track = stream
        .get_video_tracks()
        .get(0)
        .dyn_into::<MediaStreamTrack>()
        .map_err(|_| MediaError::Other("display capture returned no video track".to_string()))?;

    // the browser's own "stop sharing" button ends the track
    let track_id = track.id();
    let onended = Closure::wrap(Box::new(move || {
        let _ = events.unbounded_send(SessionEvent::ScreenShareEnded(track_id.clone()));
    }) as Box<dyn FnMut()>);
    track.set_onended(Some(onended.as_ref().unchecked_ref()));
    onended.forget();

    Ok(WebMediaTrack::new(track, stream))
}
