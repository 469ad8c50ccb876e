use crate::error::{MediaError, PeerError};
use crate::event::{EventSender, PeerHandle, SessionEvent};
use crate::platform::{MediaConstraints, Platform};
use crate::web::{WebMediaTrack, WebPeerConnection, js_error_message, media, window};
use async_trait::async_trait;
use huddle_core::IceServerConfig;
use std::time::Duration;
use tracing::warn;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

#[derive(Debug, Clone, Copy, Default)]
pub struct WebPlatform;

/// Resolves once `setTimeout` fires.
async fn timeout(duration: Duration) -> Result<(), JsValue> {
    let window = window()?;
    let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
    let mut scheduled = Ok(0);
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        scheduled =
            window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis);
    });
    scheduled?;
    JsFuture::from(promise).await?;
    Ok(())
}

#[async_trait(?Send)]
impl Platform for WebPlatform {
    type Track = WebMediaTrack;
    type Connection = WebPeerConnection;

    fn create_connection(
        &self,
        handle: PeerHandle,
        ice_servers: &[IceServerConfig],
        events: EventSender<WebMediaTrack>,
    ) -> Result<WebPeerConnection, PeerError> {
        WebPeerConnection::open(handle, ice_servers, events)
            .map_err(|e| PeerError::Operation(js_error_message(&e)))
    }

    async fn user_media(
        &self,
        constraints: MediaConstraints,
    ) -> Result<Vec<WebMediaTrack>, MediaError> {
        media::user_media(constraints).await
    }

    async fn display_media(
        &self,
        events: EventSender<WebMediaTrack>,
    ) -> Result<WebMediaTrack, MediaError> {
        media::display_media(events).await
    }

    async fn sleep(&self, duration: Duration) {
        if let Err(e) = timeout(duration).await {
            warn!("setTimeout failed: {}", js_error_message(&e));
        }
    }

    fn schedule(
        &self,
        delay: Duration,
        events: EventSender<WebMediaTrack>,
        event: SessionEvent<WebMediaTrack>,
    ) {
        wasm_bindgen_futures::spawn_local(async move {
            match timeout(delay).await {
                Ok(()) => {
                    let _ = events.unbounded_send(event);
                }
                Err(e) => warn!("Dropping scheduled event: {}", js_error_message(&e)),
            }
        });
    }
}
