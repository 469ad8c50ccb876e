//! Browser backend: `RTCPeerConnection`, `MediaDevices`, `fetch`,
//! `WebSocket` and `setTimeout` through web-sys.

mod channel;
mod connection;
mod logger;
pub(crate) mod media;
mod platform;
mod relay;

pub use channel::MeetingChannel;
pub use connection::WebPeerConnection;
pub use logger::{ConsoleMakeWriter, init_logging};
pub use media::WebMediaTrack;
pub use platform::WebPlatform;
pub use relay::FetchRelayClient;

use wasm_bindgen::{JsCast, JsValue};

pub(crate) fn js_error_message(err: &JsValue) -> String {
    if let Some(text) = err.as_string() {
        return text;
    }
    js_sys::Reflect::get(err, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{err:?}"))
}

/// `DOMException.name`, e.g. `NotReadableError`.
pub(crate) fn js_error_name(err: &JsValue) -> Option<String> {
    js_sys::Reflect::get(err, &JsValue::from_str("name"))
        .ok()
        .and_then(|n| n.as_string())
}

/// Calls `target[name](...args)` for methods web-sys does not bind.
pub(crate) fn call_method(
    target: &JsValue,
    name: &str,
    args: &js_sys::Array,
) -> Result<JsValue, JsValue> {
    let method: js_sys::Function =
        js_sys::Reflect::get(target, &JsValue::from_str(name))?.dyn_into()?;
    method.apply(target, args)
}

pub(crate) fn window() -> Result<web_sys::Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))
}
