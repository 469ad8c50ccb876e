use crate::event::{EventSender, SessionEvent};
use crate::web::{WebMediaTrack, js_error_message};
use huddle_core::{ClientFrame, MeetingId, ServerFrame, Topic};
use tracing::{error, info, warn};
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use web_sys::{MessageEvent, WebSocket};

/// Socket subscribed to a meeting's presence and private topics. Every
/// frame it receives lands in the session's event queue.
pub struct MeetingChannel {
    ws: WebSocket,
}

impl MeetingChannel {
    pub fn connect(
        url: &str,
        meeting_id: MeetingId,
        events: EventSender<WebMediaTrack>,
    ) -> Result<Self, JsValue> {
        let ws = WebSocket::new(url)?;
        let topics = [Topic::presence(meeting_id), Topic::private(meeting_id)];

        let onopen = {
            let ws = ws.clone();
            Closure::wrap(Box::new(move |_: JsValue| {
                info!("Meeting channel open");
                for topic in topics {
                    let frame = ClientFrame::Subscribe {
                        topic: topic.to_string(),
                    };
                    match serde_json::to_string(&frame) {
                        Ok(json) => {
                            if let Err(e) = ws.send_with_str(&json) {
                                warn!("Subscribe to {} failed: {}", topic, js_error_message(&e));
                            }
                        }
                        Err(e) => error!("Failed to serialize subscribe frame: {}", e),
                    }
                }
            }) as Box<dyn FnMut(JsValue)>)
        };
        ws.set_onopen(Some(onopen.as_ref().unchecked_ref()));
        onopen.forget();

        let onmessage = Closure::wrap(Box::new(move |e: MessageEvent| {
            let Some(text) = e.data().as_string() else {
                return;
            };
            match serde_json::from_str::<ServerFrame>(&text) {
                Ok(frame) => {
                    let _ = events.unbounded_send(SessionEvent::Channel(frame));
                }
                Err(e) => warn!("Invalid server frame: {}", e),
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        ws.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        onmessage.forget();

        let onclose = Closure::wrap(Box::new(move |_: JsValue| {
            info!("Meeting channel closed");
        }) as Box<dyn FnMut(JsValue)>);
        ws.set_onclose(Some(onclose.as_ref().unchecked_ref()));
        onclose.forget();

        Ok(Self { ws })
    }

    pub fn close(&self) {
        if let Err(e) = self.ws.close() {
            warn!("Closing meeting channel failed: {}", js_error_message(&e));
        }
    }
}

impl Drop for MeetingChannel {
    fn drop(&mut self) {
        self.close();
    }
}
