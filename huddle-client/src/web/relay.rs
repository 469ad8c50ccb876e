use crate::error::RelayClientError;
use crate::platform::RelayClient;
use crate::web::{js_error_message, window};
use async_trait::async_trait;
use huddle_core::utils::USER_ID_HEADER;
use huddle_core::{
    IceCandidateRequest, IceServerConfig, IceServersResponse, MeetingId, SignalRequest, UserId,
};
use serde::Serialize;
use tracing::debug;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, RequestMode, Response};

fn transport(err: JsValue) -> RelayClientError {
    RelayClientError::Transport(js_error_message(&err))
}

/// Talks to the signaling relay over `fetch`.
#[derive(Debug, Clone)]
pub struct FetchRelayClient {
    base_url: String,
    user_id: UserId,
}

impl FetchRelayClient {
    pub fn new(base_url: impl Into<String>, user_id: UserId) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id,
        }
    }

    async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<String>,
    ) -> Result<String, RelayClientError> {
        let headers = Headers::new().map_err(transport)?;
        headers
            .set(USER_ID_HEADER, &self.user_id.to_string())
            .map_err(transport)?;
        headers.set("Accept", "application/json").map_err(transport)?;

        let init = RequestInit::new();
        init.set_method(method);
        init.set_mode(RequestMode::Cors);
        if let Some(body) = &body {
            headers
                .set("Content-Type", "application/json")
                .map_err(transport)?;
            init.set_body(&JsValue::from_str(body));
        }
        init.set_headers(&headers);

        let url = format!("{}{}", self.base_url, path);
        let request = Request::new_with_str_and_init(&url, &init).map_err(transport)?;
        let response: Response = JsFuture::from(window().map_err(transport)?.fetch_with_request(&request))
            .await
            .map_err(transport)?
            .dyn_into()
            .map_err(transport)?;
        let text = JsFuture::from(response.text().map_err(transport)?)
            .await
            .map_err(transport)?
            .as_string()
            .unwrap_or_default();

        if !response.ok() {
            let message = serde_json::from_str::<serde_json::Value>(&text)
                .ok()
                .and_then(|v| v["message"].as_str().map(str::to_string))
                .unwrap_or(text);
            debug!("{} {} rejected with {}", method, path, response.status());
            return Err(RelayClientError::Rejected {
                status: response.status(),
                message,
            });
        }
        Ok(text)
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<(), RelayClientError> {
        let body = serde_json::to_string(body).map_err(|e| RelayClientError::Decode(e.to_string()))?;
        self.request("POST", path, Some(body)).await.map(|_| ())
    }
}

#[async_trait(?Send)]
impl RelayClient for FetchRelayClient {
    async fn send_signal(
        &self,
        meeting_id: MeetingId,
        request: SignalRequest,
    ) -> Result<(), RelayClientError> {
        self.post(&format!("/meetings/{meeting_id}/signal"), &request)
            .await
    }

    async fn send_ice_candidate(
        &self,
        meeting_id: MeetingId,
        request: IceCandidateRequest,
    ) -> Result<(), RelayClientError> {
        self.post(&format!("/meetings/{meeting_id}/ice-candidate"), &request)
            .await
    }

    async fn ice_servers(
        &self,
        meeting_id: MeetingId,
    ) -> Result<Vec<IceServerConfig>, RelayClientError> {
        let text = self
            .request("GET", &format!("/meetings/{meeting_id}/ice-servers"), None)
            .await?;
        let response: IceServersResponse =
            serde_json::from_str(&text).map_err(|e| RelayClientError::Decode(e.to_string()))?;
        Ok(response.ice_servers)
    }
}
