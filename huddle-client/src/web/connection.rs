use crate::error::PeerError;
use crate::event::{EventSender, PeerHandle, SessionEvent};
use crate::negotiation::{NegotiationState, VideoEncoding};
use crate::platform::{
    ConnectionState, LocalDescription, MediaTrack, PeerConnection, SessionDescription, TrackKind,
};
use crate::web::{WebMediaTrack, call_method, js_error_message, js_error_name};
use async_trait::async_trait;
use huddle_core::{IceCandidateInit, IceServerConfig, SdpType};
use js_sys::{Array, Object, Reflect};
use std::cell::RefCell;
use tracing::warn;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    MediaStream, RtcConfiguration, RtcIceCandidateInit, RtcIceServer, RtcPeerConnection,
    RtcPeerConnectionIceEvent, RtcPeerConnectionState, RtcRtpSender, RtcSdpType,
    RtcSessionDescriptionInit, RtcSignalingState, RtcTrackEvent,
};

pub struct WebPeerConnection {
    pc: RtcPeerConnection,
    audio_sender: RefCell<Option<RtcRtpSender>>,
    video_sender: RefCell<Option<RtcRtpSender>>,
}

fn peer_error(err: JsValue) -> PeerError {
    let message = js_error_message(&err);
    if message.contains("m-line") {
        return PeerError::DescriptionMismatch(message);
    }
    match js_error_name(&err).as_deref() {
        Some("InvalidStateError") => PeerError::InvalidState(message),
        _ => PeerError::Operation(message),
    }
}

fn map_state(state: RtcPeerConnectionState) -> ConnectionState {
    match state {
        RtcPeerConnectionState::Connecting => ConnectionState::Connecting,
        RtcPeerConnectionState::Connected => ConnectionState::Connected,
        RtcPeerConnectionState::Disconnected => ConnectionState::Disconnected,
        RtcPeerConnectionState::Failed => ConnectionState::Failed,
        RtcPeerConnectionState::Closed => ConnectionState::Closed,
        _ => ConnectionState::New,
    }
}

fn rtc_sdp_type(kind: SdpType) -> RtcSdpType {
    match kind {
        SdpType::Offer => RtcSdpType::Offer,
        SdpType::Answer => RtcSdpType::Answer,
    }
}

impl WebPeerConnection {
    pub(crate) fn open(
        handle: PeerHandle,
        ice_servers: &[IceServerConfig],
        events: EventSender<WebMediaTrack>,
    ) -> Result<Self, JsValue> {
        let rtc_config = RtcConfiguration::new();
        let servers = Array::new();
        for server in ice_servers {
            let rtc_ice_server = RtcIceServer::new();
            rtc_ice_server.set_urls(&JsValue::from_str(&server.urls));
            if let Some(username) = &server.username {
                rtc_ice_server.set_username(username);
            }
            if let Some(credential) = &server.credential {
                rtc_ice_server.set_credential(credential);
            }
            servers.push(&rtc_ice_server);
        }
        rtc_config.set_ice_servers(&servers);

        let pc = RtcPeerConnection::new_with_configuration(&rtc_config)?;

        let tx = events.clone();
        let onnegotiationneeded = Closure::wrap(Box::new(move || {
            let _ = tx.unbounded_send(SessionEvent::NegotiationNeeded(handle));
        }) as Box<dyn FnMut()>);
        pc.set_onnegotiationneeded(Some(onnegotiationneeded.as_ref().unchecked_ref()));
        onnegotiationneeded.forget();

        let tx = events.clone();
        let onice = Closure::wrap(Box::new(move |ev: RtcPeerConnectionIceEvent| {
            let Some(candidate) = ev.candidate() else {
                return;
            };
            let init = IceCandidateInit {
                candidate: candidate.candidate(),
                sdp_mid: candidate.sdp_mid(),
                sdp_m_line_index: candidate.sdp_m_line_index(),
            };
            // empty string marks end-of-candidates
            if init.candidate.is_empty() {
                return;
            }
            let _ = tx.unbounded_send(SessionEvent::LocalCandidate(handle, init));
        }) as Box<dyn FnMut(RtcPeerConnectionIceEvent)>);
        pc.set_onicecandidate(Some(onice.as_ref().unchecked_ref()));
        onice.forget();

        let tx = events.clone();
        let state_source = pc.clone();
        let onstate = Closure::wrap(Box::new(move || {
            let state = map_state(state_source.connection_state());
            let _ = tx.unbounded_send(SessionEvent::ConnectionStateChanged(handle, state));
        }) as Box<dyn FnMut()>);
        pc.set_onconnectionstatechange(Some(onstate.as_ref().unchecked_ref()));
        onstate.forget();

        let tx = events;
        let ontrack = Closure::wrap(Box::new(move |ev: RtcTrackEvent| {
            let track = ev.track();
            let stream = match ev.streams().get(0).dyn_into::<MediaStream>() {
                Ok(stream) => stream,
                Err(_) => match MediaStream::new() {
                    Ok(stream) => {
                        stream.add_track(&track);
                        stream
                    }
                    Err(e) => {
                        warn!("Dropping remote track from {}: {}", handle, js_error_message(&e));
                        return;
                    }
                },
            };
            let _ = tx.unbounded_send(SessionEvent::RemoteTrack(
                handle,
                WebMediaTrack::new(track, stream),
            ));
        }) as Box<dyn FnMut(RtcTrackEvent)>);
        pc.set_ontrack(Some(ontrack.as_ref().unchecked_ref()));
        ontrack.forget();

        Ok(Self {
            pc,
            audio_sender: RefCell::new(None),
            video_sender: RefCell::new(None),
        })
    }

    pub fn raw(&self) -> &RtcPeerConnection {
        &self.pc
    }

    fn sender(&self, kind: TrackKind) -> &RefCell<Option<RtcRtpSender>> {
        match kind {
            TrackKind::Audio => &self.audio_sender,
            TrackKind::Video => &self.video_sender,
        }
    }
}

#[async_trait(?Send)]
impl PeerConnection for WebPeerConnection {
    type Track = WebMediaTrack;

    fn connection_state(&self) -> ConnectionState {
        map_state(self.pc.connection_state())
    }

    fn signaling_state(&self) -> NegotiationState {
        match self.pc.signaling_state() {
            RtcSignalingState::HaveLocalOffer | RtcSignalingState::HaveLocalPranswer => {
                NegotiationState::HaveLocalOffer
            }
            RtcSignalingState::HaveRemoteOffer | RtcSignalingState::HaveRemotePranswer => {
                NegotiationState::HaveRemoteOffer
            }
            _ => NegotiationState::Stable,
        }
    }

    async fn set_local_description(
        &self,
        action: LocalDescription,
    ) -> Result<Option<SessionDescription>, PeerError> {
        match action {
            LocalDescription::Rollback => {
                let init = RtcSessionDescriptionInit::new(RtcSdpType::Rollback);
                JsFuture::from(self.pc.set_local_description(&init))
                    .await
                    .map_err(peer_error)?;
                Ok(None)
            }
            LocalDescription::Implicit => {
                let (kind, promise) = match self.pc.signaling_state() {
                    RtcSignalingState::HaveRemoteOffer => (SdpType::Answer, self.pc.create_answer()),
                    _ => (SdpType::Offer, self.pc.create_offer()),
                };
                let created = JsFuture::from(promise).await.map_err(peer_error)?;
                let sdp = Reflect::get(&created, &JsValue::from_str("sdp"))
                    .ok()
                    .and_then(|v| v.as_string())
                    .ok_or_else(|| {
                        PeerError::Operation("created description carries no sdp".to_string())
                    })?;

                let init = RtcSessionDescriptionInit::new(rtc_sdp_type(kind));
                init.set_sdp(&sdp);
                JsFuture::from(self.pc.set_local_description(&init))
                    .await
                    .map_err(peer_error)?;
                Ok(Some(SessionDescription::new(kind, sdp)))
            }
        }
    }

    async fn set_remote_description(
        &self,
        description: SessionDescription,
    ) -> Result<(), PeerError> {
        let init = RtcSessionDescriptionInit::new(rtc_sdp_type(description.kind));
        init.set_sdp(&description.sdp);
        JsFuture::from(self.pc.set_remote_description(&init))
            .await
            .map_err(peer_error)?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: &IceCandidateInit) -> Result<(), PeerError> {
        let init = RtcIceCandidateInit::new(&candidate.candidate);
        init.set_sdp_mid(candidate.sdp_mid.as_deref());
        init.set_sdp_m_line_index(candidate.sdp_m_line_index);
        JsFuture::from(
            self.pc
                .add_ice_candidate_with_opt_rtc_ice_candidate_init(Some(&init)),
        )
        .await
        .map_err(peer_error)?;
        Ok(())
    }

    fn restart_ice(&self) {
        if let Err(e) = call_method(&self.pc, "restartIce", &Array::new()) {
            warn!("restartIce failed: {}", js_error_message(&e));
        }
    }

    fn add_track(&self, track: &WebMediaTrack) -> Result<(), PeerError> {
        let sender = call_method(
            &self.pc,
            "addTrack",
            &Array::of2(track.track(), track.stream()),
        )
        .map_err(peer_error)?;

        let sender = sender.dyn_into::<RtcRtpSender>().map_err(peer_error)?;
        *self.sender(track.kind()).borrow_mut() = Some(sender);
        Ok(())
    }

    fn has_sender(&self, kind: TrackKind) -> bool {
        self.sender(kind).borrow().is_some()
    }

    async fn replace_track(
        &self,
        kind: TrackKind,
        track: Option<&WebMediaTrack>,
    ) -> Result<(), PeerError> {
        let sender = self
            .sender(kind)
            .borrow()
            .clone()
            .ok_or_else(|| PeerError::InvalidState(format!("no {kind:?} sender")))?;
        JsFuture::from(sender.replace_track(track.map(|t| t.track())))
            .await
            .map_err(peer_error)?;
        Ok(())
    }

    async fn set_video_encoding(&self, encoding: VideoEncoding) -> Result<bool, PeerError> {
        let Some(sender) = self.video_sender.borrow().clone() else {
            return Ok(false);
        };

        let params = call_method(&sender, "getParameters", &Array::new()).map_err(peer_error)?;
        let encodings = Reflect::get(&params, &JsValue::from_str("encodings"))
            .ok()
            .and_then(|e| e.dyn_into::<Array>().ok())
            .filter(|e| e.length() > 0)
            .unwrap_or_else(|| Array::of1(&Object::new()));

        let update: Object = serde_wasm_bindgen::to_value(&encoding)
            .map_err(|e| PeerError::Operation(e.to_string()))?
            .dyn_into()
            .map_err(peer_error)?;
        let first: Object = encodings.get(0).dyn_into().map_err(peer_error)?;
        Object::assign(&first, &update);
        Reflect::set(&params, &JsValue::from_str("encodings"), &encodings).map_err(peer_error)?;

        let promise: js_sys::Promise = call_method(&sender, "setParameters", &Array::of1(&params))
            .map_err(peer_error)?
            .dyn_into()
            .map_err(peer_error)?;
        JsFuture::from(promise).await.map_err(peer_error)?;
        Ok(true)
    }

    fn close(&self) {
        self.pc.close();
    }
}
