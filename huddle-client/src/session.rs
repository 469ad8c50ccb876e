//! Session orchestrator.
//!
//! One [`Session`] per joined meeting. It owns a [`PeerSession`] per remote
//! participant, the local media tracks and the visibility sets that drive
//! adaptive bitrate, and runs a single-threaded loop over
//! [`SessionEvent`]s.

use crate::error::{MediaError, PeerError};
use crate::event::{EventReceiver, EventSender, PeerHandle, SessionEvent, event_queue};
use crate::negotiation::{BitrateTier, PeerSession, Visibility};
use crate::platform::{
    ConnectionState, MediaConstraints, MediaTrack, Platform, RelayClient, SessionDescription,
    TrackKind,
};
use futures::{FutureExt, StreamExt};
use huddle_core::utils::{decode_sdp, default_stun_servers, encode_sdp};
use huddle_core::{
    ChannelEvent, IceCandidateInit, IceCandidateRequest, IceServerConfig, MeetingId,
    RosterEvent, RosterParticipant, ServerFrame, SignalPayload, SignalRequest, UserId,
};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// Delay before reconnecting to a peer whose state was discarded.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Wait between stopping capture and acquiring the device again.
pub const DEVICE_RELEASE_DELAY: Duration = Duration::from_millis(100);

/// Wait before the audio-only retry after a device failure.
pub const DEVICE_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub meeting_id: MeetingId,
    pub local_user: UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    MeetingEnded,
    Kicked,
}

/// UI-facing notifications. Every hook defaults to a no-op.
pub trait SessionObserver<T> {
    fn remote_track_added(&self, _user: UserId, _track: &T) {}

    fn remote_stream_removed(&self, _user: UserId) {}

    fn bitrate_changed(&self, _user: UserId, _tier: BitrateTier) {}

    /// A desynchronized peer was dropped and a reconnect is scheduled.
    fn reconnecting(&self, _user: UserId) {}

    fn participant_updated(&self, _participant: &RosterParticipant) {}

    fn session_ended(&self, _reason: EndReason) {}
}

pub struct NoopObserver;

impl<T> SessionObserver<T> for NoopObserver {}

pub struct Session<P: Platform, R: RelayClient> {
    config: SessionConfig,
    platform: P,
    relay: R,
    observer: Rc<dyn SessionObserver<P::Track>>,
    peers: HashMap<UserId, PeerSession<P::Connection>>,
    /// Candidates from users we have no peer for yet.
    early_candidates: HashMap<UserId, Vec<IceCandidateInit>>,
    /// Users we want a connection to.
    present: HashSet<UserId>,
    participants: HashMap<UserId, RosterParticipant>,
    local_tracks: Vec<P::Track>,
    screen_track: Option<P::Track>,
    visible: HashSet<UserId>,
    priority: HashSet<UserId>,
    ice_servers: Vec<IceServerConfig>,
    events_tx: EventSender<P::Track>,
    events_rx: EventReceiver<P::Track>,
    next_connection: u64,
    destroyed: bool,
}

impl<P: Platform, R: RelayClient> Session<P, R> {
    pub fn new(config: SessionConfig, platform: P, relay: R) -> Self {
        let (events_tx, events_rx) = event_queue();
        Self {
            config,
            platform,
            relay,
            observer: Rc::new(NoopObserver),
            peers: HashMap::new(),
            early_candidates: HashMap::new(),
            present: HashSet::new(),
            participants: HashMap::new(),
            local_tracks: Vec::new(),
            screen_track: None,
            visible: HashSet::new(),
            priority: HashSet::new(),
            ice_servers: default_stun_servers(),
            events_tx,
            events_rx,
            next_connection: 1,
            destroyed: false,
        }
    }

    pub fn with_observer(mut self, observer: Rc<dyn SessionObserver<P::Track>>) -> Self {
        self.observer = observer;
        self
    }

    /// Sender for feeding channel frames (and anything else) into the loop.
    pub fn events(&self) -> EventSender<P::Track> {
        self.events_tx.clone()
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn peer(&self, user: UserId) -> Option<&PeerSession<P::Connection>> {
        self.peers.get(&user)
    }

    pub fn peer_ids(&self) -> Vec<UserId> {
        let mut ids: Vec<UserId> = self.peers.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn participant(&self, user: UserId) -> Option<&RosterParticipant> {
        self.participants.get(&user)
    }

    pub fn local_tracks(&self) -> &[P::Track] {
        &self.local_tracks
    }

    pub fn screen_track(&self) -> Option<&P::Track> {
        self.screen_track.as_ref()
    }

    pub fn ice_servers(&self) -> &[IceServerConfig] {
        &self.ice_servers
    }

    pub fn early_candidates(&self, user: UserId) -> usize {
        self.early_candidates.get(&user).map_or(0, Vec::len)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Fetches the STUN/TURN list for this meeting. Keeps the built-in STUN
    /// list when the relay fails or returns nothing.
    pub async fn load_ice_servers(&mut self) {
        match self.relay.ice_servers(self.config.meeting_id).await {
            Ok(servers) if !servers.is_empty() => {
                info!("Loaded {} ICE servers", servers.len());
                self.ice_servers = servers;
            }
            Ok(_) => warn!("Relay returned no ICE servers, keeping defaults"),
            Err(e) => warn!("Failed to load ICE servers, keeping defaults: {}", e),
        }
    }

    /// Acquires microphone and/or camera. Existing capture is stopped first
    /// and given time to release the device. When the device is unavailable
    /// and video was requested, retries once with audio only. The new tracks
    /// go onto the senders of every existing peer.
    pub async fn init_local_media(&mut self, audio: bool, video: bool) -> Result<(), MediaError> {
        if !self.local_tracks.is_empty() {
            for track in self.local_tracks.drain(..) {
                track.stop();
            }
            self.platform.sleep(DEVICE_RELEASE_DELAY).await;
        }

        let tracks = match self
            .platform
            .user_media(MediaConstraints { audio, video })
            .await
        {
            Ok(tracks) => tracks,
            Err(MediaError::DeviceUnavailable(reason)) if video => {
                warn!("Camera unavailable ({}), retrying audio only", reason);
                self.platform.sleep(DEVICE_RETRY_DELAY).await;
                self.platform
                    .user_media(MediaConstraints {
                        audio,
                        video: false,
                    })
                    .await?
            }
            Err(e) => return Err(e),
        };

        info!("Acquired {} local tracks", tracks.len());
        self.local_tracks = tracks;
        self.reattach_local_tracks().await;
        self.refresh_bitrates().await;
        Ok(())
    }

    /// Puts the current microphone, and the camera unless a screen is being
    /// shared, onto every peer.
    async fn reattach_local_tracks(&mut self) {
        let audio = self
            .local_tracks
            .iter()
            .find(|t| t.kind() == TrackKind::Audio)
            .cloned();
        let camera = self.camera_track().cloned();
        let sharing = self.screen_track.is_some();

        for peer in self.peers.values_mut() {
            if let Err(e) = peer.set_outgoing(TrackKind::Audio, audio.as_ref()).await {
                warn!("{} failed to attach microphone: {}", peer.handle(), e);
            }
            if sharing {
                continue;
            }
            if let Err(e) = peer.set_outgoing(TrackKind::Video, camera.as_ref()).await {
                warn!("{} failed to attach camera: {}", peer.handle(), e);
            }
        }
    }

    fn camera_track(&self) -> Option<&P::Track> {
        self.local_tracks
            .iter()
            .find(|t| t.kind() == TrackKind::Video)
    }

    /// Turns the camera on: re-enables the existing track, or acquires one
    /// and puts it on every peer.
    pub async fn enable_camera(&mut self) -> Result<(), MediaError> {
        if let Some(camera) = self.camera_track() {
            camera.set_enabled(true);
            return Ok(());
        }

        let camera = self
            .platform
            .user_media(MediaConstraints {
                audio: false,
                video: true,
            })
            .await?
            .into_iter()
            .find(|t| t.kind() == TrackKind::Video)
            .ok_or_else(|| MediaError::DeviceUnavailable("no camera track".to_string()))?;

        if self.screen_track.is_none() {
            for peer in self.peers.values_mut() {
                if let Err(e) = peer.set_outgoing_video(Some(&camera)).await {
                    warn!("{} failed to attach camera: {}", peer.handle(), e);
                }
            }
        }
        self.local_tracks.push(camera);
        self.refresh_bitrates().await;
        Ok(())
    }

    /// Mutes or unmutes the microphone. Tracks are never stopped.
    pub fn set_audio_enabled(&self, enabled: bool) {
        self.set_kind_enabled(TrackKind::Audio, enabled);
    }

    pub fn set_video_enabled(&self, enabled: bool) {
        self.set_kind_enabled(TrackKind::Video, enabled);
    }

    fn set_kind_enabled(&self, kind: TrackKind, enabled: bool) {
        for track in self.local_tracks.iter().filter(|t| t.kind() == kind) {
            track.set_enabled(enabled);
        }
        debug!("{:?} {}", kind, if enabled { "enabled" } else { "disabled" });
    }

    /// Replaces the outgoing video on every peer with a screen capture.
    pub async fn start_screen_share(&mut self) -> Result<(), MediaError> {
        if self.screen_track.is_some() {
            return Ok(());
        }
        let screen = self.platform.display_media(self.events_tx.clone()).await?;

        for peer in self.peers.values_mut() {
            if let Err(e) = peer.set_outgoing_video(Some(&screen)).await {
                warn!("{} failed to share screen: {}", peer.handle(), e);
            }
        }
        info!("Screen share started");
        self.screen_track = Some(screen);
        self.refresh_bitrates().await;
        Ok(())
    }

    /// Stops the screen capture and puts the camera back on every peer.
    pub async fn stop_screen_share(&mut self) {
        let Some(screen) = self.screen_track.take() else {
            return;
        };
        screen.stop();

        let camera = self.camera_track().cloned();
        for peer in self.peers.values_mut() {
            if let Err(e) = peer.set_outgoing_video(camera.as_ref()).await {
                warn!("{} failed to restore camera: {}", peer.handle(), e);
            }
        }
        info!("Screen share stopped");
        self.refresh_bitrates().await;
    }

    pub async fn set_visible_users(&mut self, users: impl IntoIterator<Item = UserId>) {
        self.visible = users.into_iter().collect();
        self.refresh_bitrates().await;
    }

    pub async fn set_priority_users(&mut self, users: impl IntoIterator<Item = UserId>) {
        self.priority = users.into_iter().collect();
        self.refresh_bitrates().await;
    }

    fn visibility_of(&self, user: UserId) -> Visibility {
        if self.priority.contains(&user) {
            Visibility::Priority
        } else if self.visible.contains(&user) {
            Visibility::Visible
        } else {
            Visibility::Hidden
        }
    }

    /// Recomputes every peer's visibility, then applies tiers on connected
    /// peers. Unconnected peers get theirs when they connect.
    async fn refresh_bitrates(&mut self) {
        let visibilities: Vec<(UserId, Visibility)> = self
            .peers
            .keys()
            .map(|user| (*user, self.visibility_of(*user)))
            .collect();
        for (user, visibility) in visibilities {
            if let Some(peer) = self.peers.get_mut(&user) {
                peer.set_visibility(visibility);
            }
        }

        for (user, peer) in self.peers.iter_mut() {
            if !peer.is_connected() {
                continue;
            }
            match peer.apply_bitrate_tier().await {
                Ok(Some(tier)) => self.observer.bitrate_changed(*user, tier),
                Ok(None) => {}
                Err(e) => warn!("{} failed to set bitrate: {}", peer.handle(), e),
            }
        }
    }

    /// Creates a peer for `user` unless one exists. Local tracks are added
    /// right away, which makes the connection ask for negotiation.
    pub fn connect_to(&mut self, user: UserId) {
        if self.destroyed || user == self.config.local_user {
            return;
        }
        self.present.insert(user);
        if self.peers.contains_key(&user) {
            return;
        }

        if let Err(e) = self.create_peer(user) {
            error!("Failed to create connection to user {}: {}", user, e);
        }
    }

    fn create_peer(&mut self, user: UserId) -> Result<(), PeerError> {
        let handle = PeerHandle {
            remote_user: user,
            connection: self.next_connection,
        };
        self.next_connection += 1;

        let connection =
            self.platform
                .create_connection(handle, &self.ice_servers, self.events_tx.clone())?;
        let mut peer = PeerSession::new(self.config.local_user, handle, connection);

        let outgoing_video = self.screen_track.as_ref().or_else(|| self.camera_track());
        let audio = self
            .local_tracks
            .iter()
            .filter(|t| t.kind() == TrackKind::Audio);
        for track in audio.chain(outgoing_video) {
            peer.add_track(track)?;
        }

        peer.set_visibility(self.visibility_of(user));
        if let Some(candidates) = self.early_candidates.remove(&user) {
            debug!("{} handing over {} early candidates", handle, candidates.len());
            peer.enqueue_candidates(candidates);
        }

        info!("Created {}", handle);
        self.peers.insert(user, peer);
        Ok(())
    }

    /// Closes the peer's connection and forgets its state.
    fn close_peer(&mut self, user: UserId) -> bool {
        self.early_candidates.remove(&user);
        match self.peers.remove(&user) {
            Some(peer) => {
                peer.close();
                debug!("Closed {}", peer.handle());
                true
            }
            None => false,
        }
    }

    /// Tears down the connection to a departed participant.
    pub fn disconnect_from(&mut self, user: UserId) {
        self.present.remove(&user);
        self.visible.remove(&user);
        self.priority.remove(&user);
        if self.close_peer(user) {
            info!("Disconnected from user {}", user);
            self.observer.remote_stream_removed(user);
        }
    }

    /// Closes every connection and stops every local track. Safe to call
    /// more than once; events arriving afterwards are ignored.
    pub fn teardown(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        for (_, peer) in self.peers.drain() {
            peer.close();
        }
        for track in self.local_tracks.drain(..) {
            track.stop();
        }
        if let Some(screen) = self.screen_track.take() {
            screen.stop();
        }
        self.early_candidates.clear();
        self.present.clear();
        self.participants.clear();
        self.visible.clear();
        self.priority.clear();
        while let Some(Some(_)) = self.events_rx.next().now_or_never() {}

        info!("Session for meeting {} torn down", self.config.meeting_id);
    }

    fn end(&mut self, reason: EndReason) {
        if self.destroyed {
            return;
        }
        info!("Session ended: {:?}", reason);
        self.teardown();
        self.observer.session_ended(reason);
    }

    /// Processes events until the session is torn down.
    pub async fn run(&mut self) {
        while !self.destroyed {
            match self.events_rx.next().await {
                Some(event) => self.handle_event(event).await,
                None => break,
            }
        }
    }

    /// Processes the events already queued, without waiting for more.
    /// Returns how many were handled.
    pub async fn pump(&mut self) -> usize {
        let mut handled = 0;
        while !self.destroyed {
            let Some(Some(event)) = self.events_rx.next().now_or_never() else {
                break;
            };
            self.handle_event(event).await;
            handled += 1;
        }
        handled
    }

    fn is_current(&self, handle: PeerHandle) -> bool {
        self.peers
            .get(&handle.remote_user)
            .is_some_and(|p| p.handle() == handle)
    }

    pub async fn handle_event(&mut self, event: SessionEvent<P::Track>) {
        if self.destroyed {
            trace!("Session destroyed, dropping event");
            return;
        }

        match event {
            SessionEvent::Channel(frame) => self.handle_frame(frame).await,
            SessionEvent::NegotiationNeeded(handle) => self.handle_negotiation_needed(handle).await,
            SessionEvent::LocalCandidate(handle, candidate) => {
                if self.is_current(handle) {
                    self.send_candidate(handle.remote_user, candidate).await;
                }
            }
            SessionEvent::ConnectionStateChanged(handle, state) => {
                self.handle_connection_state(handle, state).await
            }
            SessionEvent::RemoteTrack(handle, track) => {
                if self.is_current(handle) {
                    debug!("{} remote {:?} track {}", handle, track.kind(), track.id());
                    self.observer.remote_track_added(handle.remote_user, &track);
                }
            }
            SessionEvent::ScreenShareEnded(track_id) => {
                if self.screen_track.as_ref().is_some_and(|t| t.id() == track_id) {
                    info!("Screen share ended by the system");
                    self.stop_screen_share().await;
                }
            }
            SessionEvent::Reconnect(user) => {
                if self.present.contains(&user) && !self.peers.contains_key(&user) {
                    info!("Reconnecting to user {}", user);
                    self.connect_to(user);
                }
            }
        }
    }

    async fn handle_frame(&mut self, frame: ServerFrame) {
        let event = match ChannelEvent::from_frame(&frame) {
            Ok(Some(event)) => event,
            Ok(None) => {
                trace!("Ignoring {} on {}", frame.event, frame.topic);
                return;
            }
            Err(e) => {
                warn!("Malformed {} on {}: {}", frame.event, frame.topic, e);
                return;
            }
        };

        let local = self.config.local_user;
        match event {
            ChannelEvent::Signal(payload) if payload.to_user_id == local => {
                self.handle_signal(payload).await
            }
            ChannelEvent::IceCandidate(payload) if payload.to_user_id == local => {
                self.handle_remote_candidate(payload.from_user_id, payload.candidate)
                    .await
            }
            ChannelEvent::Signal(_) | ChannelEvent::IceCandidate(_) => {}
            ChannelEvent::Roster(event) => self.handle_roster(event),
            ChannelEvent::Subscribed { topic, members } => {
                info!("Subscribed to {} ({} members)", topic, members.len());
                for member in members {
                    self.connect_to(member.id);
                }
            }
            ChannelEvent::SubscriptionFailed { topic, message } => {
                error!("Subscription to {} failed: {}", topic, message)
            }
        }
    }

    fn handle_roster(&mut self, event: RosterEvent) {
        let local = self.config.local_user;
        match event {
            RosterEvent::Joined(participant) => {
                if participant.user_id == local {
                    return;
                }
                let user = participant.user_id;
                self.participants.insert(user, participant);
                self.connect_to(user);
            }
            RosterEvent::Left(who) => {
                if who.user_id != local {
                    self.participants.remove(&who.user_id);
                    self.disconnect_from(who.user_id);
                }
            }
            RosterEvent::Kicked(who) => {
                if who.user_id == local {
                    self.end(EndReason::Kicked);
                } else {
                    self.participants.remove(&who.user_id);
                    self.disconnect_from(who.user_id);
                }
            }
            RosterEvent::Updated(participant) => {
                self.observer.participant_updated(&participant);
                self.participants.insert(participant.user_id, participant);
            }
            RosterEvent::MeetingEnded(_) => self.end(EndReason::MeetingEnded),
        }
    }

    async fn handle_negotiation_needed(&mut self, handle: PeerHandle) {
        if !self.is_current(handle) {
            trace!("Stale negotiation-needed for {}", handle);
            return;
        }
        let Some(peer) = self.peers.get_mut(&handle.remote_user) else {
            return;
        };

        match peer.create_offer().await {
            Ok(Some(offer)) => {
                self.send_description(handle.remote_user, offer).await;
                if let Some(peer) = self.peers.get_mut(&handle.remote_user) {
                    peer.offer_sent();
                }
            }
            Ok(None) => {}
            Err(e) => error!("{} failed to create offer: {}", handle, e),
        }
    }

    async fn handle_signal(&mut self, payload: SignalPayload) {
        let from = payload.from_user_id;
        let sdp = match decode_sdp(&payload.sdp) {
            Ok(sdp) => sdp,
            Err(e) => {
                warn!("Undecodable {} from user {}: {}", payload.kind, from, e);
                return;
            }
        };
        debug!("Received {} from {} (user {})", payload.kind, payload.from_user_name, from);

        if !self.peers.contains_key(&from) {
            self.connect_to(from);
        }
        let description = SessionDescription::new(payload.kind, sdp);
        if self
            .peers
            .get(&from)
            .is_some_and(|p| p.is_from_new_remote_session(&description))
        {
            info!("User {} rebuilt its connection, rebuilding ours", from);
            self.close_peer(from);
            self.connect_to(from);
        }
        let Some(peer) = self.peers.get_mut(&from) else {
            return;
        };
        let handle = peer.handle();

        match peer.apply_remote_description(description).await {
            Ok(Some(answer)) => self.send_description(from, answer).await,
            Ok(None) => {}
            Err(PeerError::DescriptionMismatch(reason)) => {
                warn!("{} desynchronized ({}), recreating", handle, reason);
                self.close_peer(from);
                self.observer.reconnecting(from);
                self.platform.schedule(
                    RECONNECT_DELAY,
                    self.events_tx.clone(),
                    SessionEvent::Reconnect(from),
                );
            }
            Err(e) => error!("{} failed to apply {}: {}", handle, payload.kind, e),
        }
    }

    async fn handle_remote_candidate(&mut self, from: UserId, candidate: IceCandidateInit) {
        match self.peers.get_mut(&from) {
            Some(peer) => peer.add_remote_candidate(candidate).await,
            None => {
                trace!("Holding candidate from user {} until a peer exists", from);
                self.early_candidates.entry(from).or_default().push(candidate);
            }
        }
    }

    async fn handle_connection_state(&mut self, handle: PeerHandle, state: ConnectionState) {
        if !self.is_current(handle) {
            return;
        }
        let Some(peer) = self.peers.get_mut(&handle.remote_user) else {
            return;
        };
        debug!("{} connection {:?}", handle, state);

        match state {
            ConnectionState::Connected => {
                info!("Connected to user {}", handle.remote_user);
                match peer.apply_bitrate_tier().await {
                    Ok(Some(tier)) => self.observer.bitrate_changed(handle.remote_user, tier),
                    Ok(None) => {}
                    Err(e) => warn!("{} failed to set bitrate: {}", handle, e),
                }
            }
            ConnectionState::Failed => peer.restart_ice(),
            _ => {}
        }
    }

    async fn send_description(&self, to: UserId, description: SessionDescription) {
        let request = SignalRequest::new(to, description.kind, encode_sdp(&description.sdp));
        if let Err(e) = self
            .relay
            .send_signal(self.config.meeting_id, request)
            .await
        {
            error!("Failed to send {} to user {}: {}", description.kind, to, e);
        }
    }

    async fn send_candidate(&self, to: UserId, candidate: IceCandidateInit) {
        let request = IceCandidateRequest {
            target_user_id: to,
            candidate,
        };
        if let Err(e) = self
            .relay
            .send_ice_candidate(self.config.meeting_id, request)
            .await
        {
            warn!("Failed to send ICE candidate to user {}: {}", to, e);
        }
    }
}

impl<P: Platform, R: RelayClient> Drop for Session<P, R> {
    fn drop(&mut self) {
        self.teardown();
    }
}
