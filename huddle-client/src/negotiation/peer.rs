use crate::error::PeerError;
use crate::event::PeerHandle;
use crate::negotiation::{BitrateTier, NegotiationState, Transition, Visibility, is_polite};
use crate::platform::{
    ConnectionState, LocalDescription, PeerConnection, SessionDescription, TrackKind,
};
use huddle_core::utils::session_id;
use huddle_core::{IceCandidateInit, SdpType, UserId};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NegotiationCounters {
    pub offers_sent: u32,
    pub answers_sent: u32,
    pub offers_ignored: u32,
    pub rollbacks: u32,
    pub ice_restarts: u32,
}

/// Negotiation state for one remote participant.
///
/// Owns the connection exclusively. Every incoming offer is checked against
/// the explicit [`NegotiationState`] and the `making_offer` flag to detect
/// collisions; the polite side rolls back, the impolite side ignores.
pub struct PeerSession<C: PeerConnection> {
    handle: PeerHandle,
    polite: bool,
    connection: C,
    state: NegotiationState,
    making_offer: bool,
    ignore_offer: bool,
    remote_description_set: bool,
    /// Origin session id of the last remote description applied.
    remote_session: Option<String>,
    pending_candidates: VecDeque<IceCandidateInit>,
    applied_candidates: HashSet<IceCandidateInit>,
    bitrate_tier: BitrateTier,
    visibility: Visibility,
    counters: NegotiationCounters,
}

impl<C: PeerConnection> PeerSession<C> {
    pub fn new(local_user: UserId, handle: PeerHandle, connection: C) -> Self {
        Self {
            polite: is_polite(local_user, handle.remote_user),
            handle,
            connection,
            state: NegotiationState::Stable,
            making_offer: false,
            ignore_offer: false,
            remote_description_set: false,
            remote_session: None,
            pending_candidates: VecDeque::new(),
            applied_candidates: HashSet::new(),
            bitrate_tier: BitrateTier::High,
            visibility: Visibility::Hidden,
            counters: NegotiationCounters::default(),
        }
    }

    pub fn handle(&self) -> PeerHandle {
        self.handle
    }

    pub fn remote_user(&self) -> UserId {
        self.handle.remote_user
    }

    pub fn is_polite(&self) -> bool {
        self.polite
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn is_making_offer(&self) -> bool {
        self.making_offer
    }

    pub fn ignores_offer(&self) -> bool {
        self.ignore_offer
    }

    pub fn remote_description_set(&self) -> bool {
        self.remote_description_set
    }

    /// True for an offer produced by a different remote connection than the
    /// one this peer negotiated with. It cannot be applied on top of the
    /// current state.
    pub fn is_from_new_remote_session(&self, description: &SessionDescription) -> bool {
        if description.kind != SdpType::Offer {
            return false;
        }
        match (self.remote_session.as_deref(), session_id(&description.sdp)) {
            (Some(known), Some(incoming)) => known != incoming,
            _ => false,
        }
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    pub fn bitrate_tier(&self) -> BitrateTier {
        self.bitrate_tier
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn counters(&self) -> NegotiationCounters {
        self.counters
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection.connection_state() == ConnectionState::Connected
    }

    /// Creates a local offer. Returns `None` when an offer is already in
    /// flight or the connection is not stable; the connection fires
    /// negotiation-needed again once it is.
    ///
    /// The caller sends the offer and then calls [`Self::offer_sent`].
    pub async fn create_offer(&mut self) -> Result<Option<SessionDescription>, PeerError> {
        if self.making_offer || !self.state.is_stable() {
            debug!(
                "{} negotiation needed while {} (making offer: {}), deferring",
                self.handle, self.state, self.making_offer
            );
            return Ok(None);
        }
        let next = self.state.next(Transition::SetLocalOffer)?;

        self.making_offer = true;
        let offer = match self
            .connection
            .set_local_description(LocalDescription::Implicit)
            .await
        {
            Ok(Some(description)) if description.kind == SdpType::Offer => description,
            Ok(other) => {
                self.making_offer = false;
                return Err(PeerError::InvalidState(format!(
                    "expected a local offer, got {:?}",
                    other.map(|d| d.kind)
                )));
            }
            Err(e) => {
                self.making_offer = false;
                return Err(e);
            }
        };

        self.state = next;
        self.counters.offers_sent += 1;
        debug!("{} created offer", self.handle);
        Ok(Some(offer))
    }

    pub fn offer_sent(&mut self) {
        self.making_offer = false;
    }

    /// Applies a remote offer or answer. Returns the local answer to send
    /// back when an offer was accepted.
    pub async fn apply_remote_description(
        &mut self,
        description: SessionDescription,
    ) -> Result<Option<SessionDescription>, PeerError> {
        match description.kind {
            SdpType::Offer => self.accept_offer(description).await,
            SdpType::Answer => {
                let next = match self.state.next(Transition::SetRemoteAnswer) {
                    Ok(next) => next,
                    Err(e) => {
                        warn!("{} dropping answer: {}", self.handle, e);
                        return Ok(None);
                    }
                };
                let session = session_id(&description.sdp).map(str::to_string);
                self.connection.set_remote_description(description).await?;
                self.state = next;
                self.remote_session = session;
                debug!("{} applied answer", self.handle);
                self.drain_pending_candidates().await;
                Ok(None)
            }
        }
    }

    async fn accept_offer(
        &mut self,
        offer: SessionDescription,
    ) -> Result<Option<SessionDescription>, PeerError> {
        let collision = self.making_offer || !self.state.is_stable();
        self.ignore_offer = !self.polite && collision;
        if self.ignore_offer {
            self.counters.offers_ignored += 1;
            info!("{} ignoring colliding offer", self.handle);
            return Ok(None);
        }

        if collision {
            let next = self.state.next(Transition::Rollback)?;
            self.connection
                .set_local_description(LocalDescription::Rollback)
                .await?;
            self.state = next;
            self.making_offer = false;
            self.counters.rollbacks += 1;
            info!("{} rolled back local offer for incoming one", self.handle);
        }

        let next = self.state.next(Transition::SetRemoteOffer)?;
        let session = session_id(&offer.sdp).map(str::to_string);
        self.connection.set_remote_description(offer).await?;
        self.state = next;
        self.remote_session = session;
        self.drain_pending_candidates().await;

        let next = self.state.next(Transition::SetLocalAnswer)?;
        let answer = self
            .connection
            .set_local_description(LocalDescription::Implicit)
            .await?
            .filter(|d| d.kind == SdpType::Answer)
            .ok_or_else(|| PeerError::InvalidState("expected a local answer".to_string()))?;
        self.state = next;
        self.counters.answers_sent += 1;
        debug!("{} created answer", self.handle);
        Ok(Some(answer))
    }

    /// Applies a remote candidate, or queues it until a remote description
    /// exists. Each distinct candidate is applied at most once.
    pub async fn add_remote_candidate(&mut self, candidate: IceCandidateInit) {
        if !self.remote_description_set {
            trace!("{} queueing candidate until remote description", self.handle);
            self.pending_candidates.push_back(candidate);
            return;
        }
        self.apply_candidate(candidate).await;
    }

    /// Queues candidates that arrived before this peer existed.
    pub fn enqueue_candidates(&mut self, candidates: impl IntoIterator<Item = IceCandidateInit>) {
        self.pending_candidates.extend(candidates);
    }

    async fn drain_pending_candidates(&mut self) {
        self.remote_description_set = true;
        if !self.pending_candidates.is_empty() {
            debug!(
                "{} applying {} queued candidates",
                self.handle,
                self.pending_candidates.len()
            );
        }
        while let Some(candidate) = self.pending_candidates.pop_front() {
            self.apply_candidate(candidate).await;
        }
    }

    async fn apply_candidate(&mut self, candidate: IceCandidateInit) {
        if self.applied_candidates.contains(&candidate) {
            trace!("{} skipping duplicate candidate", self.handle);
            return;
        }
        match self.connection.add_ice_candidate(&candidate).await {
            Ok(()) => {
                self.applied_candidates.insert(candidate);
            }
            Err(e) if self.ignore_offer => {
                debug!("{} candidate for ignored offer failed: {}", self.handle, e)
            }
            Err(e) => warn!("{} failed to add candidate: {}", self.handle, e),
        }
    }

    pub fn restart_ice(&mut self) {
        self.counters.ice_restarts += 1;
        info!("{} connection failed, restarting ICE", self.handle);
        self.connection.restart_ice();
    }

    pub fn add_track(&mut self, track: &C::Track) -> Result<(), PeerError> {
        self.connection.add_track(track)
    }

    /// Puts `track` on the outgoing sender of its kind in place. Without
    /// such a sender the track is added instead, which renegotiates.
    pub async fn set_outgoing(
        &mut self,
        kind: TrackKind,
        track: Option<&C::Track>,
    ) -> Result<(), PeerError> {
        if self.connection.has_sender(kind) {
            return self.connection.replace_track(kind, track).await;
        }
        match track {
            Some(track) => self.connection.add_track(track),
            None => Ok(()),
        }
    }

    pub async fn set_outgoing_video(&mut self, track: Option<&C::Track>) -> Result<(), PeerError> {
        self.set_outgoing(TrackKind::Video, track).await
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
    }

    pub fn target_tier(&self) -> BitrateTier {
        BitrateTier::for_visibility(self.visibility)
    }

    /// Applies the tier for the current visibility if it differs from the
    /// one in effect. Returns the new tier when encodings were changed.
    pub async fn apply_bitrate_tier(&mut self) -> Result<Option<BitrateTier>, PeerError> {
        let target = self.target_tier();
        if target == self.bitrate_tier {
            return Ok(None);
        }
        if !self.connection.set_video_encoding(target.encoding()).await? {
            trace!("{} has no video sender, tier {} deferred", self.handle, target);
            return Ok(None);
        }
        debug!("{} bitrate {} -> {}", self.handle, self.bitrate_tier, target);
        self.bitrate_tier = target;
        Ok(Some(target))
    }

    pub fn close(&self) {
        self.connection.close();
    }
}
