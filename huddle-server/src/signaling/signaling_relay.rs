use crate::errors::RelayError;
use crate::membership::MembershipRegistry;
use crate::signaling::SignalingOutput;
use huddle_core::{
    ICE_CANDIDATE_EVENT, IceCandidatePayload, IceCandidateRequest, MeetingId, Participant,
    SIGNAL_EVENT, SdpType, SignalPayload, SignalRequest, Topic, UserId,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Forwards offers, answers and ICE candidates between the participants of
/// a meeting. Holds no state of its own: membership comes from the
/// registry, delivery goes through the output.
#[derive(Clone)]
pub struct SignalingRelay {
    registry: Arc<dyn MembershipRegistry>,
    output: Arc<dyn SignalingOutput>,
}

impl SignalingRelay {
    pub fn new(registry: Arc<dyn MembershipRegistry>, output: Arc<dyn SignalingOutput>) -> Self {
        Self { registry, output }
    }

    /// Meeting must exist and be running, and the sender must be in it.
    async fn authorized_sender(
        &self,
        meeting_id: MeetingId,
        from: UserId,
    ) -> Result<Participant, RelayError> {
        let meeting = self
            .registry
            .meeting(meeting_id)
            .await
            .ok_or(RelayError::MeetingNotFound)?;
        if !meeting.is_active() {
            return Err(RelayError::MeetingNotActive);
        }

        self.registry
            .active_participant(meeting_id, from)
            .await
            .ok_or_else(|| {
                warn!(
                    "Rejected signaling from user {} in meeting {}: not a participant",
                    from, meeting_id
                );
                RelayError::Unauthorized
            })
    }

    /// Returns the number of connections the signal reached.
    pub async fn relay_signal(
        &self,
        meeting_id: MeetingId,
        from: UserId,
        request: SignalRequest,
    ) -> Result<usize, RelayError> {
        let sender = self.authorized_sender(meeting_id, from).await?;

        let kind = SdpType::parse(&request.kind)
            .ok_or_else(|| RelayError::InvalidRequest("The selected type is invalid.".to_string()))?;
        if request.sdp.is_empty() {
            return Err(RelayError::InvalidRequest(
                "The sdp field is required.".to_string(),
            ));
        }

        let payload = SignalPayload {
            from_user_id: from,
            to_user_id: request.target_user_id,
            from_user_name: sender.display_name,
            kind,
            sdp: request.sdp,
        };
        let data = serde_json::to_value(&payload)
            .map_err(|e| RelayError::InvalidRequest(e.to_string()))?;

        let reached = self
            .output
            .publish(&Topic::private(meeting_id), SIGNAL_EVENT, data, Some(from))
            .await;
        debug!(
            "Relayed {} from {} to {} in meeting {} ({} connections)",
            kind, from, payload.to_user_id, meeting_id, reached
        );
        Ok(reached)
    }

    pub async fn relay_ice_candidate(
        &self,
        meeting_id: MeetingId,
        from: UserId,
        request: IceCandidateRequest,
    ) -> Result<usize, RelayError> {
        self.authorized_sender(meeting_id, from).await?;

        if request.candidate.candidate.is_empty() {
            return Err(RelayError::InvalidRequest(
                "The candidate.candidate field is required.".to_string(),
            ));
        }

        let payload = IceCandidatePayload {
            from_user_id: from,
            to_user_id: request.target_user_id,
            candidate: request.candidate,
        };
        let data = serde_json::to_value(&payload)
            .map_err(|e| RelayError::InvalidRequest(e.to_string()))?;

        let reached = self
            .output
            .publish(&Topic::private(meeting_id), ICE_CANDIDATE_EVENT, data, Some(from))
            .await;
        debug!(
            "Relayed ICE candidate from {} to {} in meeting {} ({} connections)",
            from, payload.to_user_id, meeting_id, reached
        );
        Ok(reached)
    }
}
