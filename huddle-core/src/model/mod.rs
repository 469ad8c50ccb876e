mod frame;
mod ids;
mod meeting;
mod participant;
mod roster;
mod signaling;
mod topic;

pub use frame::{
    ChannelEvent, ClientFrame, SUBSCRIPTION_ERROR_EVENT, SUBSCRIPTION_SUCCEEDED_EVENT, ServerFrame,
};
pub use ids::{MeetingId, ParticipantId, UserId};
pub use meeting::{Meeting, MeetingFeatures, MeetingStatus};
pub use participant::{MediaFlags, Participant, PresenceMember, Role, RosterParticipant};
pub use roster::{
    MEETING_ENDED_EVENT, MeetingEnded, PARTICIPANT_JOINED_EVENT, PARTICIPANT_KICKED_EVENT,
    PARTICIPANT_LEFT_EVENT, PARTICIPANT_UPDATED_EVENT, ParticipantRef, RosterEvent,
};
pub use signaling::{
    ICE_CANDIDATE_EVENT, IceCandidateInit, IceCandidatePayload, IceCandidateRequest,
    IceServerConfig, IceServersResponse, SIGNAL_EVENT, SdpType, SignalPayload, SignalRequest,
};
pub use topic::{Topic, TopicError};
