use crate::utils::MockTrack;
use huddle_client::{BitrateTier, EndReason, MediaTrack, SessionObserver};
use huddle_core::{RosterParticipant, UserId};
use std::cell::RefCell;

#[derive(Default)]
pub struct RecordingObserver {
    pub remote_tracks: RefCell<Vec<(UserId, String)>>,
    pub removed: RefCell<Vec<UserId>>,
    pub bitrates: RefCell<Vec<(UserId, BitrateTier)>>,
    pub reconnecting: RefCell<Vec<UserId>>,
    pub updated: RefCell<Vec<RosterParticipant>>,
    pub ended: RefCell<Vec<EndReason>>,
}

impl SessionObserver<MockTrack> for RecordingObserver {
    fn remote_track_added(&self, user: UserId, track: &MockTrack) {
        self.remote_tracks.borrow_mut().push((user, track.id()));
    }

    fn remote_stream_removed(&self, user: UserId) {
        self.removed.borrow_mut().push(user);
    }

    fn bitrate_changed(&self, user: UserId, tier: BitrateTier) {
        self.bitrates.borrow_mut().push((user, tier));
    }

    fn reconnecting(&self, user: UserId) {
        self.reconnecting.borrow_mut().push(user);
    }

    fn participant_updated(&self, participant: &RosterParticipant) {
        self.updated.borrow_mut().push(participant.clone());
    }

    fn session_ended(&self, reason: EndReason) {
        self.ended.borrow_mut().push(reason);
    }
}
