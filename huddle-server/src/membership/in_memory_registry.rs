use crate::errors::MembershipError;
use crate::membership::{MediaUpdate, MembershipRegistry};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use huddle_core::{
    MediaFlags, Meeting, MeetingEnded, MeetingFeatures, MeetingId, MeetingStatus, Participant,
    ParticipantId, ParticipantRef, Role, RosterEvent, UserId,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// Result of a membership operation: the affected participant row and the
/// roster events the operation produced, in publishing order.
#[derive(Debug, Clone)]
pub struct MembershipChange {
    pub participant: Participant,
    pub events: Vec<RosterEvent>,
}

struct MeetingRecord {
    meeting: Meeting,
    /// One row per user. Kept in join order: a rejoining row moves to the back.
    participants: Vec<Participant>,
}

impl MeetingRecord {
    fn position(&self, user_id: UserId) -> Option<usize> {
        self.participants.iter().position(|p| p.user_id == user_id)
    }

    fn active_position(&self, user_id: UserId) -> Option<usize> {
        self.participants
            .iter()
            .position(|p| p.user_id == user_id && p.is_active())
    }

    fn active_count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_active()).count()
    }

    fn manager_position(&self, actor: UserId) -> Result<usize, MembershipError> {
        let idx = self
            .active_position(actor)
            .ok_or(MembershipError::NotPermitted)?;
        if !self.participants[idx].can_manage() {
            return Err(MembershipError::NotPermitted);
        }
        Ok(idx)
    }

    fn target_position(&self, target: ParticipantId) -> Result<usize, MembershipError> {
        let idx = self
            .participants
            .iter()
            .position(|p| p.id == target)
            .ok_or(MembershipError::ParticipantNotFound)?;
        if self.participants[idx].is_host() {
            return Err(MembershipError::CannotTargetHost);
        }
        Ok(idx)
    }

    fn mark_left(&mut self, idx: usize) -> ParticipantRef {
        let participant = &mut self.participants[idx];
        participant.flags = MediaFlags::default();
        participant.left_at = Some(Utc::now());
        ParticipantRef {
            participant_id: participant.id,
            user_id: participant.user_id,
            display_name: participant.display_name.clone(),
        }
    }

    fn end(&mut self) -> RosterEvent {
        let now = Utc::now();
        for participant in self.participants.iter_mut().filter(|p| p.is_active()) {
            participant.flags = MediaFlags::default();
            participant.left_at = Some(now);
        }
        self.meeting.status = MeetingStatus::Ended;
        RosterEvent::MeetingEnded(MeetingEnded {
            meeting_id: self.meeting.id,
            ended_at: now,
        })
    }
}

/// `DashMap`-backed membership store. Every operation on a meeting runs
/// under that meeting's entry lock, so multi-row updates (host handover,
/// screen-share exclusivity) are atomic per meeting.
pub struct InMemoryRegistry {
    meetings: DashMap<MeetingId, MeetingRecord>,
    next_meeting_id: AtomicU64,
    next_participant_id: AtomicU64,
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            meetings: DashMap::new(),
            next_meeting_id: AtomicU64::new(1),
            next_participant_id: AtomicU64::new(1),
        }
    }

    pub fn create_meeting(
        &self,
        host_id: UserId,
        features: MeetingFeatures,
        max_participants: u32,
    ) -> Meeting {
        let id = MeetingId(self.next_meeting_id.fetch_add(1, Ordering::Relaxed));
        let meeting = Meeting {
            id,
            host_id,
            status: MeetingStatus::Scheduled,
            features,
            max_participants,
        };
        self.meetings.insert(
            id,
            MeetingRecord {
                meeting: meeting.clone(),
                participants: Vec::new(),
            },
        );
        info!("Created meeting {} hosted by user {}", id, host_id);
        meeting
    }

    pub fn start_meeting(
        &self,
        meeting_id: MeetingId,
        actor: UserId,
    ) -> Result<Meeting, MembershipError> {
        let mut record = self
            .meetings
            .get_mut(&meeting_id)
            .ok_or(MembershipError::MeetingNotFound)?;

        if !record.meeting.is_host(actor) {
            return Err(MembershipError::NotPermitted);
        }
        match record.meeting.status {
            MeetingStatus::Active => Err(MembershipError::InvalidState(
                "Meeting is already active".to_string(),
            )),
            MeetingStatus::Ended => Err(MembershipError::InvalidState(
                "Cannot start an ended meeting".to_string(),
            )),
            MeetingStatus::Scheduled => {
                record.meeting.status = MeetingStatus::Active;
                info!("Meeting {} started", meeting_id);
                Ok(record.meeting.clone())
            }
        }
    }

    /// Ends an active meeting on behalf of its host or an active manager.
    /// Every active participant is marked as left.
    pub fn end_meeting(
        &self,
        meeting_id: MeetingId,
        actor: UserId,
    ) -> Result<(Meeting, RosterEvent), MembershipError> {
        let mut record = self
            .meetings
            .get_mut(&meeting_id)
            .ok_or(MembershipError::MeetingNotFound)?;

        if !record.meeting.is_host(actor) {
            record.manager_position(actor)?;
        }
        if !record.meeting.is_active() {
            return Err(MembershipError::InvalidState(
                "Meeting is not active".to_string(),
            ));
        }

        let event = record.end();
        info!("Meeting {} ended by user {}", meeting_id, actor);
        Ok((record.meeting.clone(), event))
    }

    /// Get-or-create the user's row and (re)join it with clean media flags.
    /// With the waiting room enabled, non-managers are parked there instead
    /// and no event is produced.
    pub fn join(
        &self,
        meeting_id: MeetingId,
        user_id: UserId,
        display_name: &str,
    ) -> Result<MembershipChange, MembershipError> {
        let mut record = self
            .meetings
            .get_mut(&meeting_id)
            .ok_or(MembershipError::MeetingNotFound)?;

        if record.meeting.is_ended() {
            return Err(MembershipError::MeetingEnded);
        }

        let already_active = record.active_position(user_id).is_some();
        if !already_active && record.active_count() >= record.meeting.max_participants as usize {
            return Err(MembershipError::MeetingFull);
        }

        let mut participant = match record.position(user_id) {
            Some(idx) => record.participants.remove(idx),
            None => Participant {
                id: ParticipantId(self.next_participant_id.fetch_add(1, Ordering::Relaxed)),
                meeting_id,
                user_id,
                display_name: display_name.to_string(),
                role: if record.meeting.is_host(user_id) {
                    Role::Host
                } else {
                    Role::Participant
                },
                avatar: None,
                flags: MediaFlags::default(),
                is_in_waiting_room: false,
                joined_at: None,
                left_at: None,
            },
        };

        participant.flags = MediaFlags::default();
        participant.left_at = None;

        let mut events = Vec::new();
        if record.meeting.features.waiting_room_enabled && !participant.can_manage() {
            participant.is_in_waiting_room = true;
            participant.joined_at = None;
            debug!(
                "User {} parked in waiting room of meeting {}",
                user_id, meeting_id
            );
        } else {
            participant.is_in_waiting_room = false;
            participant.joined_at = Some(Utc::now());
            events.push(RosterEvent::Joined(participant.roster_entry()));
            info!("User {} joined meeting {}", user_id, meeting_id);
        }

        record.participants.push(participant.clone());
        Ok(MembershipChange {
            participant,
            events,
        })
    }

    /// Leaves the meeting. A departing host hands over to the first active
    /// co-host, else the first active participant; with nobody left the
    /// meeting ends.
    pub fn leave(
        &self,
        meeting_id: MeetingId,
        user_id: UserId,
    ) -> Result<MembershipChange, MembershipError> {
        let mut record = self
            .meetings
            .get_mut(&meeting_id)
            .ok_or(MembershipError::MeetingNotFound)?;

        let idx = record
            .active_position(user_id)
            .ok_or(MembershipError::NotInMeeting)?;

        let left = record.mark_left(idx);
        let mut events = vec![RosterEvent::Left(left)];
        info!("User {} left meeting {}", user_id, meeting_id);

        if record.participants[idx].is_host() && record.meeting.is_active() {
            let successor = record
                .participants
                .iter()
                .position(|p| p.is_active() && p.role == Role::CoHost)
                .or_else(|| {
                    record
                        .participants
                        .iter()
                        .position(|p| p.is_active() && p.role == Role::Participant)
                });

            match successor {
                Some(next) => {
                    record.participants[idx].role = Role::CoHost;
                    record.participants[next].role = Role::Host;
                    record.meeting.host_id = record.participants[next].user_id;
                    info!(
                        "Host of meeting {} handed over to user {}",
                        meeting_id, record.meeting.host_id
                    );
                    events.push(RosterEvent::Updated(
                        record.participants[next].roster_entry(),
                    ));
                }
                None => {
                    events.push(record.end());
                    info!("Meeting {} ended: last participant left", meeting_id);
                }
            }
        }

        Ok(MembershipChange {
            participant: record.participants[idx].clone(),
            events,
        })
    }

    pub fn kick(
        &self,
        meeting_id: MeetingId,
        actor: UserId,
        target: ParticipantId,
    ) -> Result<MembershipChange, MembershipError> {
        let mut record = self
            .meetings
            .get_mut(&meeting_id)
            .ok_or(MembershipError::MeetingNotFound)?;

        record.manager_position(actor)?;
        let idx = record.target_position(target)?;
        if !record.participants[idx].is_active() {
            return Err(MembershipError::ParticipantNotFound);
        }

        let kicked = record.mark_left(idx);
        info!(
            "User {} kicked from meeting {} by user {}",
            kicked.user_id, meeting_id, actor
        );
        Ok(MembershipChange {
            participant: record.participants[idx].clone(),
            events: vec![RosterEvent::Kicked(kicked)],
        })
    }

    pub fn promote(
        &self,
        meeting_id: MeetingId,
        actor: UserId,
        target: ParticipantId,
    ) -> Result<MembershipChange, MembershipError> {
        self.change_role(meeting_id, actor, target, Role::CoHost)
    }

    pub fn demote(
        &self,
        meeting_id: MeetingId,
        actor: UserId,
        target: ParticipantId,
    ) -> Result<MembershipChange, MembershipError> {
        self.change_role(meeting_id, actor, target, Role::Participant)
    }

    fn change_role(
        &self,
        meeting_id: MeetingId,
        actor: UserId,
        target: ParticipantId,
        role: Role,
    ) -> Result<MembershipChange, MembershipError> {
        let mut record = self
            .meetings
            .get_mut(&meeting_id)
            .ok_or(MembershipError::MeetingNotFound)?;

        record.manager_position(actor)?;
        let idx = record.target_position(target)?;

        let participant = &mut record.participants[idx];
        participant.role = role;
        info!(
            "User {} in meeting {} is now {:?}",
            participant.user_id, meeting_id, role
        );
        Ok(MembershipChange {
            participant: participant.clone(),
            events: vec![RosterEvent::Updated(participant.roster_entry())],
        })
    }

    /// Applies a media flag update. Only one active participant may share
    /// their screen at a time.
    pub fn update_media(
        &self,
        meeting_id: MeetingId,
        user_id: UserId,
        update: MediaUpdate,
    ) -> Result<MembershipChange, MembershipError> {
        let mut record = self
            .meetings
            .get_mut(&meeting_id)
            .ok_or(MembershipError::MeetingNotFound)?;

        let idx = record
            .active_position(user_id)
            .ok_or(MembershipError::NotInMeeting)?;

        if update.starts_screen_share()
            && record
                .participants
                .iter()
                .any(|p| p.is_active() && p.user_id != user_id && p.flags.is_screen_sharing)
        {
            return Err(MembershipError::ScreenShareBusy);
        }

        let participant = &mut record.participants[idx];
        update.apply(&mut participant.flags);
        debug!(
            "User {} in meeting {} media flags now {:?}",
            user_id, meeting_id, participant.flags
        );
        Ok(MembershipChange {
            participant: participant.clone(),
            events: vec![RosterEvent::Updated(participant.roster_entry())],
        })
    }

    /// Any row for the user, active or not.
    pub fn participant(&self, meeting_id: MeetingId, user_id: UserId) -> Option<Participant> {
        let record = self.meetings.get(&meeting_id)?;
        record
            .position(user_id)
            .map(|idx| record.participants[idx].clone())
    }
}

#[async_trait]
impl MembershipRegistry for InMemoryRegistry {
    async fn meeting(&self, meeting_id: MeetingId) -> Option<Meeting> {
        self.meetings.get(&meeting_id).map(|r| r.meeting.clone())
    }

    async fn active_participant(
        &self,
        meeting_id: MeetingId,
        user_id: UserId,
    ) -> Option<Participant> {
        let record = self.meetings.get(&meeting_id)?;
        record
            .active_position(user_id)
            .map(|idx| record.participants[idx].clone())
    }

    async fn active_participants(&self, meeting_id: MeetingId) -> Vec<Participant> {
        self.meetings
            .get(&meeting_id)
            .map(|r| {
                r.participants
                    .iter()
                    .filter(|p| p.is_active())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}
