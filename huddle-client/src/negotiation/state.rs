use crate::error::NegotiationError;
use huddle_core::UserId;
use std::fmt;

/// Offer/answer state of one peer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NegotiationState {
    #[default]
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    SetLocalOffer,
    SetRemoteOffer,
    SetLocalAnswer,
    SetRemoteAnswer,
    Rollback,
}

impl NegotiationState {
    /// Legal transitions:
    ///
    /// | from              | via             | to                |
    /// |-------------------|-----------------|-------------------|
    /// | stable            | SetLocalOffer   | have-local-offer  |
    /// | stable            | SetRemoteOffer  | have-remote-offer |
    /// | have-local-offer  | SetLocalOffer   | have-local-offer  |
    /// | have-local-offer  | SetRemoteAnswer | stable            |
    /// | have-local-offer  | Rollback        | stable            |
    /// | have-remote-offer | SetRemoteOffer  | have-remote-offer |
    /// | have-remote-offer | SetLocalAnswer  | stable            |
    /// | have-remote-offer | Rollback        | stable            |
    pub fn next(self, via: Transition) -> Result<Self, NegotiationError> {
        use NegotiationState::*;
        use Transition::*;

        match (self, via) {
            (Stable, SetLocalOffer) | (HaveLocalOffer, SetLocalOffer) => Ok(HaveLocalOffer),
            (Stable, SetRemoteOffer) | (HaveRemoteOffer, SetRemoteOffer) => Ok(HaveRemoteOffer),
            (HaveLocalOffer, SetRemoteAnswer) | (HaveRemoteOffer, SetLocalAnswer) => Ok(Stable),
            (HaveLocalOffer, Rollback) | (HaveRemoteOffer, Rollback) => Ok(Stable),
            (from, via) => Err(NegotiationError::IllegalTransition { from, via }),
        }
    }

    pub fn is_stable(self) -> bool {
        self == NegotiationState::Stable
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NegotiationState::Stable => "stable",
            NegotiationState::HaveLocalOffer => "have-local-offer",
            NegotiationState::HaveRemoteOffer => "have-remote-offer",
        }
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The polite side yields during an offer collision. The numerically
/// smaller user id is polite, so both ends agree without talking.
pub fn is_polite(local: UserId, remote: UserId) -> bool {
    local < remote
}
