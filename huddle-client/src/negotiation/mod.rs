//! Per-peer perfect negotiation.

mod bitrate;
mod peer;
mod state;

pub use bitrate::*;
pub use peer::*;
pub use state::*;
