mod sdp;
mod stun;

pub use sdp::{SdpError, decode_sdp, encode_sdp, session_id};
pub use stun::{DEFAULT_STUN_SERVERS, TURN_PORT, TURNS_PORT, default_stun_servers};

/// Header carrying the caller's user id on relay requests.
pub const USER_ID_HEADER: &str = "x-user-id";
