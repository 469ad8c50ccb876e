use crate::model::IceServerConfig;

pub const DEFAULT_STUN_SERVERS: [&str; 10] = [
    "stun:stun.l.google.com:19302",
    "stun:stun.l.google.com:5349",
    "stun:stun1.l.google.com:3478",
    "stun:stun1.l.google.com:5349",
    "stun:stun2.l.google.com:19302",
    "stun:stun2.l.google.com:5349",
    "stun:stun3.l.google.com:3478",
    "stun:stun3.l.google.com:5349",
    "stun:stun4.l.google.com:19302",
    "stun:stun4.l.google.com:5349",
];

pub const TURN_PORT: u16 = 3478;
pub const TURNS_PORT: u16 = 5349;

pub fn default_stun_servers() -> Vec<IceServerConfig> {
    DEFAULT_STUN_SERVERS
        .iter()
        .map(|url| IceServerConfig::stun(*url))
        .collect()
}
