use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdpError {
    #[error("sdp is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("sdp is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Session descriptions travel base64-encoded (standard alphabet) so the
/// relay never has to look inside them.
pub fn encode_sdp(sdp: &str) -> String {
    STANDARD.encode(sdp.as_bytes())
}

pub fn decode_sdp(encoded: &str) -> Result<String, SdpError> {
    let bytes = STANDARD.decode(encoded.trim())?;
    Ok(String::from_utf8(bytes)?)
}

/// The `sess-id` field of the origin (`o=`) line. It stays fixed for the
/// lifetime of the connection that produced the description.
pub fn session_id(sdp: &str) -> Option<&str> {
    sdp.lines()
        .find_map(|line| line.strip_prefix("o="))
        .and_then(|origin| origin.split_whitespace().nth(1))
}
