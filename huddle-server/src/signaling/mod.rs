mod channel_authorizer;
mod signaling_output;
mod signaling_relay;
mod topic_broadcaster;
mod ws_handler;

pub use channel_authorizer::*;
pub use signaling_output::*;
pub use signaling_relay::*;
pub use topic_broadcaster::*;
pub use ws_handler::*;
