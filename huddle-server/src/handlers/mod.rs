mod membership;
mod signaling;

pub use membership::*;
pub use signaling::*;
