pub mod config;
pub mod errors;
pub mod handlers;
pub mod ice;
pub mod membership;
pub mod middleware;
pub mod routes;
pub mod signaling;

pub use config::{Config, ConfigError};
pub use errors::{MembershipError, RelayError};
pub use ice::IceCredentialIssuer;
pub use membership::*;
pub use routes::{AppState, build_routes};
pub use signaling::*;
