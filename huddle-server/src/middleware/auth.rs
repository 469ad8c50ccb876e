//! Identity middleware.
//!
//! Authentication happens upstream (gateway or session layer); this server
//! trusts the `x-user-id` header it forwards and stores the caller in the
//! request extensions.

use crate::errors::RelayError;
use axum::{extract::Request, middleware::Next, response::IntoResponse};
use huddle_core::UserId;
use tracing::debug;

pub use huddle_core::utils::USER_ID_HEADER;

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub UserId);

pub async fn require_user(mut req: Request, next: Next) -> Result<impl IntoResponse, RelayError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .ok_or_else(|| {
            debug!("Missing or malformed {} header", USER_ID_HEADER);
            RelayError::Unauthenticated
        })?;

    req.extensions_mut().insert(AuthUser(UserId(user_id)));
    Ok(next.run(req).await)
}
