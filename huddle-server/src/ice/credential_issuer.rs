use crate::config::{Config, TurnConfig, TurnCredentials};
use crate::errors::RelayError;
use crate::membership::MembershipRegistry;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use huddle_core::utils::{TURN_PORT, TURNS_PORT};
use huddle_core::{IceServerConfig, MeetingId, UserId};
use ring::hmac;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tracing::{debug, warn};

/// Time-limited TURN credentials in the coturn REST format: the username is
/// `"{expires_at}:{user_id}"` and the password is the base64 HMAC-SHA1 of the
/// username keyed with the shared secret.
pub fn turn_rest_credentials(secret: &[u8], user_id: UserId, expires_at: i64) -> (String, String) {
    let username = format!("{expires_at}:{user_id}");
    let key = hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, secret);
    let tag = hmac::sign(&key, username.as_bytes());
    (username, STANDARD.encode(tag.as_ref()))
}

/// Hands out the ICE server list (STUN first, then TURN) to meeting
/// participants. Credentials are minted per request.
#[derive(Clone)]
pub struct IceCredentialIssuer {
    registry: Arc<dyn MembershipRegistry>,
    stun_servers: Vec<String>,
    turn: Option<TurnConfig>,
}

impl IceCredentialIssuer {
    pub fn new(registry: Arc<dyn MembershipRegistry>, config: &Config) -> Self {
        if let Some(TurnConfig {
            credentials: TurnCredentials::Static { .. },
            host,
        }) = &config.turn
        {
            warn!(
                "TURN server {} uses static shared credentials; set TURN_SECRET for time-limited ones",
                host
            );
        }
        Self {
            registry,
            stun_servers: config.stun_servers.clone(),
            turn: config.turn.clone(),
        }
    }

    pub async fn issue_ice_servers(
        &self,
        meeting_id: MeetingId,
        user_id: UserId,
    ) -> Result<Vec<IceServerConfig>, RelayError> {
        if self.registry.meeting(meeting_id).await.is_none() {
            return Err(RelayError::MeetingNotFound);
        }
        if !self.registry.is_active_participant(meeting_id, user_id).await {
            return Err(RelayError::Unauthorized);
        }

        let servers = self.ice_servers_at(user_id, Utc::now().timestamp());
        debug!(
            "Issued {} ICE servers to user {} in meeting {}",
            servers.len(),
            user_id,
            meeting_id
        );
        Ok(servers)
    }

    /// The list as it would be issued at unix time `now`.
    pub fn ice_servers_at(&self, user_id: UserId, now: i64) -> Vec<IceServerConfig> {
        let mut servers: Vec<IceServerConfig> = self
            .stun_servers
            .iter()
            .map(|url| IceServerConfig::stun(url.as_str()))
            .collect();

        let Some(turn) = &self.turn else {
            return servers;
        };

        let (username, credential) = match &turn.credentials {
            TurnCredentials::TimeLimited {
                secret,
                ttl_seconds,
            } => {
                let expires_at = now.saturating_add_unsigned(*ttl_seconds);
                turn_rest_credentials(secret.expose_secret().as_bytes(), user_id, expires_at)
            }
            TurnCredentials::Static { username, password } => {
                (username.clone(), password.expose_secret().to_string())
            }
        };

        for url in [
            format!("turn:{}:{}", turn.host, TURN_PORT),
            format!("turns:{}:{}", turn.host, TURNS_PORT),
        ] {
            servers.push(IceServerConfig {
                urls: url,
                username: Some(username.clone()),
                credential: Some(credential.clone()),
            });
        }
        servers
    }
}
