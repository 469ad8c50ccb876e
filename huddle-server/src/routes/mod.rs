//! HTTP routes.
//!
//! Defines the Axum router and application state.

use crate::config::Config;
use crate::handlers;
use crate::ice::IceCredentialIssuer;
use crate::membership::{InMemoryRegistry, MembershipService};
use crate::middleware::require_user;
use crate::signaling::{ChannelAuthorizer, SignalingRelay, TopicBroadcaster, ws_handler};
use axum::{
    Router,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<InMemoryRegistry>,
    pub broadcaster: TopicBroadcaster,
    pub relay: SignalingRelay,
    pub authorizer: ChannelAuthorizer,
    pub ice: IceCredentialIssuer,
    pub membership: MembershipService,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        Self::with_registry(config, Arc::new(InMemoryRegistry::new()))
    }

    pub fn with_registry(config: &Config, registry: Arc<InMemoryRegistry>) -> Self {
        let broadcaster = TopicBroadcaster::new();
        let output = Arc::new(broadcaster.clone());

        Self {
            relay: SignalingRelay::new(registry.clone(), output.clone()),
            authorizer: ChannelAuthorizer::new(registry.clone()),
            ice: IceCredentialIssuer::new(registry.clone(), config),
            membership: MembershipService::new(registry.clone(), output),
            broadcaster,
            registry,
        }
    }
}

/// Build the application routes.
///
/// Every route requires the caller identity header. Timeout applies to the
/// HTTP routes only; the WebSocket route is long-lived.
pub fn build_routes(state: AppState) -> Router {
    let api = Router::new()
        .route("/meetings/{meeting}/signal", post(handlers::send_signal))
        .route(
            "/meetings/{meeting}/ice-candidate",
            post(handlers::send_ice_candidate),
        )
        .route("/meetings/{meeting}/ice-servers", get(handlers::ice_servers))
        .route("/meetings/{meeting}/join", post(handlers::join_meeting))
        .route("/meetings/{meeting}/leave", post(handlers::leave_meeting))
        .route("/meetings/{meeting}/end", post(handlers::end_meeting))
        .route("/meetings/{meeting}/media", post(handlers::update_media))
        .route(
            "/meetings/{meeting}/participants/{participant}/kick",
            post(handlers::kick_participant),
        )
        .route(
            "/meetings/{meeting}/participants/{participant}/promote",
            post(handlers::promote_participant),
        )
        .route(
            "/meetings/{meeting}/participants/{participant}/demote",
            post(handlers::demote_participant),
        )
        .layer(TimeoutLayer::new(Duration::from_secs(30)));

    Router::new()
        .merge(api)
        .route("/ws", get(ws_handler))
        .layer(middleware::from_fn(require_user))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
