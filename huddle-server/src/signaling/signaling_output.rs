use async_trait::async_trait;
use huddle_core::{Topic, UserId};
use serde_json::Value;

/// Outbound side of the relay: whatever fans events out to subscribed
/// connections (the WebSocket broadcaster in production, a recorder in tests).
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Publish `event` on `topic` to every subscribed connection, skipping
    /// the connections owned by `exclude`. Returns how many connections the
    /// event reached.
    async fn publish(
        &self,
        topic: &Topic,
        event: &str,
        data: Value,
        exclude: Option<UserId>,
    ) -> usize;
}
