use crate::middleware::AuthUser;
use crate::routes::AppState;
use crate::signaling::{ChannelAuthorizer, ConnectionId, TopicBroadcaster};
use axum::Extension;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use huddle_core::{ClientFrame, ServerFrame, Topic, UserId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Extension(AuthUser(user_id)): Extension<AuthUser>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let authorizer = state.authorizer.clone();
    let broadcaster = state.broadcaster.clone();

    ws.on_upgrade(move |socket| handle_socket(socket, user_id, authorizer, broadcaster))
}

/// Topic subscriptions held by one socket.
pub type SocketSubscriptions = Arc<DashMap<Topic, ConnectionId>>;

async fn handle_socket(
    socket: WebSocket,
    user_id: UserId,
    authorizer: ChannelAuthorizer,
    broadcaster: TopicBroadcaster,
) {
    info!("New WebSocket connection for user {}", user_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerFrame>();
    let subscriptions: SocketSubscriptions = Arc::new(DashMap::new());

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize server frame: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let broadcaster = broadcaster.clone();
        let subscriptions = subscriptions.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                        Ok(frame) => {
                            handle_client_frame(
                                frame,
                                user_id,
                                &authorizer,
                                &broadcaster,
                                &subscriptions,
                                &tx,
                            )
                            .await
                        }
                        Err(e) => warn!("Invalid client frame from user {}: {:?}", user_id, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    for entry in subscriptions.iter() {
        broadcaster.unsubscribe(*entry.value());
    }
    info!("WebSocket disconnected for user {}", user_id);
}

/// Applies one subscribe/unsubscribe frame. Subscription replies and relayed
/// events are written to `tx`, the socket's outbound queue.
pub async fn handle_client_frame(
    frame: ClientFrame,
    user_id: UserId,
    authorizer: &ChannelAuthorizer,
    broadcaster: &TopicBroadcaster,
    subscriptions: &SocketSubscriptions,
    tx: &mpsc::UnboundedSender<ServerFrame>,
) {
    match frame {
        ClientFrame::Subscribe { topic } => {
            let grant = match authorizer.authorize(user_id, &topic).await {
                Ok(grant) => grant,
                Err(e) => {
                    debug!("User {} denied subscription to {}: {}", user_id, topic, e);
                    let _ = tx.send(ServerFrame::subscription_error(topic, e.to_string()));
                    return;
                }
            };

            let members = grant.presence.as_ref().map(|p| p.members.as_slice());
            if subscriptions.contains_key(&grant.topic) {
                let _ = tx.send(ServerFrame::subscription_succeeded(topic, members));
                return;
            }

            let (connection_id, mut events) = broadcaster.subscribe(grant.topic, user_id);
            subscriptions.insert(grant.topic, connection_id);

            // the reply is queued before any forwarded event
            let _ = tx.send(ServerFrame::subscription_succeeded(topic, members));

            let forward_tx = tx.clone();
            tokio::spawn(async move {
                while let Some(frame) = events.recv().await {
                    if forward_tx.send(frame).is_err() {
                        break;
                    }
                }
            });
        }
        ClientFrame::Unsubscribe { topic } => {
            let Ok(topic) = topic.parse::<Topic>() else {
                return;
            };
            if let Some((_, connection_id)) = subscriptions.remove(&topic) {
                broadcaster.unsubscribe(connection_id);
            }
        }
    }
}
