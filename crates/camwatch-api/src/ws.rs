//! WebSocket push of detection events.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::hub::EventHub;
use crate::metrics;
use crate::state::AppState;

/// Global counter for active WebSocket connections.
static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Event WebSocket endpoint. Every new log entry is pushed as JSON text.
pub async fn ws_events(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| async move {
        connection_opened();
        handle_events_socket(socket, state.hub).await;
        connection_closed();
    })
}

/// Count an upgraded connection. Returns the new active count.
fn connection_opened() -> i64 {
    let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_ws_active_connections(count);
    metrics::record_ws_connection("events");
    count
}

/// Count a closed connection. Returns the new active count.
fn connection_closed() -> i64 {
    let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
    metrics::set_ws_active_connections(count);
    count
}

async fn handle_events_socket(socket: WebSocket, hub: EventHub) {
    let (mut sender, mut receiver) = socket.split();
    let (id, mut events) = hub.subscribe();
    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    info!("Event client {} connected", id);

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(entry) = event else { break };
                let json = match serde_json::to_string(&entry) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to serialize log entry: {}", e);
                        continue;
                    }
                };
                if sender.send(Message::Text(json)).await.is_err() {
                    debug!("Event client {} went away", id);
                    break;
                }
                metrics::record_ws_message_sent("events", entry.label.as_str());
            }
            _ = heartbeat.tick() => {
                if sender.send(Message::Ping(vec![])).await.is_err() {
                    warn!("Heartbeat failed, client disconnected");
                    break;
                }
            }
            client_msg = receiver.next() => {
                match client_msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }

    hub.unsubscribe(id);
    info!("Event client {} disconnected", id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use camwatch_detector::DetectorConfig;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::config::ApiConfig;
    use crate::routes::create_router;

    #[tokio::test]
    async fn test_gauge_counts_only_upgraded_connections() {
        let root = TempDir::new().unwrap();
        let detector = DetectorConfig::default().with_static_root(root.path()).with_cameras(["cam1"]);
        let config = ApiConfig {
            autostart_streams: false,
            ..ApiConfig::default()
        };
        let state = AppState::new(config, detector).await.unwrap();

        // A handshake served outside a real connection can never upgrade.
        let response = create_router(state, None)
            .oneshot(
                Request::builder()
                    .uri("/ws")
                    .header(header::CONNECTION, "upgrade")
                    .header(header::UPGRADE, "websocket")
                    .header(header::SEC_WEBSOCKET_VERSION, "13")
                    .header(header::SEC_WEBSOCKET_KEY, "dGhlIHNhbXBsZSBub25jZQ==")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert!(response.status().is_client_error());
        assert_eq!(ACTIVE_WS_CONNECTIONS.load(Ordering::SeqCst), 0);

        assert_eq!(connection_opened(), 1);
        assert_eq!(connection_closed(), 0);
    }
}
