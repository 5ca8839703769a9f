use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::api::rest::couriers::AvailabilityResponse;
use crate::api::rest::orders::TenantQuery;
use crate::engine::availability::CourierAvailabilityTracker;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Streams dispatch events to the client until either side hangs up.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = BroadcastStream::new(state.dispatch_events_tx.subscribe());

    info!("websocket client connected");

    let send_task = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            let Ok(event) = event else {
                warn!("websocket client lagged behind dispatch events");
                continue;
            };

            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize dispatch event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("websocket client disconnected");
}

pub async fn courier_availability_ws(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(courier_id): Path<String>,
    Query(query): Query<TenantQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| stream_availability(socket, state, query.tenant_id, courier_id))
}

/// Sends the courier's current availability, then every pushed change.
async fn stream_availability(
    socket: WebSocket,
    state: Arc<AppState>,
    tenant_id: String,
    courier_id: String,
) {
    let (mut sender, mut receiver) = socket.split();
    let mut tracker = CourierAvailabilityTracker::subscribe(
        state.store.clone(),
        tenant_id,
        Some(courier_id.clone()),
    );

    info!(courier_id = %courier_id, "availability watcher connected");

    let mut send_task = tokio::spawn(async move {
        let mut next = Some(tracker.first_reading().await);

        while let Some(availability) = next {
            let update = AvailabilityResponse::new(courier_id.clone(), availability);
            let json = match serde_json::to_string(&update) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize availability for ws");
                    break;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
            next = tracker.changed().await;
        }

        tracker.unsubscribe();
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("availability watcher disconnected");
}
