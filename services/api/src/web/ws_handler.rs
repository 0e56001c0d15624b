//! services/api/src/web/ws_handler.rs
//!
//! This is the main entry point and control loop for a WebSocket connection.
//! One connection is one page load of a tab; the `TabDriver` owns its state.

use crate::web::{
    protocol::{ClientMessage, ServerMessage},
    state::AppState,
    tab::{TabDriver, TabEvent},
};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{
    stream::{SplitSink, StreamExt},
    SinkExt,
};
use std::sync::Arc;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

/// The handler for upgrading HTTP requests to WebSocket connections.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("New WebSocket connection established.");

    let (sender, mut receiver) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<TabEvent>();

    // The forwarder is the only task that writes to the socket.
    let forwarder = spawn_forwarder(sender, outbound_rx);

    // --- 1. Initialization Phase ---
    let attached = match receiver.next().await {
        Some(Ok(Message::Text(init_json))) => {
            match serde_json::from_str::<ClientMessage>(init_json.as_str()) {
                Ok(ClientMessage::Init { tab_id }) => match app_state.tabs.attach(tab_id).await {
                    Some(store) => {
                        info!("Initializing page load for tab {}", tab_id);
                        Some((tab_id, store))
                    }
                    None => {
                        warn!("Init for unknown tab {}", tab_id);
                        let _ = outbound_tx.send(ServerMessage::error("Unknown tab."));
                        None
                    }
                },
                _ => {
                    error!("First message was not a valid Init message.");
                    let _ = outbound_tx.send(ServerMessage::error(
                        "The first message must be an init message.",
                    ));
                    None
                }
            }
        }
        _ => {
            error!("Client disconnected before sending Init message.");
            None
        }
    };

    if let Some((tab_id, tab_store)) = attached {
        match TabDriver::start(&app_state, tab_store, outbound_tx.clone(), events_tx).await {
            Ok(mut driver) => {
                // --- 2. Main Message Loop ---
                loop {
                    tokio::select! {
                        incoming = receiver.next() => match incoming {
                            Some(Ok(Message::Text(text))) => {
                                match serde_json::from_str::<ClientMessage>(text.as_str()) {
                                    Ok(message) => driver.handle_client_message(message).await,
                                    Err(e) => {
                                        warn!("Failed to deserialize client message: {}", e);
                                        let _ = outbound_tx.send(ServerMessage::error(
                                            format!("Invalid message: {}", e),
                                        ));
                                    }
                                }
                            }
                            Some(Ok(Message::Close(_))) => {
                                info!("Client sent close message.");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!("WebSocket receive error: {}", e);
                                break;
                            }
                            None => {
                                info!("Client disconnected.");
                                break;
                            }
                        },
                        Some(event) = events_rx.recv() => driver.handle_event(event).await,
                    }
                }
                driver.shutdown();
            }
            Err(e) => {
                error!("Failed to start page load: {}", e);
                let _ = outbound_tx.send(ServerMessage::error(e.to_string()));
            }
        }
        app_state.tabs.detach(tab_id).await;
    }

    // --- 3. Cleanup ---
    // Dropping the last sender lets the forwarder flush and exit.
    drop(outbound_tx);
    if let Err(e) = forwarder.await {
        error!("Forwarder task failed: {}", e);
    }
    info!("WebSocket connection closed.");
}

fn spawn_forwarder(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: UnboundedReceiver<ServerMessage>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize server message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                debug!("Socket closed while sending; stopping forwarder.");
                break;
            }
        }
        let _ = sender.close().await;
    })
}
