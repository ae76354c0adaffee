//! `/ws` — the WebSocket transport endpoint (spec §4.7/§6.2).
//!
//! One reader task and one writer task per connection, mirroring the
//! donor's node WebSocket split (`nodes/ws.rs`): the writer forwards the
//! client's registry-assigned outbound channel to the socket, the reader
//! loop applies incoming `subscribe`/`unsubscribe` frames and replies to
//! malformed ones without closing the connection.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};

use fleet_transport::ClientFrame;

use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (client_id, mut outbound_rx) = state.registry.register();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound_rx.recv().await {
            let Ok(json) = serde_json::to_string(&frame) else {
                continue;
            };
            if ws_sink.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let mut subscribed_to: Option<String> = None;

    while let Some(Ok(message)) = ws_stream.next().await {
        match message {
            Message::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                Ok(ClientFrame::Subscribe { session_id }) => {
                    if let Some(previous) = subscribed_to.take() {
                        if previous != session_id {
                            state.supervisor.unsubscribe(&previous);
                        } else {
                            subscribed_to = Some(previous);
                            continue;
                        }
                    }

                    if state.supervisor.subscribe(&session_id) {
                        state.registry.subscribe(client_id, session_id.clone());
                        subscribed_to = Some(session_id);
                    } else {
                        state.registry.send_to(
                            client_id,
                            fleet_transport::ServerFrame::bad_frame(format!(
                                "unknown session {session_id}"
                            )),
                        );
                    }
                }
                Ok(ClientFrame::Unsubscribe) => {
                    if let Some(previous) = subscribed_to.take() {
                        state.registry.unsubscribe(client_id);
                        state.supervisor.unsubscribe(&previous);
                    }
                }
                Err(e) => {
                    state.registry.send_to(
                        client_id,
                        fleet_transport::ServerFrame::bad_frame(e.to_string()),
                    );
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    writer.abort();
    if let Some(session_id) = state.registry.unregister(client_id) {
        state.supervisor.unsubscribe(&session_id);
    }
}
