/// Real-time event channel (WebSocket)
///
/// Clients connect to `GET /events` with their access token either in the
/// `token` query parameter (browsers can't set headers on an upgrade) or in
/// a standard `Authorization: Bearer` header. Every frame is a JSON text
/// message of the shape `{"event": "...", "data": ...}`.
///
/// Protocol:
///
/// 1. Upgrade is always accepted so the client gets a frame, not a bare
///    HTTP error.
/// 2. Invalid/missing token: one `error` frame, then close.
/// 3. Valid token: the session registers with the hub under the token's
///    user id, receives a `connected` ack, then streams targeted and
///    global events until either side closes.
///
/// Incoming client messages are ignored except for close; this channel is
/// one-way.

use crate::{app::AppState, notify};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use taskhub_shared::auth::jwt::{self, Claims};
use tokio::sync::broadcast;

/// Query parameters accepted by the events endpoint
#[derive(Debug, Deserialize)]
pub struct EventsParams {
    /// Access token (alternative to the Authorization header)
    pub token: Option<String>,
}

/// WebSocket upgrade handler for `/events`
pub async fn events_upgrade(
    State(state): State<AppState>,
    Query(params): Query<EventsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let token = params.token.or_else(|| bearer_token(&headers));
    let claims = token.and_then(|t| jwt::validate_token(&t, state.jwt_secret()).ok());

    ws.on_upgrade(move |socket| handle_session(socket, state, claims))
}

/// Extracts a bearer token from the Authorization header
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Runs one WebSocket session to completion
async fn handle_session(socket: WebSocket, state: AppState, claims: Option<Claims>) {
    let (mut sink, mut stream) = socket.split();

    let Some(claims) = claims else {
        let frame = json!({
            "event": notify::ERROR,
            "data": { "message": "Unauthorized" },
        });
        let _ = sink.send(Message::Text(frame.to_string())).await;
        let _ = sink.close().await;
        return;
    };

    let user_id = claims.sub;
    let mut receiver = state.hub.register(user_id).await;

    let ack = json!({
        "event": notify::CONNECTED,
        "data": { "userId": user_id },
    });
    if sink.send(Message::Text(ack.to_string())).await.is_err() {
        return;
    }

    tracing::info!(user_id, "Event session opened");

    loop {
        tokio::select! {
            // Targeted events for this user
            direct = receiver.direct.recv() => {
                let Some(frame) = direct else { break };
                if send_frame(&mut sink, &frame).await.is_err() {
                    break;
                }
            }

            // Global broadcasts
            global = receiver.global.recv() => {
                match global {
                    Ok(frame) => {
                        if send_frame(&mut sink, &frame).await.is_err() {
                            break;
                        }
                    }
                    // Lagged sessions skip the missed events and carry on
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(user_id, missed, "Event session lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            // Client traffic: only close matters
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    tracing::info!(user_id, "Event session closed");
}

/// Serializes and sends one event frame
async fn send_frame(
    sink: &mut (impl futures::Sink<Message, Error = axum::Error> + Unpin),
    frame: &notify::WsEvent,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(frame).map_err(axum::Error::new)?;
    sink.send(Message::Text(text)).await
}
