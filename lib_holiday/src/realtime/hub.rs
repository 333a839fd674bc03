//! # Notification Hub
//!
//! The websocket endpoint at `/hubs/notifications` plus the developer push endpoint
//! `POST /api/dev/notify`.
//!
//! ## Session flow:
//! 1. **Upgrade**: the connection registers with the authenticated identity (an
//!    [`AuthenticatedUser`] request extension inserted by an auth layer), else the `userId`
//!    query parameter, else its own connection id.
//! 2. **Greeting**: a `Connected` frame reports the connection id and initial group.
//! 3. **Loop**: inbound `SetUserId` / `Ping` frames are answered; outbound frames queued by
//!    the dispatcher are written to the socket.
//! 4. **Close**: on close, socket error or write failure the connection is unregistered.
//!    When the shutdown token fires the hub sends a `Close` frame first.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        FromRequestParts, Query, State,
    },
    http::request::Parts,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::dispatcher::NotificationDispatcher;
use super::message::{ClientMessage, ServerMessage};
use super::registry::{ConnectionId, ConnectionRegistry, Registration};
use crate::model::{country_name, HolidayDetected, NotifyCommand};

/// Route of the websocket endpoint.
pub const HUB_PATH: &str = "/hubs/notifications";

/// Identity established by an upstream authentication layer.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

/// Extracts the optional [`AuthenticatedUser`] extension without rejecting the request.
#[derive(Debug, Clone, Default)]
pub struct MaybeAuthenticated(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeAuthenticated {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<AuthenticatedUser>().map(|u| u.0.clone())))
    }
}

#[derive(Clone)]
struct HubState {
    registry: Arc<ConnectionRegistry>,
    dispatcher: Arc<NotificationDispatcher>,
    shutdown: CancellationToken,
}

#[derive(Debug, Deserialize)]
struct HubQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

/// Websocket hub and developer push routes. Open sessions close once `shutdown` fires.
pub fn notification_routes(dispatcher: Arc<NotificationDispatcher>, shutdown: CancellationToken) -> Router {
    let state = HubState {
        registry: Arc::clone(dispatcher.registry()),
        dispatcher,
        shutdown,
    };

    Router::new()
        .route(HUB_PATH, get(hub_handler))
        .route("/api/dev/notify", post(dev_notify_handler))
        .with_state(state)
}

async fn hub_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<HubQuery>,
    MaybeAuthenticated(authenticated): MaybeAuthenticated,
    State(state): State<HubState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        handle_socket(socket, state.registry, state.shutdown, authenticated, query.user_id)
    })
}

async fn handle_socket(
    socket: WebSocket,
    registry: Arc<ConnectionRegistry>,
    shutdown: CancellationToken,
    authenticated: Option<String>,
    query_user_id: Option<String>,
) {
    let Registration { id, group, mut receiver } =
        registry.register(authenticated.as_deref(), query_user_id.as_deref());
    let (mut sink, mut stream) = socket.split();

    let greeting = ServerMessage::Connected {
        connection_id: id.to_string(),
        user_id: group,
    };

    if send_frame(&mut sink, &greeting).await {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!(connection_id = %id, "Closing socket for shutdown");
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                inbound = stream.next() => match inbound {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_client_text(&registry, id, text.as_str());
                        if !send_frame(&mut sink, &reply).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(connection_id = %id, error = %e, "Socket read failed");
                        break;
                    }
                },
                outbound = receiver.recv() => match outbound {
                    Some(frame) => {
                        if !send_frame(&mut sink, &frame).await {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
    }

    registry.disconnect(id);
}

/// Applies one inbound frame and returns the reply.
fn handle_client_text(registry: &ConnectionRegistry, id: ConnectionId, text: &str) -> ServerMessage {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::SetUserId { user_id }) => match registry.set_user_id(id, &user_id) {
            Ok(_) => ServerMessage::UserIdSet {
                user_id: user_id.trim().to_string(),
            },
            Err(e) => {
                warn!(connection_id = %id, error = %e, "SetUserId rejected");
                ServerMessage::Error { message: e.to_string() }
            }
        },
        Ok(ClientMessage::Ping) => ServerMessage::Pong,
        Err(e) => ServerMessage::Error {
            message: format!("Unrecognized message: {e}"),
        },
    }
}

/// Writes one JSON frame. Returns `false` once the socket is unusable.
async fn send_frame<S>(sink: &mut S, frame: &ServerMessage) -> bool
where
    S: Sink<Message> + Unpin,
{
    let json = match serde_json::to_string(frame) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "Failed to serialize frame");
            return true;
        }
    };
    sink.send(Message::Text(json.into())).await.is_ok()
}

/// Body of `POST /api/dev/notify`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DevNotifyRequest {
    #[serde(default)]
    user_ids: Vec<String>,
    country_code: String,
    country_name: Option<String>,
    date: NaiveDate,
    local_name: Option<String>,
    name: String,
    detected_at_utc: Option<DateTime<Utc>>,
}

impl DevNotifyRequest {
    fn into_command(self) -> NotifyCommand {
        let holiday = HolidayDetected {
            country_name: self.country_name.unwrap_or_else(|| country_name(&self.country_code)),
            country_code: self.country_code,
            date: self.date,
            local_name: self.local_name.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            is_fixed: false,
            is_global: true,
            holiday_type: None,
            detected_at_utc: self.detected_at_utc.unwrap_or_else(Utc::now),
        };
        NotifyCommand::new(self.user_ids, holiday)
    }
}

/// Pushes a hand-built alert straight through the dispatcher.
async fn dev_notify_handler(State(state): State<HubState>, Json(request): Json<DevNotifyRequest>) -> impl IntoResponse {
    let command = request.into_command();
    info!(users = ?command.user_ids, country = %command.holiday.country_code, "Developer notify");
    Json(state.dispatcher.dispatch(&command))
}
