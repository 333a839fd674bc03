//! Websocket frames. Both directions are JSON objects discriminated by `type`.

use serde::{Deserialize, Serialize};

use crate::model::HolidayAlert;

/// Client-to-server frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Re-keys this connection under `userId`.
    SetUserId {
        #[serde(rename = "userId")]
        user_id: String,
    },
    Ping,
}

/// Server-to-client frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// First frame on every connection.
    Connected {
        #[serde(rename = "connectionId")]
        connection_id: String,
        #[serde(rename = "userId")]
        user_id: String,
    },
    /// Confirms a `SetUserId`.
    UserIdSet {
        #[serde(rename = "userId")]
        user_id: String,
    },
    /// The alert pushed to every connection of a notified user.
    HolidayDetected(HolidayAlert),
    Pong,
    Error { message: String },
}
