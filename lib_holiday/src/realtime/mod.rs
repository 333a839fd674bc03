//! # Realtime Delivery
//!
//! Everything between a `NotifyCommand` and a user's open sockets.
//!
//! - **`registry`**: live connections grouped by user identity. It alone decides who is
//!   reachable right now.
//! - **`dispatcher`**: turns a command into one send per recipient group.
//! - **`message`**: the JSON frames exchanged with websocket clients.
//! - **`hub`** (feature `realtime`): the `axum` websocket endpoint and developer push route.
//! - **`api`** (feature `realtime`): subscription routes, health check and CORS.
//!
//! Delivery is real-time only. A user without live connections receives nothing and nothing
//! is queued for later.

#![forbid(unsafe_code)]

pub mod dispatcher;
pub mod message;
pub mod registry;

#[cfg(feature = "realtime")]
pub mod api;
#[cfg(feature = "realtime")]
pub mod hub;

pub use dispatcher::{DispatchReport, NotificationDispatcher};
pub use message::{ClientMessage, ServerMessage};
pub use registry::{ConnectionId, ConnectionRegistry, Registration};
