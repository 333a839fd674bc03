//! # Error Taxonomy
//!
//! Every failure the pipeline can produce is typed here with `thiserror`, one enum per
//! collaborator boundary. The split mirrors how each failure is handled:
//!
//! - **`SourceError`**: transient fetch failures, isolated per country by the poller.
//! - **`BusError`**: publish/consume failures. A publish failure ends the current poll cycle.
//! - **`StoreError`**: subscription lookup/upsert failures, surfaced so the bus redelivers.
//! - **`RegistryError`**: invalid identity assignment on the realtime registry.
//! - **`HandlerError`**: what a bus message handler returns to request redelivery.

use thiserror::Error;

/// Failures reported by a holiday source.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The provider answered with a non-2xx status.
    #[error("Holiday source unavailable (status {status}): {body}")]
    Unavailable {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Raw error body, if the provider sent one.
        body: String,
    },

    /// The request never produced a response (DNS, connect, timeout, middleware).
    #[error("Holiday source transport error: {0}")]
    Transport(String),

    /// The provider answered 2xx but the body did not match the expected schema.
    #[error("Holiday source returned an undecodable body: {0}")]
    Decode(String),
}

/// Failures of the event bus transport.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Failed to publish to topic '{topic}': {reason}")]
    Publish { topic: String, reason: String },

    #[error("Failed to consume from topic '{topic}': {reason}")]
    Consume { topic: String, reason: String },

    #[error("Acknowledgement failed for message {id}: {reason}")]
    Ack { id: String, reason: String },

    #[error("Payload codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Event bus is closed")]
    Closed,
}

/// Failures of the subscription store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Subscription store backend error: {0}")]
    Backend(String),

    #[error("Stored subscription for '{user_id}' is corrupt: {reason}")]
    Corrupt { user_id: String, reason: String },

    #[error("User id cannot be empty")]
    EmptyUserId,
}

/// Failures of the realtime connection registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Connection {0} is not registered")]
    UnknownConnection(String),

    #[error("User id cannot be empty")]
    EmptyUserId,
}

/// Error returned by a bus message handler. Any variant triggers redelivery.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("{0}")]
    Other(String),
}

/// Top-level error type for the holiday monitor library.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}
