//! # Redis Connections
//!
//! Multi-process transports backed by Redis through a shared `ConnectionManager`
//! (auto-reconnecting, multiplexed):
//!
//! - **`redis_bus`**: the event bus on Redis Streams with consumer groups.
//! - **`redis_store`**: the subscription store as JSON documents plus per-country sets.

pub mod redis_bus;
pub mod redis_store;

use redis::aio::ConnectionManager;
use redis::Client;

/// Opens a managed async connection to `url` (e.g. `redis://127.0.0.1/`).
pub async fn connect(url: &str) -> redis::RedisResult<ConnectionManager> {
    let client = Client::open(url)?;
    client.get_connection_manager().await
}
