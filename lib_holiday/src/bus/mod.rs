//! # Event Bus
//!
//! At-least-once, topic-addressed transport between the pipeline stages.
//!
//! ## Delivery contract:
//! - Every topic has named **consumer groups**. A published message is copied to each
//!   group that exists at publish time; consumers inside one group compete for it.
//! - A consumer must `ack` or `nack` every delivery. A `nack` schedules redelivery of the
//!   same envelope with `attempt + 1` after the requested delay.
//! - No ordering is guaranteed between messages, and duplicates are possible. Handlers
//!   must tolerate both.
//!
//! Two transports implement [`EventBus`]: [`memory::InMemoryBus`] for single-process runs
//! and tests, and `connections::redis_bus::RedisStreamBus` for multi-process deployments.

pub mod consumer;
pub mod memory;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::BusError;

/// Consumer group of the subscription matcher on `holiday.detected`.
pub const MATCHER_GROUP: &str = "subscription-matcher";

/// Prefix of the dispatcher groups on `notify.users`.
///
/// Every notifier process holds its own connection registry, so each one joins a group of
/// its own (`notification-dispatcher-{instance}`) and receives every command.
pub const DISPATCHER_GROUP_PREFIX: &str = "notification-dispatcher";

/// Dispatcher group name for a notifier instance.
pub fn dispatcher_group(instance: &str) -> String {
    format!("{DISPATCHER_GROUP_PREFIX}-{instance}")
}

/// Consumer name for one matcher process inside [`MATCHER_GROUP`].
///
/// Replicas compete in one group, so every process gets a name of its own. Entries left
/// pending under a name that never returns are reclaimed by the survivors.
pub fn matcher_consumer(instance: &str) -> String {
    format!("{instance}-matcher-{}", Uuid::new_v4().simple())
}

/// Bus topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "holiday.detected")]
    HolidayDetected,
    #[serde(rename = "notify.users")]
    NotifyUsers,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::HolidayDetected => "holiday.detected",
            Topic::NotifyUsers => "notify.users",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message as it travels on the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub id: Uuid,
    pub topic: Topic,
    pub published_at: DateTime<Utc>,
    /// 1 on first delivery, incremented on every redelivery.
    pub attempt: u32,
    pub payload: serde_json::Value,
}

impl Envelope {
    pub fn new(topic: Topic, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            topic,
            published_at: Utc::now(),
            attempt: 1,
            payload,
        }
    }

    /// Copy of this envelope for the next delivery attempt.
    pub fn redelivery(&self) -> Self {
        Self {
            attempt: self.attempt.saturating_add(1),
            ..self.clone()
        }
    }
}

/// A single delivery handed to a consumer.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub envelope: Envelope,
    /// Transport-specific handle used to acknowledge the delivery (a stream entry id for
    /// Redis, empty for the in-memory bus).
    pub receipt: String,
}

/// Publishing side of the bus.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publishes `payload` to every consumer group of `topic`.
    async fn publish(&self, topic: Topic, payload: serde_json::Value) -> Result<Uuid, BusError>;

    /// Joins `group` on `topic` as `consumer`, creating the group when missing.
    async fn subscribe(
        &self,
        topic: Topic,
        group: &str,
        consumer: &str,
    ) -> Result<Box<dyn BusSubscription>, BusError>;
}

/// Consuming side of a group membership.
#[async_trait]
pub trait BusSubscription: Send {
    fn topic(&self) -> Topic;

    /// Waits for the next delivery. `BusError::Closed` means no more will arrive.
    async fn next(&mut self) -> Result<Delivery, BusError>;

    async fn ack(&mut self, delivery: &Delivery) -> Result<(), BusError>;

    /// Rejects the delivery; it comes back after `delay` with its attempt counter bumped.
    async fn nack(&mut self, delivery: &Delivery, delay: Duration) -> Result<(), BusError>;
}

/// Serializes `message` and publishes it on `topic`.
pub async fn publish_message<T>(bus: &dyn EventBus, topic: Topic, message: &T) -> Result<Uuid, BusError>
where
    T: Serialize + Sync,
{
    let payload = serde_json::to_value(message)?;
    bus.publish(topic, payload).await
}
