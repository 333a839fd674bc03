//! # In-Memory Event Bus
//!
//! Single-process transport. Each `(topic, group)` pair owns one unbounded queue; every
//! subscription to the same group shares the queue's receiver, which makes its members
//! compete for messages. Publishing clones the envelope into every group queue of the
//! topic. Messages published to a topic without groups are dropped.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use uuid::Uuid;

use super::{BusSubscription, Delivery, Envelope, EventBus, Topic};
use crate::error::BusError;

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Envelope>>>;

struct GroupQueue {
    sender: mpsc::UnboundedSender<Envelope>,
    receiver: SharedReceiver,
}

/// Queue-per-group bus living inside one process.
#[derive(Default)]
pub struct InMemoryBus {
    topics: Mutex<HashMap<Topic, HashMap<String, GroupQueue>>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the groups currently attached to `topic`.
    pub fn groups(&self, topic: Topic) -> Vec<String> {
        let topics = self.topics.lock();
        let mut names: Vec<String> = topics
            .get(&topic)
            .map(|groups| groups.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, topic: Topic, payload: serde_json::Value) -> Result<Uuid, BusError> {
        let envelope = Envelope::new(topic, payload);
        let id = envelope.id;

        let topics = self.topics.lock();
        match topics.get(&topic) {
            Some(groups) if !groups.is_empty() => {
                for (group, queue) in groups {
                    queue.sender.send(envelope.clone()).map_err(|_| BusError::Publish {
                        topic: topic.to_string(),
                        reason: format!("group '{group}' queue is closed"),
                    })?;
                }
                trace!(%topic, %id, groups = groups.len(), "Published envelope");
            }
            _ => debug!(%topic, %id, "No consumer groups attached, message dropped"),
        }

        Ok(id)
    }

    async fn subscribe(
        &self,
        topic: Topic,
        group: &str,
        consumer: &str,
    ) -> Result<Box<dyn BusSubscription>, BusError> {
        let mut topics = self.topics.lock();
        let queue = topics
            .entry(topic)
            .or_default()
            .entry(group.to_string())
            .or_insert_with(|| {
                let (sender, receiver) = mpsc::unbounded_channel();
                GroupQueue {
                    sender,
                    receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
                }
            });

        debug!(%topic, group, consumer, "Consumer joined group");

        Ok(Box::new(MemorySubscription {
            topic,
            sender: queue.sender.clone(),
            receiver: Arc::clone(&queue.receiver),
        }))
    }
}

/// One consumer's handle on a group queue.
pub struct MemorySubscription {
    topic: Topic,
    sender: mpsc::UnboundedSender<Envelope>,
    receiver: SharedReceiver,
}

#[async_trait]
impl BusSubscription for MemorySubscription {
    fn topic(&self) -> Topic {
        self.topic
    }

    async fn next(&mut self) -> Result<Delivery, BusError> {
        let mut receiver = self.receiver.lock().await;
        match receiver.recv().await {
            Some(envelope) => Ok(Delivery {
                envelope,
                receipt: String::new(),
            }),
            None => Err(BusError::Closed),
        }
    }

    async fn ack(&mut self, _delivery: &Delivery) -> Result<(), BusError> {
        Ok(())
    }

    async fn nack(&mut self, delivery: &Delivery, delay: Duration) -> Result<(), BusError> {
        let retry = delivery.envelope.redelivery();

        if delay.is_zero() {
            return self.sender.send(retry).map_err(|_| BusError::Closed);
        }

        let sender = self.sender.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = sender.send(retry);
        });
        Ok(())
    }
}
