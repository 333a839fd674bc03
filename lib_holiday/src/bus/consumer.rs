//! # Consumer Loop
//!
//! Drives one [`BusSubscription`] into a typed [`MessageHandler`] until cancelled.
//!
//! ## Settlement rules:
//! - Handler success: `ack`.
//! - Handler error below `max_attempts`: `nack`, redelivered after `redelivery_delay`.
//! - Handler error at `max_attempts`: dead-lettered (logged at error, then acked).
//! - Payload that does not decode into the handler's message type: dead-lettered at once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::{BusSubscription, Delivery};
use crate::error::{BusError, HandlerError};

/// Typed processing step attached to a bus subscription.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    type Message: DeserializeOwned + Send;

    /// Short name used in log fields.
    fn name(&self) -> &'static str;

    async fn handle(&self, message: Self::Message) -> Result<(), HandlerError>;
}

/// Retry knobs for [`run_consumer`].
#[derive(Debug, Clone, Copy)]
pub struct ConsumerOptions {
    pub max_attempts: u32,
    pub redelivery_delay: Duration,
    /// Pause after a transport error before reading again.
    pub error_backoff: Duration,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            redelivery_delay: Duration::from_secs(2),
            error_backoff: Duration::from_secs(1),
        }
    }
}

/// What happened to one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Acked,
    Retried,
    DeadLettered,
}

/// # Run Consumer
///
/// Reads deliveries until `shutdown` fires or the subscription closes. A delivery that is
/// already being handled when cancellation arrives is settled before the loop exits.
pub async fn run_consumer<H>(
    mut subscription: Box<dyn BusSubscription>,
    handler: Arc<H>,
    options: ConsumerOptions,
    shutdown: CancellationToken,
) where
    H: MessageHandler + ?Sized,
{
    let topic = subscription.topic();
    info!(%topic, handler = handler.name(), "Consumer started");

    loop {
        let next = tokio::select! {
            _ = shutdown.cancelled() => break,
            next = subscription.next() => next,
        };

        match next {
            Ok(delivery) => {
                if let Err(e) = settle(subscription.as_mut(), handler.as_ref(), &options, delivery).await {
                    warn!(%topic, handler = handler.name(), error = %e, "Failed to settle delivery");
                }
            }
            Err(BusError::Closed) => {
                info!(%topic, handler = handler.name(), "Subscription closed");
                break;
            }
            Err(e) => {
                warn!(%topic, handler = handler.name(), error = %e, "Bus read failed");
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(options.error_backoff) => {}
                }
            }
        }
    }

    info!(%topic, handler = handler.name(), "Consumer stopped");
}

/// Handles one delivery and acknowledges, retries or dead-letters it.
pub async fn settle<H>(
    subscription: &mut dyn BusSubscription,
    handler: &H,
    options: &ConsumerOptions,
    delivery: Delivery,
) -> Result<Settlement, BusError>
where
    H: MessageHandler + ?Sized,
{
    let envelope = &delivery.envelope;

    let message = match serde_json::from_value::<H::Message>(envelope.payload.clone()) {
        Ok(message) => message,
        Err(e) => {
            error!(
                topic = %envelope.topic,
                id = %envelope.id,
                handler = handler.name(),
                error = %e,
                "Undecodable payload, dead-lettering"
            );
            subscription.ack(&delivery).await?;
            return Ok(Settlement::DeadLettered);
        }
    };

    match handler.handle(message).await {
        Ok(()) => {
            debug!(topic = %envelope.topic, id = %envelope.id, attempt = envelope.attempt, "Handled");
            subscription.ack(&delivery).await?;
            Ok(Settlement::Acked)
        }
        Err(e) if envelope.attempt >= options.max_attempts => {
            error!(
                topic = %envelope.topic,
                id = %envelope.id,
                attempt = envelope.attempt,
                handler = handler.name(),
                error = %e,
                "Delivery attempts exhausted, dead-lettering"
            );
            subscription.ack(&delivery).await?;
            Ok(Settlement::DeadLettered)
        }
        Err(e) => {
            warn!(
                topic = %envelope.topic,
                id = %envelope.id,
                attempt = envelope.attempt,
                handler = handler.name(),
                error = %e,
                "Handler failed, scheduling redelivery"
            );
            subscription.nack(&delivery, options.redelivery_delay).await?;
            Ok(Settlement::Retried)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::memory::InMemoryBus;
    use crate::bus::{EventBus, Topic};
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Ping {
        n: u32,
    }

    /// Fails the first `failures` calls, then records what it sees.
    struct Flaky {
        failures: Mutex<u32>,
        seen: Mutex<Vec<u32>>,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures: Mutex::new(failures),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MessageHandler for Flaky {
        type Message = Ping;

        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn handle(&self, message: Ping) -> Result<(), HandlerError> {
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(HandlerError::Other("boom".into()));
            }
            self.seen.lock().push(message.n);
            Ok(())
        }
    }

    fn options(max_attempts: u32) -> ConsumerOptions {
        ConsumerOptions {
            max_attempts,
            redelivery_delay: Duration::ZERO,
            error_backoff: Duration::from_millis(10),
        }
    }

    async fn next_settlement(
        sub: &mut Box<dyn BusSubscription>,
        handler: &Flaky,
        options: &ConsumerOptions,
    ) -> Settlement {
        let delivery = tokio::time::timeout(Duration::from_secs(1), sub.next())
            .await
            .unwrap()
            .unwrap();
        settle(sub.as_mut(), handler, options, delivery).await.unwrap()
    }

    #[tokio::test]
    async fn success_is_acked() {
        let bus = InMemoryBus::new();
        let mut sub = bus.subscribe(Topic::HolidayDetected, "g", "c").await.unwrap();
        let handler = Flaky::new(0);
        bus.publish(Topic::HolidayDetected, json!({"n": 7})).await.unwrap();

        assert_eq!(next_settlement(&mut sub, &handler, &options(3)).await, Settlement::Acked);
        assert_eq!(*handler.seen.lock(), vec![7]);
    }

    #[tokio::test]
    async fn failure_is_retried_until_it_succeeds() {
        let bus = InMemoryBus::new();
        let mut sub = bus.subscribe(Topic::HolidayDetected, "g", "c").await.unwrap();
        let handler = Flaky::new(2);
        let opts = options(5);
        bus.publish(Topic::HolidayDetected, json!({"n": 1})).await.unwrap();

        assert_eq!(next_settlement(&mut sub, &handler, &opts).await, Settlement::Retried);
        assert_eq!(next_settlement(&mut sub, &handler, &opts).await, Settlement::Retried);
        assert_eq!(next_settlement(&mut sub, &handler, &opts).await, Settlement::Acked);
        assert_eq!(*handler.seen.lock(), vec![1]);
    }

    #[tokio::test]
    async fn exhausted_attempts_are_dead_lettered() {
        let bus = InMemoryBus::new();
        let mut sub = bus.subscribe(Topic::HolidayDetected, "g", "c").await.unwrap();
        let handler = Flaky::new(u32::MAX);
        let opts = options(2);
        bus.publish(Topic::HolidayDetected, json!({"n": 1})).await.unwrap();

        assert_eq!(next_settlement(&mut sub, &handler, &opts).await, Settlement::Retried);
        assert_eq!(next_settlement(&mut sub, &handler, &opts).await, Settlement::DeadLettered);

        let nothing = tokio::time::timeout(Duration::from_millis(50), sub.next()).await;
        assert!(nothing.is_err());
    }

    #[tokio::test]
    async fn undecodable_payload_is_dead_lettered_without_calling_handler() {
        let bus = InMemoryBus::new();
        let mut sub = bus.subscribe(Topic::HolidayDetected, "g", "c").await.unwrap();
        let handler = Flaky::new(0);
        bus.publish(Topic::HolidayDetected, json!({"unexpected": true})).await.unwrap();

        assert_eq!(
            next_settlement(&mut sub, &handler, &options(5)).await,
            Settlement::DeadLettered
        );
        assert!(handler.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn run_consumer_stops_on_cancellation() {
        let bus = InMemoryBus::new();
        let sub = bus.subscribe(Topic::HolidayDetected, "g", "c").await.unwrap();
        let handler = Arc::new(Flaky::new(0));
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(run_consumer(sub, Arc::clone(&handler), options(3), shutdown.clone()));
        bus.publish(Topic::HolidayDetected, json!({"n": 3})).await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while handler.seen.lock().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
        assert_eq!(*handler.seen.lock(), vec![3]);
    }
}
