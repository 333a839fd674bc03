//! # Pipeline Wiring
//!
//! Spawns the long-running tasks of each stage. Every task observes the same
//! `CancellationToken`, so cancelling it drains the whole pipeline.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bus::consumer::{run_consumer, ConsumerOptions};
use crate::bus::{dispatcher_group, EventBus, Topic, MATCHER_GROUP};
use crate::error::BusError;
use crate::matcher::SubscriptionMatcher;
use crate::poller::HolidayPoller;
use crate::realtime::NotificationDispatcher;
use crate::store::SubscriptionStore;

/// Starts the poll loop.
pub fn spawn_poller(poller: Arc<HolidayPoller>, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move { poller.run(shutdown).await })
}

/// Joins the matcher group on `holiday.detected` and starts consuming.
pub async fn spawn_matcher(
    bus: Arc<dyn EventBus>,
    store: Arc<dyn SubscriptionStore>,
    consumer: &str,
    options: ConsumerOptions,
    shutdown: CancellationToken,
) -> Result<JoinHandle<()>, BusError> {
    let subscription = bus.subscribe(Topic::HolidayDetected, MATCHER_GROUP, consumer).await?;
    let matcher = Arc::new(SubscriptionMatcher::new(store, bus));
    Ok(tokio::spawn(run_consumer(subscription, matcher, options, shutdown)))
}

/// Joins this instance's dispatcher group on `notify.users` and starts consuming.
pub async fn spawn_dispatcher(
    bus: Arc<dyn EventBus>,
    dispatcher: Arc<NotificationDispatcher>,
    instance: &str,
    options: ConsumerOptions,
    shutdown: CancellationToken,
) -> Result<JoinHandle<()>, BusError> {
    let group = dispatcher_group(instance);
    let subscription = bus.subscribe(Topic::NotifyUsers, &group, instance).await?;
    Ok(tokio::spawn(run_consumer(subscription, dispatcher, options, shutdown)))
}
