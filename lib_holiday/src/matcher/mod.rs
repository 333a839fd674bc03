//! # Subscription Matcher
//!
//! Consumes `holiday.detected`, resolves who subscribed to the event's country with a single
//! store lookup, and publishes one `NotifyCommand` on `notify.users`. No subscribers means no
//! command. Store and publish failures are returned so the bus redelivers the event.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::bus::consumer::MessageHandler;
use crate::bus::{publish_message, EventBus, Topic};
use crate::error::HandlerError;
use crate::model::{HolidayDetected, NotifyCommand};
use crate::store::SubscriptionStore;

pub struct SubscriptionMatcher {
    store: Arc<dyn SubscriptionStore>,
    bus: Arc<dyn EventBus>,
}

impl SubscriptionMatcher {
    pub fn new(store: Arc<dyn SubscriptionStore>, bus: Arc<dyn EventBus>) -> Self {
        Self { store, bus }
    }

    /// Resolves subscribers for `event` and publishes the fan-out command.
    ///
    /// Returns the published command, or `None` when nobody subscribed.
    pub async fn match_event(&self, event: HolidayDetected) -> Result<Option<NotifyCommand>, HandlerError> {
        let user_ids = self.store.users_subscribed_to(&event.country_code).await?;

        if user_ids.is_empty() {
            debug!(country = %event.country_code, date = %event.date, "No subscribers, nothing to notify");
            return Ok(None);
        }

        let command = NotifyCommand::new(user_ids, event);
        publish_message(self.bus.as_ref(), Topic::NotifyUsers, &command).await?;

        debug!(
            country = %command.holiday.country_code,
            recipients = command.user_ids.len(),
            "Notify command published"
        );
        Ok(Some(command))
    }
}

#[async_trait]
impl MessageHandler for SubscriptionMatcher {
    type Message = HolidayDetected;

    fn name(&self) -> &'static str {
        "subscription-matcher"
    }

    async fn handle(&self, message: HolidayDetected) -> Result<(), HandlerError> {
        self.match_event(message).await.map(|_| ())
    }
}
