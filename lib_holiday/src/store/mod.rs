//! # Subscription Store
//!
//! Key-value mapping `userId -> set of countryCode`.
//!
//! - `get` returns `None` for users that never subscribed.
//! - `upsert` replaces the whole code set. The first upsert stamps `created_at`, later
//!   ones keep it and refresh `updated_at`. Concurrent upserts for one user resolve
//!   last-writer-wins.
//! - `users_subscribed_to` returns distinct user ids in ascending order.
//!
//! Subscriptions are never deleted here. An empty code set is a valid subscription.

pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::model::Subscription;

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<Subscription>, StoreError>;

    async fn upsert(&self, user_id: &str, country_codes: &[String]) -> Result<Subscription, StoreError>;

    async fn users_subscribed_to(&self, country_code: &str) -> Result<Vec<String>, StoreError>;
}

/// Rejects blank ids and returns the trimmed form.
pub(crate) fn validate_user_id(user_id: &str) -> Result<&str, StoreError> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(StoreError::EmptyUserId);
    }
    Ok(trimmed)
}
