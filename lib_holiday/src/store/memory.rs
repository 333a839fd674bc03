//! In-process subscription store backed by a `parking_lot::RwLock`.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use tracing::debug;

use super::{validate_user_id, SubscriptionStore};
use crate::error::StoreError;
use crate::model::{normalize_country_codes, Subscription};

#[derive(Default)]
pub struct InMemorySubscriptionStore {
    subscriptions: RwLock<HashMap<String, Subscription>>,
}

impl InMemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.read().is_empty()
    }
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn get(&self, user_id: &str) -> Result<Option<Subscription>, StoreError> {
        Ok(self.subscriptions.read().get(user_id.trim()).cloned())
    }

    async fn upsert(&self, user_id: &str, country_codes: &[String]) -> Result<Subscription, StoreError> {
        let user_id = validate_user_id(user_id)?;
        let codes = normalize_country_codes(country_codes);
        let now = Utc::now();

        let mut subscriptions = self.subscriptions.write();
        let entry = subscriptions
            .entry(user_id.to_string())
            .and_modify(|s| {
                s.country_codes = codes.clone();
                s.updated_at = now;
            })
            .or_insert_with(|| Subscription {
                user_id: user_id.to_string(),
                country_codes: codes.clone(),
                created_at: now,
                updated_at: now,
            });

        debug!(user_id, countries = ?entry.country_codes, "Subscription upserted");
        Ok(entry.clone())
    }

    async fn users_subscribed_to(&self, country_code: &str) -> Result<Vec<String>, StoreError> {
        let code = country_code.trim().to_ascii_uppercase();
        let users: BTreeSet<String> = self
            .subscriptions
            .read()
            .values()
            .filter(|s| s.covers(&code))
            .map(|s| s.user_id.clone())
            .collect();
        Ok(users.into_iter().collect())
    }
}
