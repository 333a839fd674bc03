//! # Redis Subscription Store
//!
//! ## Layout:
//! - `{prefix}:subscription:{userId}`: the JSON [`Subscription`] record.
//! - `{prefix}:country:{code}`: a SET of user ids, the reverse index used by the matcher.
//!
//! An upsert rewrites the record and moves the user between country sets in one
//! `MULTI`/`EXEC` pipeline. Lookups cross-check each indexed user against its record, so a
//! stale index entry left by a racing writer never produces a false match.

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::ConnectionManager;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::model::{normalize_country_codes, Subscription};
use crate::store::{validate_user_id, SubscriptionStore};

/// Subscription store persisted in Redis.
pub struct RedisSubscriptionStore {
    conn: ConnectionManager,
    prefix: String,
}

fn backend(e: redis::RedisError) -> StoreError {
    StoreError::Backend(e.to_string())
}

impl RedisSubscriptionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            conn,
            prefix: prefix.into(),
        }
    }

    /// Connects to `url` and builds the store.
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, StoreError> {
        let conn = super::connect(url).await.map_err(backend)?;
        let store = Self::new(conn, prefix);
        info!(prefix = %store.prefix, "Redis subscription store connected");
        Ok(store)
    }

    pub fn subscription_key(&self, user_id: &str) -> String {
        format!("{}:subscription:{user_id}", self.prefix)
    }

    pub fn country_key(&self, country_code: &str) -> String {
        format!("{}:country:{country_code}", self.prefix)
    }

    fn parse(user_id: &str, raw: &str) -> Result<Subscription, StoreError> {
        serde_json::from_str(raw).map_err(|e| StoreError::Corrupt {
            user_id: user_id.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl SubscriptionStore for RedisSubscriptionStore {
    async fn get(&self, user_id: &str) -> Result<Option<Subscription>, StoreError> {
        let user_id = validate_user_id(user_id)?;
        let mut conn = self.conn.clone();

        let raw: Option<String> = redis::cmd("GET")
            .arg(self.subscription_key(user_id))
            .query_async(&mut conn)
            .await
            .map_err(backend)?;

        raw.map(|raw| Self::parse(user_id, &raw)).transpose()
    }

    async fn upsert(&self, user_id: &str, country_codes: &[String]) -> Result<Subscription, StoreError> {
        let user_id = validate_user_id(user_id)?;
        let existing = self.get(user_id).await?;
        let now = Utc::now();

        let subscription = Subscription {
            user_id: user_id.to_string(),
            country_codes: normalize_country_codes(country_codes),
            created_at: existing.as_ref().map_or(now, |s| s.created_at),
            updated_at: now,
        };
        let body = serde_json::to_string(&subscription).map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut pipe = redis::pipe();
        pipe.atomic();
        if let Some(previous) = &existing {
            for code in previous.country_codes.difference(&subscription.country_codes) {
                pipe.cmd("SREM").arg(self.country_key(code)).arg(user_id).ignore();
            }
        }
        for code in &subscription.country_codes {
            pipe.cmd("SADD").arg(self.country_key(code)).arg(user_id).ignore();
        }
        pipe.cmd("SET").arg(self.subscription_key(user_id)).arg(body).ignore();

        let mut conn = self.conn.clone();
        let () = pipe.query_async(&mut conn).await.map_err(backend)?;

        debug!(user_id, codes = ?subscription.country_codes, "Subscription saved");
        Ok(subscription)
    }

    async fn users_subscribed_to(&self, country_code: &str) -> Result<Vec<String>, StoreError> {
        let code = country_code.trim().to_ascii_uppercase();
        if code.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();

        let mut members: Vec<String> = redis::cmd("SMEMBERS")
            .arg(self.country_key(&code))
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        if members.is_empty() {
            return Ok(members);
        }
        members.sort();
        members.dedup();

        let keys: Vec<String> = members.iter().map(|u| self.subscription_key(u)).collect();
        let records: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;

        let mut users = Vec::with_capacity(members.len());
        for (user_id, raw) in members.into_iter().zip(records) {
            let Some(raw) = raw else { continue };
            match Self::parse(&user_id, &raw) {
                Ok(sub) if sub.covers(&code) => users.push(user_id),
                Ok(_) => {}
                Err(e) => warn!(user_id = %user_id, error = %e, "Skipping unreadable subscription"),
            }
        }
        Ok(users)
    }
}
