use std::sync::Arc;

use anyhow::{bail, Context, Result};
use lib_holiday::bus::memory::InMemoryBus;
use lib_holiday::bus::EventBus;
use lib_holiday::configs::{MonitorSettings, Role};
use lib_holiday::connections::redis_bus::{RedisBusOptions, RedisStreamBus};
use lib_holiday::connections::redis_store::RedisSubscriptionStore;
use lib_holiday::store::memory::InMemorySubscriptionStore;
use lib_holiday::store::SubscriptionStore;
use tracing::info;

/// Shared transports of one process.
pub struct Backends {
    pub bus: Arc<dyn EventBus>,
    pub store: Arc<dyn SubscriptionStore>,
}

/// Picks Redis when a URL is configured, otherwise the in-process bus and store.
///
/// Single-stage roles only make sense across processes, so they require Redis.
pub async fn connect(settings: &MonitorSettings) -> Result<Backends> {
    let Some(url) = settings.redis_url.as_deref() else {
        if settings.role != Role::All {
            bail!("role '{}' needs a Redis URL (HM_REDIS_URL)", settings.role);
        }
        info!("Using in-memory bus and subscription store");
        return Ok(Backends {
            bus: Arc::new(InMemoryBus::new()),
            store: Arc::new(InMemorySubscriptionStore::new()),
        });
    };

    let conn = lib_holiday::connections::connect(url)
        .await
        .with_context(|| format!("cannot connect to Redis at {url}"))?;

    let options = RedisBusOptions {
        prefix: settings.stream_prefix.clone(),
        ..RedisBusOptions::default()
    };
    info!(prefix = %settings.stream_prefix, "Using Redis bus and subscription store");

    Ok(Backends {
        bus: Arc::new(RedisStreamBus::new(conn.clone(), options)),
        store: Arc::new(RedisSubscriptionStore::new(conn, settings.stream_prefix.clone())),
    })
}
