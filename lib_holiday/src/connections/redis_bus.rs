//! # Redis Streams Event Bus
//!
//! One stream per topic, keyed `{prefix}:{topic}`. Every entry carries a single field,
//! `envelope`, holding the JSON [`Envelope`].
//!
//! ## Consumer groups:
//! - Groups are created on first subscribe with `XGROUP CREATE ... $ MKSTREAM`, so a group
//!   sees entries appended after it exists.
//! - A consumer first walks its own pending entries (left unacknowledged by a previous run
//!   under the same consumer name), then switches to new entries (`>`).
//! - Every `claim_min_idle`, a consumer sweeps the group with `XAUTOCLAIM` and takes over
//!   entries another consumer has held for at least that long. This recovers work left
//!   behind by a consumer name that never comes back.
//! - `ack` is `XACK`. `nack` waits the redelivery delay, appends a copy with
//!   `attempt + 1`, then acknowledges the original. If the process dies during the wait,
//!   the original stays pending and is recovered on restart.
//!
//! Reads are non-blocking and polled at `poll_interval`.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::streams::{StreamAutoClaimReply, StreamId, StreamReadReply};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::bus::{BusSubscription, Delivery, Envelope, EventBus, Topic};
use crate::error::BusError;

/// Entry field holding the serialized envelope.
pub const ENVELOPE_FIELD: &str = "envelope";

const READ_BATCH: usize = 16;

/// `XAUTOCLAIM` start id; the server hands it back once a sweep has covered the group.
const CLAIM_SCAN_START: &str = "0-0";

/// Tuning for [`RedisStreamBus`].
#[derive(Debug, Clone)]
pub struct RedisBusOptions {
    /// Key prefix shared by all streams.
    pub prefix: String,
    /// Sleep between reads when a stream has nothing new.
    pub poll_interval: Duration,
    /// Approximate cap on entries retained per stream (`MAXLEN ~`).
    pub max_stream_len: usize,
    /// Idle time after which another consumer's pending entry may be claimed. Also the
    /// period between claim sweeps.
    pub claim_min_idle: Duration,
}

impl Default for RedisBusOptions {
    fn default() -> Self {
        Self {
            prefix: "holiday-monitor".to_string(),
            poll_interval: Duration::from_millis(250),
            max_stream_len: 10_000,
            claim_min_idle: Duration::from_secs(60),
        }
    }
}

/// Stream key of `topic` under `prefix`.
pub fn stream_key(prefix: &str, topic: Topic) -> String {
    format!("{prefix}:{topic}")
}

fn encode(envelope: &Envelope) -> Result<String, BusError> {
    Ok(serde_json::to_string(envelope)?)
}

fn decode(raw: &str) -> Result<Envelope, BusError> {
    Ok(serde_json::from_str(raw)?)
}

async fn append(conn: &mut ConnectionManager, key: &str, max_len: usize, body: &str) -> redis::RedisResult<String> {
    redis::cmd("XADD")
        .arg(key)
        .arg("MAXLEN")
        .arg("~")
        .arg(max_len)
        .arg("*")
        .arg(ENVELOPE_FIELD)
        .arg(body)
        .query_async(conn)
        .await
}

async fn acknowledge(conn: &mut ConnectionManager, key: &str, group: &str, entry_id: &str) -> redis::RedisResult<i64> {
    redis::cmd("XACK").arg(key).arg(group).arg(entry_id).query_async(conn).await
}

/// Event bus over Redis Streams.
pub struct RedisStreamBus {
    conn: ConnectionManager,
    options: RedisBusOptions,
}

impl RedisStreamBus {
    pub fn new(conn: ConnectionManager, options: RedisBusOptions) -> Self {
        Self { conn, options }
    }

    /// Connects to `url` and builds the bus.
    pub async fn connect(url: &str, options: RedisBusOptions) -> Result<Self, BusError> {
        let conn = super::connect(url).await.map_err(|e| BusError::Consume {
            topic: "*".to_string(),
            reason: format!("redis connect failed: {e}"),
        })?;
        info!(prefix = %options.prefix, "Redis stream bus connected");
        Ok(Self::new(conn, options))
    }

    pub fn stream_key(&self, topic: Topic) -> String {
        stream_key(&self.options.prefix, topic)
    }

    async fn ensure_group(&self, key: &str, group: &str) -> redis::RedisResult<()> {
        let mut conn = self.conn.clone();
        let created: redis::RedisResult<()> = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(key)
            .arg(group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async(&mut conn)
            .await;

        match created {
            Ok(()) => {
                info!(stream = key, group, "Consumer group created");
                Ok(())
            }
            Err(e) if e.code() == Some("BUSYGROUP") => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl EventBus for RedisStreamBus {
    async fn publish(&self, topic: Topic, payload: serde_json::Value) -> Result<Uuid, BusError> {
        let envelope = Envelope::new(topic, payload);
        let body = encode(&envelope)?;
        let key = self.stream_key(topic);
        let mut conn = self.conn.clone();

        let entry_id = append(&mut conn, &key, self.options.max_stream_len, &body)
            .await
            .map_err(|e| BusError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;

        debug!(%topic, id = %envelope.id, entry_id, "Published to stream");
        Ok(envelope.id)
    }

    async fn subscribe(
        &self,
        topic: Topic,
        group: &str,
        consumer: &str,
    ) -> Result<Box<dyn BusSubscription>, BusError> {
        let key = self.stream_key(topic);
        self.ensure_group(&key, group).await.map_err(|e| BusError::Consume {
            topic: topic.to_string(),
            reason: format!("group creation failed: {e}"),
        })?;

        Ok(Box::new(RedisStreamSubscription {
            conn: self.conn.clone(),
            topic,
            key,
            group: group.to_string(),
            consumer: consumer.to_string(),
            poll_interval: self.options.poll_interval,
            max_stream_len: self.options.max_stream_len,
            claim_min_idle: self.options.claim_min_idle,
            pending_cursor: Some("0".to_string()),
            claim_cursor: CLAIM_SCAN_START.to_string(),
            last_claim_sweep: None,
            buffered: VecDeque::new(),
        }))
    }
}

/// A consumer's membership in a stream group.
pub struct RedisStreamSubscription {
    conn: ConnectionManager,
    topic: Topic,
    key: String,
    group: String,
    consumer: String,
    poll_interval: Duration,
    max_stream_len: usize,
    claim_min_idle: Duration,
    /// Position in this consumer's pending list while recovering; `None` once caught up.
    pending_cursor: Option<String>,
    /// Position of the running `XAUTOCLAIM` sweep.
    claim_cursor: String,
    /// When the last sweep finished; `None` before the first.
    last_claim_sweep: Option<Instant>,
    buffered: VecDeque<Delivery>,
}

impl RedisStreamSubscription {
    fn consume_error(&self, reason: impl std::fmt::Display) -> BusError {
        BusError::Consume {
            topic: self.topic.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Reads one batch from `start` and buffers decodable entries. Returns the number of
    /// entries the server handed out (decodable or not) and the last entry id seen.
    async fn read_batch(&mut self, start: &str) -> Result<(usize, Option<String>), BusError> {
        let reply: Option<StreamReadReply> = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.group)
            .arg(&self.consumer)
            .arg("COUNT")
            .arg(READ_BATCH)
            .arg("STREAMS")
            .arg(&self.key)
            .arg(start)
            .query_async(&mut self.conn)
            .await
            .map_err(|e| self.consume_error(e))?;

        let ids: Vec<StreamId> = reply
            .map(|r| r.keys.into_iter().flat_map(|stream| stream.ids).collect())
            .unwrap_or_default();
        let seen = ids.len();
        let last_id = ids.last().map(|entry| entry.id.clone());
        self.buffer_entries(ids).await;

        Ok((seen, last_id))
    }

    /// Buffers decodable entries; unreadable ones are dead-lettered with an `XACK`.
    async fn buffer_entries(&mut self, ids: Vec<StreamId>) {
        for entry in ids {
            let parsed = entry
                .get::<String>(ENVELOPE_FIELD)
                .ok_or_else(|| self.consume_error("entry has no envelope field"))
                .and_then(|raw| decode(&raw));

            match parsed {
                Ok(envelope) => self.buffered.push_back(Delivery {
                    envelope,
                    receipt: entry.id,
                }),
                Err(e) => {
                    error!(stream = %self.key, entry_id = %entry.id, error = %e, "Unreadable entry, dead-lettering");
                    if let Err(e) = acknowledge(&mut self.conn, &self.key, &self.group, &entry.id).await {
                        warn!(stream = %self.key, entry_id = %entry.id, error = %e, "Failed to ack unreadable entry");
                    }
                }
            }
        }
    }

    fn claim_sweep_due(&self) -> bool {
        self.claim_cursor != CLAIM_SCAN_START
            || self
                .last_claim_sweep
                .map_or(true, |at| at.elapsed() >= self.claim_min_idle)
    }

    /// Takes over one batch of entries other consumers have left idle for at least
    /// `claim_min_idle`. Returns how many were claimed.
    async fn claim_idle(&mut self) -> Result<usize, BusError> {
        let min_idle_ms = u64::try_from(self.claim_min_idle.as_millis()).unwrap_or(u64::MAX);
        let reply: StreamAutoClaimReply = redis::cmd("XAUTOCLAIM")
            .arg(&self.key)
            .arg(&self.group)
            .arg(&self.consumer)
            .arg(min_idle_ms)
            .arg(&self.claim_cursor)
            .arg("COUNT")
            .arg(READ_BATCH)
            .query_async(&mut self.conn)
            .await
            .map_err(|e| self.consume_error(e))?;

        self.claim_cursor = reply.next_stream_id;
        if self.claim_cursor == CLAIM_SCAN_START {
            self.last_claim_sweep = Some(Instant::now());
        }

        let claimed = reply.claimed.len();
        if claimed > 0 {
            info!(stream = %self.key, consumer = %self.consumer, claimed, "Claimed idle entries from other consumers");
        }
        self.buffer_entries(reply.claimed).await;
        Ok(claimed)
    }
}

#[async_trait]
impl BusSubscription for RedisStreamSubscription {
    fn topic(&self) -> Topic {
        self.topic
    }

    async fn next(&mut self) -> Result<Delivery, BusError> {
        loop {
            if let Some(delivery) = self.buffered.pop_front() {
                return Ok(delivery);
            }

            match self.pending_cursor.clone() {
                Some(cursor) => {
                    let (seen, last_id) = self.read_batch(&cursor).await?;
                    if seen == 0 {
                        debug!(stream = %self.key, consumer = %self.consumer, "Pending entries recovered");
                        self.pending_cursor = None;
                    } else {
                        self.pending_cursor = last_id;
                    }
                }
                None if self.claim_sweep_due() => {
                    if let Err(e) = self.claim_idle().await {
                        warn!(stream = %self.key, error = %e, "Idle entry sweep failed, retrying later");
                        self.claim_cursor = CLAIM_SCAN_START.to_string();
                        self.last_claim_sweep = Some(Instant::now());
                    }
                }
                None => {
                    let (seen, _) = self.read_batch(">").await?;
                    if seen == 0 {
                        tokio::time::sleep(self.poll_interval).await;
                    }
                }
            }
        }
    }

    async fn ack(&mut self, delivery: &Delivery) -> Result<(), BusError> {
        acknowledge(&mut self.conn, &self.key, &self.group, &delivery.receipt)
            .await
            .map(|_| ())
            .map_err(|e| BusError::Ack {
                id: delivery.receipt.clone(),
                reason: e.to_string(),
            })
    }

    async fn nack(&mut self, delivery: &Delivery, delay: Duration) -> Result<(), BusError> {
        let mut conn = self.conn.clone();
        let key = self.key.clone();
        let group = self.group.clone();
        let max_len = self.max_stream_len;
        let entry_id = delivery.receipt.clone();
        let body = encode(&delivery.envelope.redelivery())?;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match append(&mut conn, &key, max_len, &body).await {
                Ok(_) => {
                    if let Err(e) = acknowledge(&mut conn, &key, &group, &entry_id).await {
                        warn!(stream = %key, entry_id = %entry_id, error = %e, "Failed to ack redelivered entry");
                    }
                }
                Err(e) => {
                    warn!(stream = %key, entry_id = %entry_id, error = %e, "Redelivery append failed, entry stays pending");
                }
            }
        });
        Ok(())
    }
}
