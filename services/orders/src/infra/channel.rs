use std::time::Duration;

use anyhow::Context as _;
use deadpool_redis::Pool;
use deadpool_redis::redis::{self, Value};

use crate::domain::event::{OrderEvent, encode_event};
use crate::domain::repository::{EventPublisher, EventSubscription};
use crate::domain::types::{
    InboundMessage, MessageHandle, PUBLISH_TIMEOUT_SECS, PULL_BATCH, PULL_BLOCK_MS,
    REDELIVERY_IDLE_MS,
};
use crate::error::ChannelError;

/// Stream entry field holding the serialized event.
const BODY_FIELD: &str = "body";

/// Durable event channel backed by a Redis stream with a consumer group.
///
/// Satisfies the channel contract: `XADD` is a durable append, the group's
/// pending-entries list gives each consumer a per-message lease, `XACK`
/// removes a message from the redelivery set, and unacked entries are
/// reclaimed by `XAUTOCLAIM` once idle past the lease timeout.
#[derive(Clone)]
pub struct RedisStreamChannel {
    pool: Pool,
    stream: String,
    group: String,
}

impl RedisStreamChannel {
    pub fn new(pool: Pool, stream: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            pool,
            stream: stream.into(),
            group: group.into(),
        }
    }

    /// Create the consumer group (and the stream, if missing). Idempotent:
    /// an already-existing group is fine. Called once at startup; a failure
    /// here is fatal for the process.
    pub async fn ensure_group(&self) -> Result<(), ChannelError> {
        let mut conn = self.pool.get().await.context("acquire redis connection")?;
        let created = redis::cmd("XGROUP")
            .arg("CREATE")
            .arg(&self.stream)
            .arg(&self.group)
            .arg("$")
            .arg("MKSTREAM")
            .query_async::<Value>(&mut conn)
            .await;
        match created {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(ChannelError::Backend(
                anyhow::Error::new(e).context("create consumer group"),
            )),
        }
    }

    /// A named subscription over this channel's stream, for one consumer
    /// instance within the group.
    pub fn subscription(&self, consumer: impl Into<String>) -> RedisStreamSubscription {
        RedisStreamSubscription {
            pool: self.pool.clone(),
            stream: self.stream.clone(),
            group: self.group.clone(),
            consumer: consumer.into(),
        }
    }
}

impl EventPublisher for RedisStreamChannel {
    /// Append the event and wait at most `PUBLISH_TIMEOUT_SECS` for the
    /// broker's accept. The returned handle is the stream entry id. This
    /// never waits for consumption, only for durable acceptance.
    async fn publish(&self, event: &OrderEvent) -> Result<MessageHandle, ChannelError> {
        let body = encode_event(event)
            .context("encode order event")
            .map_err(ChannelError::Backend)?;

        let append = async {
            let mut conn = self.pool.get().await.context("acquire redis connection")?;
            let id: String = redis::cmd("XADD")
                .arg(&self.stream)
                .arg("*")
                .arg(BODY_FIELD)
                .arg(&body)
                .query_async(&mut conn)
                .await
                .context("xadd event")?;
            Ok::<_, anyhow::Error>(id)
        };

        match tokio::time::timeout(Duration::from_secs(PUBLISH_TIMEOUT_SECS), append).await {
            Ok(Ok(id)) => Ok(MessageHandle(id)),
            Ok(Err(e)) => Err(ChannelError::Backend(e)),
            Err(_) => Err(ChannelError::Timeout),
        }
    }
}

/// One consumer's view of the stream. Pull favors reclaiming stale pending
/// entries (redeliveries) before reading new ones.
pub struct RedisStreamSubscription {
    pool: Pool,
    stream: String,
    group: String,
    consumer: String,
}

impl EventSubscription for RedisStreamSubscription {
    async fn pull(&self) -> Result<Vec<InboundMessage>, ChannelError> {
        let mut conn = self.pool.get().await.context("acquire redis connection")?;

        // Reclaim messages whose lease expired: entries another (or a crashed)
        // consumer pulled but never acked.
        let reclaimed: Value = redis::cmd("XAUTOCLAIM")
            .arg(&self.stream)
            .arg(&self.group)
            .arg(&self.consumer)
            .arg(REDELIVERY_IDLE_MS)
            .arg("0-0")
            .arg("COUNT")
            .arg(PULL_BATCH)
            .query_async(&mut conn)
            .await
            .context("xautoclaim pending entries")?;
        let messages = parse_xautoclaim_reply(&reclaimed);
        if !messages.is_empty() {
            return Ok(messages);
        }

        let fresh: Value = redis::cmd("XREADGROUP")
            .arg("GROUP")
            .arg(&self.group)
            .arg(&self.consumer)
            .arg("COUNT")
            .arg(PULL_BATCH)
            .arg("BLOCK")
            .arg(PULL_BLOCK_MS)
            .arg("STREAMS")
            .arg(&self.stream)
            .arg(">")
            .query_async(&mut conn)
            .await
            .context("xreadgroup new entries")?;
        Ok(parse_xreadgroup_reply(&fresh))
    }

    async fn ack(&self, handle: &MessageHandle) -> Result<(), ChannelError> {
        let mut conn = self.pool.get().await.context("acquire redis connection")?;
        let _: i64 = redis::cmd("XACK")
            .arg(&self.stream)
            .arg(&self.group)
            .arg(&handle.0)
            .query_async(&mut conn)
            .await
            .context("xack message")?;
        Ok(())
    }
}

// ── Reply parsing ────────────────────────────────────────────────────────────
// Redis replies are untyped nested arrays; these helpers tolerate Nil and
// unexpected shapes by skipping rather than failing, since a malformed entry
// must not wedge the pull loop.

fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Some(s.clone()),
        _ => None,
    }
}

fn as_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::BulkString(bytes) => Some(bytes.clone()),
        Value::SimpleString(s) => Some(s.clone().into_bytes()),
        _ => None,
    }
}

/// One entry: `[id, [field, value, ...]]`. Only the `body` field matters.
fn parse_entry(value: &Value) -> Option<InboundMessage> {
    let Value::Array(parts) = value else {
        return None;
    };
    let id = as_string(parts.first()?)?;
    let Value::Array(fields) = parts.get(1)? else {
        return None;
    };
    let payload = fields
        .chunks_exact(2)
        .find(|pair| as_string(&pair[0]).as_deref() == Some(BODY_FIELD))
        .and_then(|pair| as_bytes(&pair[1]))?;
    Some(InboundMessage {
        handle: MessageHandle(id),
        payload,
    })
}

fn parse_entry_list(value: &Value) -> Vec<InboundMessage> {
    match value {
        Value::Array(entries) => entries.iter().filter_map(parse_entry).collect(),
        _ => Vec::new(),
    }
}

/// `XREADGROUP` reply: Nil on block timeout, otherwise
/// `[[stream_name, [entry, ...]], ...]` (a single stream here).
fn parse_xreadgroup_reply(value: &Value) -> Vec<InboundMessage> {
    let Value::Array(streams) = value else {
        return Vec::new();
    };
    streams
        .iter()
        .filter_map(|stream| match stream {
            Value::Array(parts) => parts.get(1),
            _ => None,
        })
        .flat_map(parse_entry_list)
        .collect()
}

/// `XAUTOCLAIM` reply: `[next_cursor, [entry, ...], ...]`.
fn parse_xautoclaim_reply(value: &Value) -> Vec<InboundMessage> {
    let Value::Array(parts) = value else {
        return Vec::new();
    };
    parts.get(1).map(parse_entry_list).unwrap_or_default()
}
