use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Order received from an external system, persisted exactly once.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    /// Caller-supplied order id; unique, doubles as the idempotency key.
    pub external_ref: String,
    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: String,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Line item belonging to exactly one order.
#[derive(Debug, Clone)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub sku: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Result of ingesting a webhook: the echoed order id and whether the
/// payload was a redelivery of an already-stored order.
#[derive(Debug, Clone)]
pub struct IngestReceipt {
    pub order_id: String,
    pub duplicate: bool,
}

/// Opaque channel message id, returned on publish and used to ack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHandle(pub String);

impl std::fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message pulled from a subscription; unacknowledged until the consumer
/// decides its disposition.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub handle: MessageHandle,
    pub payload: Vec<u8>,
}

/// Terminal classification of one egress dispatch (after local retries).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Downstream answered 2xx.
    Delivered,
    /// Transient failure (5xx, 429, connect error, timeout) and the local
    /// retry budget is spent; channel redelivery takes over.
    RetryableFailure,
    /// Downstream rejected the payload (4xx other than 429); retrying will
    /// not help.
    PermanentFailure,
}

impl DeliveryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::RetryableFailure => "retries_exhausted",
            Self::PermanentFailure => "rejected",
        }
    }
}

/// What the dispatcher reports back to the consumer for one message.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub outcome: DeliveryOutcome,
    pub attempts: u32,
    /// Last HTTP status seen, if any response arrived at all.
    pub last_status: Option<u16>,
}

/// Ledger row recording one consumer processing attempt.
#[derive(Debug, Clone)]
pub struct DeliveryAttempt {
    pub id: Uuid,
    pub message_id: String,
    pub order_ref: String,
    pub http_status: Option<i16>,
    pub attempts: i32,
    pub outcome: DeliveryOutcome,
    pub created_at: DateTime<Utc>,
}

/// How long the publisher waits for the broker's durable accept.
pub const PUBLISH_TIMEOUT_SECS: u64 = 2;

/// Local dispatch attempts before handing retries back to the channel.
pub const MAX_DELIVERY_ATTEMPTS: u32 = 3;

/// Base backoff between local dispatch attempts; doubles each retry.
pub const BACKOFF_BASE_MS: u64 = 200;

/// Per-request timeout for the egress HTTP POST.
pub const EGRESS_TIMEOUT_SECS: u64 = 5;

/// Idle time after which an unacked message is reclaimed for redelivery.
pub const REDELIVERY_IDLE_MS: u64 = 30_000;

/// How long a pull blocks waiting for new messages.
pub const PULL_BLOCK_MS: u64 = 5_000;

/// Maximum messages fetched per pull.
pub const PULL_BATCH: usize = 10;
