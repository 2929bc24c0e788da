use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::types::Order;

/// Event kind tag carried in every wire message.
pub const ORDER_CREATED: &str = "order.created";

/// The `order.created` message as it travels over the channel.
///
/// The wire format is pinned: `total` is a string with exactly two decimal
/// places and timestamps are RFC 3339. Decoding fails closed — unknown
/// fields or an unknown `event` tag are poison, not something to guess at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderEvent {
    pub event: String,
    pub order_id: String,
    pub customer_name: String,
    pub total: String,
    #[serde(serialize_with = "orderbus_core::serde::to_rfc3339_ms")]
    pub created_at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn created(order: &Order) -> Self {
        Self {
            event: ORDER_CREATED.to_owned(),
            order_id: order.external_ref.clone(),
            customer_name: order.customer_name.clone(),
            total: format_total(order.total),
            created_at: order.created_at,
        }
    }
}

/// Outbound webhook body POSTed to the downstream callback. Same shape as
/// the event except the timestamp is the send time, not the creation time.
#[derive(Debug, Clone, Serialize)]
pub struct EgressPayload {
    pub event: String,
    pub order_id: String,
    pub customer_name: String,
    pub total: String,
    #[serde(serialize_with = "orderbus_core::serde::to_rfc3339_ms")]
    pub sent_at: DateTime<Utc>,
}

impl EgressPayload {
    pub fn from_event(event: &OrderEvent, sent_at: DateTime<Utc>) -> Self {
        Self {
            event: event.event.clone(),
            order_id: event.order_id.clone(),
            customer_name: event.customer_name.clone(),
            total: event.total.clone(),
            sent_at,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported event kind: {0}")]
    UnknownKind(String),
}

/// Fixed two-decimal-place money rendering ("300.00", not "300").
pub fn format_total(total: Decimal) -> String {
    format!("{:.2}", total.round_dp(2))
}

pub fn encode_event(event: &OrderEvent) -> Result<Vec<u8>, WireError> {
    Ok(serde_json::to_vec(event)?)
}

pub fn decode_event(payload: &[u8]) -> Result<OrderEvent, WireError> {
    let event: OrderEvent = serde_json::from_slice(payload)?;
    if event.event != ORDER_CREATED {
        return Err(WireError::UnknownKind(event.event));
    }
    Ok(event)
}
