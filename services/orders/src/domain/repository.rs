#![allow(async_fn_in_trait)]

use crate::domain::event::{EgressPayload, OrderEvent};
use crate::domain::types::{
    DeliveryAttempt, DeliveryReport, InboundMessage, MessageHandle, Order, OrderItem,
};
use crate::error::{ChannelError, OrdersServiceError};

/// Store for orders and their line items.
pub trait OrderRepository: Send + Sync {
    /// Insert the order and all its items in a single transaction; either
    /// every row commits or none do. A duplicate `external_ref` yields
    /// `OrdersServiceError::DuplicateOrder`, never a generic failure, so the
    /// caller can treat retried webhook deliveries as no-ops.
    async fn create_with_items(
        &self,
        order: &Order,
        items: &[OrderItem],
    ) -> Result<(), OrdersServiceError>;
}

/// Append-only ledger of consumer delivery attempts.
pub trait DeliveryLogRepository: Send + Sync {
    async fn record(&self, attempt: &DeliveryAttempt) -> Result<(), OrdersServiceError>;
}

/// Hands an event to the durable channel. Success means the broker accepted
/// the message durably, not that anyone consumed it.
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &OrderEvent) -> Result<MessageHandle, ChannelError>;
}

/// A named, independently-acknowledged view over the channel's messages.
/// Unacked messages come back on a later pull once their lease expires.
pub trait EventSubscription: Send + Sync {
    async fn pull(&self) -> Result<Vec<InboundMessage>, ChannelError>;
    async fn ack(&self, handle: &MessageHandle) -> Result<(), ChannelError>;
}

/// Performs the outbound HTTP delivery, including its local retry budget.
/// Classification of the outcome is the dispatcher's job; what to do with it
/// (ack or hold) is the consumer's.
pub trait EgressDispatcher: Send + Sync {
    async fn deliver(&self, payload: &EgressPayload, url: &str) -> DeliveryReport;
}
