use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::event::OrderEvent;
use crate::domain::repository::{EventPublisher, OrderRepository};
use crate::domain::types::{IngestReceipt, Order, OrderItem};
use crate::error::OrdersServiceError;

pub struct IngestItem {
    pub sku: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

pub struct IngestOrderInput {
    pub order_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub items: Vec<IngestItem>,
    pub shipping_address: String,
    pub total: Decimal,
}

pub struct IngestOrderUseCase<R, P>
where
    R: OrderRepository,
    P: EventPublisher,
{
    pub orders: R,
    pub publisher: P,
}

impl<R, P> IngestOrderUseCase<R, P>
where
    R: OrderRepository,
    P: EventPublisher,
{
    pub async fn execute(
        &self,
        input: IngestOrderInput,
    ) -> Result<IngestReceipt, OrdersServiceError> {
        // 1. Validate → 400 on bad payload, before any side effect
        validate(&input)?;

        // 2. Build order + items with server-assigned ids and timestamp
        let now = Utc::now();
        let order = Order {
            id: Uuid::now_v7(),
            external_ref: input.order_id.clone(),
            customer_name: input.customer_name,
            customer_email: input.customer_email,
            shipping_address: input.shipping_address,
            total: input.total,
            created_at: now,
        };
        let items: Vec<OrderItem> = input
            .items
            .into_iter()
            .map(|item| OrderItem {
                id: Uuid::now_v7(),
                order_id: order.id,
                sku: item.sku,
                name: item.name,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();

        // 3. Persist atomically; a duplicate external_ref is a redelivered
        //    webhook, answered with the original success and no new publish
        match self.orders.create_with_items(&order, &items).await {
            Ok(()) => {}
            Err(OrdersServiceError::DuplicateOrder) => {
                tracing::info!(
                    order_ref = %order.external_ref,
                    "duplicate webhook delivery, answering idempotently"
                );
                return Ok(IngestReceipt {
                    order_id: order.external_ref,
                    duplicate: true,
                });
            }
            Err(e) => return Err(e),
        }
        tracing::info!(order_ref = %order.external_ref, "order created");

        // 4. Publish after commit. The order row and the stream append are
        //    separate resources; on publish failure the order is kept and the
        //    failure is traced with enough context to reconcile manually.
        let event = OrderEvent::created(&order);
        match self.publisher.publish(&event).await {
            Ok(handle) => {
                tracing::info!(
                    order_ref = %order.external_ref,
                    message_id = %handle,
                    "published order.created"
                );
            }
            Err(e) => {
                tracing::error!(
                    order_ref = %order.external_ref,
                    error = %e,
                    "failed to publish order.created; order persisted without event"
                );
            }
        }

        Ok(IngestReceipt {
            order_id: order.external_ref,
            duplicate: false,
        })
    }
}

fn validate(input: &IngestOrderInput) -> Result<(), OrdersServiceError> {
    if input.order_id.trim().is_empty() {
        return Err(OrdersServiceError::InvalidOrder(
            "order_id must not be empty".to_owned(),
        ));
    }
    if input.items.is_empty() {
        return Err(OrdersServiceError::InvalidOrder(
            "order must contain at least one item".to_owned(),
        ));
    }
    for item in &input.items {
        if item.quantity == 0 {
            return Err(OrdersServiceError::InvalidOrder(format!(
                "quantity must be positive for sku {}",
                item.sku
            )));
        }
        // Stored as a signed 32-bit column; anything above that would wrap
        // negative on insert.
        if item.quantity > i32::MAX as u32 {
            return Err(OrdersServiceError::InvalidOrder(format!(
                "quantity exceeds the supported range for sku {}",
                item.sku
            )));
        }
    }
    // Total-vs-items reconciliation is deliberately not enforced; a mismatch
    // is worth an operator's attention but not a rejection.
    let item_sum: Decimal = input
        .items
        .iter()
        .map(|i| Decimal::from(i.quantity) * i.unit_price)
        .sum();
    if item_sum != input.total {
        tracing::warn!(
            order_ref = %input.order_id,
            total = %input.total,
            item_sum = %item_sum,
            "order total does not match sum of line items"
        );
    }
    Ok(())
}
