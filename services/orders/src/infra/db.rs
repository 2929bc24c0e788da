use anyhow::Context as _;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, DatabaseConnection, DatabaseTransaction, DbErr, SqlErr,
    TransactionError, TransactionTrait,
};

use orderbus_orders_schema::{delivery_attempts, order_items, orders};

use crate::domain::repository::{DeliveryLogRepository, OrderRepository};
use crate::domain::types::{DeliveryAttempt, Order, OrderItem};
use crate::error::OrdersServiceError;

// ── Order repository ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbOrderRepository {
    pub db: DatabaseConnection,
}

impl OrderRepository for DbOrderRepository {
    async fn create_with_items(
        &self,
        order: &Order,
        items: &[OrderItem],
    ) -> Result<(), OrdersServiceError> {
        self.db
            .transaction::<_, (), DbErr>(|txn| {
                let order = order.clone();
                let items = items.to_vec();
                Box::pin(async move {
                    insert_order(txn, &order).await?;
                    for item in &items {
                        insert_order_item(txn, item).await?;
                    }
                    Ok(())
                })
            })
            .await
            .map_err(map_create_err)
    }
}

async fn insert_order(txn: &DatabaseTransaction, order: &Order) -> Result<(), DbErr> {
    orders::ActiveModel {
        id: Set(order.id),
        external_ref: Set(order.external_ref.clone()),
        customer_name: Set(order.customer_name.clone()),
        customer_email: Set(order.customer_email.clone()),
        shipping_address: Set(order.shipping_address.clone()),
        total: Set(order.total),
        created_at: Set(order.created_at),
    }
    .insert(txn)
    .await?;
    Ok(())
}

async fn insert_order_item(txn: &DatabaseTransaction, item: &OrderItem) -> Result<(), DbErr> {
    order_items::ActiveModel {
        id: Set(item.id),
        order_id: Set(item.order_id),
        sku: Set(item.sku.clone()),
        name: Set(item.name.clone()),
        quantity: Set(item.quantity as i32),
        unit_price: Set(item.unit_price),
    }
    .insert(txn)
    .await?;
    Ok(())
}

/// A unique-constraint violation on `orders.external_ref` is a redelivered
/// webhook, not a fault — surface it as `DuplicateOrder` so the caller can
/// answer idempotently. Everything else is internal.
fn map_create_err(e: TransactionError<DbErr>) -> OrdersServiceError {
    let db_err = match e {
        TransactionError::Connection(e) => e,
        TransactionError::Transaction(e) => e,
    };
    if matches!(
        db_err.sql_err(),
        Some(SqlErr::UniqueConstraintViolation(_))
    ) {
        OrdersServiceError::DuplicateOrder
    } else {
        OrdersServiceError::Internal(
            anyhow::Error::new(db_err).context("create order with items"),
        )
    }
}

// ── Delivery ledger ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbDeliveryLogRepository {
    pub db: DatabaseConnection,
}

impl DeliveryLogRepository for DbDeliveryLogRepository {
    async fn record(&self, attempt: &DeliveryAttempt) -> Result<(), OrdersServiceError> {
        delivery_attempts::ActiveModel {
            id: Set(attempt.id),
            message_id: Set(attempt.message_id.clone()),
            order_ref: Set(attempt.order_ref.clone()),
            http_status: Set(attempt.http_status),
            attempts: Set(attempt.attempts),
            outcome: Set(attempt.outcome.as_str().to_owned()),
            created_at: Set(attempt.created_at),
        }
        .insert(&self.db)
        .await
        .context("record delivery attempt")?;
        Ok(())
    }
}
