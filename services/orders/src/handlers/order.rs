use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::WithRejection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::OrdersServiceError;
use crate::state::AppState;
use crate::usecase::ingest::{IngestItem, IngestOrderInput, IngestOrderUseCase};

// ── POST /webhooks/orders ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct OrderWebhookRequest {
    pub order_id: String,
    pub customer: CustomerPayload,
    pub items: Vec<ItemPayload>,
    pub shipping_address: String,
    pub total: Decimal,
}

#[derive(Deserialize)]
pub struct CustomerPayload {
    pub name: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct ItemPayload {
    pub sku: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

#[derive(Serialize)]
pub struct OrderWebhookResponse {
    pub ok: bool,
    pub order_id: String,
}

/// Webhook ingress: validate, persist, publish. A redelivered `order_id`
/// gets the same 201 body as the first delivery, so retrying producers see
/// success instead of a spurious conflict.
pub async fn order_webhook(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<OrderWebhookRequest>, OrdersServiceError>,
) -> Result<(StatusCode, Json<OrderWebhookResponse>), OrdersServiceError> {
    let usecase = IngestOrderUseCase {
        orders: state.order_repo(),
        publisher: state.publisher(),
    };
    let receipt = usecase
        .execute(IngestOrderInput {
            order_id: body.order_id,
            customer_name: body.customer.name,
            customer_email: body.customer.email,
            items: body
                .items
                .into_iter()
                .map(|item| IngestItem {
                    sku: item.sku,
                    name: item.name,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
            shipping_address: body.shipping_address,
            total: body.total,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderWebhookResponse {
            ok: true,
            order_id: receipt.order_id,
        }),
    ))
}
