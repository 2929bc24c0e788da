use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use orderbus_core::health::{healthz, readyz};
use orderbus_core::middleware::request_id_layer;

use crate::handlers::order::order_webhook;
use crate::signature::verify_webhook_signature;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Signature verification covers the ingress webhook only; health probes
    // stay unauthenticated.
    let webhook = Router::new()
        .route("/webhooks/orders", post(order_webhook))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            verify_webhook_signature,
        ));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .merge(webhook)
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(TraceLayer::new_for_http()),
        )
        .with_state(state)
}
