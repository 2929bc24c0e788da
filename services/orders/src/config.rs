/// Orders service configuration loaded from environment variables.
///
/// Read once at process start; never re-read at runtime.
#[derive(Debug, Clone)]
pub struct OrdersConfig {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// Redis connection URL (event channel backend).
    pub redis_url: String,
    /// TCP port to listen on (default 3200). Env var: `ORDERS_PORT`.
    pub orders_port: u16,
    /// Stream key events are published to (default "orderbus.orders").
    /// Env var: `EVENT_TOPIC`.
    pub event_topic: String,
    /// Consumer group the relay reads from (default "order-relay").
    /// Env var: `EVENT_SUBSCRIPTION`.
    pub event_subscription: String,
    /// Consumer name within the group (default "relay-1"). Must be unique per
    /// instance when scaling horizontally. Env var: `CONSUMER_NAME`.
    pub consumer_name: String,
    /// Downstream callback URL the consumer POSTs delivered events to.
    /// Env var: `DOWNSTREAM_WEBHOOK_URL`.
    pub downstream_webhook_url: String,
    /// Shared secret for ingress `x-webhook-signature` verification. Unset
    /// means signatures are not checked (development). Env var:
    /// `WEBHOOK_SECRET`.
    pub webhook_secret: Option<String>,
}

impl OrdersConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL").expect("DATABASE_URL"),
            redis_url: std::env::var("REDIS_URL").expect("REDIS_URL"),
            orders_port: std::env::var("ORDERS_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3200),
            event_topic: std::env::var("EVENT_TOPIC")
                .unwrap_or_else(|_| "orderbus.orders".to_owned()),
            event_subscription: std::env::var("EVENT_SUBSCRIPTION")
                .unwrap_or_else(|_| "order-relay".to_owned()),
            consumer_name: std::env::var("CONSUMER_NAME")
                .unwrap_or_else(|_| "relay-1".to_owned()),
            downstream_webhook_url: std::env::var("DOWNSTREAM_WEBHOOK_URL")
                .expect("DOWNSTREAM_WEBHOOK_URL"),
            webhook_secret: std::env::var("WEBHOOK_SECRET").ok(),
        }
    }
}
