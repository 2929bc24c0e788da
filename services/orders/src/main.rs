use sea_orm::Database;
use tokio::sync::watch;
use tracing::info;

use orderbus_orders::config::OrdersConfig;
use orderbus_orders::consumer::RelayConsumer;
use orderbus_orders::infra::channel::RedisStreamChannel;
use orderbus_orders::infra::db::DbDeliveryLogRepository;
use orderbus_orders::infra::webhook::HttpEgressDispatcher;
use orderbus_orders::router::build_router;
use orderbus_orders::signature::WebhookVerifier;
use orderbus_orders::state::AppState;

#[tokio::main]
async fn main() {
    orderbus_core::tracing::init_tracing();

    let config = OrdersConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let redis_cfg = deadpool_redis::Config::from_url(&config.redis_url);
    let redis = redis_cfg
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .expect("failed to create Redis pool");

    let channel = RedisStreamChannel::new(
        redis,
        config.event_topic.clone(),
        config.event_subscription.clone(),
    );
    // Startup-fatal on purpose: without the group there is nothing to relay.
    channel
        .ensure_group()
        .await
        .expect("failed to create channel consumer group");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn the relay consumer alongside the HTTP server. It shares nothing
    // mutable with the ingress path beyond the store and the channel.
    let consumer = RelayConsumer {
        subscription: channel.subscription(config.consumer_name.clone()),
        dispatcher: HttpEgressDispatcher::new(),
        deliveries: DbDeliveryLogRepository { db: db.clone() },
        callback_url: config.downstream_webhook_url.clone(),
    };
    let consumer_handle = tokio::spawn(async move { consumer.run(shutdown_rx).await });

    let state = AppState {
        db,
        channel,
        verifier: WebhookVerifier::new(config.webhook_secret.clone()),
    };
    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.orders_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("orders service listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .expect("server error");

    // Let the consumer finish its in-flight batch before the process exits.
    let _ = consumer_handle.await;
}

async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received, draining");
    let _ = shutdown_tx.send(true);
}
