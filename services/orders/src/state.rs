use sea_orm::DatabaseConnection;

use crate::infra::channel::RedisStreamChannel;
use crate::infra::db::DbOrderRepository;
use crate::signature::WebhookVerifier;

/// Shared application state passed to every handler via axum `State`.
/// The database connection, channel client, and signature verifier are
/// constructed once at startup and reused for the life of the process.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub channel: RedisStreamChannel,
    pub verifier: WebhookVerifier,
}

impl AppState {
    pub fn order_repo(&self) -> DbOrderRepository {
        DbOrderRepository {
            db: self.db.clone(),
        }
    }

    pub fn publisher(&self) -> RedisStreamChannel {
        self.channel.clone()
    }
}
