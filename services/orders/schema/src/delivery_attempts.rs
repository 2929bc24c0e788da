use sea_orm::entity::prelude::*;

/// One row per consumer processing attempt of a channel message. Append-only
/// ledger for operator visibility; never read on the hot path.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "delivery_attempts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Channel message id (Redis stream entry id).
    pub message_id: String,
    pub order_ref: String,
    /// Last downstream HTTP status, if a response was received at all.
    pub http_status: Option<i16>,
    pub attempts: i32,
    /// "delivered" | "retries_exhausted" | "rejected"
    pub outcome: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
