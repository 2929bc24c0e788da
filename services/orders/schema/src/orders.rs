use sea_orm::entity::prelude::*;

/// Order received from an external system. `external_ref` is the caller's
/// order id and doubles as the idempotency key — the unique constraint is
/// what closes the race between two concurrent deliveries of the same
/// webhook.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub external_ref: String,
    pub customer_name: String,
    pub customer_email: String,
    pub shipping_address: String,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub total: rust_decimal::Decimal,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
