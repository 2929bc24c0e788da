use sea_orm_migration::prelude::*;

mod m20260815_000001_create_orders;
mod m20260815_000002_create_order_items;
mod m20260815_000003_create_delivery_attempts;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260815_000001_create_orders::Migration),
            Box::new(m20260815_000002_create_order_items::Migration),
            Box::new(m20260815_000003_create_delivery_attempts::Migration),
        ]
    }
}
