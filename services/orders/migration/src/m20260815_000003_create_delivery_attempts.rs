use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeliveryAttempts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeliveryAttempts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(DeliveryAttempts::MessageId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryAttempts::OrderRef)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DeliveryAttempts::HttpStatus).small_integer())
                    .col(
                        ColumnDef::new(DeliveryAttempts::Attempts)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DeliveryAttempts::Outcome).string().not_null())
                    .col(
                        ColumnDef::new(DeliveryAttempts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Index for operator queries ("what happened to order X?").
        manager
            .create_index(
                Index::create()
                    .table(DeliveryAttempts::Table)
                    .col(DeliveryAttempts::OrderRef)
                    .name("idx_delivery_attempts_order_ref")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeliveryAttempts::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum DeliveryAttempts {
    Table,
    Id,
    MessageId,
    OrderRef,
    HttpStatus,
    Attempts,
    Outcome,
    CreatedAt,
}
