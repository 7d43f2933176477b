use sea_orm_migration::prelude::*;

const UP: &str = include_str!("../../migrations/0002_order_item_stock_reserved.sql");

const DOWN: &str = "ALTER TABLE order_items DROP COLUMN IF EXISTS stock_reserved;";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(UP).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.get_connection().execute_unprepared(DOWN).await?;
        Ok(())
    }
}
