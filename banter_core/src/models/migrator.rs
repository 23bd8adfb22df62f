use sea_orm_migration::prelude::*;

mod m20260815_000001_create_users_table;
mod m20260815_000002_create_entities_table;
mod m20260815_000003_create_comments_table;
mod m20260815_000004_create_follows_table;
mod m20260815_000005_create_lists_table;
mod m20260815_000006_create_reports_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260815_000001_create_users_table::Migration),
            Box::new(m20260815_000002_create_entities_table::Migration),
            Box::new(m20260815_000003_create_comments_table::Migration),
            Box::new(m20260815_000004_create_follows_table::Migration),
            Box::new(m20260815_000005_create_lists_table::Migration),
            Box::new(m20260815_000006_create_reports_table::Migration),
        ]
    }
}

#[cfg(test)]
use sea_orm::{ConnectOptions, Database, DbErr};

#[tokio::test]
async fn test_migrations_okay() -> Result<(), DbErr> {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1);

    let db = Database::connect(opts).await?;
    let schema_manager = SchemaManager::new(&db);

    Migrator::refresh(&db).await?;

    assert!(schema_manager.has_table("user").await?);
    assert!(schema_manager.has_table("entity").await?);
    assert!(schema_manager.has_table("comment").await?);
    assert!(schema_manager.has_table("follow").await?);
    assert!(schema_manager.has_table("list").await?);
    assert!(schema_manager.has_table("report").await?);

    Ok(())
}
