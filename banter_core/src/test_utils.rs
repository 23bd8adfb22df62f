use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::models::migrator::Migrator;

/// Create a fresh in-memory SQLite database with all migrations applied.
/// The pool is pinned to a single connection so every query in the test
/// sees the same memory instance.
///
/// # Example
/// ```
/// use banter_core::test_utils;
///
/// #[tokio::test]
/// async fn my_test() {
///     let db = test_utils::create_test_db().await;
///     // Database is ready to use!
/// }
/// ```
pub async fn create_test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1);

    let db = Database::connect(opts)
        .await
        .expect("Failed to create test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}
