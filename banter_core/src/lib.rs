pub mod config;
pub mod entity;
pub mod feed;
pub mod ids;
pub mod models;
pub mod notifications;
pub mod scoring;
pub mod service;
pub mod test_utils;

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tracing_subscriber::EnvFilter;

use crate::notifications::{LogSink, NotificationSink};
use crate::service::{
    comments::CommentsService, entities::EntitiesService, follows::FollowsService,
    lists::ListsService, reports::ReportsService, users::UsersService,
};

/// Main runtime handle for Banter. Owns the database connection and one
/// service per domain area. Construct one per process and pass it around;
/// cloning is cheap.
#[derive(Clone)]
pub struct BanterCore {
    pub db: DatabaseConnection,

    pub users: UsersService,
    pub entities: EntitiesService,
    pub comments: CommentsService,
    pub follows: FollowsService,
    pub lists: ListsService,
    pub reports: ReportsService,
}

impl BanterCore {
    /// Opens (or creates) the database named by the config, runs migrations,
    /// and wires up the services.
    pub async fn start(config: &config::BanterConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db = models::open_or_create_db(config).await?;
        models::migrate_up(&db).await?;
        Ok(Self::with_connection(db))
    }

    /// Builds the service set over an already-open connection. Notifications
    /// go to the log.
    pub fn with_connection(db: DatabaseConnection) -> Self {
        Self::with_sink(db, Arc::new(LogSink))
    }

    /// Like [`Self::with_connection`] but with a caller-supplied delivery
    /// channel for notification events.
    pub fn with_sink(db: DatabaseConnection, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            users: UsersService::new(db.clone()),
            entities: EntitiesService::new(db.clone(), sink.clone()),
            comments: CommentsService::new(db.clone(), sink.clone()),
            follows: FollowsService::new(db.clone(), sink),
            lists: ListsService::new(db.clone()),
            reports: ReportsService::new(db.clone()),
            db,
        }
    }
}

/// Installs the default tracing subscriber, filtered by RUST_LOG.
/// Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

pub mod prelude {
    pub use super::config;
    pub use super::entity;
    pub use super::feed;
    pub use super::ids;
    pub use super::models;
    pub use super::notifications;
    pub use super::scoring;
    pub use super::service;

    pub use super::{init_tracing, BanterCore};
}
