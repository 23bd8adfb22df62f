use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine;
use chrono::Utc;
use sea_orm::{sea_query::Expr, DatabaseConnection};
use thiserror::Error;

use crate::{
    entity::prelude::*,
    feed::{FeedError, FeedQuery},
    ids::{EntityId, ProjectId, UserId},
    notifications::{notify, NotificationEvent, NotificationSink},
    scoring::{spawn_rescore, INITIAL_SCORE},
    service::{
        adjust_reputation, blank_to_none, Actor, VoteOp, REP_CREATE_ENTITY, REP_DOWNVOTE,
        REP_UPVOTE,
    },
};

pub const MAX_TITLE_CHARS: usize = 300;
pub const MAX_CONTENT_CHARS: usize = 100_000;
pub const MAX_METADATA_BYTES: usize = 10_240;

#[derive(Debug, Error)]
pub enum EntitiesServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("entity not found")]
    EntityNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("title longer than 300 characters")]
    TitleTooLong,

    #[error("content longer than 100000 characters")]
    ContentTooLong,

    #[error("metadata larger than 10240 bytes")]
    MetadataTooLarge,

    #[error("already upvoted")]
    AlreadyUpvoted,

    #[error("already downvoted")]
    AlreadyDownvoted,

    #[error("no upvote to remove")]
    NotUpvoted,

    #[error("no downvote to remove")]
    NotDownvoted,

    #[error("unauthorized: not entity author")]
    Unauthorized,
}

#[derive(Debug, Clone, Default)]
pub struct CreateEntity {
    pub user_id: Option<UserId>,
    pub foreign_id: Option<String>,
    pub source_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub keywords: Vec<String>,
    pub mentions: Vec<String>,
    pub attachments: Vec<serde_json::Value>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub metadata: Option<serde_json::Value>,
}

/// Fields are applied only when present.
#[derive(Debug, Clone, Default)]
pub struct UpdateEntity {
    pub title: Option<String>,
    pub content: Option<String>,
    pub keywords: Option<Vec<String>>,
    pub attachments: Option<Vec<serde_json::Value>>,
    /// `Value::Null` clears the stored metadata.
    pub metadata: Option<serde_json::Value>,
}

/// Read result: the entity together with its derived reply count.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityWithReplies {
    pub entity: EntityModel,
    pub replies_count: u64,
}

#[derive(Clone)]
pub struct EntitiesService {
    db: DatabaseConnection,
    sink: Arc<dyn NotificationSink>,
}

impl EntitiesService {
    pub fn new(db: DatabaseConnection, sink: Arc<dyn NotificationSink>) -> Self {
        Self { db, sink }
    }

    pub async fn create(
        &self,
        project_id: ProjectId,
        input: CreateEntity,
    ) -> Result<EntityModel, EntitiesServiceError> {
        let title = blank_to_none(input.title);
        if let Some(title) = &title {
            if title.chars().count() > MAX_TITLE_CHARS {
                return Err(EntitiesServiceError::TitleTooLong);
            }
        }

        let content = blank_to_none(input.content);
        if let Some(content) = &content {
            if content.chars().count() > MAX_CONTENT_CHARS {
                return Err(EntitiesServiceError::ContentTooLong);
            }
        }

        validate_metadata(&input.metadata)?;

        if let Some(author) = input.user_id {
            let author_exists = Users::find_by_id(author)
                .filter(UserColumn::ProjectId.eq(project_id))
                .one(&self.db)
                .await?
                .is_some();
            if !author_exists {
                return Err(EntitiesServiceError::UserNotFound);
            }
        }

        let id = EntityId::new();
        let now = Utc::now();

        let entity = EntityActiveModel {
            id: Set(id),
            project_id: Set(project_id),
            user_id: Set(input.user_id),
            short_id: Set(short_id_for(id)),
            foreign_id: Set(blank_to_none(input.foreign_id)),
            source_id: Set(blank_to_none(input.source_id)),
            title: Set(title),
            content: Set(content),
            attachments: Set(Attachments(input.attachments)),
            mentions: Set(Mentions(input.mentions)),
            keywords: Set(Keywords::normalized(input.keywords)),
            upvotes: Set(UserIdSet::default()),
            downvotes: Set(UserIdSet::default()),
            shares_count: Set(0),
            views: Set(1),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            score: Set(INITIAL_SCORE),
            score_updated_at: Set(now),
            metadata: Set(input.metadata),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        };

        let txn = self.db.begin().await?;
        let created = Entities::insert(entity).exec_with_returning(&txn).await?;
        if let Some(author) = created.user_id {
            adjust_reputation(&txn, author, REP_CREATE_ENTITY).await?;
        }
        txn.commit().await?;

        Ok(created)
    }

    pub async fn get(
        &self,
        project_id: ProjectId,
        entity_id: EntityId,
    ) -> Result<EntityWithReplies, EntitiesServiceError> {
        let entity = self.find_active(project_id, entity_id).await?;
        self.finish_read(entity).await
    }

    pub async fn get_by_short_id(
        &self,
        project_id: ProjectId,
        short_id: &str,
    ) -> Result<EntityWithReplies, EntitiesServiceError> {
        let entity = Entities::find()
            .filter(EntityColumn::ProjectId.eq(project_id))
            .filter(EntityColumn::ShortId.eq(short_id))
            .filter(EntityColumn::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or(EntitiesServiceError::EntityNotFound)?;
        self.finish_read(entity).await
    }

    /// Lookup by the caller's own identifier, optionally creating an
    /// authorless placeholder entity on first access.
    pub async fn get_by_foreign_id(
        &self,
        project_id: ProjectId,
        foreign_id: &str,
        create_if_missing: bool,
    ) -> Result<EntityWithReplies, EntitiesServiceError> {
        let existing = Entities::find()
            .filter(EntityColumn::ProjectId.eq(project_id))
            .filter(EntityColumn::ForeignId.eq(foreign_id))
            .filter(EntityColumn::DeletedAt.is_null())
            .one(&self.db)
            .await?;

        let entity = match existing {
            Some(entity) => entity,
            None if create_if_missing => {
                self.create(
                    project_id,
                    CreateEntity {
                        foreign_id: Some(foreign_id.to_owned()),
                        ..Default::default()
                    },
                )
                .await?
            }
            None => return Err(EntitiesServiceError::EntityNotFound),
        };

        self.finish_read(entity).await
    }

    pub async fn list(
        &self,
        query: FeedQuery,
    ) -> Result<Vec<EntityWithReplies>, EntitiesServiceError> {
        let entities = query.into_select()?.all(&self.db).await?;

        let ids: Vec<EntityId> = entities.iter().map(|entity| entity.id).collect();
        let counts = self.replies_counts(&ids).await?;

        spawn_rescore(self.db.clone(), entities.clone());

        Ok(entities
            .into_iter()
            .map(|entity| {
                let replies_count = counts.get(&entity.id).copied().unwrap_or(0);
                EntityWithReplies {
                    entity,
                    replies_count,
                }
            })
            .collect())
    }

    pub async fn update(
        &self,
        actor: Actor,
        project_id: ProjectId,
        entity_id: EntityId,
        input: UpdateEntity,
    ) -> Result<EntityModel, EntitiesServiceError> {
        let entity = self.find_active(project_id, entity_id).await?;
        authorize(&actor, entity.user_id)?;

        let mut active: EntityActiveModel = entity.into();

        if let Some(title) = input.title {
            let title = blank_to_none(Some(title));
            if let Some(title) = &title {
                if title.chars().count() > MAX_TITLE_CHARS {
                    return Err(EntitiesServiceError::TitleTooLong);
                }
            }
            active.title = Set(title);
        }

        if let Some(content) = input.content {
            let content = blank_to_none(Some(content));
            if let Some(content) = &content {
                if content.chars().count() > MAX_CONTENT_CHARS {
                    return Err(EntitiesServiceError::ContentTooLong);
                }
            }
            active.content = Set(content);
        }

        if let Some(keywords) = input.keywords {
            active.keywords = Set(Keywords::normalized(keywords));
        }

        if let Some(attachments) = input.attachments {
            active.attachments = Set(Attachments(attachments));
        }

        if let Some(metadata) = input.metadata {
            if metadata.is_null() {
                active.metadata = Set(None);
            } else {
                let metadata = Some(metadata);
                validate_metadata(&metadata)?;
                active.metadata = Set(metadata);
            }
        }

        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    /// Bumps the view counter. Views only ever increase.
    pub async fn increment_views(
        &self,
        project_id: ProjectId,
        entity_id: EntityId,
    ) -> Result<(), EntitiesServiceError> {
        let result = Entities::update_many()
            .col_expr(EntityColumn::Views, Expr::col(EntityColumn::Views).add(1))
            .filter(EntityColumn::Id.eq(entity_id))
            .filter(EntityColumn::ProjectId.eq(project_id))
            .filter(EntityColumn::DeletedAt.is_null())
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(EntitiesServiceError::EntityNotFound);
        }
        Ok(())
    }

    pub async fn upvote(
        &self,
        project_id: ProjectId,
        entity_id: EntityId,
        voter: UserId,
    ) -> Result<EntityModel, EntitiesServiceError> {
        self.apply_vote(project_id, entity_id, voter, VoteOp::Up)
            .await
    }

    pub async fn downvote(
        &self,
        project_id: ProjectId,
        entity_id: EntityId,
        voter: UserId,
    ) -> Result<EntityModel, EntitiesServiceError> {
        self.apply_vote(project_id, entity_id, voter, VoteOp::Down)
            .await
    }

    pub async fn remove_upvote(
        &self,
        project_id: ProjectId,
        entity_id: EntityId,
        voter: UserId,
    ) -> Result<EntityModel, EntitiesServiceError> {
        self.apply_vote(project_id, entity_id, voter, VoteOp::RemoveUp)
            .await
    }

    pub async fn remove_downvote(
        &self,
        project_id: ProjectId,
        entity_id: EntityId,
        voter: UserId,
    ) -> Result<EntityModel, EntitiesServiceError> {
        self.apply_vote(project_id, entity_id, voter, VoteOp::RemoveDown)
            .await
    }

    /// Soft delete by the author or a master caller. The author gives back
    /// the reputation earned at creation.
    pub async fn delete(
        &self,
        actor: Actor,
        project_id: ProjectId,
        entity_id: EntityId,
    ) -> Result<(), EntitiesServiceError> {
        let txn = self.db.begin().await?;

        let entity = Entities::find_by_id(entity_id)
            .filter(EntityColumn::ProjectId.eq(project_id))
            .filter(EntityColumn::DeletedAt.is_null())
            .one(&txn)
            .await?
            .ok_or(EntitiesServiceError::EntityNotFound)?;

        authorize(&actor, entity.user_id)?;

        let author = entity.user_id;
        let mut active: EntityActiveModel = entity.into();
        active.deleted_at = Set(Some(Utc::now()));
        active.update(&txn).await?;

        if let Some(author) = author {
            adjust_reputation(&txn, author, -REP_CREATE_ENTITY).await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn apply_vote(
        &self,
        project_id: ProjectId,
        entity_id: EntityId,
        voter: UserId,
        op: VoteOp,
    ) -> Result<EntityModel, EntitiesServiceError> {
        let txn = self.db.begin().await?;

        let entity = Entities::find_by_id(entity_id)
            .filter(EntityColumn::ProjectId.eq(project_id))
            .filter(EntityColumn::DeletedAt.is_null())
            .one(&txn)
            .await?
            .ok_or(EntitiesServiceError::EntityNotFound)?;

        let mut upvotes = entity.upvotes.clone();
        let mut downvotes = entity.downvotes.clone();
        let mut delta = 0;

        match op {
            VoteOp::Up => {
                if !upvotes.insert(voter) {
                    return Err(EntitiesServiceError::AlreadyUpvoted);
                }
                delta += REP_UPVOTE;
                if downvotes.remove(&voter) {
                    delta -= REP_DOWNVOTE;
                }
            }
            VoteOp::Down => {
                if !downvotes.insert(voter) {
                    return Err(EntitiesServiceError::AlreadyDownvoted);
                }
                delta += REP_DOWNVOTE;
                if upvotes.remove(&voter) {
                    delta -= REP_UPVOTE;
                }
            }
            VoteOp::RemoveUp => {
                if !upvotes.remove(&voter) {
                    return Err(EntitiesServiceError::NotUpvoted);
                }
                delta -= REP_UPVOTE;
            }
            VoteOp::RemoveDown => {
                if !downvotes.remove(&voter) {
                    return Err(EntitiesServiceError::NotDownvoted);
                }
                delta -= REP_DOWNVOTE;
            }
        }

        let author = entity.user_id;
        let mut active: EntityActiveModel = entity.into();
        active.upvotes = Set(upvotes);
        active.downvotes = Set(downvotes);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        if let Some(author) = author {
            adjust_reputation(&txn, author, delta).await?;
        }

        txn.commit().await?;

        if op == VoteOp::Up {
            notify(
                self.sink.clone(),
                NotificationEvent::EntityUpvote {
                    entity_id,
                    author,
                    voter,
                },
            );
        }

        Ok(updated)
    }

    async fn find_active(
        &self,
        project_id: ProjectId,
        entity_id: EntityId,
    ) -> Result<EntityModel, EntitiesServiceError> {
        Entities::find_by_id(entity_id)
            .filter(EntityColumn::ProjectId.eq(project_id))
            .filter(EntityColumn::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or(EntitiesServiceError::EntityNotFound)
    }

    /// Attach the derived reply count and kick off a background rescore.
    async fn finish_read(
        &self,
        entity: EntityModel,
    ) -> Result<EntityWithReplies, EntitiesServiceError> {
        let counts = self.replies_counts(&[entity.id]).await?;
        let replies_count = counts.get(&entity.id).copied().unwrap_or(0);

        spawn_rescore(self.db.clone(), vec![entity.clone()]);

        Ok(EntityWithReplies {
            entity,
            replies_count,
        })
    }

    async fn replies_counts(
        &self,
        ids: &[EntityId],
    ) -> Result<HashMap<EntityId, u64>, DbErr> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(EntityId, i64)> = Comments::find()
            .select_only()
            .column(CommentColumn::EntityId)
            .column_as(CommentColumn::Id.count(), "replies")
            .filter(CommentColumn::EntityId.is_in(ids.iter().copied()))
            .filter(CommentColumn::DeletedAt.is_null())
            .filter(CommentColumn::ParentDeletedAt.is_null())
            .group_by(CommentColumn::EntityId)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, count as u64))
            .collect())
    }
}

fn authorize(actor: &Actor, owner: Option<UserId>) -> Result<(), EntitiesServiceError> {
    if actor.is_master || owner == Some(actor.user_id) {
        Ok(())
    } else {
        Err(EntitiesServiceError::Unauthorized)
    }
}

fn validate_metadata(
    metadata: &Option<serde_json::Value>,
) -> Result<(), EntitiesServiceError> {
    if let Some(metadata) = metadata {
        let size = serde_json::to_string(metadata)
            .map(|json| json.len())
            .unwrap_or(usize::MAX);
        if size > MAX_METADATA_BYTES {
            return Err(EntitiesServiceError::MetadataTooLarge);
        }
    }
    Ok(())
}

fn short_id_for(id: EntityId) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(id.as_uuid().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{GeoFilter, Page, SortBy, TimeFrame};
    use crate::notifications::LogSink;
    use crate::service::follows::FollowsService;
    use crate::service::users::{CreateUser, UsersService};
    use crate::test_utils::create_test_db;
    use chrono::{Duration, Utc};

    async fn setup() -> (EntitiesService, UsersService, ProjectId) {
        let db = create_test_db().await;
        let entities = EntitiesService::new(db.clone(), Arc::new(LogSink));
        let users = UsersService::new(db);
        (entities, users, ProjectId::new())
    }

    async fn create_user(users: &UsersService, project_id: ProjectId, handle: &str) -> UserId {
        users
            .create(
                project_id,
                CreateUser {
                    username: Some(handle.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .id
    }

    /// Seed row with test defaults. Tests override the fields under
    /// scrutiny and insert with [`insert_seed`].
    fn seed(project_id: ProjectId) -> EntityActiveModel {
        let id = EntityId::new();
        let now = Utc::now();
        EntityActiveModel {
            id: Set(id),
            project_id: Set(project_id),
            user_id: Set(None),
            short_id: Set(short_id_for(id)),
            foreign_id: Set(None),
            source_id: Set(None),
            title: Set(None),
            content: Set(None),
            attachments: Set(Attachments::default()),
            mentions: Set(Mentions::default()),
            keywords: Set(Keywords::default()),
            upvotes: Set(UserIdSet::default()),
            downvotes: Set(UserIdSet::default()),
            shares_count: Set(0),
            views: Set(1),
            latitude: Set(None),
            longitude: Set(None),
            score: Set(INITIAL_SCORE),
            // Recent enough that background rescores are debounced away
            score_updated_at: Set(now),
            metadata: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
    }

    async fn insert_seed(service: &EntitiesService, entity: EntityActiveModel) -> EntityModel {
        Entities::insert(entity)
            .exec_with_returning(&service.db)
            .await
            .unwrap()
    }

    fn votes(count: usize) -> UserIdSet {
        UserIdSet((0..count).map(|_| UserId::new()).collect())
    }

    #[tokio::test]
    async fn test_create_entity_defaults_and_reputation() {
        let (entities, users, project_id) = setup().await;
        let author = create_user(&users, project_id, "author").await;

        let created = entities
            .create(
                project_id,
                CreateEntity {
                    user_id: Some(author),
                    title: Some("First post".to_string()),
                    keywords: vec!["  rust ".to_string(), "".to_string()],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(created.score, 2.0);
        assert_eq!(created.views, 1);
        assert_eq!(created.shares_count, 0);
        assert!(created.upvotes.is_empty());
        assert_eq!(created.keywords.0, vec!["rust"]);
        assert!(!created.short_id.is_empty());

        let author_row = users.get(project_id, author).await.unwrap();
        assert_eq!(author_row.reputation, REP_CREATE_ENTITY);
    }

    #[tokio::test]
    async fn test_create_rejects_oversized_fields() {
        let (entities, _, project_id) = setup().await;

        let result = entities
            .create(
                project_id,
                CreateEntity {
                    title: Some("x".repeat(MAX_TITLE_CHARS + 1)),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(EntitiesServiceError::TitleTooLong)));

        let result = entities
            .create(
                project_id,
                CreateEntity {
                    content: Some("x".repeat(MAX_CONTENT_CHARS + 1)),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(EntitiesServiceError::ContentTooLong)));

        let result = entities
            .create(
                project_id,
                CreateEntity {
                    metadata: Some(serde_json::json!({
                        "blob": "y".repeat(MAX_METADATA_BYTES)
                    })),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(
            result,
            Err(EntitiesServiceError::MetadataTooLarge)
        ));
    }

    #[tokio::test]
    async fn test_get_by_short_id() {
        let (entities, _, project_id) = setup().await;

        let created = entities
            .create(project_id, CreateEntity::default())
            .await
            .unwrap();

        let fetched = entities
            .get_by_short_id(project_id, &created.short_id)
            .await
            .unwrap();
        assert_eq!(fetched.entity.id, created.id);
        assert_eq!(fetched.replies_count, 0);
    }

    #[tokio::test]
    async fn test_get_by_foreign_id_creates_on_demand() {
        let (entities, _, project_id) = setup().await;

        let missing = entities
            .get_by_foreign_id(project_id, "article-9", false)
            .await;
        assert!(matches!(
            missing,
            Err(EntitiesServiceError::EntityNotFound)
        ));

        let created = entities
            .get_by_foreign_id(project_id, "article-9", true)
            .await
            .unwrap();
        assert_eq!(created.entity.foreign_id.as_deref(), Some("article-9"));
        assert!(created.entity.user_id.is_none());

        let again = entities
            .get_by_foreign_id(project_id, "article-9", true)
            .await
            .unwrap();
        assert_eq!(again.entity.id, created.entity.id);
    }

    #[tokio::test]
    async fn test_vote_exclusivity_and_idempotency() {
        let (entities, users, project_id) = setup().await;
        let author = create_user(&users, project_id, "author").await;
        let voter = create_user(&users, project_id, "voter").await;

        let entity = entities
            .create(
                project_id,
                CreateEntity {
                    user_id: Some(author),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let after_up = entities.upvote(project_id, entity.id, voter).await.unwrap();
        assert!(after_up.upvotes.contains(&voter));

        // A second identical vote conflicts
        let repeat = entities.upvote(project_id, entity.id, voter).await;
        assert!(matches!(
            repeat,
            Err(EntitiesServiceError::AlreadyUpvoted)
        ));

        // Switching sides removes the opposing vote atomically
        let after_down = entities
            .downvote(project_id, entity.id, voter)
            .await
            .unwrap();
        assert!(!after_down.upvotes.contains(&voter));
        assert!(after_down.downvotes.contains(&voter));

        // +5 create, +1 up, then switch (-1 up, -1 down) = 4
        let author_row = users.get(project_id, author).await.unwrap();
        assert_eq!(author_row.reputation, 4);

        let not_voted = entities
            .remove_upvote(project_id, entity.id, voter)
            .await;
        assert!(matches!(not_voted, Err(EntitiesServiceError::NotUpvoted)));

        let cleared = entities
            .remove_downvote(project_id, entity.id, voter)
            .await
            .unwrap();
        assert!(cleared.downvotes.is_empty());

        let author_row = users.get(project_id, author).await.unwrap();
        assert_eq!(author_row.reputation, REP_CREATE_ENTITY);
    }

    #[tokio::test]
    async fn test_delete_is_soft_and_owner_only() {
        let (entities, users, project_id) = setup().await;
        let author = create_user(&users, project_id, "author").await;
        let outsider = create_user(&users, project_id, "outsider").await;

        let entity = entities
            .create(
                project_id,
                CreateEntity {
                    user_id: Some(author),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let denied = entities
            .delete(Actor::user(outsider), project_id, entity.id)
            .await;
        assert!(matches!(denied, Err(EntitiesServiceError::Unauthorized)));

        entities
            .delete(Actor::user(author), project_id, entity.id)
            .await
            .unwrap();

        let gone = entities.get(project_id, entity.id).await;
        assert!(matches!(gone, Err(EntitiesServiceError::EntityNotFound)));

        // Row still exists, only tombstoned
        let row = Entities::find_by_id(entity.id)
            .one(&entities.db)
            .await
            .unwrap()
            .unwrap();
        assert!(row.deleted_at.is_some());

        let author_row = users.get(project_id, author).await.unwrap();
        assert_eq!(author_row.reputation, 0);

        // Master can delete rows it does not own
        let other = entities
            .create(
                project_id,
                CreateEntity {
                    user_id: Some(author),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        entities
            .delete(Actor::master(outsider), project_id, other.id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_increment_views() {
        let (entities, _, project_id) = setup().await;
        let entity = entities
            .create(project_id, CreateEntity::default())
            .await
            .unwrap();

        entities
            .increment_views(project_id, entity.id)
            .await
            .unwrap();
        entities
            .increment_views(project_id, entity.id)
            .await
            .unwrap();

        let fetched = entities.get(project_id, entity.id).await.unwrap();
        assert_eq!(fetched.entity.views, 3);
    }

    #[tokio::test]
    async fn test_top_and_hot_are_independent_orderings() {
        let (entities, _, project_id) = setup().await;

        // e1: many votes but low score, e2: few votes but high score
        let mut fresh = seed(project_id);
        fresh.created_at = Set(Utc::now() - Duration::hours(1));
        fresh.score = Set(1.0);
        fresh.upvotes = Set(votes(10));
        let e1 = insert_seed(&entities, fresh).await;

        let mut aged = seed(project_id);
        aged.created_at = Set(Utc::now() - Duration::hours(47));
        aged.score = Set(5.0);
        aged.upvotes = Set(votes(2));
        let e2 = insert_seed(&entities, aged).await;

        let mut top = FeedQuery::new(project_id);
        top.sort = SortBy::Top;
        let top_rows = entities.list(top).await.unwrap();
        assert_eq!(top_rows[0].entity.id, e1.id);
        assert_eq!(top_rows[1].entity.id, e2.id);

        let mut hot = FeedQuery::new(project_id);
        hot.sort = SortBy::Hot;
        let hot_rows = entities.list(hot).await.unwrap();
        assert_eq!(hot_rows[0].entity.id, e2.id);
        assert_eq!(hot_rows[1].entity.id, e1.id);
    }

    #[tokio::test]
    async fn test_list_pagination_and_keyword_filter() {
        let (entities, _, project_id) = setup().await;

        for i in 0..5 {
            entities
                .create(
                    project_id,
                    CreateEntity {
                        title: Some(format!("Post {i}")),
                        keywords: if i % 2 == 0 {
                            vec!["even".to_string()]
                        } else {
                            vec!["odd".to_string()]
                        },
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
        }

        let mut query = FeedQuery::new(project_id);
        query.sort = SortBy::New;
        query.page = Page::new(1, 2);
        let page1 = entities.list(query.clone()).await.unwrap();
        assert_eq!(page1.len(), 2);

        query.page = Page::new(3, 2);
        let page3 = entities.list(query).await.unwrap();
        assert_eq!(page3.len(), 1);

        let mut evens = FeedQuery::new(project_id);
        evens.keywords_include = vec!["even".to_string()];
        let rows = entities.list(evens).await.unwrap();
        assert_eq!(rows.len(), 3);

        let mut no_odds = FeedQuery::new(project_id);
        no_odds.keywords_exclude = vec!["odd".to_string()];
        let rows = entities.list(no_odds).await.unwrap();
        assert_eq!(rows.len(), 3);

        let mut oversized = FeedQuery::new(project_id);
        oversized.page = Page::new(0, 10);
        let err = entities.list(oversized).await;
        assert!(matches!(
            err,
            Err(EntitiesServiceError::Feed(FeedError::InvalidPage))
        ));
    }

    #[tokio::test]
    async fn test_controversial_ranks_balanced_votes_first() {
        let (entities, _, project_id) = setup().await;

        let mut split = seed(project_id);
        split.upvotes = Set(votes(1));
        split.downvotes = Set(votes(1));
        let balanced = insert_seed(&entities, split).await;

        let mut lopsided = seed(project_id);
        lopsided.upvotes = Set(votes(1));
        let one_sided = insert_seed(&entities, lopsided).await;

        let mut query = FeedQuery::new(project_id);
        query.sort = SortBy::Controversial;
        let rows = entities.list(query).await.unwrap();
        assert_eq!(rows[0].entity.id, balanced.id);
        assert_eq!(rows[1].entity.id, one_sided.id);
    }

    #[tokio::test]
    async fn test_geo_radius_filter() {
        let (entities, _, project_id) = setup().await;

        let mut origin = seed(project_id);
        origin.latitude = Set(Some(0.0));
        origin.longitude = Set(Some(0.0));
        let near = insert_seed(&entities, origin).await;

        let mut distant = seed(project_id);
        distant.latitude = Set(Some(10.0));
        distant.longitude = Set(Some(10.0));
        insert_seed(&entities, distant).await;

        // Rows without coordinates never match a geo filter
        insert_seed(&entities, seed(project_id)).await;

        let mut query = FeedQuery::new(project_id);
        query.geo = Some(GeoFilter {
            latitude: 0.5,
            longitude: 0.5,
            radius_meters: 100_000.0,
        });
        let rows = entities.list(query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity.id, near.id);
    }

    #[tokio::test]
    async fn test_title_text_filter() {
        let (entities, _, project_id) = setup().await;

        entities
            .create(
                project_id,
                CreateEntity {
                    title: Some("Alpha release".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        entities
            .create(
                project_id,
                CreateEntity {
                    title: Some("Beta notes".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        // Untitled rows pass exclusion filters
        entities
            .create(project_id, CreateEntity::default())
            .await
            .unwrap();

        let mut query = FeedQuery::new(project_id);
        query.title.includes = vec!["alpha".to_string()];
        let rows = entities.list(query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity.title.as_deref(), Some("Alpha release"));

        let mut query = FeedQuery::new(project_id);
        query.title.does_not_include = vec!["beta".to_string()];
        let rows = entities.list(query).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_metadata_filters() {
        let (entities, _, project_id) = setup().await;

        entities
            .create(
                project_id,
                CreateEntity {
                    metadata: Some(serde_json::json!({ "pinned": true, "lang": "en" })),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        entities
            .create(
                project_id,
                CreateEntity {
                    metadata: Some(serde_json::json!({ "pinned": false })),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        entities
            .create(project_id, CreateEntity::default())
            .await
            .unwrap();

        let mut query = FeedQuery::new(project_id);
        query.metadata.includes = vec![("pinned".to_string(), serde_json::json!(true))];
        let rows = entities.list(query).await.unwrap();
        assert_eq!(rows.len(), 1);

        // Both the pinned=false row and the metadata-less row pass
        let mut query = FeedQuery::new(project_id);
        query.metadata.does_not_include = vec![("pinned".to_string(), serde_json::json!(true))];
        let rows = entities.list(query).await.unwrap();
        assert_eq!(rows.len(), 2);

        let mut query = FeedQuery::new(project_id);
        query.metadata.exists = vec!["lang".to_string()];
        let rows = entities.list(query).await.unwrap();
        assert_eq!(rows.len(), 1);

        let mut query = FeedQuery::new(project_id);
        query.metadata.does_not_exist = vec!["lang".to_string()];
        let rows = entities.list(query).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn test_followed_only_feed() {
        let (entities, users, project_id) = setup().await;
        let follows = FollowsService::new(entities.db.clone(), Arc::new(LogSink));

        let alice = create_user(&users, project_id, "alice").await;
        let bob = create_user(&users, project_id, "bob").await;
        let carol = create_user(&users, project_id, "carol").await;

        follows.follow(project_id, alice, bob).await.unwrap();

        let from_bob = entities
            .create(
                project_id,
                CreateEntity {
                    user_id: Some(bob),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        entities
            .create(
                project_id,
                CreateEntity {
                    user_id: Some(carol),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let mut query = FeedQuery::new(project_id);
        query.followed_only_for = Some(alice);
        let rows = entities.list(query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity.id, from_bob.id);
    }

    #[tokio::test]
    async fn test_time_frame_window() {
        let (entities, _, project_id) = setup().await;

        let mut stale = seed(project_id);
        stale.created_at = Set(Utc::now() - Duration::hours(2));
        insert_seed(&entities, stale).await;

        let fresh = entities
            .create(project_id, CreateEntity::default())
            .await
            .unwrap();

        let mut query = FeedQuery::new(project_id);
        query.time_frame = Some(TimeFrame::Hour);
        let rows = entities.list(query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity.id, fresh.id);

        let all = entities.list(FeedQuery::new(project_id)).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_update_clears_metadata_with_null() {
        let (entities, users, project_id) = setup().await;
        let author = create_user(&users, project_id, "author").await;

        let entity = entities
            .create(
                project_id,
                CreateEntity {
                    user_id: Some(author),
                    metadata: Some(serde_json::json!({ "pinned": true })),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let cleared = entities
            .update(
                Actor::user(author),
                project_id,
                entity.id,
                UpdateEntity {
                    metadata: Some(serde_json::Value::Null),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.metadata.is_none());
    }

    #[tokio::test]
    async fn test_update_owner_only() {
        let (entities, users, project_id) = setup().await;
        let author = create_user(&users, project_id, "author").await;
        let outsider = create_user(&users, project_id, "outsider").await;

        let entity = entities
            .create(
                project_id,
                CreateEntity {
                    user_id: Some(author),
                    title: Some("Original".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let denied = entities
            .update(
                Actor::user(outsider),
                project_id,
                entity.id,
                UpdateEntity {
                    title: Some("Hijacked".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(denied, Err(EntitiesServiceError::Unauthorized)));

        let updated = entities
            .update(
                Actor::user(author),
                project_id,
                entity.id,
                UpdateEntity {
                    title: Some("Edited".to_string()),
                    metadata: Some(serde_json::json!({ "edited": true })),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title.as_deref(), Some("Edited"));
        assert_eq!(
            updated.metadata,
            Some(serde_json::json!({ "edited": true }))
        );
    }
}
