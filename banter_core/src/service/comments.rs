use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{sea_query::Expr, DatabaseConnection, DatabaseTransaction};
use thiserror::Error;

use crate::{
    entity::prelude::*,
    feed::{order_comments, CommentSort, FeedError, Page},
    ids::{CommentId, EntityId, ProjectId, UserId},
    notifications::{notify, NotificationEvent, NotificationSink},
    service::{
        adjust_reputation, blank_to_none, Actor, VoteOp, REP_CREATE_COMMENT, REP_DOWNVOTE,
        REP_UPVOTE,
    },
};

#[derive(Debug, Error)]
pub enum CommentsServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("comment not found")]
    CommentNotFound,

    #[error("entity not found")]
    EntityNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("comment requires content or a gif")]
    EmptyComment,

    #[error("parent comment belongs to a different entity")]
    ParentMismatch,

    #[error("listing requires an entity, user, or parent filter")]
    MissingFilter,

    #[error("already upvoted")]
    AlreadyUpvoted,

    #[error("already downvoted")]
    AlreadyDownvoted,

    #[error("no upvote to remove")]
    NotUpvoted,

    #[error("no downvote to remove")]
    NotDownvoted,

    #[error("unauthorized: not comment author")]
    Unauthorized,
}

#[derive(Debug, Clone, Default)]
pub struct CreateComment {
    pub entity_id: EntityId,
    pub parent_id: Option<CommentId>,
    pub content: Option<String>,
    pub gif: Option<serde_json::Value>,
    pub mentions: Vec<String>,
    pub attachments: Vec<serde_json::Value>,
}

impl CreateComment {
    pub fn on_entity(entity_id: EntityId) -> Self {
        CreateComment {
            entity_id,
            ..Default::default()
        }
    }
}

/// Scopes a listing to replies of one comment or to top-level comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentFilter {
    TopLevel,
    Reply(CommentId),
}

#[derive(Debug, Clone)]
pub struct CommentQuery {
    pub project_id: ProjectId,
    pub entity_id: Option<EntityId>,
    pub user_id: Option<UserId>,
    pub parent: Option<ParentFilter>,
    pub sort: CommentSort,
    pub page: Page,
}

impl CommentQuery {
    pub fn new(project_id: ProjectId) -> Self {
        CommentQuery {
            project_id,
            entity_id: None,
            user_id: None,
            parent: None,
            sort: CommentSort::New,
            page: Page::default(),
        }
    }
}

/// Read result: the comment together with its derived reply count.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentWithReplies {
    pub comment: CommentModel,
    pub replies_count: u64,
}

#[derive(Clone)]
pub struct CommentsService {
    db: DatabaseConnection,
    sink: Arc<dyn NotificationSink>,
}

impl CommentsService {
    pub fn new(db: DatabaseConnection, sink: Arc<dyn NotificationSink>) -> Self {
        Self { db, sink }
    }

    pub async fn create(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        input: CreateComment,
    ) -> Result<CommentModel, CommentsServiceError> {
        let content = blank_to_none(input.content);
        if content.is_none() && input.gif.is_none() {
            return Err(CommentsServiceError::EmptyComment);
        }

        let entity = Entities::find_by_id(input.entity_id)
            .filter(EntityColumn::ProjectId.eq(project_id))
            .filter(EntityColumn::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or(CommentsServiceError::EntityNotFound)?;

        let parent = match input.parent_id {
            Some(parent_id) => {
                let parent = Comments::find_by_id(parent_id)
                    .filter(CommentColumn::ProjectId.eq(project_id))
                    .filter(CommentColumn::DeletedAt.is_null())
                    .one(&self.db)
                    .await?
                    .ok_or(CommentsServiceError::CommentNotFound)?;
                if parent.entity_id != input.entity_id {
                    return Err(CommentsServiceError::ParentMismatch);
                }
                Some(parent)
            }
            None => None,
        };

        let author_exists = Users::find_by_id(user_id)
            .filter(UserColumn::ProjectId.eq(project_id))
            .one(&self.db)
            .await?
            .is_some();
        if !author_exists {
            return Err(CommentsServiceError::UserNotFound);
        }

        let now = Utc::now();
        let comment = CommentActiveModel {
            id: Set(CommentId::new()),
            project_id: Set(project_id),
            entity_id: Set(input.entity_id),
            parent_id: Set(input.parent_id),
            user_id: Set(user_id),
            content: Set(content),
            gif: Set(input.gif.map(GifData)),
            mentions: Set(Mentions(input.mentions.clone())),
            attachments: Set(Attachments(input.attachments)),
            upvotes: Set(UserIdSet::default()),
            downvotes: Set(UserIdSet::default()),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
            parent_deleted_at: Set(None),
        };

        let txn = self.db.begin().await?;
        let created = Comments::insert(comment).exec_with_returning(&txn).await?;
        adjust_reputation(&txn, user_id, REP_CREATE_COMMENT).await?;
        txn.commit().await?;

        if entity.user_id != Some(user_id) {
            notify(
                self.sink.clone(),
                NotificationEvent::EntityComment {
                    entity_id: entity.id,
                    author: entity.user_id,
                    comment_id: created.id,
                    commenter: user_id,
                },
            );
        }
        if let Some(parent) = parent {
            if parent.user_id != user_id {
                notify(
                    self.sink.clone(),
                    NotificationEvent::CommentReply {
                        parent_id: parent.id,
                        author: parent.user_id,
                        reply_id: created.id,
                        replier: user_id,
                    },
                );
            }
        }
        for mentioned in input.mentions {
            notify(
                self.sink.clone(),
                NotificationEvent::CommentMention {
                    comment_id: created.id,
                    mentioned,
                    commenter: user_id,
                },
            );
        }

        Ok(created)
    }

    pub async fn get(
        &self,
        project_id: ProjectId,
        comment_id: CommentId,
    ) -> Result<CommentWithReplies, CommentsServiceError> {
        let comment = self.find_active(project_id, comment_id).await?;
        let counts = self.replies_counts(&[comment.id]).await?;
        let replies_count = counts.get(&comment.id).copied().unwrap_or(0);
        Ok(CommentWithReplies {
            comment,
            replies_count,
        })
    }

    pub async fn list(
        &self,
        query: CommentQuery,
    ) -> Result<Vec<CommentWithReplies>, CommentsServiceError> {
        if query.entity_id.is_none() && query.user_id.is_none() && query.parent.is_none() {
            return Err(CommentsServiceError::MissingFilter);
        }

        let (offset, limit) = query.page.offset_and_limit()?;

        let mut select = Comments::find()
            .filter(CommentColumn::ProjectId.eq(query.project_id))
            .filter(CommentColumn::DeletedAt.is_null());

        if let Some(entity_id) = query.entity_id {
            select = select.filter(CommentColumn::EntityId.eq(entity_id));
        }
        if let Some(user_id) = query.user_id {
            select = select.filter(CommentColumn::UserId.eq(user_id));
        }
        match query.parent {
            Some(ParentFilter::TopLevel) => {
                select = select.filter(CommentColumn::ParentId.is_null());
            }
            Some(ParentFilter::Reply(parent_id)) => {
                select = select.filter(CommentColumn::ParentId.eq(parent_id));
            }
            None => {}
        }

        let comments = order_comments(select, query.sort)
            .offset(offset)
            .limit(limit)
            .all(&self.db)
            .await?;

        let ids: Vec<CommentId> = comments.iter().map(|comment| comment.id).collect();
        let counts = self.replies_counts(&ids).await?;

        Ok(comments
            .into_iter()
            .map(|comment| {
                let replies_count = counts.get(&comment.id).copied().unwrap_or(0);
                CommentWithReplies {
                    comment,
                    replies_count,
                }
            })
            .collect())
    }

    pub async fn update(
        &self,
        actor: Actor,
        project_id: ProjectId,
        comment_id: CommentId,
        content: String,
    ) -> Result<CommentModel, CommentsServiceError> {
        let comment = self.find_active(project_id, comment_id).await?;
        authorize(&actor, comment.user_id)?;

        let content = blank_to_none(Some(content));
        if content.is_none() && comment.gif.is_none() {
            return Err(CommentsServiceError::EmptyComment);
        }

        let mut active: CommentActiveModel = comment.into();
        active.content = Set(content);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    /// Soft delete with a tombstone cascade: every direct and transitive
    /// descendant gets parent_deleted_at stamped with the same timestamp,
    /// walked breadth-first inside one transaction.
    pub async fn delete(
        &self,
        actor: Actor,
        project_id: ProjectId,
        comment_id: CommentId,
    ) -> Result<(), CommentsServiceError> {
        let txn = self.db.begin().await?;

        let comment = Comments::find_by_id(comment_id)
            .filter(CommentColumn::ProjectId.eq(project_id))
            .filter(CommentColumn::DeletedAt.is_null())
            .one(&txn)
            .await?
            .ok_or(CommentsServiceError::CommentNotFound)?;

        authorize(&actor, comment.user_id)?;

        let now = Utc::now();
        let author = comment.user_id;

        let mut active: CommentActiveModel = comment.into();
        active.deleted_at = Set(Some(now));
        active.update(&txn).await?;

        cascade_tombstones(&txn, comment_id, now).await?;
        adjust_reputation(&txn, author, -REP_CREATE_COMMENT).await?;

        txn.commit().await?;
        Ok(())
    }

    pub async fn upvote(
        &self,
        project_id: ProjectId,
        comment_id: CommentId,
        voter: UserId,
    ) -> Result<CommentModel, CommentsServiceError> {
        self.apply_vote(project_id, comment_id, voter, VoteOp::Up)
            .await
    }

    pub async fn downvote(
        &self,
        project_id: ProjectId,
        comment_id: CommentId,
        voter: UserId,
    ) -> Result<CommentModel, CommentsServiceError> {
        self.apply_vote(project_id, comment_id, voter, VoteOp::Down)
            .await
    }

    pub async fn remove_upvote(
        &self,
        project_id: ProjectId,
        comment_id: CommentId,
        voter: UserId,
    ) -> Result<CommentModel, CommentsServiceError> {
        self.apply_vote(project_id, comment_id, voter, VoteOp::RemoveUp)
            .await
    }

    pub async fn remove_downvote(
        &self,
        project_id: ProjectId,
        comment_id: CommentId,
        voter: UserId,
    ) -> Result<CommentModel, CommentsServiceError> {
        self.apply_vote(project_id, comment_id, voter, VoteOp::RemoveDown)
            .await
    }

    async fn apply_vote(
        &self,
        project_id: ProjectId,
        comment_id: CommentId,
        voter: UserId,
        op: VoteOp,
    ) -> Result<CommentModel, CommentsServiceError> {
        let txn = self.db.begin().await?;

        let comment = Comments::find_by_id(comment_id)
            .filter(CommentColumn::ProjectId.eq(project_id))
            .filter(CommentColumn::DeletedAt.is_null())
            .one(&txn)
            .await?
            .ok_or(CommentsServiceError::CommentNotFound)?;

        let mut upvotes = comment.upvotes.clone();
        let mut downvotes = comment.downvotes.clone();
        let mut delta = 0;

        match op {
            VoteOp::Up => {
                if !upvotes.insert(voter) {
                    return Err(CommentsServiceError::AlreadyUpvoted);
                }
                delta += REP_UPVOTE;
                if downvotes.remove(&voter) {
                    delta -= REP_DOWNVOTE;
                }
            }
            VoteOp::Down => {
                if !downvotes.insert(voter) {
                    return Err(CommentsServiceError::AlreadyDownvoted);
                }
                delta += REP_DOWNVOTE;
                if upvotes.remove(&voter) {
                    delta -= REP_UPVOTE;
                }
            }
            VoteOp::RemoveUp => {
                if !upvotes.remove(&voter) {
                    return Err(CommentsServiceError::NotUpvoted);
                }
                delta -= REP_UPVOTE;
            }
            VoteOp::RemoveDown => {
                if !downvotes.remove(&voter) {
                    return Err(CommentsServiceError::NotDownvoted);
                }
                delta -= REP_DOWNVOTE;
            }
        }

        let author = comment.user_id;
        let mut active: CommentActiveModel = comment.into();
        active.upvotes = Set(upvotes);
        active.downvotes = Set(downvotes);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        adjust_reputation(&txn, author, delta).await?;
        txn.commit().await?;

        Ok(updated)
    }

    async fn find_active(
        &self,
        project_id: ProjectId,
        comment_id: CommentId,
    ) -> Result<CommentModel, CommentsServiceError> {
        Comments::find_by_id(comment_id)
            .filter(CommentColumn::ProjectId.eq(project_id))
            .filter(CommentColumn::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or(CommentsServiceError::CommentNotFound)
    }

    /// Live direct-reply counts for a batch of comments. A reply counts only
    /// while it is neither deleted nor under a deleted ancestor.
    async fn replies_counts(
        &self,
        ids: &[CommentId],
    ) -> Result<HashMap<CommentId, u64>, DbErr> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(CommentId, i64)> = Comments::find()
            .select_only()
            .column(CommentColumn::ParentId)
            .column_as(CommentColumn::Id.count(), "replies")
            .filter(CommentColumn::ParentId.is_in(ids.iter().copied()))
            .filter(CommentColumn::DeletedAt.is_null())
            .filter(CommentColumn::ParentDeletedAt.is_null())
            .group_by(CommentColumn::ParentId)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, count as u64))
            .collect())
    }
}

/// Iterative breadth-first walk over the reply tree. Each pass stamps one
/// generation and feeds it back as the next frontier.
async fn cascade_tombstones(
    txn: &DatabaseTransaction,
    root: CommentId,
    stamp: chrono::DateTime<chrono::Utc>,
) -> Result<(), DbErr> {
    let mut frontier = vec![root];

    while !frontier.is_empty() {
        let children: Vec<CommentId> = Comments::find()
            .select_only()
            .column(CommentColumn::Id)
            .filter(CommentColumn::ParentId.is_in(frontier))
            .filter(CommentColumn::ParentDeletedAt.is_null())
            .into_tuple()
            .all(txn)
            .await?;

        if children.is_empty() {
            break;
        }

        Comments::update_many()
            .col_expr(CommentColumn::ParentDeletedAt, Expr::value(stamp))
            .filter(CommentColumn::Id.is_in(children.clone()))
            .exec(txn)
            .await?;

        frontier = children;
    }

    Ok(())
}

fn authorize(actor: &Actor, owner: UserId) -> Result<(), CommentsServiceError> {
    if actor.is_master || owner == actor.user_id {
        Ok(())
    } else {
        Err(CommentsServiceError::Unauthorized)
    }
}
