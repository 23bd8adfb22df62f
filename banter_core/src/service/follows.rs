use std::sync::Arc;

use chrono::Utc;
use sea_orm::DatabaseConnection;
use thiserror::Error;

use crate::{
    entity::prelude::*,
    ids::{FollowId, ProjectId, UserId},
    notifications::{notify, NotificationEvent, NotificationSink},
};

#[derive(Debug, Error)]
pub enum FollowsServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("user not found")]
    UserNotFound,

    #[error("cannot follow yourself")]
    SelfFollow,

    #[error("already following")]
    AlreadyFollowing,

    #[error("not following")]
    NotFollowing,
}

#[derive(Clone)]
pub struct FollowsService {
    db: DatabaseConnection,
    sink: Arc<dyn NotificationSink>,
}

impl FollowsService {
    pub fn new(db: DatabaseConnection, sink: Arc<dyn NotificationSink>) -> Self {
        Self { db, sink }
    }

    pub async fn follow(
        &self,
        project_id: ProjectId,
        follower_id: UserId,
        followed_id: UserId,
    ) -> Result<FollowModel, FollowsServiceError> {
        if follower_id == followed_id {
            return Err(FollowsServiceError::SelfFollow);
        }

        for user_id in [follower_id, followed_id] {
            let exists = Users::find_by_id(user_id)
                .filter(UserColumn::ProjectId.eq(project_id))
                .one(&self.db)
                .await?
                .is_some();
            if !exists {
                return Err(FollowsServiceError::UserNotFound);
            }
        }

        if self.find_edge(project_id, follower_id, followed_id).await?.is_some() {
            return Err(FollowsServiceError::AlreadyFollowing);
        }

        let follow = FollowActiveModel {
            id: Set(FollowId::new()),
            project_id: Set(project_id),
            follower_id: Set(follower_id),
            followed_id: Set(followed_id),
            created_at: Set(Utc::now()),
        };

        let created = Follows::insert(follow).exec_with_returning(&self.db).await?;

        notify(
            self.sink.clone(),
            NotificationEvent::NewFollow {
                follower: follower_id,
                followed: followed_id,
            },
        );

        Ok(created)
    }

    pub async fn unfollow(
        &self,
        project_id: ProjectId,
        follower_id: UserId,
        followed_id: UserId,
    ) -> Result<(), FollowsServiceError> {
        let edge = self
            .find_edge(project_id, follower_id, followed_id)
            .await?
            .ok_or(FollowsServiceError::NotFollowing)?;

        Follows::delete_by_id(edge.id).exec(&self.db).await?;
        Ok(())
    }

    pub async fn is_following(
        &self,
        project_id: ProjectId,
        follower_id: UserId,
        followed_id: UserId,
    ) -> Result<bool, FollowsServiceError> {
        Ok(self
            .find_edge(project_id, follower_id, followed_id)
            .await?
            .is_some())
    }

    /// How many users this user follows.
    pub async fn following_count(
        &self,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<u64, FollowsServiceError> {
        let count = Follows::find()
            .filter(FollowColumn::ProjectId.eq(project_id))
            .filter(FollowColumn::FollowerId.eq(user_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    /// How many users follow this user.
    pub async fn followers_count(
        &self,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<u64, FollowsServiceError> {
        let count = Follows::find()
            .filter(FollowColumn::ProjectId.eq(project_id))
            .filter(FollowColumn::FollowedId.eq(user_id))
            .count(&self.db)
            .await?;
        Ok(count)
    }

    async fn find_edge(
        &self,
        project_id: ProjectId,
        follower_id: UserId,
        followed_id: UserId,
    ) -> Result<Option<FollowModel>, DbErr> {
        Follows::find()
            .filter(FollowColumn::ProjectId.eq(project_id))
            .filter(FollowColumn::FollowerId.eq(follower_id))
            .filter(FollowColumn::FollowedId.eq(followed_id))
            .one(&self.db)
            .await
    }
}
