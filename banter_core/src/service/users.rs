use chrono::Utc;
use sea_orm::DatabaseConnection;
use thiserror::Error;

use crate::{
    entity::prelude::*,
    ids::{ProjectId, UserId},
    service::blank_to_none,
};

#[derive(Debug, Error)]
pub enum UsersServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("user not found")]
    UserNotFound,
}

#[derive(Debug, Clone, Default)]
pub struct CreateUser {
    pub name: Option<String>,
    pub username: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
}

#[derive(Clone)]
pub struct UsersService {
    db: DatabaseConnection,
}

impl UsersService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        project_id: ProjectId,
        input: CreateUser,
    ) -> Result<UserModel, UsersServiceError> {
        let now = Utc::now();
        let user = UserActiveModel {
            id: Set(UserId::new()),
            project_id: Set(project_id),
            name: Set(blank_to_none(input.name)),
            username: Set(blank_to_none(input.username)),
            avatar: Set(blank_to_none(input.avatar)),
            bio: Set(blank_to_none(input.bio)),
            reputation: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = Users::insert(user).exec_with_returning(&self.db).await?;
        Ok(created)
    }

    pub async fn get(
        &self,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<UserModel, UsersServiceError> {
        Users::find_by_id(user_id)
            .filter(UserColumn::ProjectId.eq(project_id))
            .one(&self.db)
            .await?
            .ok_or(UsersServiceError::UserNotFound)
    }

    pub async fn get_by_username(
        &self,
        project_id: ProjectId,
        username: &str,
    ) -> Result<UserModel, UsersServiceError> {
        Users::find()
            .filter(UserColumn::ProjectId.eq(project_id))
            .filter(UserColumn::Username.eq(username))
            .one(&self.db)
            .await?
            .ok_or(UsersServiceError::UserNotFound)
    }
}
