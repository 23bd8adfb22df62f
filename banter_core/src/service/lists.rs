use chrono::Utc;
use sea_orm::DatabaseConnection;
use thiserror::Error;

use crate::{
    entity::prelude::*,
    ids::{EntityId, ListId, ProjectId, UserId},
    service::blank_to_none,
};

/// Name given to the lazily created root list.
const ROOT_LIST_NAME: &str = "root";

#[derive(Debug, Error)]
pub enum ListsServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("list not found")]
    ListNotFound,

    #[error("entity not found")]
    EntityNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("list name must not be blank")]
    EmptyName,

    #[error("root list cannot be renamed or deleted")]
    RootImmutable,

    #[error("entity already saved to this list")]
    DuplicateEntry,

    #[error("entity not in this list")]
    EntryNotFound,
}

#[derive(Clone)]
pub struct ListsService {
    db: DatabaseConnection,
}

impl ListsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Every user has exactly one root list per project, created on first
    /// access.
    pub async fn root_list(
        &self,
        project_id: ProjectId,
        user_id: UserId,
    ) -> Result<ListModel, ListsServiceError> {
        let existing = Lists::find()
            .filter(ListColumn::ProjectId.eq(project_id))
            .filter(ListColumn::UserId.eq(user_id))
            .filter(ListColumn::IsRoot.eq(true))
            .one(&self.db)
            .await?;

        if let Some(root) = existing {
            return Ok(root);
        }

        let user_exists = Users::find_by_id(user_id)
            .filter(UserColumn::ProjectId.eq(project_id))
            .one(&self.db)
            .await?
            .is_some();
        if !user_exists {
            return Err(ListsServiceError::UserNotFound);
        }

        let now = Utc::now();
        let root = ListActiveModel {
            id: Set(ListId::new()),
            project_id: Set(project_id),
            user_id: Set(user_id),
            parent_id: Set(None),
            name: Set(ROOT_LIST_NAME.to_string()),
            is_root: Set(true),
            entity_ids: Set(EntityIdSet::default()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = Lists::insert(root).exec_with_returning(&self.db).await?;
        Ok(created)
    }

    pub async fn create_list(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        parent_id: ListId,
        name: String,
    ) -> Result<ListModel, ListsServiceError> {
        let name = blank_to_none(Some(name)).ok_or(ListsServiceError::EmptyName)?;

        // Parent must be one of the caller's own lists
        self.find_owned(project_id, user_id, parent_id).await?;

        let now = Utc::now();
        let list = ListActiveModel {
            id: Set(ListId::new()),
            project_id: Set(project_id),
            user_id: Set(user_id),
            parent_id: Set(Some(parent_id)),
            name: Set(name),
            is_root: Set(false),
            entity_ids: Set(EntityIdSet::default()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = Lists::insert(list).exec_with_returning(&self.db).await?;
        Ok(created)
    }

    pub async fn rename_list(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        list_id: ListId,
        name: String,
    ) -> Result<ListModel, ListsServiceError> {
        let name = blank_to_none(Some(name)).ok_or(ListsServiceError::EmptyName)?;

        let list = self.find_owned(project_id, user_id, list_id).await?;
        if list.is_root {
            return Err(ListsServiceError::RootImmutable);
        }

        let mut active: ListActiveModel = list.into();
        active.name = Set(name);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    pub async fn add_entity(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        list_id: ListId,
        entity_id: EntityId,
    ) -> Result<ListModel, ListsServiceError> {
        let list = self.find_owned(project_id, user_id, list_id).await?;

        let entity_exists = Entities::find_by_id(entity_id)
            .filter(EntityColumn::ProjectId.eq(project_id))
            .filter(EntityColumn::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .is_some();
        if !entity_exists {
            return Err(ListsServiceError::EntityNotFound);
        }

        let mut entity_ids = list.entity_ids.clone();
        if !entity_ids.insert(entity_id) {
            return Err(ListsServiceError::DuplicateEntry);
        }

        let mut active: ListActiveModel = list.into();
        active.entity_ids = Set(entity_ids);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    pub async fn remove_entity(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        list_id: ListId,
        entity_id: EntityId,
    ) -> Result<ListModel, ListsServiceError> {
        let list = self.find_owned(project_id, user_id, list_id).await?;

        let mut entity_ids = list.entity_ids.clone();
        if !entity_ids.remove(&entity_id) {
            return Err(ListsServiceError::EntryNotFound);
        }

        let mut active: ListActiveModel = list.into();
        active.entity_ids = Set(entity_ids);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&self.db).await?;
        Ok(updated)
    }

    pub async fn sub_lists(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        parent_id: ListId,
    ) -> Result<Vec<ListModel>, ListsServiceError> {
        self.find_owned(project_id, user_id, parent_id).await?;

        let lists = Lists::find()
            .filter(ListColumn::ProjectId.eq(project_id))
            .filter(ListColumn::UserId.eq(user_id))
            .filter(ListColumn::ParentId.eq(parent_id))
            .order_by_asc(ListColumn::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(lists)
    }

    /// Deletes a non-root list and, generation by generation, every list
    /// nested under it.
    pub async fn delete_list(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        list_id: ListId,
    ) -> Result<(), ListsServiceError> {
        let list = self.find_owned(project_id, user_id, list_id).await?;
        if list.is_root {
            return Err(ListsServiceError::RootImmutable);
        }

        let txn = self.db.begin().await?;

        let mut doomed = vec![list.id];
        let mut frontier = vec![list.id];
        while !frontier.is_empty() {
            let children: Vec<ListId> = Lists::find()
                .select_only()
                .column(ListColumn::Id)
                .filter(ListColumn::ParentId.is_in(frontier))
                .into_tuple()
                .all(&txn)
                .await?;
            if children.is_empty() {
                break;
            }
            doomed.extend(children.iter().copied());
            frontier = children;
        }

        Lists::delete_many()
            .filter(ListColumn::Id.is_in(doomed))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    /// Whether any of the user's lists holds this entity.
    pub async fn is_entity_saved(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        entity_id: EntityId,
    ) -> Result<bool, ListsServiceError> {
        let count = Lists::find()
            .filter(ListColumn::ProjectId.eq(project_id))
            .filter(ListColumn::UserId.eq(user_id))
            .filter(sea_orm::sea_query::Expr::cust_with_values(
                "EXISTS (SELECT 1 FROM json_each(list.entity_ids) WHERE json_each.value = ?)",
                [entity_id.to_string()],
            ))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn find_owned(
        &self,
        project_id: ProjectId,
        user_id: UserId,
        list_id: ListId,
    ) -> Result<ListModel, ListsServiceError> {
        Lists::find_by_id(list_id)
            .filter(ListColumn::ProjectId.eq(project_id))
            .filter(ListColumn::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or(ListsServiceError::ListNotFound)
    }
}
