use sea_orm_migration::{prelude::*, schema::*};

use super::m20260815_000001_create_users_table::User;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(List::Table)
                    .col(pk_uuid(List::Id))
                    .col(uuid(List::ProjectId))
                    .col(uuid(List::UserId))
                    .col(uuid_null(List::ParentId)) // NULL only for the root list
                    .col(string(List::Name))
                    .col(boolean(List::IsRoot))
                    .col(json(List::EntityIds))
                    .col(timestamp(List::CreatedAt))
                    .col(timestamp(List::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-list-user_id")
                            .from(List::Table, List::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-list-parent_id")
                            .from(List::Table, List::ParentId)
                            .to(List::Table, List::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create index on (project_id, user_id) for per-user lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_lists_project_user")
                    .table(List::Table)
                    .col(List::ProjectId)
                    .col(List::UserId)
                    .to_owned(),
            )
            .await?;

        // Create index on parent_id for sub-list lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_lists_parent_id")
                    .table(List::Table)
                    .col(List::ParentId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(List::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum List {
    Table,
    Id,
    ProjectId,
    UserId,
    ParentId,
    Name,
    IsRoot,
    EntityIds,
    CreatedAt,
    UpdatedAt,
}
