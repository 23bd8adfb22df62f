use sea_orm_migration::{prelude::*, schema::*};

use super::m20260815_000001_create_users_table::User;
use super::m20260815_000002_create_entities_table::Entity;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Comment::Table)
                    .col(pk_uuid(Comment::Id))
                    .col(uuid(Comment::ProjectId))
                    .col(uuid(Comment::EntityId))
                    .col(uuid_null(Comment::ParentId)) // For threaded replies
                    .col(uuid(Comment::UserId))
                    .col(text_null(Comment::Content))
                    .col(json_null(Comment::Gif))
                    .col(json(Comment::Mentions))
                    .col(json(Comment::Attachments))
                    .col(json(Comment::Upvotes))
                    .col(json(Comment::Downvotes))
                    .col(timestamp(Comment::CreatedAt))
                    .col(timestamp(Comment::UpdatedAt))
                    .col(timestamp_null(Comment::DeletedAt))
                    .col(timestamp_null(Comment::ParentDeletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-comment-entity_id")
                            .from(Comment::Table, Comment::EntityId)
                            .to(Entity::Table, Entity::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-comment-user_id")
                            .from(Comment::Table, Comment::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-comment-parent_id")
                            .from(Comment::Table, Comment::ParentId)
                            .to(Comment::Table, Comment::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create index on entity_id
        manager
            .create_index(
                Index::create()
                    .name("idx_comments_entity_id")
                    .table(Comment::Table)
                    .col(Comment::EntityId)
                    .to_owned(),
            )
            .await?;

        // Create index on user_id
        manager
            .create_index(
                Index::create()
                    .name("idx_comments_user_id")
                    .table(Comment::Table)
                    .col(Comment::UserId)
                    .to_owned(),
            )
            .await?;

        // Create index on parent_id for reply lookups and the delete cascade
        manager
            .create_index(
                Index::create()
                    .name("idx_comments_parent_id")
                    .table(Comment::Table)
                    .col(Comment::ParentId)
                    .to_owned(),
            )
            .await?;

        // Create index on created_at
        manager
            .create_index(
                Index::create()
                    .name("idx_comments_created_at")
                    .table(Comment::Table)
                    .col(Comment::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Comment::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Comment {
    Table,
    Id,
    ProjectId,
    EntityId,
    ParentId,
    UserId,
    Content,
    Gif,
    Mentions,
    Attachments,
    Upvotes,
    Downvotes,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
    ParentDeletedAt,
}
