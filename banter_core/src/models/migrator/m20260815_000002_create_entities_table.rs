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
                    .table(Entity::Table)
                    .col(pk_uuid(Entity::Id))
                    .col(uuid(Entity::ProjectId))
                    .col(uuid_null(Entity::UserId)) // Entities may be created with no author
                    .col(string(Entity::ShortId))
                    .col(string_null(Entity::ForeignId))
                    .col(string_null(Entity::SourceId))
                    .col(string_null(Entity::Title))
                    .col(text_null(Entity::Content))
                    .col(json(Entity::Attachments))
                    .col(json(Entity::Mentions))
                    .col(json(Entity::Keywords))
                    .col(json(Entity::Upvotes))
                    .col(json(Entity::Downvotes))
                    .col(integer(Entity::SharesCount))
                    .col(integer(Entity::Views))
                    .col(double_null(Entity::Latitude))
                    .col(double_null(Entity::Longitude))
                    .col(double(Entity::Score))
                    .col(timestamp(Entity::ScoreUpdatedAt))
                    .col(json_null(Entity::Metadata))
                    .col(timestamp(Entity::CreatedAt))
                    .col(timestamp(Entity::UpdatedAt))
                    .col(timestamp_null(Entity::DeletedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-entity-user_id")
                            .from(Entity::Table, Entity::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // short_id is unique within a project
        manager
            .create_index(
                Index::create()
                    .name("idx_entities_project_short_id")
                    .table(Entity::Table)
                    .col(Entity::ProjectId)
                    .col(Entity::ShortId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create index on foreign_id for upsert-by-foreign-id lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_entities_project_foreign_id")
                    .table(Entity::Table)
                    .col(Entity::ProjectId)
                    .col(Entity::ForeignId)
                    .to_owned(),
            )
            .await?;

        // Create index on created_at
        manager
            .create_index(
                Index::create()
                    .name("idx_entities_created_at")
                    .table(Entity::Table)
                    .col(Entity::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Create index on score for hot feeds
        manager
            .create_index(
                Index::create()
                    .name("idx_entities_score")
                    .table(Entity::Table)
                    .col(Entity::Score)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Entity::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Entity {
    Table,
    Id,
    ProjectId,
    UserId,
    ShortId,
    ForeignId,
    SourceId,
    Title,
    Content,
    Attachments,
    Mentions,
    Keywords,
    Upvotes,
    Downvotes,
    SharesCount,
    Views,
    Latitude,
    Longitude,
    Score,
    ScoreUpdatedAt,
    Metadata,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
