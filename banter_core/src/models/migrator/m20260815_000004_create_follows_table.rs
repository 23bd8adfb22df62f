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
                    .table(Follow::Table)
                    .col(pk_uuid(Follow::Id))
                    .col(uuid(Follow::ProjectId))
                    .col(uuid(Follow::FollowerId))
                    .col(uuid(Follow::FollowedId))
                    .col(timestamp(Follow::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-follow-follower_id")
                            .from(Follow::Table, Follow::FollowerId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-follow-followed_id")
                            .from(Follow::Table, Follow::FollowedId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one edge per ordered pair per project
        manager
            .create_index(
                Index::create()
                    .name("idx_follows_unique_edge")
                    .table(Follow::Table)
                    .col(Follow::ProjectId)
                    .col(Follow::FollowerId)
                    .col(Follow::FollowedId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Create index on followed_id for follower counts
        manager
            .create_index(
                Index::create()
                    .name("idx_follows_followed_id")
                    .table(Follow::Table)
                    .col(Follow::FollowedId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Follow::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Follow {
    Table,
    Id,
    ProjectId,
    FollowerId,
    FollowedId,
    CreatedAt,
}
