use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .col(pk_uuid(User::Id))
                    .col(uuid(User::ProjectId))
                    .col(string_null(User::Name))
                    .col(string_null(User::Username))
                    .col(string_null(User::Avatar))
                    .col(string_null(User::Bio))
                    .col(integer(User::Reputation))
                    .col(timestamp(User::CreatedAt))
                    .col(timestamp(User::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // Create index on project_id
        manager
            .create_index(
                Index::create()
                    .name("idx_users_project_id")
                    .table(User::Table)
                    .col(User::ProjectId)
                    .to_owned(),
            )
            .await?;

        // Create index on username for handle lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_users_username")
                    .table(User::Table)
                    .col(User::Username)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum User {
    Table,
    Id,
    ProjectId,
    Name,
    Username,
    Avatar,
    Bio,
    Reputation,
    CreatedAt,
    UpdatedAt,
}
