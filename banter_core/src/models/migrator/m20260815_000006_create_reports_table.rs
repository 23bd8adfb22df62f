use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Report::Table)
                    .col(pk_uuid(Report::Id))
                    .col(uuid(Report::ProjectId))
                    .col(string(Report::TargetKind))
                    .col(uuid(Report::TargetId))
                    .col(string(Report::Reason))
                    .col(text_null(Report::Details))
                    .col(json(Report::Reporters))
                    .col(timestamp(Report::CreatedAt))
                    .col(timestamp(Report::UpdatedAt))
                    .to_owned(),
            )
            .await?;

        // One report row per target
        manager
            .create_index(
                Index::create()
                    .name("idx_reports_unique_target")
                    .table(Report::Table)
                    .col(Report::ProjectId)
                    .col(Report::TargetKind)
                    .col(Report::TargetId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Report::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Report {
    Table,
    Id,
    ProjectId,
    TargetKind,
    TargetId,
    Reason,
    Details,
    Reporters,
    CreatedAt,
    UpdatedAt,
}
