use chrono::Utc;
use sea_orm::DatabaseConnection;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    entity::prelude::*,
    ids::{CommentId, EntityId, ProjectId, ReportId, UserId},
    service::blank_to_none,
};

#[derive(Debug, Error)]
pub enum ReportsServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("report target not found")]
    TargetNotFound,

    #[error("report reason must not be blank")]
    EmptyReason,
}

/// The row being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTarget {
    Entity(EntityId),
    Comment(CommentId),
}

impl ReportTarget {
    fn kind(&self) -> ReportTargetKind {
        match self {
            ReportTarget::Entity(_) => ReportTargetKind::Entity,
            ReportTarget::Comment(_) => ReportTargetKind::Comment,
        }
    }

    fn target_id(&self) -> Uuid {
        match self {
            ReportTarget::Entity(id) => id.into_uuid(),
            ReportTarget::Comment(id) => id.into_uuid(),
        }
    }
}

#[derive(Clone)]
pub struct ReportsService {
    db: DatabaseConnection,
}

impl ReportsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// File a report. Targets get a single row; later reporters are
    /// appended to it, and repeat reports by the same reporter are a no-op.
    pub async fn create_report(
        &self,
        project_id: ProjectId,
        reporter: UserId,
        target: ReportTarget,
        reason: String,
        details: Option<String>,
    ) -> Result<ReportModel, ReportsServiceError> {
        let reason = blank_to_none(Some(reason)).ok_or(ReportsServiceError::EmptyReason)?;

        self.verify_target(project_id, target).await?;

        let existing = Reports::find()
            .filter(ReportColumn::ProjectId.eq(project_id))
            .filter(ReportColumn::TargetKind.eq(target.kind()))
            .filter(ReportColumn::TargetId.eq(target.target_id()))
            .one(&self.db)
            .await?;

        if let Some(report) = existing {
            if report.reporters.contains(&reporter) {
                return Ok(report);
            }

            let mut reporters = report.reporters.clone();
            reporters.insert(reporter);

            let mut active: ReportActiveModel = report.into();
            active.reporters = Set(reporters);
            active.updated_at = Set(Utc::now());

            let updated = active.update(&self.db).await?;
            return Ok(updated);
        }

        let now = Utc::now();
        let report = ReportActiveModel {
            id: Set(ReportId::new()),
            project_id: Set(project_id),
            target_kind: Set(target.kind()),
            target_id: Set(target.target_id()),
            reason: Set(reason),
            details: Set(blank_to_none(details)),
            reporters: Set(UserIdSet(vec![reporter])),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = Reports::insert(report).exec_with_returning(&self.db).await?;
        Ok(created)
    }

    async fn verify_target(
        &self,
        project_id: ProjectId,
        target: ReportTarget,
    ) -> Result<(), ReportsServiceError> {
        let exists = match target {
            ReportTarget::Entity(entity_id) => Entities::find_by_id(entity_id)
                .filter(EntityColumn::ProjectId.eq(project_id))
                .filter(EntityColumn::DeletedAt.is_null())
                .one(&self.db)
                .await?
                .is_some(),
            ReportTarget::Comment(comment_id) => Comments::find_by_id(comment_id)
                .filter(CommentColumn::ProjectId.eq(project_id))
                .filter(CommentColumn::DeletedAt.is_null())
                .one(&self.db)
                .await?
                .is_some(),
        };

        if exists {
            Ok(())
        } else {
            Err(ReportsServiceError::TargetNotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::LogSink;
    use crate::service::comments::{CommentsService, CreateComment};
    use crate::service::entities::{CreateEntity, EntitiesService};
    use crate::service::users::{CreateUser, UsersService};
    use crate::test_utils::create_test_db;
    use std::sync::Arc;

    struct Fixture {
        reports: ReportsService,
        comments: CommentsService,
        project_id: ProjectId,
        reporter: UserId,
        entity_id: EntityId,
    }

    async fn setup() -> Fixture {
        let db = create_test_db().await;
        let reports = ReportsService::new(db.clone());
        let comments = CommentsService::new(db.clone(), Arc::new(LogSink));
        let entities = EntitiesService::new(db.clone(), Arc::new(LogSink));
        let users = UsersService::new(db);
        let project_id = ProjectId::new();

        let reporter = users
            .create(
                project_id,
                CreateUser {
                    username: Some("watcher".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .id;

        let entity_id = entities
            .create(project_id, CreateEntity::default())
            .await
            .unwrap()
            .id;

        Fixture {
            reports,
            comments,
            project_id,
            reporter,
            entity_id,
        }
    }

    #[tokio::test]
    async fn test_report_entity_dedupes_reporters() {
        let f = setup().await;

        let first = f
            .reports
            .create_report(
                f.project_id,
                f.reporter,
                ReportTarget::Entity(f.entity_id),
                "spam".to_string(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(first.reporters.len(), 1);
        assert_eq!(first.target_kind, ReportTargetKind::Entity);

        // Same reporter again is a no-op
        let repeat = f
            .reports
            .create_report(
                f.project_id,
                f.reporter,
                ReportTarget::Entity(f.entity_id),
                "spam".to_string(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(repeat.id, first.id);
        assert_eq!(repeat.reporters.len(), 1);
    }

    #[tokio::test]
    async fn test_second_reporter_appends_to_same_row() {
        let f = setup().await;
        let other = UserId::new();

        let first = f
            .reports
            .create_report(
                f.project_id,
                f.reporter,
                ReportTarget::Entity(f.entity_id),
                "spam".to_string(),
                None,
            )
            .await
            .unwrap();

        let second = f
            .reports
            .create_report(
                f.project_id,
                other,
                ReportTarget::Entity(f.entity_id),
                "abuse".to_string(),
                Some("details".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.reporters.len(), 2);
        // Reason stays as originally filed
        assert_eq!(second.reason, "spam");
    }

    #[tokio::test]
    async fn test_report_comment_target() {
        let f = setup().await;

        let comment = f
            .comments
            .create(
                f.project_id,
                f.reporter,
                CreateComment {
                    entity_id: f.entity_id,
                    content: Some("hmm".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let report = f
            .reports
            .create_report(
                f.project_id,
                f.reporter,
                ReportTarget::Comment(comment.id),
                "off topic".to_string(),
                None,
            )
            .await
            .unwrap();
        assert_eq!(report.target_kind, ReportTargetKind::Comment);
        assert_eq!(report.target_id, comment.id.into_uuid());
    }

    #[tokio::test]
    async fn test_missing_target_rejected() {
        let f = setup().await;

        let ghost = f
            .reports
            .create_report(
                f.project_id,
                f.reporter,
                ReportTarget::Entity(EntityId::new()),
                "spam".to_string(),
                None,
            )
            .await;
        assert!(matches!(ghost, Err(ReportsServiceError::TargetNotFound)));
    }
}
