use crate::entity::types::UserIdSet;
use crate::ids::{ProjectId, ReportId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Discriminant for the reported row. The target id column holds either an
/// entity id or a comment id depending on this value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum ReportTargetKind {
    #[sea_orm(string_value = "entity")]
    Entity,
    #[sea_orm(string_value = "comment")]
    Comment,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "report")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: ReportId,
    pub project_id: ProjectId,
    pub target_kind: ReportTargetKind,
    pub target_id: Uuid,
    pub reason: String,
    pub details: Option<String>,
    /// One row per target; repeat reporters are appended here.
    pub reporters: UserIdSet,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
