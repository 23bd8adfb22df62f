use crate::entity::types::{Attachments, Keywords, Mentions, UserIdSet};
use crate::ids::{EntityId, ProjectId, UserId};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entity")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: EntityId,
    pub project_id: ProjectId,
    pub user_id: Option<UserId>,
    /// Stable url-safe handle, generated once from `id` at insert.
    pub short_id: String,
    pub foreign_id: Option<String>,
    pub source_id: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub attachments: Attachments,
    pub mentions: Mentions,
    pub keywords: Keywords,
    pub upvotes: UserIdSet,
    pub downvotes: UserIdSet,
    pub shares_count: i32,
    pub views: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Ranking score. The only field mutated by the background rescorer.
    pub score: f64,
    pub score_updated_at: DateTimeUtc,
    pub metadata: Option<Json>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub deleted_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::comment::Entity")]
    Comment,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
