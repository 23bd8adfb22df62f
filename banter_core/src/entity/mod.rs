// SeaORM entities
// One module per table, plus the JSON column wrapper types they share.

pub mod comment;
pub mod entity;
pub mod follow;
pub mod list;
pub mod report;
pub mod types;
pub mod user;

#[cfg(test)]
mod tests;

pub mod prelude {
    // Re-export all entities for convenience
    pub use super::comment::{
        ActiveModel as CommentActiveModel, Column as CommentColumn, Entity as Comments,
        Model as CommentModel,
    };
    pub use super::entity::{
        ActiveModel as EntityActiveModel, Column as EntityColumn, Entity as Entities,
        Model as EntityModel,
    };
    pub use super::follow::{
        ActiveModel as FollowActiveModel, Column as FollowColumn, Entity as Follows,
        Model as FollowModel,
    };
    pub use super::list::{
        ActiveModel as ListActiveModel, Column as ListColumn, Entity as Lists, Model as ListModel,
    };
    pub use super::report::{
        ActiveModel as ReportActiveModel, Column as ReportColumn, Entity as Reports,
        Model as ReportModel, ReportTargetKind,
    };
    pub use super::user::{
        ActiveModel as UserActiveModel, Column as UserColumn, Entity as Users, Model as UserModel,
    };

    pub use super::types::{Attachments, EntityIdSet, GifData, Keywords, Mentions, UserIdSet};

    // Re-export commonly used SeaORM types and traits
    pub use sea_orm::{
        ActiveModelTrait,
        ActiveValue,

        ColumnTrait,
        ConnectionTrait,

        // Database and connection types
        Database,
        DatabaseConnection,
        DbConn,
        // Common result types
        DbErr,
        Delete,

        // Core traits
        EntityTrait,
        Insert,
        ModelTrait,
        NotSet,
        // Pagination
        PaginatorTrait,
        QueryFilter,
        QueryOrder,
        QuerySelect,
        Related,
        RelationTrait,
        // Query builders
        Select,
        // Active model helpers
        Set,
        TransactionTrait,

        Unchanged,
        Update,
    };
}
