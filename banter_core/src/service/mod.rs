use sea_orm::{sea_query::Expr, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};

use crate::entity::prelude::*;
use crate::ids::UserId;

pub mod comments;
pub mod entities;
pub mod follows;
pub mod lists;
pub mod reports;
pub mod users;

/// Caller identity for authorization checks.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub user_id: UserId,
    /// Master callers may act on rows they do not own.
    pub is_master: bool,
}

impl Actor {
    pub fn user(user_id: UserId) -> Self {
        Actor {
            user_id,
            is_master: false,
        }
    }

    pub fn master(user_id: UserId) -> Self {
        Actor {
            user_id,
            is_master: true,
        }
    }
}

/// Vote mutations shared by entities and comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VoteOp {
    Up,
    Down,
    RemoveUp,
    RemoveDown,
}

// Reputation ledger deltas. Removals and deletions apply the negation.
pub(crate) const REP_CREATE_ENTITY: i32 = 5;
pub(crate) const REP_CREATE_COMMENT: i32 = 2;
pub(crate) const REP_UPVOTE: i32 = 1;
pub(crate) const REP_DOWNVOTE: i32 = -1;

/// Single-statement ledger adjustment, run inside the caller's transaction.
pub(crate) async fn adjust_reputation<C: ConnectionTrait>(
    conn: &C,
    user_id: UserId,
    delta: i32,
) -> Result<(), DbErr> {
    if delta == 0 {
        return Ok(());
    }
    Users::update_many()
        .col_expr(
            UserColumn::Reputation,
            Expr::col(UserColumn::Reputation).add(delta),
        )
        .filter(UserColumn::Id.eq(user_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Empty and whitespace-only strings are stored as NULL.
pub(crate) fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
