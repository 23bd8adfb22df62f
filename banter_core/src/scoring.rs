use chrono::{DateTime, Duration, Utc};
use sea_orm::{sea_query::Expr, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::entity::prelude::*;

/// Minimum gap between two score recomputations of the same entity.
const DEBOUNCE_MINUTES: i64 = 5;

/// Score assigned to freshly created entities.
pub const INITIAL_SCORE: f64 = 2.0;

#[derive(Debug, Error, PartialEq)]
pub enum ScoringError {
    #[error("entity state is invalid for scoring")]
    InvalidEntityState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOutcome {
    pub new_score: f64,
    pub new_score_updated_at: DateTime<Utc>,
    /// False when the debounce window swallowed the recomputation.
    pub updated: bool,
}

/// Recompute an entity's ranking score.
///
/// The score is the sum of a time-decaying base and an interaction term
/// normalized by exposure, clamped at zero and rounded to two decimals.
pub fn score_entity(
    entity: &EntityModel,
    replies_count: u64,
    now: DateTime<Utc>,
) -> Result<ScoreOutcome, ScoringError> {
    if entity.created_at > now || entity.views <= 0 {
        return Err(ScoringError::InvalidEntityState);
    }

    if now - entity.score_updated_at <= Duration::minutes(DEBOUNCE_MINUTES) {
        return Ok(ScoreOutcome {
            new_score: entity.score,
            new_score_updated_at: entity.score_updated_at,
            updated: false,
        });
    }

    let upvotes = entity.upvotes.len() as f64;
    let downvotes = entity.downvotes.len() as f64;
    let replies = replies_count as f64;
    let shares = entity.shares_count as f64;

    let interaction = upvotes - 0.5 * downvotes + 0.5 * replies + 2.0 * shares;

    let views = entity.views.max(1) as f64;
    let age_hours = (now - entity.created_at).num_seconds() as f64 / 3600.0;

    let base = 2.0 * (-age_hours / 48.0).exp();
    let exposure_adjusted = interaction / (views + 1.0).log2();

    let raw = (base + exposure_adjusted).max(0.0);
    let new_score = (raw * 100.0).round() / 100.0;

    Ok(ScoreOutcome {
        new_score,
        new_score_updated_at: now,
        updated: true,
    })
}

/// Recompute and persist scores for a batch of entities off the request path.
///
/// Callers are free to drop the handle. Failures are logged and swallowed;
/// concurrent rescores race benignly since the debounce bounds the churn.
pub fn spawn_rescore(db: DatabaseConnection, batch: Vec<EntityModel>) -> JoinHandle<()> {
    tokio::spawn(async move {
        for entity in batch {
            if let Err(err) = rescore_one(&db, &entity).await {
                tracing::warn!(entity_id = %entity.id, "rescore failed: {err}");
            }
        }
    })
}

async fn rescore_one(db: &DatabaseConnection, entity: &EntityModel) -> Result<(), DbErr> {
    let replies_count = Comments::find()
        .filter(CommentColumn::EntityId.eq(entity.id))
        .filter(CommentColumn::DeletedAt.is_null())
        .filter(CommentColumn::ParentDeletedAt.is_null())
        .count(db)
        .await?;

    let outcome = match score_entity(entity, replies_count, Utc::now()) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!(entity_id = %entity.id, "skipping rescore: {err}");
            return Ok(());
        }
    };

    if !outcome.updated {
        return Ok(());
    }

    Entities::update_many()
        .col_expr(EntityColumn::Score, Expr::value(outcome.new_score))
        .col_expr(
            EntityColumn::ScoreUpdatedAt,
            Expr::value(outcome.new_score_updated_at),
        )
        .filter(EntityColumn::Id.eq(entity.id))
        .exec(db)
        .await?;

    Ok(())
}
