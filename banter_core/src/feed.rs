use chrono::{Duration, Utc};
use sea_orm::{
    sea_query::{Expr, SimpleExpr},
    ColumnTrait, Condition, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect, QueryTrait,
    Select,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::prelude::*;
use crate::ids::{ProjectId, UserId};

/// Hard cap on entity and comment page sizes.
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Error, PartialEq)]
pub enum FeedError {
    #[error("page must be at least 1")]
    InvalidPage,
    #[error("limit must be at least 1")]
    InvalidLimit,
    #[error("latitude must be within [-90, 90]")]
    InvalidLatitude,
    #[error("longitude must be within [-180, 180]")]
    InvalidLongitude,
    #[error("radius must be positive")]
    InvalidRadius,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    New,
    Old,
    Top,
    Hot,
    Controversial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentSort {
    New,
    Old,
    Top,
    Controversial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFrame {
    Hour,
    Day,
    Week,
    Month,
    Year,
}

impl TimeFrame {
    fn window(self) -> Duration {
        match self {
            TimeFrame::Hour => Duration::hours(1),
            TimeFrame::Day => Duration::days(1),
            TimeFrame::Week => Duration::weeks(1),
            TimeFrame::Month => Duration::days(30),
            TimeFrame::Year => Duration::days(365),
        }
    }
}

/// 1-indexed pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page: u64,
    pub limit: u64,
}

impl Default for Page {
    fn default() -> Self {
        Page { page: 1, limit: 10 }
    }
}

impl Page {
    pub fn new(page: u64, limit: u64) -> Self {
        Page { page, limit }
    }

    /// Validates the request and returns `(offset, limit)` with the limit
    /// clamped to [`MAX_PAGE_SIZE`].
    pub fn offset_and_limit(self) -> Result<(u64, u64), FeedError> {
        if self.page < 1 {
            return Err(FeedError::InvalidPage);
        }
        if self.limit < 1 {
            return Err(FeedError::InvalidLimit);
        }
        let limit = self.limit.min(MAX_PAGE_SIZE);
        Ok(((self.page - 1) * limit, limit))
    }
}

/// Case-insensitive substring matching over a text column.
/// `includes` terms are OR-ed, `does_not_include` terms are AND-ed and a
/// NULL column passes the exclusion.
#[derive(Debug, Clone, Default)]
pub struct TextFilter {
    pub includes: Vec<String>,
    pub does_not_include: Vec<String>,
}

impl TextFilter {
    fn is_empty(&self) -> bool {
        self.includes.is_empty() && self.does_not_include.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GeoFilter {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
}

/// Predicates over the free-form metadata object.
#[derive(Debug, Clone, Default)]
pub struct MetadataFilter {
    pub includes: Vec<(String, serde_json::Value)>,
    pub does_not_include: Vec<(String, serde_json::Value)>,
    pub exists: Vec<String>,
    pub does_not_exist: Vec<String>,
}

/// Declarative feed request, translated into a single select over the
/// non-deleted entities of one project.
#[derive(Debug, Clone)]
pub struct FeedQuery {
    pub project_id: ProjectId,
    pub sort: SortBy,
    pub time_frame: Option<TimeFrame>,
    pub source_id: Option<String>,
    pub user_id: Option<UserId>,
    /// Restrict to entities authored by users this requester follows.
    pub followed_only_for: Option<UserId>,
    pub keywords_include: Vec<String>,
    pub keywords_exclude: Vec<String>,
    pub title: TextFilter,
    pub content: TextFilter,
    pub has_attachments: Option<bool>,
    pub geo: Option<GeoFilter>,
    pub metadata: MetadataFilter,
    pub page: Page,
}

impl FeedQuery {
    pub fn new(project_id: ProjectId) -> Self {
        FeedQuery {
            project_id,
            sort: SortBy::Hot,
            time_frame: None,
            source_id: None,
            user_id: None,
            followed_only_for: None,
            keywords_include: Vec::new(),
            keywords_exclude: Vec::new(),
            title: TextFilter::default(),
            content: TextFilter::default(),
            has_attachments: None,
            geo: None,
            metadata: MetadataFilter::default(),
            page: Page::default(),
        }
    }

    pub fn into_select(self) -> Result<Select<Entities>, FeedError> {
        let (offset, limit) = self.page.offset_and_limit()?;

        let mut select = Entities::find()
            .filter(EntityColumn::ProjectId.eq(self.project_id))
            .filter(EntityColumn::DeletedAt.is_null());

        if let Some(frame) = self.time_frame {
            select = select.filter(EntityColumn::CreatedAt.gte(Utc::now() - frame.window()));
        }

        if let Some(source_id) = self.source_id {
            select = select.filter(EntityColumn::SourceId.eq(source_id));
        }

        if let Some(user_id) = self.user_id {
            select = select.filter(EntityColumn::UserId.eq(user_id));
        }

        if let Some(requester) = self.followed_only_for {
            let followed = Follows::find()
                .select_only()
                .column(FollowColumn::FollowedId)
                .filter(FollowColumn::ProjectId.eq(self.project_id))
                .filter(FollowColumn::FollowerId.eq(requester))
                .into_query();
            select = select.filter(EntityColumn::UserId.in_subquery(followed));
        }

        for keyword in self.keywords_include {
            select = select.filter(Expr::cust_with_values(
                "EXISTS (SELECT 1 FROM json_each(entity.keywords) WHERE json_each.value = ?)",
                [keyword],
            ));
        }

        for keyword in self.keywords_exclude {
            select = select.filter(Expr::cust_with_values(
                "NOT EXISTS (SELECT 1 FROM json_each(entity.keywords) WHERE json_each.value = ?)",
                [keyword],
            ));
        }

        if !self.title.is_empty() {
            select = apply_text_filter(select, "entity.title", &self.title);
        }
        if !self.content.is_empty() {
            select = apply_text_filter(select, "entity.content", &self.content);
        }

        if let Some(has_attachments) = self.has_attachments {
            let expr = if has_attachments {
                Expr::cust("json_array_length(entity.attachments) > 0")
            } else {
                Expr::cust("json_array_length(entity.attachments) = 0")
            };
            select = select.filter(expr);
        }

        if let Some(geo) = self.geo {
            if !(-90.0..=90.0).contains(&geo.latitude) {
                return Err(FeedError::InvalidLatitude);
            }
            if !(-180.0..=180.0).contains(&geo.longitude) {
                return Err(FeedError::InvalidLongitude);
            }
            if geo.radius_meters <= 0.0 {
                return Err(FeedError::InvalidRadius);
            }

            // Haversine great-circle distance, earth radius in meters
            select = select.filter(Expr::cust_with_values(
                "entity.latitude IS NOT NULL AND entity.longitude IS NOT NULL \
                 AND 2 * 6371000 * asin(sqrt( \
                   pow(sin(radians(? - entity.latitude) / 2), 2) \
                   + cos(radians(entity.latitude)) * cos(radians(?)) \
                     * pow(sin(radians(? - entity.longitude) / 2), 2) \
                 )) <= ?",
                [geo.latitude, geo.latitude, geo.longitude, geo.radius_meters],
            ));
        }

        for (key, value) in self.metadata.includes {
            select = select.filter(Expr::cust_with_values(
                "json_extract(entity.metadata, ?) IS NOT NULL \
                 AND json_extract(entity.metadata, ?) = json_extract(?, '$')",
                [
                    json_path(&key),
                    json_path(&key),
                    value.to_string(),
                ],
            ));
        }

        for (key, value) in self.metadata.does_not_include {
            select = select.filter(Expr::cust_with_values(
                "entity.metadata IS NULL \
                 OR json_extract(entity.metadata, ?) IS NULL \
                 OR json_extract(entity.metadata, ?) <> json_extract(?, '$')",
                [
                    json_path(&key),
                    json_path(&key),
                    value.to_string(),
                ],
            ));
        }

        for key in self.metadata.exists {
            select = select.filter(Expr::cust_with_values(
                "entity.metadata IS NOT NULL AND json_type(entity.metadata, ?) IS NOT NULL",
                [json_path(&key)],
            ));
        }

        for key in self.metadata.does_not_exist {
            select = select.filter(Expr::cust_with_values(
                "entity.metadata IS NULL OR json_type(entity.metadata, ?) IS NULL",
                [json_path(&key)],
            ));
        }

        select = match self.sort {
            SortBy::New => select.order_by_desc(EntityColumn::CreatedAt),
            SortBy::Old => select.order_by_asc(EntityColumn::CreatedAt),
            SortBy::Hot => select
                .order_by_desc(EntityColumn::Score)
                .order_by_desc(EntityColumn::CreatedAt),
            SortBy::Top => select
                .order_by(vote_delta("entity"), Order::Desc)
                .order_by(upvote_count("entity"), Order::Desc)
                .order_by_desc(EntityColumn::CreatedAt),
            SortBy::Controversial => select
                .order_by(controversy("entity"), Order::Desc)
                .order_by_desc(EntityColumn::CreatedAt),
        };

        Ok(select.offset(offset).limit(limit))
    }
}

/// Apply a [`CommentSort`] to a comment select. Shares the vote arithmetic
/// with the entity feed.
pub fn order_comments(select: Select<Comments>, sort: CommentSort) -> Select<Comments> {
    match sort {
        CommentSort::New => select.order_by_desc(CommentColumn::CreatedAt),
        CommentSort::Old => select.order_by_asc(CommentColumn::CreatedAt),
        CommentSort::Top => select
            .order_by(vote_delta("comment"), Order::Desc)
            .order_by(upvote_count("comment"), Order::Desc)
            .order_by_desc(CommentColumn::CreatedAt),
        CommentSort::Controversial => select
            .order_by(controversy("comment"), Order::Desc)
            .order_by_desc(CommentColumn::CreatedAt),
    }
}

fn json_path(key: &str) -> String {
    format!("$.{key}")
}

fn apply_text_filter<E: EntityTrait>(
    mut select: Select<E>,
    column: &str,
    filter: &TextFilter,
) -> Select<E> {
    if !filter.includes.is_empty() {
        let mut any = Condition::any();
        for term in &filter.includes {
            any = any.add(Expr::cust_with_values(
                format!("LOWER({column}) LIKE ?"),
                [like_pattern(term)],
            ));
        }
        select = select.filter(any);
    }

    for term in &filter.does_not_include {
        select = select.filter(Expr::cust_with_values(
            format!("({column} IS NULL OR LOWER({column}) NOT LIKE ?)"),
            [like_pattern(term)],
        ));
    }

    select
}

fn like_pattern(term: &str) -> String {
    format!("%{}%", term.to_lowercase())
}

fn vote_delta(table: &str) -> SimpleExpr {
    Expr::cust(format!(
        "json_array_length({table}.upvotes) - json_array_length({table}.downvotes)"
    ))
}

fn upvote_count(table: &str) -> SimpleExpr {
    Expr::cust(format!("json_array_length({table}.upvotes)"))
}

/// Guarded controversy ranking. `min/max` keeps the balance term in [0, 1]
/// and the outer `max(_, 1)` avoids dividing by zero on unvoted rows.
fn controversy(table: &str) -> SimpleExpr {
    let up = format!("json_array_length({table}.upvotes)");
    let down = format!("json_array_length({table}.downvotes)");
    Expr::cust(format!(
        "ln({up} + {down} + 1) * (min({up}, {down}) * 1.0 / max(max({up}, {down}), 1))"
    ))
}
