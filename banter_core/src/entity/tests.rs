use chrono::Utc;

use crate::entity::prelude::*;
use crate::ids::{CommentId, EntityId, ProjectId, UserId};
use crate::test_utils::create_test_db;

fn blank_entity(project_id: ProjectId, user_id: Option<UserId>) -> EntityActiveModel {
    let id = EntityId::new();
    let now = Utc::now();
    EntityActiveModel {
        id: Set(id),
        project_id: Set(project_id),
        user_id: Set(user_id),
        short_id: Set(id.to_string()),
        foreign_id: Set(None),
        source_id: Set(None),
        title: Set(None),
        content: Set(None),
        attachments: Set(Attachments::default()),
        mentions: Set(Mentions::default()),
        keywords: Set(Keywords::default()),
        upvotes: Set(UserIdSet::default()),
        downvotes: Set(UserIdSet::default()),
        shares_count: Set(0),
        views: Set(1),
        latitude: Set(None),
        longitude: Set(None),
        score: Set(2.0),
        score_updated_at: Set(now),
        metadata: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
}

#[tokio::test]
async fn test_entity_json_columns_roundtrip() {
    let db = create_test_db().await;
    let project_id = ProjectId::new();
    let voter = UserId::new();

    let mut entity = blank_entity(project_id, None);
    entity.title = Set(Some("Hello".to_string()));
    entity.keywords = Set(Keywords(vec!["rust".to_string(), "sqlite".to_string()]));
    entity.upvotes = Set(UserIdSet(vec![voter]));
    entity.metadata = Set(Some(serde_json::json!({ "pinned": true })));

    let created = Entities::insert(entity)
        .exec_with_returning(&db)
        .await
        .unwrap();

    let fetched = Entities::find_by_id(created.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(fetched.keywords.0, vec!["rust", "sqlite"]);
    assert!(fetched.upvotes.contains(&voter));
    assert_eq!(
        fetched.metadata,
        Some(serde_json::json!({ "pinned": true }))
    );
}

#[tokio::test]
async fn test_comment_optional_columns_roundtrip() {
    let db = create_test_db().await;
    let project_id = ProjectId::new();
    let user_id = UserId::new();
    let now = Utc::now();

    let user = UserActiveModel {
        id: Set(user_id),
        project_id: Set(project_id),
        name: Set(None),
        username: Set(Some("rob".to_string())),
        avatar: Set(None),
        bio: Set(None),
        reputation: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Users::insert(user).exec(&db).await.unwrap();

    let entity = Entities::insert(blank_entity(project_id, None))
        .exec_with_returning(&db)
        .await
        .unwrap();

    let comment = CommentActiveModel {
        id: Set(CommentId::new()),
        project_id: Set(project_id),
        entity_id: Set(entity.id),
        parent_id: Set(None),
        user_id: Set(user_id),
        content: Set(None),
        gif: Set(Some(GifData(serde_json::json!({ "url": "g.gif" })))),
        mentions: Set(Mentions::default()),
        attachments: Set(Attachments::default()),
        upvotes: Set(UserIdSet::default()),
        downvotes: Set(UserIdSet::default()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        parent_deleted_at: Set(None),
    };

    let created = Comments::insert(comment)
        .exec_with_returning(&db)
        .await
        .unwrap();

    let fetched = Comments::find_by_id(created.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();

    assert!(fetched.content.is_none());
    assert_eq!(fetched.gif, Some(GifData(serde_json::json!({ "url": "g.gif" }))));
    assert!(fetched.parent_deleted_at.is_none());
}

#[tokio::test]
async fn test_nullable_id_columns_decode_as_none() {
    let db = create_test_db().await;
    let project_id = ProjectId::new();
    let user_id = UserId::new();
    let now = Utc::now();

    let user = UserActiveModel {
        id: Set(user_id),
        project_id: Set(project_id),
        name: Set(None),
        username: Set(None),
        avatar: Set(None),
        bio: Set(None),
        reputation: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Users::insert(user).exec(&db).await.unwrap();

    // Authorless entity: user_id is NULL
    let entity = Entities::insert(blank_entity(project_id, None))
        .exec_with_returning(&db)
        .await
        .unwrap();

    let fetched = Entities::find_by_id(entity.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(fetched.user_id.is_none());

    // Top-level comment: parent_id is NULL
    let comment = CommentActiveModel {
        id: Set(CommentId::new()),
        project_id: Set(project_id),
        entity_id: Set(entity.id),
        parent_id: Set(None),
        user_id: Set(user_id),
        content: Set(Some("top level".to_string())),
        gif: Set(None),
        mentions: Set(Mentions::default()),
        attachments: Set(Attachments::default()),
        upvotes: Set(UserIdSet::default()),
        downvotes: Set(UserIdSet::default()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
        parent_deleted_at: Set(None),
    };
    let created = Comments::insert(comment)
        .exec_with_returning(&db)
        .await
        .unwrap();

    let fetched = Comments::find_by_id(created.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    assert!(fetched.parent_id.is_none());
}

#[test]
fn test_user_id_set_is_a_set() {
    let a = UserId::new();
    let b = UserId::new();

    let mut set = UserIdSet::default();
    assert!(set.insert(a));
    assert!(!set.insert(a));
    assert!(set.insert(b));
    assert_eq!(set.len(), 2);

    assert!(set.remove(&a));
    assert!(!set.remove(&a));
    assert_eq!(set.len(), 1);
}

#[test]
fn test_keywords_normalized_drops_blanks() {
    let keywords = Keywords::normalized(vec![
        "  rust ".to_string(),
        "".to_string(),
        "   ".to_string(),
        "db".to_string(),
    ]);
    assert_eq!(keywords.0, vec!["rust", "db"]);
}
