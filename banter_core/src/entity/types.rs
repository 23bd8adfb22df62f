use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, UserId};

/// JSON-backed set of user ids. Used for vote rolls and reporter lists.
/// Uniqueness is enforced here, not by the database.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct UserIdSet(pub Vec<UserId>);

impl UserIdSet {
    pub fn contains(&self, id: &UserId) -> bool {
        self.0.contains(id)
    }

    /// Returns false if the id was already present.
    pub fn insert(&mut self, id: UserId) -> bool {
        if self.0.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    /// Returns false if the id was not present.
    pub fn remove(&mut self, id: &UserId) -> bool {
        let before = self.0.len();
        self.0.retain(|member| member != id);
        self.0.len() != before
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// JSON-backed set of entity ids, used by bookmark lists.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct EntityIdSet(pub Vec<EntityId>);

impl EntityIdSet {
    pub fn contains(&self, id: &EntityId) -> bool {
        self.0.contains(id)
    }

    pub fn insert(&mut self, id: EntityId) -> bool {
        if self.0.contains(&id) {
            return false;
        }
        self.0.push(id);
        true
    }

    pub fn remove(&mut self, id: &EntityId) -> bool {
        let before = self.0.len();
        self.0.retain(|member| member != id);
        self.0.len() != before
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Searchable keyword tags on an entity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Keywords(pub Vec<String>);

impl Keywords {
    /// Trims every keyword and drops blanks.
    pub fn normalized(raw: Vec<String>) -> Self {
        Keywords(
            raw.into_iter()
                .map(|keyword| keyword.trim().to_owned())
                .filter(|keyword| !keyword.is_empty())
                .collect(),
        )
    }
}

/// Usernames referenced with an @handle in the body text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Mentions(pub Vec<String>);

/// Opaque attachment descriptors, passed through from the uploader.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Attachments(pub Vec<serde_json::Value>);

impl Attachments {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Opaque gif payload from the client picker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct GifData(pub serde_json::Value);
