use std::collections::HashMap;

use banter_core::ids::{CommentId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tree nodes are keyed by either a server id or, while an optimistic post is
/// in flight, a client-generated placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKey {
    Confirmed(CommentId),
    Pending(String),
}

impl NodeKey {
    pub fn is_pending(&self) -> bool {
        matches!(self, NodeKey::Pending(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentAuthor {
    pub id: UserId,
    pub username: Option<String>,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeComment {
    pub key: NodeKey,
    pub parent: Option<NodeKey>,
    pub author: CommentAuthor,
    pub content: Option<String>,
    pub gif: Option<serde_json::Value>,
    pub mentions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub upvotes: usize,
    pub downvotes: usize,
}

/// Client-side view of one entity's comment thread. Sibling order is owned
/// by the tree: new comments are shown first, older pages are appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommentTree {
    nodes: HashMap<NodeKey, TreeComment>,
    top_level: Vec<NodeKey>,
    children: HashMap<NodeKey, Vec<NodeKey>>,
}

impl CommentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a batch of comments. Fresh comments (`is_new`) are prepended to
    /// their sibling list; paged-in history is appended. Keys already in the
    /// tree are skipped.
    pub fn insert(&mut self, batch: Vec<TreeComment>, is_new: bool) {
        for comment in batch {
            if self.nodes.contains_key(&comment.key) {
                continue;
            }

            let siblings = match &comment.parent {
                Some(parent) => self.children.entry(parent.clone()).or_default(),
                None => &mut self.top_level,
            };
            if is_new {
                siblings.insert(0, comment.key.clone());
            } else {
                siblings.push(comment.key.clone());
            }

            self.nodes.insert(comment.key.clone(), comment);
        }
    }

    /// Removes a comment and everything nested under it. Returns the removed
    /// root, if it was present.
    pub fn remove(&mut self, key: &NodeKey) -> Option<TreeComment> {
        let root = self.nodes.remove(key)?;

        // Detach from the sibling list
        match &root.parent {
            Some(parent) => {
                if let Some(siblings) = self.children.get_mut(parent) {
                    siblings.retain(|sibling| sibling != key);
                    if siblings.is_empty() {
                        self.children.remove(parent);
                    }
                }
            }
            None => self.top_level.retain(|sibling| sibling != key),
        }

        // Drop the subtree
        let mut frontier = vec![key.clone()];
        while let Some(next) = frontier.pop() {
            if let Some(descendants) = self.children.remove(&next) {
                for descendant in descendants {
                    self.nodes.remove(&descendant);
                    frontier.push(descendant);
                }
            }
        }

        Some(root)
    }

    pub fn get(&self, key: &NodeKey) -> Option<&TreeComment> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn top_level(&self) -> Vec<&TreeComment> {
        self.top_level
            .iter()
            .filter_map(|key| self.nodes.get(key))
            .collect()
    }

    pub fn replies_of(&self, key: &NodeKey) -> Vec<&TreeComment> {
        self.children
            .get(key)
            .map(|keys| keys.iter().filter_map(|k| self.nodes.get(k)).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
