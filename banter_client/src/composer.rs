use async_trait::async_trait;
use banter_core::ids::{CommentId, EntityId};
use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};

use crate::error::ClientError;
use crate::mentions::filter_mentions;
use crate::tree::{CommentAuthor, CommentTree, NodeKey, TreeComment};

/// Payload handed to the backend when a draft is submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateCommentRequest {
    pub entity_id: EntityId,
    pub parent_id: Option<CommentId>,
    pub content: Option<String>,
    pub gif: Option<serde_json::Value>,
    pub mentions: Vec<String>,
}

/// Transport seam. The UI wires this to whatever carries requests to the
/// backend; tests use an in-memory double.
#[async_trait]
pub trait CommentsApi: Send + Sync {
    async fn create_comment(&self, request: CreateCommentRequest) -> Result<TreeComment, String>;
}

/// What the user has typed so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub content: Option<String>,
    pub gif: Option<serde_json::Value>,
    /// Usernames the editor offered for completion. Only the ones that
    /// survive [`filter_mentions`] are sent.
    pub mentions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The comment was accepted and lives in the tree under this key.
    Posted(NodeKey),
    /// A submit was already in flight; this one was dropped.
    Suppressed,
}

/// Drives one entity's comment box: reply targeting, optimistic inserts,
/// and rollback when the backend rejects a post.
pub struct CommentComposer<A: CommentsApi> {
    pub tree: CommentTree,
    api: A,
    entity_id: EntityId,
    pub current_user: Option<CommentAuthor>,
    reply_target: Option<NodeKey>,
    push_mention: Option<String>,
    submitting: bool,
    failed_draft: Option<Draft>,
}

impl<A: CommentsApi> CommentComposer<A> {
    pub fn new(api: A, entity_id: EntityId, current_user: Option<CommentAuthor>) -> Self {
        Self {
            tree: CommentTree::new(),
            api,
            entity_id,
            current_user,
            reply_target: None,
            push_mention: None,
            submitting: false,
            failed_draft: None,
        }
    }

    /// Reply directly under the given comment.
    pub fn deep_reply(&mut self, key: &NodeKey) {
        if self.tree.contains(key) {
            self.reply_target = Some(key.clone());
            self.push_mention = None;
        }
    }

    /// Reply alongside the given comment (under its parent), mentioning its
    /// author so the thread reads as an answer to them.
    pub fn shallow_reply(&mut self, key: &NodeKey) {
        let Some(node) = self.tree.get(key) else {
            return;
        };
        self.reply_target = node.parent.clone();
        self.push_mention = node.author.username.clone();
    }

    pub fn clear_reply(&mut self) {
        self.reply_target = None;
        self.push_mention = None;
    }

    pub fn reply_target(&self) -> Option<&NodeKey> {
        self.reply_target.as_ref()
    }

    /// The draft from the last failed submit, so the UI can put the text
    /// back in the box.
    pub fn take_failed_draft(&mut self) -> Option<Draft> {
        self.failed_draft.take()
    }

    /// Posts the draft. The comment appears in the tree immediately under a
    /// pending key and is swapped for the confirmed row when the backend
    /// answers; on failure the tree is restored and the draft stashed.
    pub async fn submit(&mut self, draft: Draft) -> Result<SubmitOutcome, ClientError> {
        if self.submitting {
            return Ok(SubmitOutcome::Suppressed);
        }

        let author = self
            .current_user
            .clone()
            .ok_or(ClientError::NotSignedIn)?;

        let content = draft
            .content
            .clone()
            .filter(|text| !text.trim().is_empty());
        if content.is_none() && draft.gif.is_none() {
            return Err(ClientError::EmptyDraft);
        }

        let parent_id = match &self.reply_target {
            Some(NodeKey::Confirmed(id)) => Some(*id),
            Some(NodeKey::Pending(_)) => return Err(ClientError::ParentNotConfirmed),
            None => None,
        };

        self.submitting = true;

        let mut candidates = draft.mentions.clone();
        if let Some(pushed) = &self.push_mention {
            if !candidates.contains(pushed) {
                candidates.push(pushed.clone());
            }
        }
        let mentions = filter_mentions(content.as_deref().unwrap_or(""), &candidates);

        let suffix: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        let pending_key = NodeKey::Pending(format!("pending-{suffix}"));

        self.tree.insert(
            vec![TreeComment {
                key: pending_key.clone(),
                parent: self.reply_target.clone(),
                author,
                content: content.clone(),
                gif: draft.gif.clone(),
                mentions: mentions.clone(),
                created_at: Utc::now(),
                upvotes: 0,
                downvotes: 0,
            }],
            true,
        );

        let request = CreateCommentRequest {
            entity_id: self.entity_id,
            parent_id,
            content,
            gif: draft.gif.clone(),
            mentions,
        };

        self.clear_reply();

        let result = self.api.create_comment(request).await;
        self.submitting = false;

        match result {
            Ok(confirmed) => {
                self.tree.remove(&pending_key);
                let key = confirmed.key.clone();
                self.tree.insert(vec![confirmed], true);
                Ok(SubmitOutcome::Posted(key))
            }
            Err(message) => {
                tracing::warn!(%message, "comment submit rejected, rolling back");
                self.tree.remove(&pending_key);
                self.failed_draft = Some(draft);
                Err(ClientError::Api(message))
            }
        }
    }
}
