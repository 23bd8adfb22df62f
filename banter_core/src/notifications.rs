use std::sync::Arc;

use async_trait::async_trait;

use crate::ids::{CommentId, EntityId, UserId};

/// Events emitted by the services after the triggering write has committed.
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    EntityUpvote {
        entity_id: EntityId,
        author: Option<UserId>,
        voter: UserId,
    },
    EntityComment {
        entity_id: EntityId,
        author: Option<UserId>,
        comment_id: CommentId,
        commenter: UserId,
    },
    CommentReply {
        parent_id: CommentId,
        author: UserId,
        reply_id: CommentId,
        replier: UserId,
    },
    CommentMention {
        comment_id: CommentId,
        mentioned: String,
        commenter: UserId,
    },
    NewFollow {
        follower: UserId,
        followed: UserId,
    },
}

/// Delivery backend for notification events. Implementations own retry and
/// fan-out; callers never wait on them.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn dispatch(
        &self,
        event: NotificationEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Default sink. Writes events to the log and nothing else.
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn dispatch(
        &self,
        event: NotificationEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(?event, "notification");
        Ok(())
    }
}

/// Fire-and-forget dispatch. Failures are logged and dropped.
pub fn notify(sink: Arc<dyn NotificationSink>, event: NotificationEvent) {
    tokio::spawn(async move {
        if let Err(err) = sink.dispatch(event).await {
            tracing::warn!("notification dispatch failed: {err}");
        }
    });
}
