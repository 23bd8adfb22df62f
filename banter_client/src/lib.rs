//! Client-side comment thread state: an optimistic comment tree and the
//! composer that drives it. Backend access goes through the [`composer::CommentsApi`]
//! trait so this crate stays transport-agnostic.

pub mod composer;
pub mod error;
pub mod mentions;
pub mod tree;

pub mod prelude {
    pub use super::composer::{
        CommentComposer, CommentsApi, CreateCommentRequest, Draft, SubmitOutcome,
    };
    pub use super::error::ClientError;
    pub use super::mentions::filter_mentions;
    pub use super::tree::{CommentAuthor, CommentTree, NodeKey, TreeComment};
}
