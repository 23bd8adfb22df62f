use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    #[error("no signed-in user")]
    NotSignedIn,

    #[error("draft has no content")]
    EmptyDraft,

    #[error("parent comment has not been confirmed yet")]
    ParentNotConfirmed,

    #[error("api error: {0}")]
    Api(String),
}
