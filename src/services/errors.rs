use thiserror::Error;

/// Caller-visible failures of the learning core. Everything except `Storage` is raised
/// before the operation's transaction writes anything.
#[derive(Debug, Error)]
pub(crate) enum LearningError {
    #[error("actor is not allowed to perform this operation")]
    Unauthorized,
    #[error("user already has an active enrollment in this course")]
    AlreadyEnrolled,
    #[error("enrollment is not active")]
    NotActive,
    #[error("course is not free")]
    NotFree,
    #[error("course is not available for enrollment")]
    CourseUnavailable,
    #[error("watched percentage must be between 0 and 100")]
    InvalidPercentage,
    #[error("playback position must not be negative")]
    InvalidPosition,
    #[error("review is not pending")]
    NotPending,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}
