use sqlx::PgPool;

use crate::db::models::ModerationReview;
use crate::db::types::{ReviewStatus, SubjectType};

const COLUMNS: &str = "id, subject_type, subject_id, status, submitted_by, reviewer_id, notes, \
     created_at, updated_at";

pub(crate) struct SubmitReview<'a> {
    pub(crate) id: &'a str,
    pub(crate) subject_type: SubjectType,
    pub(crate) subject_id: &'a str,
    pub(crate) submitted_by: &'a str,
    pub(crate) notes: Option<&'a str>,
    pub(crate) submitted_at: time::PrimitiveDateTime,
}

/// Creates the review for a subject or resets the existing one back to pending, dropping
/// the previous reviewer and notes.
pub(crate) async fn upsert_pending(
    executor: impl sqlx::PgExecutor<'_>,
    params: SubmitReview<'_>,
) -> Result<ModerationReview, sqlx::Error> {
    sqlx::query_as::<_, ModerationReview>(&format!(
        "INSERT INTO moderation_reviews (
            id, subject_type, subject_id, status, submitted_by, reviewer_id, notes,
            created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,NULL,$6,$7,$7)
         ON CONFLICT ON CONSTRAINT uq_moderation_reviews_subject
         DO UPDATE SET status = EXCLUDED.status,
                       submitted_by = EXCLUDED.submitted_by,
                       reviewer_id = NULL,
                       notes = EXCLUDED.notes,
                       updated_at = EXCLUDED.updated_at
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.subject_type)
    .bind(params.subject_id)
    .bind(ReviewStatus::Pending)
    .bind(params.submitted_by)
    .bind(params.notes)
    .bind(params.submitted_at)
    .fetch_one(executor)
    .await
}

pub(crate) async fn find_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    review_id: &str,
) -> Result<Option<ModerationReview>, sqlx::Error> {
    sqlx::query_as::<_, ModerationReview>(&format!(
        "SELECT {COLUMNS} FROM moderation_reviews WHERE id = $1"
    ))
    .bind(review_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn lock_by_id(
    executor: impl sqlx::PgExecutor<'_>,
    review_id: &str,
) -> Result<Option<ModerationReview>, sqlx::Error> {
    sqlx::query_as::<_, ModerationReview>(&format!(
        "SELECT {COLUMNS} FROM moderation_reviews WHERE id = $1 FOR UPDATE"
    ))
    .bind(review_id)
    .fetch_optional(executor)
    .await
}

pub(crate) async fn resolve(
    executor: impl sqlx::PgExecutor<'_>,
    review_id: &str,
    status: ReviewStatus,
    reviewer_id: &str,
    notes: Option<&str>,
    resolved_at: time::PrimitiveDateTime,
) -> Result<ModerationReview, sqlx::Error> {
    sqlx::query_as::<_, ModerationReview>(&format!(
        "UPDATE moderation_reviews
         SET status = $1, reviewer_id = $2, notes = $3, updated_at = $4
         WHERE id = $5
         RETURNING {COLUMNS}"
    ))
    .bind(status)
    .bind(reviewer_id)
    .bind(notes)
    .bind(resolved_at)
    .bind(review_id)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_by_status(
    pool: &PgPool,
    status: ReviewStatus,
    skip: i64,
    limit: i64,
) -> Result<Vec<ModerationReview>, sqlx::Error> {
    sqlx::query_as::<_, ModerationReview>(&format!(
        "SELECT {COLUMNS} FROM moderation_reviews
         WHERE status = $1
         ORDER BY updated_at
         OFFSET $2 LIMIT $3"
    ))
    .bind(status)
    .bind(skip)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub(crate) async fn count_by_status(
    pool: &PgPool,
    status: ReviewStatus,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM moderation_reviews WHERE status = $1")
        .bind(status)
        .fetch_one(pool)
        .await
}
