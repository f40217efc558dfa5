use sqlx::PgConnection;
use uuid::Uuid;

use crate::core::state::AppState;
use crate::db::models::{ModerationReview, User};
use crate::db::types::{ReviewStatus, SubjectType};
use crate::repositories;
use crate::repositories::moderation_reviews::SubmitReview;
use crate::services::access;
use crate::services::errors::LearningError;
use crate::services::facts::{self, Fact, Outcome};

/// Publishable entity under review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ModerationSubject {
    Course(String),
    Lesson(String),
}

impl ModerationSubject {
    pub(crate) fn from_parts(subject_type: SubjectType, subject_id: String) -> Self {
        match subject_type {
            SubjectType::Course => Self::Course(subject_id),
            SubjectType::Lesson => Self::Lesson(subject_id),
        }
    }

    pub(crate) fn subject_type(&self) -> SubjectType {
        match self {
            Self::Course(_) => SubjectType::Course,
            Self::Lesson(_) => SubjectType::Lesson,
        }
    }

    pub(crate) fn id(&self) -> &str {
        match self {
            Self::Course(id) | Self::Lesson(id) => id,
        }
    }

    async fn exists(&self, conn: &mut PgConnection) -> Result<bool, sqlx::Error> {
        Ok(match self {
            Self::Course(id) => repositories::courses::find_by_id(conn, id)
                .await?
                .is_some_and(|course| course.deleted_at.is_none()),
            Self::Lesson(id) => repositories::lessons::find_by_id(conn, id).await?.is_some(),
        })
    }

    /// Flips the subject's publish flag. `false` when the subject is gone.
    async fn publish(
        &self,
        conn: &mut PgConnection,
        now: time::PrimitiveDateTime,
    ) -> Result<bool, sqlx::Error> {
        match self {
            Self::Course(id) => repositories::courses::set_published(conn, id, now).await,
            Self::Lesson(id) => repositories::lessons::set_published(conn, id, now).await,
        }
    }
}

pub(crate) fn ensure_pending(review: &ModerationReview) -> Result<(), LearningError> {
    if review.status == ReviewStatus::Pending {
        Ok(())
    } else {
        Err(LearningError::NotPending)
    }
}

/// Puts the subject (back) into review. Any earlier decision, reviewer and notes are
/// discarded.
pub(crate) async fn submit(
    state: &AppState,
    actor: &User,
    subject: &ModerationSubject,
    notes: Option<&str>,
) -> Result<Outcome<ModerationReview>, LearningError> {
    if !access::can_submit_for_review(actor) {
        return Err(LearningError::Unauthorized);
    }

    let mut conn = state.db().acquire().await?;
    if !subject.exists(&mut conn).await? {
        return Err(LearningError::NotFound("moderation subject"));
    }

    let review = repositories::moderation_reviews::upsert_pending(
        &mut *conn,
        SubmitReview {
            id: &Uuid::new_v4().to_string(),
            subject_type: subject.subject_type(),
            subject_id: subject.id(),
            submitted_by: &actor.id,
            notes,
            submitted_at: state.clock().now(),
        },
    )
    .await?;

    Ok(Outcome::new(review, Vec::new()))
}

/// Approves a pending review and publishes its subject in the same transaction.
pub(crate) async fn approve(
    state: &AppState,
    actor: &User,
    review_id: &str,
    notes: Option<&str>,
) -> Result<Outcome<ModerationReview>, LearningError> {
    resolve(state, actor, review_id, ReviewStatus::Approved, notes).await
}

/// Rejects a pending review; the subject's publish flag is left as is.
pub(crate) async fn reject(
    state: &AppState,
    actor: &User,
    review_id: &str,
    reason: &str,
) -> Result<Outcome<ModerationReview>, LearningError> {
    resolve(state, actor, review_id, ReviewStatus::Rejected, Some(reason)).await
}

async fn resolve(
    state: &AppState,
    actor: &User,
    review_id: &str,
    decision: ReviewStatus,
    notes: Option<&str>,
) -> Result<Outcome<ModerationReview>, LearningError> {
    if !access::can_resolve_review(actor) {
        return Err(LearningError::Unauthorized);
    }

    let now = state.clock().now();
    let mut tx = state.db().begin().await?;

    let review = repositories::moderation_reviews::lock_by_id(&mut *tx, review_id)
        .await?
        .ok_or(LearningError::NotFound("review"))?;
    ensure_pending(&review)?;

    let resolved = repositories::moderation_reviews::resolve(
        &mut *tx, &review.id, decision, &actor.id, notes, now,
    )
    .await?;

    if decision == ReviewStatus::Approved {
        let subject =
            ModerationSubject::from_parts(resolved.subject_type, resolved.subject_id.clone());
        if !subject.publish(&mut tx, now).await? {
            return Err(LearningError::NotFound("moderation subject"));
        }
    }

    let produced = vec![Fact::ReviewResolved {
        review_id: resolved.id.clone(),
        subject_type: resolved.subject_type,
        subject_id: resolved.subject_id.clone(),
        status: resolved.status,
        submitted_by: resolved.submitted_by.clone(),
    }];
    facts::record(&mut tx, &produced, now).await?;
    tx.commit().await?;

    metrics::counter!(
        crate::core::metrics::MODERATION_DECISIONS_TOTAL,
        "decision" => decision_label(decision)
    )
    .increment(1);

    Ok(Outcome::new(resolved, produced))
}

fn decision_label(status: ReviewStatus) -> &'static str {
    match status {
        ReviewStatus::Pending => "pending",
        ReviewStatus::Approved => "approved",
        ReviewStatus::Rejected => "rejected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::UserRole;
    use crate::test_support;
    use time::macros::datetime;

    fn review(status: ReviewStatus) -> ModerationReview {
        ModerationReview {
            id: "review-1".to_string(),
            subject_type: SubjectType::Course,
            subject_id: "course-1".to_string(),
            status,
            submitted_by: "author".to_string(),
            reviewer_id: None,
            notes: None,
            created_at: datetime!(2025-01-01 00:00:00),
            updated_at: datetime!(2025-01-01 00:00:00),
        }
    }

    #[test]
    fn only_pending_reviews_can_be_resolved() {
        assert!(ensure_pending(&review(ReviewStatus::Pending)).is_ok());
        assert!(matches!(
            ensure_pending(&review(ReviewStatus::Approved)),
            Err(LearningError::NotPending)
        ));
        assert!(matches!(
            ensure_pending(&review(ReviewStatus::Rejected)),
            Err(LearningError::NotPending)
        ));
    }

    #[test]
    fn subject_round_trips_through_parts() {
        let subject = ModerationSubject::from_parts(SubjectType::Lesson, "lesson-9".to_string());
        assert_eq!(subject, ModerationSubject::Lesson("lesson-9".to_string()));
        assert_eq!(subject.subject_type(), SubjectType::Lesson);
        assert_eq!(subject.id(), "lesson-9");
    }

    #[tokio::test]
    async fn approval_publishes_course() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();

        let author = test_support::insert_user(pool, "author30", UserRole::Instructor).await;
        let admin = test_support::insert_user(pool, "admin30", UserRole::Admin).await;
        let course = test_support::insert_course(pool, &author.id, None, false).await;
        let subject = ModerationSubject::Course(course.id.clone());

        let submitted =
            submit(&ctx.state, &author, &subject, Some("ready")).await.expect("submit");
        assert_eq!(submitted.value.status, ReviewStatus::Pending);

        let approved = approve(&ctx.state, &admin, &submitted.value.id, Some("looks good"))
            .await
            .expect("approve");
        assert_eq!(approved.value.status, ReviewStatus::Approved);
        assert_eq!(approved.value.reviewer_id.as_deref(), Some(admin.id.as_str()));

        let course = repositories::courses::find_by_id(pool, &course.id)
            .await
            .expect("find")
            .expect("course");
        assert!(course.is_published);

        let again = approve(&ctx.state, &admin, &submitted.value.id, None).await;
        assert!(matches!(again, Err(LearningError::NotPending)));
    }

    #[tokio::test]
    async fn rejection_keeps_lesson_hidden_and_resubmit_resets() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();

        let author = test_support::insert_user(pool, "author31", UserRole::Instructor).await;
        let admin = test_support::insert_user(pool, "admin31", UserRole::Admin).await;
        let course = test_support::insert_course(pool, &author.id, None, true).await;
        let lesson = test_support::insert_lesson(pool, &course.id, 1, false, false).await;
        let subject = ModerationSubject::Lesson(lesson.id.clone());

        let submitted = submit(&ctx.state, &author, &subject, None).await.expect("submit");
        let rejected = reject(&ctx.state, &admin, &submitted.value.id, "audio is missing")
            .await
            .expect("reject");
        assert_eq!(rejected.value.status, ReviewStatus::Rejected);
        assert_eq!(rejected.value.notes.as_deref(), Some("audio is missing"));

        let lesson_row = repositories::lessons::find_by_id(pool, &lesson.id)
            .await
            .expect("find")
            .expect("lesson");
        assert!(!lesson_row.is_published);

        let resubmitted = submit(&ctx.state, &author, &subject, None).await.expect("resubmit");
        assert_eq!(resubmitted.value.id, submitted.value.id);
        assert_eq!(resubmitted.value.status, ReviewStatus::Pending);
        assert!(resubmitted.value.reviewer_id.is_none());
        assert!(resubmitted.value.notes.is_none());
    }

    #[tokio::test]
    async fn role_guards() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();

        let author = test_support::insert_user(pool, "author32", UserRole::Instructor).await;
        let student = test_support::insert_user(pool, "student32", UserRole::Student).await;
        let course = test_support::insert_course(pool, &author.id, None, false).await;
        let subject = ModerationSubject::Course(course.id.clone());

        let denied = submit(&ctx.state, &student, &subject, None).await;
        assert!(matches!(denied, Err(LearningError::Unauthorized)));

        let submitted = submit(&ctx.state, &author, &subject, None).await.expect("submit");
        let denied = approve(&ctx.state, &author, &submitted.value.id, None).await;
        assert!(matches!(denied, Err(LearningError::Unauthorized)));

        let review = repositories::moderation_reviews::find_by_id(pool, &submitted.value.id)
            .await
            .expect("find")
            .expect("review");
        assert_eq!(review.status, ReviewStatus::Pending);
    }
}
