use uuid::Uuid;

use crate::core::state::AppState;
use crate::db::models::{LessonProgress, User};
use crate::repositories;
use crate::repositories::lesson_progress::ProgressWrite;
use crate::services::access;
use crate::services::completion;
use crate::services::errors::LearningError;
use crate::services::facts::{self, Fact, Outcome};

/// Percentage to store given the previous value. Below the threshold the latest report wins;
/// once the threshold was reached the value only moves up.
pub(crate) fn stored_percentage(previous: Option<i32>, incoming: i32, threshold: i32) -> i32 {
    match previous {
        Some(previous) if previous >= threshold => previous.max(incoming),
        _ => incoming,
    }
}

/// True only on the write that takes the lesson from not completed to completed.
pub(crate) fn crosses_threshold(previous: Option<i32>, stored: i32, threshold: i32) -> bool {
    let was_completed = previous.is_some_and(|previous| previous >= threshold);
    !was_completed && stored >= threshold
}

pub(crate) fn validate_report(
    watched_percentage: i32,
    last_position_seconds: i32,
) -> Result<(), LearningError> {
    if !(0..=100).contains(&watched_percentage) {
        return Err(LearningError::InvalidPercentage);
    }
    if last_position_seconds < 0 {
        return Err(LearningError::InvalidPosition);
    }
    Ok(())
}

/// Records a watch report for (user, lesson) and, when this report completes the lesson,
/// checks whether the whole course is now complete. Progress, completion and their facts
/// commit together.
pub(crate) async fn record_progress(
    state: &AppState,
    user: &User,
    lesson_id: &str,
    watched_percentage: i32,
    last_position_seconds: i32,
) -> Result<Outcome<LessonProgress>, LearningError> {
    let lesson = repositories::lessons::find_by_id(state.db(), lesson_id)
        .await?
        .ok_or(LearningError::NotFound("lesson"))?;

    let has_active_enrollment = if lesson.is_open_preview() {
        false
    } else {
        repositories::enrollments::has_active(state.db(), &user.id, &lesson.course_id).await?
    };
    if !access::can_watch(&lesson, user, has_active_enrollment) {
        return Err(LearningError::Unauthorized);
    }

    validate_report(watched_percentage, last_position_seconds)?;

    let threshold = state.settings().learning().completion_threshold;
    let now = state.clock().now();

    let mut tx = state.db().begin().await?;

    let first_write = ProgressWrite {
        id: &Uuid::new_v4().to_string(),
        user_id: &user.id,
        lesson_id: &lesson.id,
        watched_percentage,
        last_position_seconds,
        watched_at: now,
    };

    let (previous, progress) =
        match repositories::lesson_progress::insert_if_absent(&mut *tx, &first_write).await? {
            Some(created) => (None, created),
            None => {
                let existing = repositories::lesson_progress::lock_for_user_lesson(
                    &mut *tx, &user.id, &lesson.id,
                )
                .await?
                .ok_or(LearningError::NotFound("lesson progress"))?;

                let stored = stored_percentage(
                    Some(existing.watched_percentage),
                    watched_percentage,
                    threshold,
                );
                let updated = repositories::lesson_progress::update(
                    &mut *tx,
                    &existing.id,
                    stored,
                    last_position_seconds,
                    now,
                )
                .await?;
                (Some(existing.watched_percentage), updated)
            }
        };

    let mut produced = vec![Fact::ProgressUpdated {
        user_id: user.id.clone(),
        lesson_id: lesson.id.clone(),
        course_id: lesson.course_id.clone(),
        percentage: progress.watched_percentage,
        position: progress.last_position_seconds,
    }];

    let lesson_completed = crosses_threshold(previous, progress.watched_percentage, threshold);
    if lesson_completed {
        let course_fact =
            completion::check_and_complete(&mut tx, &user.id, &lesson.course_id, threshold, now)
                .await?;
        produced.extend(course_fact);
    }

    facts::record(&mut tx, &produced, now).await?;
    tx.commit().await?;

    if lesson_completed {
        metrics::counter!(crate::core::metrics::LESSON_COMPLETIONS_TOTAL).increment(1);
    }

    Ok(Outcome::new(progress, produced))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::UserRole;
    use crate::test_support;

    #[test]
    fn below_threshold_latest_report_wins() {
        assert_eq!(stored_percentage(None, 40, 90), 40);
        assert_eq!(stored_percentage(Some(60), 20, 90), 20);
        assert_eq!(stored_percentage(Some(89), 95, 90), 95);
    }

    #[test]
    fn completed_lessons_never_fall_back() {
        assert_eq!(stored_percentage(Some(95), 40, 90), 95);
        assert_eq!(stored_percentage(Some(90), 0, 90), 90);
        assert_eq!(stored_percentage(Some(95), 100, 90), 100);
    }

    #[test]
    fn stored_value_stays_in_range() {
        for previous in [None, Some(0), Some(50), Some(90), Some(100)] {
            for incoming in [0, 1, 50, 89, 90, 99, 100] {
                let stored = stored_percentage(previous, incoming, 90);
                assert!((0..=100).contains(&stored), "{previous:?} {incoming} -> {stored}");
            }
        }
    }

    #[test]
    fn threshold_crossing_fires_once() {
        assert!(crosses_threshold(None, 95, 90));
        assert!(crosses_threshold(Some(50), 90, 90));
        assert!(!crosses_threshold(Some(50), 89, 90));
        assert!(!crosses_threshold(Some(95), 100, 90));
        assert!(!crosses_threshold(Some(90), 90, 90));
    }

    #[test]
    fn report_validation() {
        assert!(validate_report(0, 0).is_ok());
        assert!(validate_report(100, 3600).is_ok());
        assert!(matches!(validate_report(101, 0), Err(LearningError::InvalidPercentage)));
        assert!(matches!(validate_report(-1, 0), Err(LearningError::InvalidPercentage)));
        assert!(matches!(validate_report(50, -5), Err(LearningError::InvalidPosition)));
    }

    fn course_completed_count(facts: &[Fact]) -> usize {
        facts.iter().filter(|fact| matches!(fact, Fact::CourseCompleted { .. })).count()
    }

    #[tokio::test]
    async fn three_lessons_complete_the_course_once() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();

        let author = test_support::insert_user(pool, "author10", UserRole::Instructor).await;
        let student = test_support::insert_user(pool, "student10", UserRole::Student).await;
        let course = test_support::insert_course(pool, &author.id, None, true).await;
        let mut lessons = Vec::new();
        for index in 1..=3 {
            lessons.push(test_support::insert_lesson(pool, &course.id, index, true, false).await);
        }
        crate::services::enrollment::enroll_free(&ctx.state, &student, &course.id)
            .await
            .expect("enroll");

        let first = record_progress(&ctx.state, &student, &lessons[0].id, 95, 570)
            .await
            .expect("progress lesson 1");
        assert_eq!(course_completed_count(&first.facts), 0);
        let completed = repositories::lesson_progress::count_completed_in_course(
            pool,
            &student.id,
            &course.id,
            90,
        )
        .await
        .expect("count");
        assert_eq!(completed, 1);
        assert!(repositories::course_completions::find_for_user_course(
            pool,
            &student.id,
            &course.id
        )
        .await
        .expect("find")
        .is_none());

        let second = record_progress(&ctx.state, &student, &lessons[1].id, 95, 570)
            .await
            .expect("progress lesson 2");
        assert_eq!(course_completed_count(&second.facts), 0);

        let third = record_progress(&ctx.state, &student, &lessons[2].id, 95, 570)
            .await
            .expect("progress lesson 3");
        assert_eq!(course_completed_count(&third.facts), 1);

        let completion = repositories::course_completions::find_for_user_course(
            pool,
            &student.id,
            &course.id,
        )
        .await
        .expect("find")
        .expect("completion row");
        assert_eq!(completion.completed_at, ctx.state.clock().now());

        let again = record_progress(&ctx.state, &student, &lessons[2].id, 100, 600)
            .await
            .expect("rewatch");
        assert_eq!(course_completed_count(&again.facts), 0);

        let outbox = repositories::fact_outbox::list_types(pool).await.expect("outbox");
        assert_eq!(outbox.iter().filter(|kind| *kind == "course_completed").count(), 1);
        assert_eq!(outbox.iter().filter(|kind| *kind == "progress_updated").count(), 4);
    }

    #[tokio::test]
    async fn concurrent_reports_keep_one_row_and_complete_once() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db().clone();

        let author = test_support::insert_user(&pool, "author15", UserRole::Instructor).await;
        let student = test_support::insert_user(&pool, "student15", UserRole::Student).await;
        let course = test_support::insert_course(&pool, &author.id, None, true).await;
        let lesson = test_support::insert_lesson(&pool, &course.id, 1, true, false).await;
        crate::services::enrollment::enroll_free(&ctx.state, &student, &course.id)
            .await
            .expect("enroll");

        let mut handles = Vec::new();
        for (percentage, position) in [(95, 570), (40, 240), (100, 600), (30, 180)] {
            let state = ctx.state.clone();
            let student = student.clone();
            let lesson_id = lesson.id.clone();
            handles.push(tokio::spawn(async move {
                record_progress(&state, &student, &lesson_id, percentage, position).await
            }));
        }

        let mut completions = 0;
        for handle in handles {
            let outcome = handle.await.expect("join").expect("progress");
            completions += course_completed_count(&outcome.facts);
        }
        assert_eq!(completions, 1);

        let rows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM lesson_progress WHERE user_id = $1 AND lesson_id = $2",
        )
        .bind(&student.id)
        .bind(&lesson.id)
        .fetch_one(&pool)
        .await
        .expect("count rows");
        assert_eq!(rows, 1);

        let stored =
            repositories::lesson_progress::find_for_user_lesson(&pool, &student.id, &lesson.id)
                .await
                .expect("find")
                .expect("progress row");
        assert_eq!(stored.watched_percentage, 100);

        let outbox = repositories::fact_outbox::list_types(&pool).await.expect("outbox");
        assert_eq!(outbox.iter().filter(|kind| *kind == "course_completed").count(), 1);
        assert_eq!(outbox.iter().filter(|kind| *kind == "progress_updated").count(), 4);
    }

    #[tokio::test]
    async fn lower_report_keeps_completed_percentage() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();

        let author = test_support::insert_user(pool, "author11", UserRole::Instructor).await;
        let student = test_support::insert_user(pool, "student11", UserRole::Student).await;
        let course = test_support::insert_course(pool, &author.id, None, true).await;
        let lesson = test_support::insert_lesson(pool, &course.id, 1, true, false).await;
        test_support::insert_lesson(pool, &course.id, 2, true, false).await;
        crate::services::enrollment::enroll_free(&ctx.state, &student, &course.id)
            .await
            .expect("enroll");

        record_progress(&ctx.state, &student, &lesson.id, 95, 500).await.expect("first");
        let outcome =
            record_progress(&ctx.state, &student, &lesson.id, 40, 200).await.expect("second");

        assert_eq!(outcome.value.watched_percentage, 95);
        assert_eq!(outcome.value.last_position_seconds, 200);
        assert!(matches!(
            outcome.facts.as_slice(),
            [Fact::ProgressUpdated { percentage: 95, position: 200, .. }]
        ));
    }

    #[tokio::test]
    async fn unenrolled_viewer_is_rejected_without_writing() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();

        let author = test_support::insert_user(pool, "author12", UserRole::Instructor).await;
        let student = test_support::insert_user(pool, "student12", UserRole::Student).await;
        let course = test_support::insert_course(pool, &author.id, None, true).await;
        let lesson = test_support::insert_lesson(pool, &course.id, 1, true, false).await;

        let result = record_progress(&ctx.state, &student, &lesson.id, 50, 10).await;
        assert!(matches!(result, Err(LearningError::Unauthorized)));

        let row = repositories::lesson_progress::find_for_user_lesson(pool, &student.id, &lesson.id)
            .await
            .expect("find");
        assert!(row.is_none());
        assert!(repositories::fact_outbox::list_types(pool).await.expect("outbox").is_empty());
    }

    #[tokio::test]
    async fn free_preview_is_open_without_enrollment() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();

        let author = test_support::insert_user(pool, "author13", UserRole::Instructor).await;
        let visitor = test_support::insert_user(pool, "visitor13", UserRole::Instructor).await;
        let course = test_support::insert_course(pool, &author.id, Some(4_900), true).await;
        let preview = test_support::insert_lesson(pool, &course.id, 1, true, true).await;

        let outcome =
            record_progress(&ctx.state, &visitor, &preview.id, 30, 60).await.expect("preview");
        assert_eq!(outcome.value.watched_percentage, 30);
    }

    #[tokio::test]
    async fn out_of_range_percentage_is_rejected() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();

        let author = test_support::insert_user(pool, "author14", UserRole::Instructor).await;
        let student = test_support::insert_user(pool, "student14", UserRole::Student).await;
        let course = test_support::insert_course(pool, &author.id, None, true).await;
        let preview = test_support::insert_lesson(pool, &course.id, 1, true, true).await;

        let result = record_progress(&ctx.state, &student, &preview.id, 120, 10).await;
        assert!(matches!(result, Err(LearningError::InvalidPercentage)));
    }
}
