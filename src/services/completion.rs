use sqlx::PgConnection;
use uuid::Uuid;

use crate::core::time::format_primitive;
use crate::repositories;
use crate::services::facts::Fact;

/// A course with no published lessons is never complete.
pub(crate) fn is_course_complete(total_published: i64, completed: i64) -> bool {
    total_published > 0 && completed >= total_published
}

/// Records the course completion for the user if every published lesson is now past the
/// threshold. Runs on the caller's transaction; returns the `CourseCompleted` fact only when
/// this call created the row, so repeated or concurrent checks are silent no-ops.
pub(crate) async fn check_and_complete(
    conn: &mut PgConnection,
    user_id: &str,
    course_id: &str,
    threshold: i32,
    now: time::PrimitiveDateTime,
) -> Result<Option<Fact>, sqlx::Error> {
    repositories::course_completions::lock_pair(&mut *conn, user_id, course_id).await?;

    let total = repositories::lessons::count_published(&mut *conn, course_id).await?;
    let completed = repositories::lesson_progress::count_completed_in_course(
        &mut *conn, user_id, course_id, threshold,
    )
    .await?;

    if !is_course_complete(total, completed) {
        return Ok(None);
    }

    let created = repositories::course_completions::insert_if_absent(
        &mut *conn,
        &Uuid::new_v4().to_string(),
        user_id,
        course_id,
        now,
    )
    .await?;

    let Some(completion) = created else {
        return Ok(None);
    };

    let course_title = repositories::courses::find_by_id(&mut *conn, course_id)
        .await?
        .map(|course| course.title)
        .unwrap_or_default();

    metrics::counter!(crate::core::metrics::COURSE_COMPLETIONS_TOTAL).increment(1);

    Ok(Some(Fact::CourseCompleted {
        user_id: completion.user_id,
        course_id: completion.course_id,
        course_title,
        completed_at: format_primitive(completion.completed_at),
    }))
}
