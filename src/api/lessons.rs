use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::api::handlers::trace_facts;
use crate::core::state::AppState;
use crate::schemas::progress::{ProgressReport, ProgressResponse};
use crate::services::facts::Fact;
use crate::services::progress;

pub(crate) fn router() -> Router<AppState> {
    Router::new().route("/:lesson_id/progress", post(record_progress))
}

async fn record_progress(
    Path(lesson_id): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ProgressReport>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let outcome = progress::record_progress(
        &state,
        &user,
        &lesson_id,
        payload.watched_percentage,
        payload.last_position_seconds,
    )
    .await?;
    trace_facts(&outcome.facts);

    let course_completed =
        outcome.facts.iter().any(|fact| matches!(fact, Fact::CourseCompleted { .. }));
    let learning = state.settings().learning();

    Ok(Json(ProgressResponse::from_db(
        outcome.value,
        learning.completion_threshold,
        course_completed,
        learning.progress_update_interval_seconds,
    )))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::db::types::UserRole;
    use crate::repositories;
    use crate::services::enrollment;
    use crate::test_support;

    #[tokio::test]
    async fn progress_flow_reports_course_completion() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();

        let author = test_support::insert_user(pool, "author60", UserRole::Instructor).await;
        let student = test_support::insert_user(pool, "student60", UserRole::Student).await;
        let course = test_support::insert_course(pool, &author.id, None, true).await;
        let lesson = test_support::insert_lesson(pool, &course.id, 1, true, false).await;
        enrollment::enroll_free(&ctx.state, &student, &course.id).await.expect("enroll");
        let token = test_support::bearer_token(&student.id, ctx.state.settings());
        let uri = format!("/api/v1/lessons/{}/progress", lesson.id);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &uri,
                Some(&token),
                Some(json!({ "watched_percentage": 92, "last_position_seconds": 552 })),
            ))
            .await
            .expect("progress");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::OK, "response: {body}");
        assert_eq!(body["watched_percentage"], 92);
        assert_eq!(body["is_completed"], true);
        assert_eq!(body["course_completed"], true);
        assert_eq!(body["progress_update_interval_seconds"], 10);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &uri,
                Some(&token),
                Some(json!({ "watched_percentage": 10, "last_position_seconds": 60 })),
            ))
            .await
            .expect("rewind");
        let body = test_support::read_json(response).await;
        assert_eq!(body["watched_percentage"], 92);
        assert_eq!(body["course_completed"], false);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/v1/courses/{}/progress", course.id),
                Some(&token),
                None,
            ))
            .await
            .expect("summary");
        let body = test_support::read_json(response).await;
        assert_eq!(body["total_lessons"], 1);
        assert_eq!(body["completed_lessons"], 1);
        assert_eq!(body["is_completed"], true);
        assert!(body["completed_at"].is_string());
    }

    #[tokio::test]
    async fn invalid_or_unauthorized_reports_are_rejected() {
        let ctx = test_support::setup_test_context().await;
        let pool = ctx.state.db();

        let author = test_support::insert_user(pool, "author61", UserRole::Instructor).await;
        let student = test_support::insert_user(pool, "student61", UserRole::Student).await;
        let course = test_support::insert_course(pool, &author.id, None, true).await;
        let lesson = test_support::insert_lesson(pool, &course.id, 1, true, false).await;
        let preview = test_support::insert_lesson(pool, &course.id, 2, true, true).await;
        let token = test_support::bearer_token(&student.id, ctx.state.settings());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/lessons/{}/progress", lesson.id),
                Some(&token),
                Some(json!({ "watched_percentage": 50, "last_position_seconds": 30 })),
            ))
            .await
            .expect("not enrolled");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let row = repositories::lesson_progress::find_for_user_lesson(pool, &student.id, &lesson.id)
            .await
            .expect("find");
        assert!(row.is_none());

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                &format!("/api/v1/lessons/{}/progress", preview.id),
                Some(&token),
                Some(json!({ "watched_percentage": 150, "last_position_seconds": 30 })),
            ))
            .await
            .expect("out of range");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/lessons/missing-lesson/progress",
                Some(&token),
                Some(json!({ "watched_percentage": 50 })),
            ))
            .await
            .expect("missing lesson");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
