use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_course_owner, ContentManager, CurrentUser};
use crate::api::handlers::trace_facts;
use crate::core::state::AppState;
use crate::core::time::format_primitive;
use crate::db::models::{Course, User};
use crate::repositories;
use crate::schemas::course::{
    CourseCreate, CourseProgressResponse, CourseResponse, LessonCreate, LessonResponse,
};
use crate::schemas::enrollment::EnrollmentResponse;
use crate::services::enrollment;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_course).get(list_courses))
        .route("/:course_id", get(get_course).delete(delete_course))
        .route("/:course_id/lessons", post(create_lesson).get(list_lessons))
        .route("/:course_id/progress", get(course_progress))
        .route("/:course_id/enroll", post(enroll_free))
}

async fn create_course(
    State(state): State<AppState>,
    ContentManager(user): ContentManager,
    Json(payload): Json<CourseCreate>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let currency = payload.currency.as_deref().map(str::to_ascii_lowercase);
    let course = repositories::courses::create(
        state.db(),
        repositories::courses::CreateCourse {
            id: &Uuid::new_v4().to_string(),
            title: payload.title.trim(),
            description: payload.description.as_deref(),
            price_cents: payload.price_cents,
            currency: currency.as_deref(),
            created_by: &user.id,
            created_at: state.clock().now(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create course"))?;

    Ok((StatusCode::CREATED, Json(CourseResponse::from_db(course))))
}

async fn list_courses(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let courses = repositories::courses::list_published(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;

    Ok(Json(courses.into_iter().map(CourseResponse::from_db).collect()))
}

async fn get_course(
    Path(course_id): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<CourseResponse>, ApiError> {
    let course = fetch_visible_course(&state, &user, &course_id).await?;
    Ok(Json(CourseResponse::from_db(course)))
}

async fn delete_course(
    Path(course_id): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode, ApiError> {
    let course = fetch_course(&state, &course_id).await?;
    require_course_owner(&user, &course)?;

    let deleted = repositories::courses::soft_delete(state.db(), &course.id, state.clock().now())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete course"))?;
    if !deleted {
        return Err(ApiError::NotFound("Course not found".to_string()));
    }

    tracing::info!(
        action = "course.delete",
        actor_id = %user.id,
        course_id = %course.id,
        "Course soft-deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn create_lesson(
    Path(course_id): Path<String>,
    State(state): State<AppState>,
    ContentManager(user): ContentManager,
    Json(payload): Json<LessonCreate>,
) -> Result<(StatusCode, Json<LessonResponse>), ApiError> {
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let course = fetch_course(&state, &course_id).await?;
    require_course_owner(&user, &course)?;

    let lesson = repositories::lessons::create(
        state.db(),
        repositories::lessons::CreateLesson {
            id: &Uuid::new_v4().to_string(),
            course_id: &course.id,
            title: payload.title.trim(),
            order_index: payload.order_index,
            duration_seconds: payload.duration_seconds,
            is_free_preview: payload.is_free_preview,
            created_at: state.clock().now(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create lesson"))?;

    Ok((StatusCode::CREATED, Json(LessonResponse::from_db(lesson))))
}

async fn list_lessons(
    Path(course_id): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<LessonResponse>>, ApiError> {
    let course = fetch_visible_course(&state, &user, &course_id).await?;
    let include_unpublished = require_course_owner(&user, &course).is_ok();

    let lessons =
        repositories::lessons::list_for_course(state.db(), &course.id, include_unpublished)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list lessons"))?;

    Ok(Json(lessons.into_iter().map(LessonResponse::from_db).collect()))
}

async fn course_progress(
    Path(course_id): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<CourseProgressResponse>, ApiError> {
    let course = fetch_course(&state, &course_id).await?;
    let threshold = state.settings().learning().completion_threshold;

    let total_lessons = repositories::lessons::count_published(state.db(), &course.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count lessons"))?;
    let completed_lessons = repositories::lesson_progress::count_completed_in_course(
        state.db(),
        &user.id,
        &course.id,
        threshold,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to count completed lessons"))?;
    let completion =
        repositories::course_completions::find_for_user_course(state.db(), &user.id, &course.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load course completion"))?;
    let certificate =
        repositories::certificates::find_for_user_course(state.db(), &user.id, &course.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load certificate"))?;

    Ok(Json(CourseProgressResponse {
        course_id: course.id,
        total_lessons,
        completed_lessons,
        is_completed: completion.is_some(),
        completed_at: completion.map(|row| format_primitive(row.completed_at)),
        certificate_code: certificate.map(|row| row.verification_code),
    }))
}

async fn enroll_free(
    Path(course_id): Path<String>,
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<(StatusCode, Json<EnrollmentResponse>), ApiError> {
    let outcome = enrollment::enroll_free(&state, &user, &course_id).await?;
    trace_facts(&outcome.facts);

    Ok((StatusCode::CREATED, Json(EnrollmentResponse::from_db(outcome.value))))
}

async fn fetch_course(state: &AppState, course_id: &str) -> Result<Course, ApiError> {
    repositories::courses::find_by_id(state.db(), course_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load course"))?
        .filter(|course| course.deleted_at.is_none())
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))
}

/// Unpublished courses are only visible to their owner and admins.
async fn fetch_visible_course(
    state: &AppState,
    user: &User,
    course_id: &str,
) -> Result<Course, ApiError> {
    let course = fetch_course(state, course_id).await?;
    if course.is_published || require_course_owner(user, &course).is_ok() {
        Ok(course)
    } else {
        Err(ApiError::NotFound("Course not found".to_string()))
    }
}
