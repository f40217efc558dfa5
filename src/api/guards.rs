use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::{Course, User};
use crate::repositories;

const INVALID_CREDENTIALS: &str = "Invalid authentication credentials";

/// Any active, authenticated user.
pub(crate) struct CurrentUser(pub(crate) User);
pub(crate) struct CurrentAdmin(pub(crate) User);
/// Instructors and admins.
pub(crate) struct ContentManager(pub(crate) User);

async fn authenticate(parts: &Parts, state: &AppState) -> Result<User, ApiError> {
    let token = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized(INVALID_CREDENTIALS))?;

    let claims = security::verify_token(token, state.settings())
        .map_err(|_| ApiError::Unauthorized(INVALID_CREDENTIALS))?;

    let user = repositories::users::find_by_id(state.db(), &claims.sub)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("User not found"))?;

    if !user.is_active {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
    }

    Ok(user)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(CurrentUser)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        require(user, User::is_admin, "Admin access required").map(CurrentAdmin)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for ContentManager {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await?;
        require(user, User::can_manage_content, "Instructor access required").map(ContentManager)
    }
}

fn require(
    user: User,
    allowed: fn(&User) -> bool,
    message: &'static str,
) -> Result<User, ApiError> {
    if allowed(&user) {
        Ok(user)
    } else {
        Err(ApiError::Forbidden(message))
    }
}

/// Owner of the course or an admin may change it.
pub(crate) fn require_course_owner(user: &User, course: &Course) -> Result<(), ApiError> {
    if user.is_admin() || course.created_by == user.id {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Not enough permissions for this course"))
    }
}
