use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{EnrollmentStatus, ReviewStatus, SubjectType, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) username: String,
    pub(crate) hashed_password: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl User {
    pub(crate) fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub(crate) fn is_student(&self) -> bool {
        self.role == UserRole::Student
    }

    pub(crate) fn is_instructor(&self) -> bool {
        self.role == UserRole::Instructor
    }

    pub(crate) fn can_manage_content(&self) -> bool {
        self.is_instructor() || self.is_admin()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Course {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) price_cents: Option<i64>,
    pub(crate) currency: Option<String>,
    pub(crate) is_published: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
    pub(crate) deleted_at: Option<PrimitiveDateTime>,
}

impl Course {
    /// A course with no price or a zero price is free.
    pub(crate) fn is_free(&self) -> bool {
        self.price_cents.map_or(true, |price| price == 0)
    }

    /// Published and not soft-deleted.
    pub(crate) fn is_available(&self) -> bool {
        self.is_published && self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Lesson {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) order_index: i32,
    pub(crate) duration_seconds: i32,
    pub(crate) is_published: bool,
    pub(crate) is_free_preview: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

impl Lesson {
    pub(crate) fn is_open_preview(&self) -> bool {
        self.is_published && self.is_free_preview
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Enrollment {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) course_id: String,
    pub(crate) status: EnrollmentStatus,
    pub(crate) paid_amount_cents: Option<i64>,
    pub(crate) currency: Option<String>,
    pub(crate) payment_id: Option<String>,
    pub(crate) enrolled_at: PrimitiveDateTime,
    pub(crate) canceled_at: Option<PrimitiveDateTime>,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct LessonProgress {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) lesson_id: String,
    pub(crate) watched_percentage: i32,
    pub(crate) last_position_seconds: i32,
    pub(crate) last_watched_at: PrimitiveDateTime,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct CourseCompletion {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) course_id: String,
    pub(crate) completed_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ModerationReview {
    pub(crate) id: String,
    pub(crate) subject_type: SubjectType,
    pub(crate) subject_id: String,
    pub(crate) status: ReviewStatus,
    pub(crate) submitted_by: String,
    pub(crate) reviewer_id: Option<String>,
    pub(crate) notes: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct OutboxRow {
    pub(crate) id: i64,
    pub(crate) fact_type: String,
    pub(crate) payload: sqlx::types::Json<serde_json::Value>,
    pub(crate) attempts: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Certificate {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) course_id: String,
    pub(crate) verification_code: String,
    pub(crate) issued_at: PrimitiveDateTime,
}
