use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Course, Lesson};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct CourseCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    #[serde(alias = "priceCents")]
    #[validate(range(min = 0, message = "price_cents must be non-negative"))]
    pub(crate) price_cents: Option<i64>,
    #[serde(default)]
    #[validate(length(equal = 3, message = "currency must be a 3-letter code"))]
    pub(crate) currency: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) price_cents: Option<i64>,
    pub(crate) currency: Option<String>,
    pub(crate) is_free: bool,
    pub(crate) is_published: bool,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl CourseResponse {
    pub(crate) fn from_db(course: Course) -> Self {
        let is_free = course.is_free();
        Self {
            id: course.id,
            title: course.title,
            description: course.description,
            price_cents: course.price_cents,
            currency: course.currency,
            is_free,
            is_published: course.is_published,
            created_by: course.created_by,
            created_at: format_primitive(course.created_at),
            updated_at: format_primitive(course.updated_at),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct LessonCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[serde(alias = "orderIndex")]
    #[validate(range(min = 0, message = "order_index must be non-negative"))]
    pub(crate) order_index: i32,
    #[serde(default)]
    #[serde(alias = "durationSeconds")]
    #[validate(range(min = 0, message = "duration_seconds must be non-negative"))]
    pub(crate) duration_seconds: i32,
    #[serde(default)]
    #[serde(alias = "isFreePreview")]
    pub(crate) is_free_preview: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct LessonResponse {
    pub(crate) id: String,
    pub(crate) course_id: String,
    pub(crate) title: String,
    pub(crate) order_index: i32,
    pub(crate) duration_seconds: i32,
    pub(crate) is_published: bool,
    pub(crate) is_free_preview: bool,
    pub(crate) created_at: String,
}

impl LessonResponse {
    pub(crate) fn from_db(lesson: Lesson) -> Self {
        Self {
            id: lesson.id,
            course_id: lesson.course_id,
            title: lesson.title,
            order_index: lesson.order_index,
            duration_seconds: lesson.duration_seconds,
            is_published: lesson.is_published,
            is_free_preview: lesson.is_free_preview,
            created_at: format_primitive(lesson.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseProgressResponse {
    pub(crate) course_id: String,
    pub(crate) total_lessons: i64,
    pub(crate) completed_lessons: i64,
    pub(crate) is_completed: bool,
    pub(crate) completed_at: Option<String>,
    pub(crate) certificate_code: Option<String>,
}
