use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::LessonProgress;

/// Range checks live in the progress service so they surface as domain errors.
#[derive(Debug, Deserialize)]
pub(crate) struct ProgressReport {
    #[serde(alias = "watchedPercentage")]
    pub(crate) watched_percentage: i32,
    #[serde(default)]
    #[serde(alias = "lastPositionSeconds")]
    pub(crate) last_position_seconds: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProgressResponse {
    pub(crate) lesson_id: String,
    pub(crate) watched_percentage: i32,
    pub(crate) last_position_seconds: i32,
    pub(crate) last_watched_at: String,
    pub(crate) is_completed: bool,
    pub(crate) course_completed: bool,
    pub(crate) progress_update_interval_seconds: u64,
}

impl ProgressResponse {
    pub(crate) fn from_db(
        progress: LessonProgress,
        threshold: i32,
        course_completed: bool,
        progress_update_interval_seconds: u64,
    ) -> Self {
        Self {
            lesson_id: progress.lesson_id,
            watched_percentage: progress.watched_percentage,
            last_position_seconds: progress.last_position_seconds,
            last_watched_at: format_primitive(progress.last_watched_at),
            is_completed: progress.watched_percentage >= threshold,
            course_completed,
            progress_update_interval_seconds,
        }
    }
}
