pub(crate) mod certificates;
pub(crate) mod course_completions;
pub(crate) mod courses;
pub(crate) mod enrollments;
pub(crate) mod fact_outbox;
pub(crate) mod lesson_progress;
pub(crate) mod lessons;
pub(crate) mod moderation_reviews;
pub(crate) mod users;
