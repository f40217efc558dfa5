//! Yes/no authorization decisions used by the learning services.

use crate::db::models::{Enrollment, Lesson, User};

/// A published free-preview lesson is open to anyone; otherwise the viewer must be a student
/// with an active enrollment in the lesson's course.
pub(crate) fn can_watch(lesson: &Lesson, user: &User, has_active_enrollment: bool) -> bool {
    lesson.is_open_preview() || (user.is_student() && has_active_enrollment)
}

pub(crate) fn can_cancel(actor: &User, enrollment: &Enrollment) -> bool {
    actor.is_admin() || actor.id == enrollment.user_id
}

pub(crate) fn can_submit_for_review(actor: &User) -> bool {
    actor.can_manage_content()
}

pub(crate) fn can_resolve_review(actor: &User) -> bool {
    actor.is_admin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::{EnrollmentStatus, UserRole};
    use time::macros::datetime;

    fn user(id: &str, role: UserRole) -> User {
        User {
            id: id.to_string(),
            username: format!("{id}-name"),
            hashed_password: String::new(),
            full_name: "Test User".to_string(),
            role,
            is_active: true,
            created_at: datetime!(2025-01-01 00:00:00),
            updated_at: datetime!(2025-01-01 00:00:00),
        }
    }

    fn lesson(is_published: bool, is_free_preview: bool) -> Lesson {
        Lesson {
            id: "lesson-1".to_string(),
            course_id: "course-1".to_string(),
            title: "Intro".to_string(),
            order_index: 1,
            duration_seconds: 600,
            is_published,
            is_free_preview,
            created_at: datetime!(2025-01-01 00:00:00),
            updated_at: datetime!(2025-01-01 00:00:00),
        }
    }

    fn enrollment_of(user_id: &str) -> Enrollment {
        Enrollment {
            id: "enrollment-1".to_string(),
            user_id: user_id.to_string(),
            course_id: "course-1".to_string(),
            status: EnrollmentStatus::Active,
            paid_amount_cents: None,
            currency: None,
            payment_id: None,
            enrolled_at: datetime!(2025-01-01 00:00:00),
            canceled_at: None,
            updated_at: datetime!(2025-01-01 00:00:00),
        }
    }

    #[test]
    fn published_preview_is_open_to_everyone() {
        let preview = lesson(true, true);
        assert!(can_watch(&preview, &user("s", UserRole::Student), false));
        assert!(can_watch(&preview, &user("i", UserRole::Instructor), false));
    }

    #[test]
    fn unpublished_preview_requires_enrollment() {
        let draft = lesson(false, true);
        assert!(!can_watch(&draft, &user("s", UserRole::Student), false));
        assert!(can_watch(&draft, &user("s", UserRole::Student), true));
    }

    #[test]
    fn only_enrolled_students_watch_regular_lessons() {
        let regular = lesson(true, false);
        assert!(can_watch(&regular, &user("s", UserRole::Student), true));
        assert!(!can_watch(&regular, &user("s", UserRole::Student), false));
        assert!(!can_watch(&regular, &user("i", UserRole::Instructor), true));
        assert!(!can_watch(&regular, &user("a", UserRole::Admin), true));
    }

    #[test]
    fn cancel_needs_owner_or_admin() {
        let enrollment = enrollment_of("owner");
        assert!(can_cancel(&user("owner", UserRole::Student), &enrollment));
        assert!(can_cancel(&user("root", UserRole::Admin), &enrollment));
        assert!(!can_cancel(&user("other", UserRole::Student), &enrollment));
        assert!(!can_cancel(&user("instructor", UserRole::Instructor), &enrollment));
    }

    #[test]
    fn review_roles() {
        assert!(can_submit_for_review(&user("i", UserRole::Instructor)));
        assert!(can_submit_for_review(&user("a", UserRole::Admin)));
        assert!(!can_submit_for_review(&user("s", UserRole::Student)));

        assert!(can_resolve_review(&user("a", UserRole::Admin)));
        assert!(!can_resolve_review(&user("i", UserRole::Instructor)));
    }
}
