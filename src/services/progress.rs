// src/services/progress.rs

use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        certificate::IssueRequest,
        enrollment::{
            Enrollment, ProgressSnapshot, RecordProgressRequest, STATUS_COMPLETED,
        },
        user::Principal,
    },
    services::certificate::CertificateIssuer,
};

/// Course completion percentage from completed vs. total lesson counts.
fn course_percentage(completed_lessons: i64, total_lessons: i64) -> f64 {
    if total_lessons > 0 {
        (completed_lessons as f64 / total_lessons as f64) * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LessonCourse {
    course_id: i64,
    course_title: String,
    course_hours: i32,
}

/// Records per-lesson progress and cascades to the enrollment.
///
/// Within a single transaction: upsert the progress row, recompute the course
/// percentage from completed lesson counts, write it to the enrollment
/// (decreases are allowed when a lesson is un-marked), and at 100% flip the
/// enrollment to COMPLETED exactly once.
///
/// Certificate issuance runs after commit and is best-effort: a failure is
/// logged and never rolls back or fails the progress update. The issuer's
/// idempotence guarantees repeated completion events cannot mint a second
/// certificate.
pub async fn record_progress(
    pool: &PgPool,
    issuer: &dyn CertificateIssuer,
    principal: &Principal,
    lesson_id: i64,
    req: &RecordProgressRequest,
) -> Result<ProgressSnapshot, AppError> {
    // Resolve lesson -> module -> course.
    let lesson_course = sqlx::query_as::<_, LessonCourse>(
        r#"
        SELECT m.course_id, c.title AS course_title, c.hours AS course_hours
        FROM lessons l
        JOIN modules m ON l.module_id = m.id
        JOIN courses c ON m.course_id = c.id
        WHERE l.id = $1
        "#,
    )
    .bind(lesson_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Lesson not found".to_string()))?;

    let course_id = lesson_course.course_id;

    let mut tx = pool.begin().await?;

    let enrollment = sqlx::query_as::<_, Enrollment>(
        "SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2",
    )
    .bind(principal.user_id)
    .bind(course_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Not enrolled in this course".to_string()))?;

    // Upsert the progress row. The timestamp is set on the transition to
    // completed, kept on repeats, and cleared when un-marked. time_spent
    // accumulates by the reported delta.
    sqlx::query(
        r#"
        INSERT INTO progress (user_id, lesson_id, completed, time_spent_seconds, completed_at)
        VALUES ($1, $2, $3, $4, CASE WHEN $3 THEN NOW() ELSE NULL END)
        ON CONFLICT (user_id, lesson_id) DO UPDATE SET
            completed = EXCLUDED.completed,
            time_spent_seconds = progress.time_spent_seconds + $4,
            completed_at = CASE
                WHEN EXCLUDED.completed THEN COALESCE(progress.completed_at, NOW())
                ELSE NULL
            END
        "#,
    )
    .bind(principal.user_id)
    .bind(lesson_id)
    .bind(req.completed)
    .bind(req.time_spent_seconds)
    .execute(&mut *tx)
    .await?;

    let total_lessons = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM lessons l
        JOIN modules m ON l.module_id = m.id
        WHERE m.course_id = $1
        "#,
    )
    .bind(course_id)
    .fetch_one(&mut *tx)
    .await?;

    let completed_lessons = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM progress p
        JOIN lessons l ON p.lesson_id = l.id
        JOIN modules m ON l.module_id = m.id
        WHERE m.course_id = $1 AND p.user_id = $2 AND p.completed
        "#,
    )
    .bind(course_id)
    .bind(principal.user_id)
    .fetch_one(&mut *tx)
    .await?;

    let percentage = course_percentage(completed_lessons, total_lessons);

    sqlx::query("UPDATE enrollments SET progress = $1 WHERE id = $2")
        .bind(percentage)
        .bind(enrollment.id)
        .execute(&mut *tx)
        .await?;

    // Completion trigger: flip to COMPLETED exactly once. The status guard in
    // the WHERE clause makes the flip idempotent under concurrent updates.
    let mut newly_completed = false;
    if percentage >= 100.0 && enrollment.status != STATUS_COMPLETED {
        let result = sqlx::query(
            "UPDATE enrollments SET status = $1, completed_at = NOW() WHERE id = $2 AND status <> $1",
        )
        .bind(STATUS_COMPLETED)
        .bind(enrollment.id)
        .execute(&mut *tx)
        .await?;
        newly_completed = result.rows_affected() > 0;
    }

    tx.commit().await?;

    if newly_completed {
        let user_name = sqlx::query_scalar::<_, String>(
            "SELECT COALESCE(NULLIF(full_name, ''), username) FROM users WHERE id = $1",
        )
        .bind(principal.user_id)
        .fetch_one(pool)
        .await
        .unwrap_or_default();

        let issue = issuer
            .issue(IssueRequest {
                user_id: principal.user_id,
                course_id,
                user_name,
                course_title: lesson_course.course_title,
                hours: lesson_course.course_hours,
            })
            .await;

        if let Err(e) = issue {
            // Best-effort: progress is already committed and must stand.
            tracing::warn!(
                "Certificate issuance failed for user {} on course {}: {}",
                principal.user_id,
                course_id,
                e
            );
        }
    }

    Ok(ProgressSnapshot {
        progress: percentage,
        completed: percentage >= 100.0,
    })
}
