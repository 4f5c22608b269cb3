// src/handlers/catalog.rs

use std::collections::{HashMap, HashSet};

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::{FromRow, PgPool};

use crate::{
    error::AppError,
    models::{
        course::{Course, CourseDetailResponse, Lesson, LessonView, Module, ModuleView},
        enrollment::{Enrollment, Progress},
    },
    services::unlock::{LessonGate, compute_lock_state},
    utils::jwt::Claims,
};

/// Lists published courses for the catalog.
pub async fn list_courses(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let courses = sqlx::query_as::<_, Course>(
        "SELECT * FROM courses WHERE published ORDER BY created_at DESC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list courses: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(courses))
}

#[derive(Debug, FromRow)]
struct LessonRow {
    id: i64,
    module_id: i64,
    title: String,
    duration_minutes: i32,
    position: i32,
}

/// Per-user lock context for one course: lessons flattened in unlock order,
/// their locked flags, completed-lesson set and evaluation gates.
struct LockContext {
    lessons: Vec<LessonRow>,
    locks: Vec<bool>,
    completed_lessons: HashSet<i64>,
    evaluations_by_lesson: HashMap<i64, Vec<i64>>,
}

/// Loads everything the unlock resolver needs and runs it. The flattening
/// order (module position, then lesson position) defines the unlock chain.
async fn load_lock_context(
    pool: &PgPool,
    course_id: i64,
    user_id: i64,
) -> Result<LockContext, AppError> {
    let lessons = sqlx::query_as::<_, LessonRow>(
        r#"
        SELECT l.id, l.module_id, l.title, l.duration_minutes, l.position
        FROM lessons l
        JOIN modules m ON l.module_id = m.id
        WHERE m.course_id = $1
        ORDER BY m.position, m.id, l.position, l.id
        "#,
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?;

    let evaluation_links = sqlx::query_as::<_, (i64, i64)>(
        r#"
        SELECT e.id, e.lesson_id
        FROM evaluations e
        JOIN lessons l ON e.lesson_id = l.id
        JOIN modules m ON l.module_id = m.id
        WHERE m.course_id = $1 AND e.published
        "#,
    )
    .bind(course_id)
    .fetch_all(pool)
    .await?;

    let mut evaluations_by_lesson: HashMap<i64, Vec<i64>> = HashMap::new();
    for (evaluation_id, lesson_id) in evaluation_links {
        evaluations_by_lesson
            .entry(lesson_id)
            .or_default()
            .push(evaluation_id);
    }

    let completed_lessons: HashSet<i64> = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT p.lesson_id
        FROM progress p
        JOIN lessons l ON p.lesson_id = l.id
        JOIN modules m ON l.module_id = m.id
        WHERE m.course_id = $1 AND p.user_id = $2 AND p.completed
        "#,
    )
    .bind(course_id)
    .bind(user_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .collect();

    let passed_evaluations: HashSet<i64> = sqlx::query_scalar::<_, i64>(
        "SELECT DISTINCT evaluation_id FROM evaluation_submissions WHERE user_id = $1 AND passed",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .collect();

    let gates: Vec<LessonGate> = lessons
        .iter()
        .map(|l| LessonGate {
            lesson_id: l.id,
            evaluation_ids: evaluations_by_lesson.get(&l.id).cloned().unwrap_or_default(),
        })
        .collect();

    let locks = compute_lock_state(&gates, &completed_lessons, &passed_evaluations);

    Ok(LockContext {
        lessons,
        locks,
        completed_lessons,
        evaluations_by_lesson,
    })
}

/// Course detail for the current user: modules, lessons in unlock order and
/// the per-lesson locked flags.
///
/// Lock state is derived on every read from persisted progress and passing
/// submissions; nothing is cached.
pub async fn get_course(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal();

    let course = sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = $1")
        .bind(course_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    if !course.published && !principal.role.is_staff() {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    let modules = sqlx::query_as::<_, Module>(
        "SELECT * FROM modules WHERE course_id = $1 ORDER BY position, id",
    )
    .bind(course_id)
    .fetch_all(&pool)
    .await?;

    let ctx = load_lock_context(&pool, course_id, principal.user_id).await?;

    let mut views: HashMap<i64, Vec<LessonView>> = HashMap::new();
    for (lesson, locked) in ctx.lessons.into_iter().zip(ctx.locks) {
        views.entry(lesson.module_id).or_default().push(LessonView {
            id: lesson.id,
            title: lesson.title,
            duration_minutes: lesson.duration_minutes,
            position: lesson.position,
            completed: ctx.completed_lessons.contains(&lesson.id),
            locked,
            evaluation_ids: ctx
                .evaluations_by_lesson
                .get(&lesson.id)
                .cloned()
                .unwrap_or_default(),
        });
    }

    let enrollment = sqlx::query_as::<_, Enrollment>(
        "SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2",
    )
    .bind(principal.user_id)
    .bind(course_id)
    .fetch_optional(&pool)
    .await?;

    let modules = modules
        .into_iter()
        .map(|m| ModuleView {
            lessons: views.remove(&m.id).unwrap_or_default(),
            id: m.id,
            title: m.title,
            position: m.position,
        })
        .collect();

    Ok(Json(CourseDetailResponse {
        id: course.id,
        title: course.title,
        description: course.description,
        hours: course.hours,
        modules,
        enrollment,
    }))
}

/// Lesson body for the current user. Locked lessons never leak their
/// content: the lock state is recomputed here, not trusted from the client.
pub async fn get_lesson(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(lesson_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal();

    let course_id = sqlx::query_scalar::<_, i64>(
        "SELECT m.course_id FROM lessons l JOIN modules m ON l.module_id = m.id WHERE l.id = $1",
    )
    .bind(lesson_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(AppError::NotFound("Lesson not found".to_string()))?;

    let ctx = load_lock_context(&pool, course_id, principal.user_id).await?;

    let locked = ctx
        .lessons
        .iter()
        .position(|l| l.id == lesson_id)
        .map(|i| ctx.locks[i])
        .unwrap_or(true);

    if locked && !principal.role.is_staff() {
        return Err(AppError::Forbidden("Lesson is locked".to_string()));
    }

    let lesson = sqlx::query_as::<_, Lesson>("SELECT * FROM lessons WHERE id = $1")
        .bind(lesson_id)
        .fetch_one(&pool)
        .await?;

    let progress = sqlx::query_as::<_, Progress>(
        "SELECT * FROM progress WHERE user_id = $1 AND lesson_id = $2",
    )
    .bind(principal.user_id)
    .bind(lesson_id)
    .fetch_optional(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "lesson": lesson,
        "progress": progress,
    })))
}
