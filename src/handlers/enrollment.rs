// src/handlers/enrollment.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        certificate::CertificateListEntry,
        enrollment::{Enrollment, EnrollmentListEntry, STATUS_ACTIVE},
    },
    utils::jwt::Claims,
};

/// Enrolls the current user in a course. Idempotent: re-enrolling returns
/// the existing row untouched (progress is never reset here).
pub async fn enroll(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(course_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal();

    let published =
        sqlx::query_scalar::<_, bool>("SELECT published FROM courses WHERE id = $1")
            .bind(course_id)
            .fetch_optional(&pool)
            .await?
            .ok_or(AppError::NotFound("Course not found".to_string()))?;

    if !published && !principal.role.is_staff() {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    // Progress starts at 0 and is only ever recomputed from progress rows.
    sqlx::query(
        r#"
        INSERT INTO enrollments (user_id, course_id, status, progress)
        VALUES ($1, $2, $3, 0)
        ON CONFLICT (user_id, course_id) DO NOTHING
        "#,
    )
    .bind(principal.user_id)
    .bind(course_id)
    .bind(STATUS_ACTIVE)
    .execute(&pool)
    .await?;

    let enrollment = sqlx::query_as::<_, Enrollment>(
        "SELECT * FROM enrollments WHERE user_id = $1 AND course_id = $2",
    )
    .bind(principal.user_id)
    .bind(course_id)
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// Lists the current user's enrollments with course titles.
pub async fn my_enrollments(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal();

    let entries = sqlx::query_as::<_, EnrollmentListEntry>(
        r#"
        SELECT
            e.id, e.course_id, c.title AS course_title, e.status, e.progress,
            e.enrolled_at, e.completed_at
        FROM enrollments e
        JOIN courses c ON e.course_id = c.id
        WHERE e.user_id = $1
        ORDER BY e.enrolled_at DESC
        "#,
    )
    .bind(principal.user_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list enrollments: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(entries))
}

/// Lists the current user's certificates.
pub async fn my_certificates(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal();

    let entries = sqlx::query_as::<_, CertificateListEntry>(
        r#"
        SELECT
            ct.id, ct.course_id, c.title AS course_title, c.hours, ct.code, ct.issued_at
        FROM certificates ct
        JOIN courses c ON ct.course_id = c.id
        WHERE ct.user_id = $1
        ORDER BY ct.issued_at DESC
        "#,
    )
    .bind(principal.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(entries))
}
