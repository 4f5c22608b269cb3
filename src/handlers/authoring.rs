// src/handlers/authoring.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        course::{
            CreateCourseRequest, CreateLessonRequest, CreateModuleRequest, UpdateCourseRequest,
            UpdateLessonRequest,
        },
        diagnostic::{CreateDiagnosticQuestionRequest, CreateDiagnosticRequest},
        evaluation::CreateEvaluationRequest,
        question::CreateQuestionRequest,
    },
    utils::html::clean_html,
};

/// Creates a new course.
/// Staff only.
pub async fn create_course(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO courses (title, description, hours, published)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(&payload.title)
    .bind(payload.description.unwrap_or_default())
    .bind(payload.hours.unwrap_or(0))
    .bind(payload.published.unwrap_or(false))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create course: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Updates a course by ID. Fields are optional.
/// Staff only.
pub async fn update_course(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateCourseRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.title.is_none()
        && payload.description.is_none()
        && payload.hours.is_none()
        && payload.published.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE courses SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(description) = payload.description {
        separated.push("description = ");
        separated.push_bind_unseparated(description);
    }

    if let Some(hours) = payload.hours {
        separated.push("hours = ");
        separated.push_bind_unseparated(hours);
    }

    if let Some(published) = payload.published {
        separated.push("published = ");
        separated.push_bind_unseparated(published);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update course: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Deletes a course by ID. Cascades through modules, lessons and progress.
/// Staff only.
pub async fn delete_course(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Course not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Adds a module to a course.
/// Staff only.
pub async fn create_module(
    State(pool): State<PgPool>,
    Path(course_id): Path<i64>,
    Json(payload): Json<CreateModuleRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    sqlx::query_scalar::<_, i64>("SELECT id FROM courses WHERE id = $1")
        .bind(course_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Course not found".to_string()))?;

    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO modules (course_id, title, position) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(course_id)
    .bind(&payload.title)
    .bind(payload.position.unwrap_or(0))
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Adds a lesson to a module. The HTML body is sanitized before storage.
/// Staff only.
pub async fn create_lesson(
    State(pool): State<PgPool>,
    Path(module_id): Path<i64>,
    Json(payload): Json<CreateLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    sqlx::query_scalar::<_, i64>("SELECT id FROM modules WHERE id = $1")
        .bind(module_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Module not found".to_string()))?;

    let content = clean_html(&payload.content.unwrap_or_default());

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO lessons (module_id, title, content, duration_minutes, position)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(module_id)
    .bind(&payload.title)
    .bind(&content)
    .bind(payload.duration_minutes.unwrap_or(0))
    .bind(payload.position.unwrap_or(0))
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Updates a lesson by ID. Fields are optional.
/// Staff only.
pub async fn update_lesson(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateLessonRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.title.is_none()
        && payload.content.is_none()
        && payload.duration_minutes.is_none()
        && payload.position.is_none()
    {
        return Ok(StatusCode::OK);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE lessons SET ");
    let mut separated = builder.separated(", ");

    if let Some(title) = payload.title {
        separated.push("title = ");
        separated.push_bind_unseparated(title);
    }

    if let Some(content) = payload.content {
        separated.push("content = ");
        separated.push_bind_unseparated(clean_html(&content));
    }

    if let Some(duration_minutes) = payload.duration_minutes {
        separated.push("duration_minutes = ");
        separated.push_bind_unseparated(duration_minutes);
    }

    if let Some(position) = payload.position {
        separated.push("position = ");
        separated.push_bind_unseparated(position);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(&pool).await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Lesson not found".to_string()));
    }

    Ok(StatusCode::OK)
}

/// Creates an evaluation attached to a course or a lesson.
/// Staff only.
pub async fn create_evaluation(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateEvaluationRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO evaluations
        (course_id, lesson_id, title, kind, passing_score, attempts, time_limit_minutes, published)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(payload.course_id)
    .bind(payload.lesson_id)
    .bind(&payload.title)
    .bind(&payload.kind)
    .bind(payload.passing_score)
    .bind(payload.attempts)
    .bind(payload.time_limit_minutes)
    .bind(payload.published.unwrap_or(false))
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create evaluation: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Adds a question to an evaluation.
/// Staff only.
pub async fn create_question(
    State(pool): State<PgPool>,
    Path(evaluation_id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    sqlx::query_scalar::<_, i64>("SELECT id FROM evaluations WHERE id = $1")
        .bind(evaluation_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Evaluation not found".to_string()))?;

    let options = serde_json::to_value(&payload.options)?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO questions
        (evaluation_id, type, prompt, options, answer, explanation, points, position)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(evaluation_id)
    .bind(&payload.question_type)
    .bind(clean_html(&payload.prompt))
    .bind(options)
    .bind(&payload.answer)
    .bind(&payload.explanation)
    .bind(payload.points.unwrap_or(10))
    .bind(payload.position.unwrap_or(0))
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Deletes a question by ID.
/// Staff only. Submissions keep their stored raw answers; grading is never
/// re-run retroactively.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Creates a diagnostic.
/// Staff only.
pub async fn create_diagnostic(
    State(pool): State<PgPool>,
    Json(payload): Json<CreateDiagnosticRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO diagnostics (title, description, published)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(&payload.title)
    .bind(payload.description.unwrap_or_default())
    .bind(payload.published.unwrap_or(false))
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// Adds a question to a diagnostic. A question with no answer key or zero
/// points is treated as an unscored opinion question.
/// Staff only.
pub async fn create_diagnostic_question(
    State(pool): State<PgPool>,
    Path(diagnostic_id): Path<i64>,
    Json(payload): Json<CreateDiagnosticQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    sqlx::query_scalar::<_, i64>("SELECT id FROM diagnostics WHERE id = $1")
        .bind(diagnostic_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(AppError::NotFound("Diagnostic not found".to_string()))?;

    let options = serde_json::to_value(&payload.options)?;

    let id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO diagnostic_questions
        (diagnostic_id, prompt, options, answer, points, position)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(diagnostic_id)
    .bind(clean_html(&payload.prompt))
    .bind(options)
    .bind(&payload.answer)
    .bind(payload.points.unwrap_or(10))
    .bind(payload.position.unwrap_or(0))
    .fetch_one(&pool)
    .await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}
