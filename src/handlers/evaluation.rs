// src/handlers/evaluation.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    error::AppError,
    models::evaluation::{ReviewRequest, SubmitEvaluationRequest},
    services::evaluation,
    utils::jwt::Claims,
};

/// Returns the evaluation for taking: stripped questions plus remaining
/// attempts. Correct answers and explanations never leave the server here.
pub async fn get_for_taking(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(evaluation_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal();
    let view = evaluation::get_for_taking(&pool, &principal, evaluation_id).await?;
    Ok(Json(view))
}

/// Grades and persists one evaluation attempt for the current user.
pub async fn submit(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(evaluation_id): Path<i64>,
    Json(payload): Json<SubmitEvaluationRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }

    let principal = claims.principal();
    let outcome = evaluation::submit(&pool, &principal, evaluation_id, &payload.answers).await?;

    Ok(Json(outcome))
}

/// Lists submissions for an evaluation. Staff only.
pub async fn list_submissions(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(evaluation_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal();
    let entries = evaluation::list_submissions(&pool, &principal, evaluation_id).await?;
    Ok(Json(entries))
}

/// Records a manual review on a submission. Staff only.
pub async fn review_submission(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(submission_id): Path<i64>,
    Json(payload): Json<ReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let principal = claims.principal();
    evaluation::review(&pool, &principal, submission_id, &payload).await?;

    Ok(Json(serde_json::json!({ "reviewed": true })))
}
