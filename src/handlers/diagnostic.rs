// src/handlers/diagnostic.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::diagnostic::{Diagnostic, SubmitDiagnosticRequest},
    services::diagnostic,
    utils::jwt::Claims,
};

/// Lists published diagnostics.
pub async fn list_diagnostics(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let diagnostics = sqlx::query_as::<_, Diagnostic>(
        "SELECT * FROM diagnostics WHERE published ORDER BY created_at DESC",
    )
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list diagnostics: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(diagnostics))
}

/// Returns a diagnostic with its questions stripped of answer keys.
pub async fn get_for_taking(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(diagnostic_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let principal = claims.principal();
    let (diagnostic, questions) =
        diagnostic::get_for_taking(&pool, &principal, diagnostic_id).await?;

    Ok(Json(serde_json::json!({
        "id": diagnostic.id,
        "title": diagnostic.title,
        "description": diagnostic.description,
        "questions": questions,
    })))
}

/// Grades a diagnostic and upserts the user's single result row.
pub async fn submit(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(diagnostic_id): Path<i64>,
    Json(payload): Json<SubmitDiagnosticRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }

    let principal = claims.principal();
    let outcome = diagnostic::submit(&pool, &principal, diagnostic_id, &payload.answers).await?;

    Ok(Json(outcome))
}
