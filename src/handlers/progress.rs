// src/handlers/progress.rs

use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::enrollment::RecordProgressRequest,
    services::{certificate::CertificateIssuer, progress},
    utils::jwt::Claims,
};

/// Records lesson progress for the current user and returns the recomputed
/// course percentage.
pub async fn record_progress(
    State(pool): State<PgPool>,
    State(issuer): State<Arc<dyn CertificateIssuer>>,
    Extension(claims): Extension<Claims>,
    Path(lesson_id): Path<i64>,
    Json(payload): Json<RecordProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.time_spent_seconds < 0 {
        return Err(AppError::BadRequest(
            "time_spent_seconds cannot be negative".to_string(),
        ));
    }

    let principal = claims.principal();
    let snapshot =
        progress::record_progress(&pool, issuer.as_ref(), &principal, lesson_id, &payload).await?;

    Ok(Json(snapshot))
}
