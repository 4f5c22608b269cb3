// src/models/enrollment.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Enrollment status values. Transitions are one-directional:
/// ACTIVE -> COMPLETED, never back.
pub const STATUS_ACTIVE: &str = "ACTIVE";
pub const STATUS_COMPLETED: &str = "COMPLETED";

/// Represents the 'enrollments' table: one row per (user, course).
/// `progress` is always recomputed from progress rows, never set directly
/// except to 0 on creation.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub status: String,
    pub progress: f64,
    pub enrolled_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Enrollment joined with course info, for the "my courses" listing.
#[derive(Debug, Serialize, FromRow)]
pub struct EnrollmentListEntry {
    pub id: i64,
    pub course_id: i64,
    pub course_title: String,
    pub status: String,
    pub progress: f64,
    pub enrolled_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'progress' table: one row per (user, lesson), upserted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Progress {
    pub id: i64,
    pub user_id: i64,
    pub lesson_id: i64,
    pub completed: bool,
    pub time_spent_seconds: i32,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for recording lesson progress.
#[derive(Debug, Deserialize)]
pub struct RecordProgressRequest {
    pub completed: bool,
    /// Seconds spent since the last report; added to the accumulated total.
    #[serde(default)]
    pub time_spent_seconds: i32,
}

/// Response after recording progress: the recomputed course percentage and
/// whether the course is now complete.
#[derive(Debug, Serialize)]
pub struct ProgressSnapshot {
    pub progress: f64,
    pub completed: bool,
}
