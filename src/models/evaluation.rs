// src/models/evaluation.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use validator::Validate;

use crate::models::question::{AnswerValue, PublicQuestion};

/// Represents the 'evaluations' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Evaluation {
    pub id: i64,

    /// Direct course attachment (final exams); mutually optional with lesson.
    pub course_id: Option<i64>,

    /// Lesson attachment; gates the unlock chain for the following lesson.
    pub lesson_id: Option<i64>,

    pub title: String,

    /// 'quiz', 'practice', 'self_assessment' or 'final_exam'.
    pub kind: String,

    /// Passing threshold as a percentage, boundary inclusive.
    pub passing_score: f64,

    /// Maximum graded attempts per user.
    pub attempts: i32,

    pub time_limit_minutes: Option<i32>,

    pub published: bool,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'evaluation_submissions' table: one row per graded attempt.
/// Immutable after creation except for the manual-review fields.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EvaluationSubmission {
    pub id: i64,
    pub evaluation_id: i64,
    pub user_id: i64,

    /// Raw answers as submitted, kept verbatim for manual review.
    pub answers: sqlx::types::Json<serde_json::Value>,

    pub score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub passed: bool,
    pub attempt_number: i32,

    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub feedback: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for submitting an evaluation attempt.
/// Key: Question ID, Value: the user's answer.
#[derive(Debug, Deserialize)]
pub struct SubmitEvaluationRequest {
    pub answers: HashMap<i64, AnswerValue>,
}

/// Result of grading one submission.
#[derive(Debug, Serialize)]
pub struct GradingOutcome {
    pub success: bool,
    pub score: i32,
    #[serde(rename = "maxScore")]
    pub max_score: i32,
    pub percentage: f64,
    pub passed: bool,
    #[serde(rename = "submissionId")]
    pub submission_id: i64,
    #[serde(rename = "attemptNumber")]
    pub attempt_number: i32,
}

/// Evaluation body served to a student about to take it.
/// Questions are stripped of answers and explanations.
#[derive(Debug, Serialize)]
pub struct TakingView {
    pub id: i64,
    pub title: String,
    pub kind: String,
    #[serde(rename = "passingScore")]
    pub passing_score: f64,
    #[serde(rename = "timeLimitMinutes")]
    pub time_limit_minutes: Option<i32>,
    #[serde(rename = "attemptsLeft")]
    pub attempts_left: i32,
    #[serde(rename = "maxAttempts")]
    pub max_attempts: i32,
    pub questions: Vec<PublicQuestion>,
}

/// Submission row joined with the submitter's username, for review queues.
#[derive(Debug, Serialize, FromRow)]
pub struct SubmissionListEntry {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub passed: bool,
    pub attempt_number: i32,
    pub reviewed_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// DTO for a manual review of a submission.
#[derive(Debug, Deserialize, Validate)]
pub struct ReviewRequest {
    /// Approval overrides the automatic pass flag.
    pub approve: bool,
    #[validate(length(max = 2000))]
    pub feedback: Option<String>,
}

/// DTO for creating an evaluation.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEvaluationRequest {
    pub course_id: Option<i64>,
    pub lesson_id: Option<i64>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(min = 1, max = 30))]
    pub kind: String,
    #[validate(range(min = 0.0, max = 100.0))]
    pub passing_score: f64,
    #[validate(range(min = 1, max = 100))]
    pub attempts: i32,
    pub time_limit_minutes: Option<i32>,
    pub published: Option<bool>,
}
