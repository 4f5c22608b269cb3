// src/models/diagnostic.rs

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use std::collections::HashMap;
use validator::Validate;

use crate::models::question::AnswerValue;

/// Represents the 'diagnostics' table: one-shot placement tests,
/// independent of course structure.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Diagnostic {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub published: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'diagnostic_questions' table.
/// Questions with an empty answer or zero points are opinion questions and
/// do not contribute to the score.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DiagnosticQuestion {
    pub id: i64,
    pub diagnostic_id: i64,
    pub prompt: String,
    pub options: Json<Vec<String>>,
    pub answer: Option<String>,
    pub points: i32,
    pub position: i32,
}

/// Diagnostic question as served to the taker (answer stripped).
#[derive(Debug, Serialize)]
pub struct PublicDiagnosticQuestion {
    pub id: i64,
    pub prompt: String,
    pub options: Json<Vec<String>>,
    pub position: i32,
}

impl From<DiagnosticQuestion> for PublicDiagnosticQuestion {
    fn from(q: DiagnosticQuestion) -> Self {
        PublicDiagnosticQuestion {
            id: q.id,
            prompt: q.prompt,
            options: q.options,
            position: q.position,
        }
    }
}

/// Skill tier derived from the diagnostic percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Level {
    #[serde(rename = "BASIC")]
    Basic,
    #[serde(rename = "INTERMEDIATE")]
    Intermediate,
    #[serde(rename = "ADVANCED")]
    Advanced,
    #[serde(rename = "EXPERT")]
    Expert,
}

impl Level {
    /// Fixed thresholds, inclusive on the lower bound of each tier.
    pub fn for_percentage(pct: f64) -> Self {
        if pct >= 85.0 {
            Level::Expert
        } else if pct >= 70.0 {
            Level::Advanced
        } else if pct >= 50.0 {
            Level::Intermediate
        } else {
            Level::Basic
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Basic => "BASIC",
            Level::Intermediate => "INTERMEDIATE",
            Level::Advanced => "ADVANCED",
            Level::Expert => "EXPERT",
        }
    }
}

/// DTO for submitting diagnostic answers.
#[derive(Debug, Deserialize)]
pub struct SubmitDiagnosticRequest {
    pub answers: HashMap<i64, AnswerValue>,
}

/// Result of grading a diagnostic; one row per (user, diagnostic),
/// overwritten on retake.
#[derive(Debug, Serialize)]
pub struct DiagnosticOutcome {
    pub success: bool,
    pub score: i32,
    #[serde(rename = "maxScore")]
    pub max_score: i32,
    pub percentage: f64,
    pub level: Level,
    #[serde(rename = "resultId")]
    pub result_id: i64,
}

/// DTO for creating a diagnostic.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDiagnosticRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    pub published: Option<bool>,
}

/// DTO for creating a diagnostic question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateDiagnosticQuestionRequest {
    #[validate(length(min = 1, max = 1000))]
    pub prompt: String,
    pub options: Vec<String>,
    #[validate(length(max = 500))]
    pub answer: Option<String>,
    pub points: Option<i32>,
    pub position: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_tier_boundaries() {
        assert_eq!(Level::for_percentage(100.0), Level::Expert);
        assert_eq!(Level::for_percentage(85.0), Level::Expert);
        assert_eq!(Level::for_percentage(84.9), Level::Advanced);
        assert_eq!(Level::for_percentage(70.0), Level::Advanced);
        assert_eq!(Level::for_percentage(69.9), Level::Intermediate);
        assert_eq!(Level::for_percentage(50.0), Level::Intermediate);
        assert_eq!(Level::for_percentage(49.9), Level::Basic);
        assert_eq!(Level::for_percentage(0.0), Level::Basic);
    }
}
