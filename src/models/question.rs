// src/models/question.rs

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use validator::Validate;

/// Question type tag. Stored as TEXT in the database; unrecognized tags fall
/// back to `Unknown`, which grades by trimmed string equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    /// 1-to-5 agreement scale; graded by numeric equality.
    Scale,
    /// Requires human review; never auto-graded correct.
    OpenText,
    Unknown,
}

impl QuestionType {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "multiple_choice" => QuestionType::MultipleChoice,
            "true_false" => QuestionType::TrueFalse,
            "scale" => QuestionType::Scale,
            "open_text" => QuestionType::OpenText,
            _ => QuestionType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::Scale => "scale",
            QuestionType::OpenText => "open_text",
            QuestionType::Unknown => "unknown",
        }
    }
}

/// A submitted answer value. Payload shapes differ per question type
/// (booleans for true/false, numbers for scales), so the boundary accepts
/// all three and normalizes to text before grading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Bool(bool),
    Number(i64),
    Text(String),
}

impl AnswerValue {
    pub fn as_text(&self) -> String {
        match self {
            AnswerValue::Bool(b) => b.to_string(),
            AnswerValue::Number(n) => n.to_string(),
            AnswerValue::Text(s) => s.clone(),
        }
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,

    pub evaluation_id: i64,

    /// Question type tag. Mapped from the database column 'type' since
    /// `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: String,

    /// The text content of the question.
    pub prompt: String,

    /// List of options (e.g., ["Option A", "Option B"]).
    /// Stored as a JSON array in the database.
    pub options: Json<Vec<String>>,

    /// The correct answer key. NULL for open-text questions.
    pub answer: Option<String>,

    /// Explanation shown after grading; never sent while taking.
    pub explanation: Option<String>,

    pub points: i32,

    pub position: i32,
}

/// Slim row used by the grading services: just what the comparator needs.
#[derive(Debug, FromRow)]
pub struct AnswerKey {
    pub id: i64,
    #[sqlx(rename = "type")]
    pub question_type: String,
    pub answer: Option<String>,
    pub points: i32,
}

/// DTO for sending a question to a student (excludes answer and explanation).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: String,
    pub prompt: String,
    pub options: Json<Vec<String>>,
    pub points: i32,
    pub position: i32,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        PublicQuestion {
            id: q.id,
            question_type: q.question_type,
            prompt: q.prompt,
            options: q.options,
            points: q.points,
            position: q.position,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    #[validate(length(min = 1, max = 20))]
    #[serde(rename = "type")]
    pub question_type: String,
    #[validate(length(min = 1, max = 1000))]
    pub prompt: String,
    #[validate(custom(function = validate_options))]
    pub options: Vec<String>,
    #[validate(length(max = 500))]
    pub answer: Option<String>,
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
    pub points: Option<i32>,
    pub position: Option<i32>,
}

fn validate_options(options: &[String]) -> Result<(), validator::ValidationError> {
    for opt in options {
        if opt.len() > 500 {
            return Err(validator::ValidationError::new("option_too_long"));
        }
    }
    Ok(())
}
