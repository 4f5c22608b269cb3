// src/models/course.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'courses' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Nominal workload, printed on certificates.
    pub hours: i32,
    pub published: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Represents the 'modules' table. Modules order lessons within a course.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Module {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub position: i32,
}

/// Represents the 'lessons' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Lesson {
    pub id: i64,
    pub module_id: i64,
    pub title: String,
    /// Sanitized HTML body.
    pub content: String,
    pub duration_minutes: i32,
    pub position: i32,
}

/// Lesson as shown on the course detail page, with the per-user lock flag
/// computed by the unlock resolver. Content is withheld for locked lessons.
#[derive(Debug, Serialize)]
pub struct LessonView {
    pub id: i64,
    pub title: String,
    #[serde(rename = "durationMinutes")]
    pub duration_minutes: i32,
    pub position: i32,
    pub completed: bool,
    pub locked: bool,
    #[serde(rename = "evaluationIds")]
    pub evaluation_ids: Vec<i64>,
}

/// Module with its lessons, for the course detail page.
#[derive(Debug, Serialize)]
pub struct ModuleView {
    pub id: i64,
    pub title: String,
    pub position: i32,
    pub lessons: Vec<LessonView>,
}

/// Course detail response: modules, per-user lock state and the caller's
/// enrollment snapshot (absent when not enrolled).
#[derive(Debug, Serialize)]
pub struct CourseDetailResponse {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub hours: i32,
    pub modules: Vec<ModuleView>,
    pub enrollment: Option<crate::models::enrollment::Enrollment>,
}

/// DTO for creating a course.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(range(min = 0, max = 10000))]
    pub hours: Option<i32>,
    pub published: Option<bool>,
}

/// DTO for updating a course. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub hours: Option<i32>,
    pub published: Option<bool>,
}

/// DTO for creating a module.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateModuleRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub position: Option<i32>,
}

/// DTO for creating a lesson.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateLessonRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    /// HTML body; sanitized before storage.
    #[validate(length(max = 100000))]
    pub content: Option<String>,
    #[validate(range(min = 0, max = 100000))]
    pub duration_minutes: Option<i32>,
    pub position: Option<i32>,
}

/// DTO for updating a lesson. Fields are optional.
#[derive(Debug, Deserialize)]
pub struct UpdateLessonRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub duration_minutes: Option<i32>,
    pub position: Option<i32>,
}
