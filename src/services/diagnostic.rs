// src/services/diagnostic.rs

use std::collections::HashMap;

use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        diagnostic::{
            Diagnostic, DiagnosticOutcome, DiagnosticQuestion, Level, PublicDiagnosticQuestion,
        },
        question::AnswerValue,
        user::Principal,
    },
};

/// A diagnostic question contributes to the score only when it has both a
/// non-empty correct answer and positive points; everything else is an
/// opinion question.
fn is_scored(question: &DiagnosticQuestion) -> bool {
    question.points > 0
        && question
            .answer
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty())
}

/// Pure grading pass over the diagnostic's questions. Diagnostics only use
/// single-answer formats, so grading is stringified trimmed equality with no
/// per-type dispatch.
fn grade(
    questions: &[DiagnosticQuestion],
    answers: &HashMap<i64, AnswerValue>,
) -> (i32, i32, f64) {
    let mut score = 0;
    let mut max_score = 0;

    for question in questions.iter().filter(|q| is_scored(q)) {
        max_score += question.points;
        let correct = question.answer.as_deref().unwrap_or_default();
        if let Some(user) = answers.get(&question.id) {
            if user.as_text().trim() == correct.trim() {
                score += question.points;
            }
        }
    }

    let percentage = if max_score > 0 {
        (score as f64 / max_score as f64) * 100.0
    } else {
        0.0
    };

    (score, max_score, percentage)
}

/// Grades a diagnostic and upserts the single result row for this user.
/// Diagnostics are single-shot by design: a retake overwrites the previous
/// score, level, answers and completion timestamp instead of appending.
pub async fn submit(
    pool: &PgPool,
    principal: &Principal,
    diagnostic_id: i64,
    answers: &HashMap<i64, AnswerValue>,
) -> Result<DiagnosticOutcome, AppError> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM diagnostics WHERE id = $1")
        .bind(diagnostic_id)
        .fetch_optional(pool)
        .await?;

    if exists.is_none() {
        return Err(AppError::NotFound("Diagnostic not found".to_string()));
    }

    let questions = sqlx::query_as::<_, DiagnosticQuestion>(
        "SELECT * FROM diagnostic_questions WHERE diagnostic_id = $1",
    )
    .bind(diagnostic_id)
    .fetch_all(pool)
    .await?;

    let (score, max_score, percentage) = grade(&questions, answers);
    let level = Level::for_percentage(percentage);
    let raw_answers = serde_json::to_value(answers)?;

    let result_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO diagnostic_results
        (diagnostic_id, user_id, answers, score, max_score, percentage, level, completed_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        ON CONFLICT (user_id, diagnostic_id) DO UPDATE SET
            answers = EXCLUDED.answers,
            score = EXCLUDED.score,
            max_score = EXCLUDED.max_score,
            percentage = EXCLUDED.percentage,
            level = EXCLUDED.level,
            completed_at = NOW()
        RETURNING id
        "#,
    )
    .bind(diagnostic_id)
    .bind(principal.user_id)
    .bind(raw_answers)
    .bind(score)
    .bind(max_score)
    .bind(percentage)
    .bind(level.as_str())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to upsert diagnostic result: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(DiagnosticOutcome {
        success: true,
        score,
        max_score,
        percentage,
        level,
        result_id,
    })
}

/// Returns the diagnostic with its questions stripped of answers.
pub async fn get_for_taking(
    pool: &PgPool,
    principal: &Principal,
    diagnostic_id: i64,
) -> Result<(Diagnostic, Vec<PublicDiagnosticQuestion>), AppError> {
    let diagnostic = sqlx::query_as::<_, Diagnostic>("SELECT * FROM diagnostics WHERE id = $1")
        .bind(diagnostic_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("Diagnostic not found".to_string()))?;

    if !diagnostic.published && !principal.role.is_staff() {
        return Err(AppError::NotFound("Diagnostic not found".to_string()));
    }

    let questions = sqlx::query_as::<_, DiagnosticQuestion>(
        "SELECT * FROM diagnostic_questions WHERE diagnostic_id = $1 ORDER BY position, id",
    )
    .bind(diagnostic_id)
    .fetch_all(pool)
    .await?;

    Ok((
        diagnostic,
        questions
            .into_iter()
            .map(PublicDiagnosticQuestion::from)
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    fn question(id: i64, answer: Option<&str>, points: i32) -> DiagnosticQuestion {
        DiagnosticQuestion {
            id,
            diagnostic_id: 1,
            prompt: format!("q{id}"),
            options: Json(vec!["a".to_string(), "b".to_string()]),
            answer: answer.map(|s| s.to_string()),
            points,
            position: id as i32,
        }
    }

    fn answers(pairs: &[(i64, &str)]) -> HashMap<i64, AnswerValue> {
        pairs
            .iter()
            .map(|(id, a)| (*id, AnswerValue::Text(a.to_string())))
            .collect()
    }

    #[test]
    fn opinion_questions_do_not_count() {
        let questions = vec![
            question(1, Some("a"), 10),
            question(2, None, 10),      // no answer key
            question(3, Some("b"), 0),  // zero points
            question(4, Some(" "), 10), // blank answer key
        ];
        let (score, max_score, _) = grade(&questions, &answers(&[(1, "a"), (2, "a"), (3, "b")]));
        assert_eq!(max_score, 10);
        assert_eq!(score, 10);
    }

    #[test]
    fn grading_is_trimmed_string_equality() {
        let questions = vec![question(1, Some("b"), 10)];
        let (score, _, _) = grade(&questions, &answers(&[(1, " b ")]));
        assert_eq!(score, 10);
        let (score, _, _) = grade(&questions, &answers(&[(1, "B")]));
        assert_eq!(score, 0);
    }

    #[test]
    fn numeric_payloads_stringify_before_comparison() {
        let questions = vec![question(1, Some("3"), 10)];
        let mut submitted = HashMap::new();
        submitted.insert(1, AnswerValue::Number(3));
        let (score, _, _) = grade(&questions, &submitted);
        assert_eq!(score, 10);
    }

    #[test]
    fn all_opinion_diagnostic_is_zero_percent_basic() {
        let questions = vec![question(1, None, 10), question(2, Some("a"), 0)];
        let (score, max_score, percentage) = grade(&questions, &answers(&[(1, "x")]));
        assert_eq!(score, 0);
        assert_eq!(max_score, 0);
        assert_eq!(percentage, 0.0);
        assert_eq!(Level::for_percentage(percentage), Level::Basic);
    }
}
