// src/services/evaluation.rs

use std::collections::HashMap;

use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        evaluation::{
            Evaluation, EvaluationSubmission, GradingOutcome, ReviewRequest,
            SubmissionListEntry, TakingView,
        },
        question::{AnswerKey, AnswerValue, PublicQuestion, Question, QuestionType},
        user::Principal,
    },
    services::comparator::compare,
};

/// Pure grading pass over the evaluation's answer keys.
/// Every question contributes its points to max_score; a correct answer
/// contributes them to score. Open-text points inflate max_score only, by
/// policy: they stay ungraded until manual review.
fn grade(keys: &[AnswerKey], answers: &HashMap<i64, AnswerValue>) -> (i32, i32, f64) {
    let mut score = 0;
    let mut max_score = 0;

    for key in keys {
        max_score += key.points;
        let user_answer = answers.get(&key.id).map(|a| a.as_text());
        if compare(
            user_answer.as_deref(),
            key.answer.as_deref(),
            QuestionType::parse(&key.question_type),
        ) {
            score += key.points;
        }
    }

    let percentage = if max_score > 0 {
        (score as f64 / max_score as f64) * 100.0
    } else {
        0.0
    };

    (score, max_score, percentage)
}

/// Grades a submission and persists it as a new attempt.
///
/// The attempt-count check and the insert run in one transaction, and the
/// submissions table carries a unique (evaluation_id, user_id, attempt_number)
/// constraint, so two racing submissions cannot both slip under the ceiling;
/// the loser surfaces as a 409.
pub async fn submit(
    pool: &PgPool,
    principal: &Principal,
    evaluation_id: i64,
    answers: &HashMap<i64, AnswerValue>,
) -> Result<GradingOutcome, AppError> {
    let evaluation =
        sqlx::query_as::<_, Evaluation>("SELECT * FROM evaluations WHERE id = $1")
            .bind(evaluation_id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::NotFound("Evaluation not found".to_string()))?;

    // Drafts are invisible to students on the submit path too, not just on
    // the taking view. Grading against one would still burn an attempt row.
    if !evaluation.published && !principal.role.is_staff() {
        return Err(AppError::NotFound("Evaluation not found".to_string()));
    }

    let mut tx = pool.begin().await?;

    let prior_attempts = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM evaluation_submissions WHERE evaluation_id = $1 AND user_id = $2",
    )
    .bind(evaluation_id)
    .bind(principal.user_id)
    .fetch_one(&mut *tx)
    .await?;

    if prior_attempts >= evaluation.attempts as i64 {
        return Err(AppError::AttemptsExceeded {
            max_attempts: evaluation.attempts,
        });
    }

    let keys = sqlx::query_as::<_, AnswerKey>(
        "SELECT id, type, answer, points FROM questions WHERE evaluation_id = $1",
    )
    .bind(evaluation_id)
    .fetch_all(&mut *tx)
    .await?;

    let (score, max_score, percentage) = grade(&keys, answers);
    let passed = percentage >= evaluation.passing_score;
    let attempt_number = prior_attempts as i32 + 1;

    // Raw answers stored verbatim for later manual review.
    let raw_answers = serde_json::to_value(answers)?;

    let submission_id = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO evaluation_submissions
        (evaluation_id, user_id, answers, score, max_score, percentage, passed, attempt_number)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(evaluation_id)
    .bind(principal.user_id)
    .bind(raw_answers)
    .bind(score)
    .bind(max_score)
    .bind(percentage)
    .bind(passed)
    .bind(attempt_number)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| {
        if e.to_string().contains("unique constraint") || e.to_string().contains("23505") {
            AppError::Conflict("Concurrent submission detected, please retry".to_string())
        } else {
            tracing::error!("Failed to insert submission: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    tx.commit().await?;

    Ok(GradingOutcome {
        success: true,
        score,
        max_score,
        percentage,
        passed,
        submission_id,
        attempt_number,
    })
}

/// Returns the evaluation body for taking: questions stripped of answers and
/// explanations, plus the remaining attempt count.
///
/// With no attempts left this returns `AttemptsExceeded` without exposing the
/// question set at all.
pub async fn get_for_taking(
    pool: &PgPool,
    principal: &Principal,
    evaluation_id: i64,
) -> Result<TakingView, AppError> {
    let evaluation =
        sqlx::query_as::<_, Evaluation>("SELECT * FROM evaluations WHERE id = $1")
            .bind(evaluation_id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::NotFound("Evaluation not found".to_string()))?;

    if !evaluation.published && !principal.role.is_staff() {
        return Err(AppError::NotFound("Evaluation not found".to_string()));
    }

    let used = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM evaluation_submissions WHERE evaluation_id = $1 AND user_id = $2",
    )
    .bind(evaluation_id)
    .bind(principal.user_id)
    .fetch_one(pool)
    .await?;

    let attempts_left = evaluation.attempts - used as i32;
    if attempts_left <= 0 {
        return Err(AppError::AttemptsExceeded {
            max_attempts: evaluation.attempts,
        });
    }

    let questions = sqlx::query_as::<_, Question>(
        "SELECT * FROM questions WHERE evaluation_id = $1 ORDER BY position, id",
    )
    .bind(evaluation_id)
    .fetch_all(pool)
    .await?;

    Ok(TakingView {
        id: evaluation.id,
        title: evaluation.title,
        kind: evaluation.kind,
        passing_score: evaluation.passing_score,
        time_limit_minutes: evaluation.time_limit_minutes,
        attempts_left,
        max_attempts: evaluation.attempts,
        questions: questions.into_iter().map(PublicQuestion::from).collect(),
    })
}

/// Lists submissions for an evaluation, newest first. Staff only.
pub async fn list_submissions(
    pool: &PgPool,
    principal: &Principal,
    evaluation_id: i64,
) -> Result<Vec<SubmissionListEntry>, AppError> {
    if !principal.role.is_staff() {
        return Err(AppError::Forbidden(
            "Only teachers may review submissions".to_string(),
        ));
    }

    let entries = sqlx::query_as::<_, SubmissionListEntry>(
        r#"
        SELECT
            s.id, s.user_id, u.username, s.score, s.max_score, s.percentage,
            s.passed, s.attempt_number, s.reviewed_at, s.created_at
        FROM evaluation_submissions s
        JOIN users u ON s.user_id = u.id
        WHERE s.evaluation_id = $1
        ORDER BY s.created_at DESC
        "#,
    )
    .bind(evaluation_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Records a manual review on a submission. Staff only.
///
/// Approval sets `passed = true` regardless of the automatic percentage
/// (open-text answers can only pass this way). A non-approving review leaves
/// the automatic verdict in place. Score fields are never touched.
pub async fn review(
    pool: &PgPool,
    principal: &Principal,
    submission_id: i64,
    req: &ReviewRequest,
) -> Result<(), AppError> {
    if !principal.role.is_staff() {
        return Err(AppError::Forbidden(
            "Only teachers may review submissions".to_string(),
        ));
    }

    let submission = sqlx::query_as::<_, EvaluationSubmission>(
        "SELECT * FROM evaluation_submissions WHERE id = $1",
    )
    .bind(submission_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Submission not found".to_string()))?;

    sqlx::query(
        r#"
        UPDATE evaluation_submissions
        SET reviewed_by = $1,
            reviewed_at = NOW(),
            feedback = $2,
            passed = CASE WHEN $3 THEN TRUE ELSE passed END
        WHERE id = $4
        "#,
    )
    .bind(principal.user_id)
    .bind(&req.feedback)
    .bind(req.approve)
    .bind(submission.id)
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: i64, question_type: &str, answer: Option<&str>, points: i32) -> AnswerKey {
        AnswerKey {
            id,
            question_type: question_type.to_string(),
            answer: answer.map(|s| s.to_string()),
            points,
        }
    }

    fn answers(pairs: &[(i64, &str)]) -> HashMap<i64, AnswerValue> {
        pairs
            .iter()
            .map(|(id, a)| (*id, AnswerValue::Text(a.to_string())))
            .collect()
    }

    #[test]
    fn one_correct_one_wrong_is_half() {
        let keys = vec![
            key(1, "multiple_choice", Some("a"), 10),
            key(2, "multiple_choice", Some("b"), 10),
        ];
        let (score, max_score, percentage) = grade(&keys, &answers(&[(1, "a"), (2, "c")]));
        assert_eq!(score, 10);
        assert_eq!(max_score, 20);
        assert_eq!(percentage, 50.0);
    }

    #[test]
    fn unanswered_questions_still_count_toward_max() {
        let keys = vec![
            key(1, "multiple_choice", Some("a"), 10),
            key(2, "true_false", Some("true"), 5),
        ];
        let (score, max_score, percentage) = grade(&keys, &answers(&[(1, "a")]));
        assert_eq!(score, 10);
        assert_eq!(max_score, 15);
        assert!((percentage - 66.666).abs() < 0.01);
    }

    #[test]
    fn open_text_points_never_score() {
        let keys = vec![
            key(1, "open_text", None, 10),
            key(2, "multiple_choice", Some("a"), 10),
        ];
        let (score, max_score, _) = grade(&keys, &answers(&[(1, "an essay"), (2, "a")]));
        assert_eq!(score, 10);
        assert_eq!(max_score, 20);
    }

    #[test]
    fn scale_answers_accept_numeric_payloads() {
        let keys = vec![key(1, "scale", Some("4"), 10)];
        let mut submitted = HashMap::new();
        submitted.insert(1, AnswerValue::Number(4));
        let (score, max_score, percentage) = grade(&keys, &submitted);
        assert_eq!(score, 10);
        assert_eq!(max_score, 10);
        assert_eq!(percentage, 100.0);
    }

    #[test]
    fn empty_question_set_is_zero_percent() {
        let (score, max_score, percentage) = grade(&[], &answers(&[(1, "a")]));
        assert_eq!(score, 0);
        assert_eq!(max_score, 0);
        assert_eq!(percentage, 0.0);
    }

    #[test]
    fn passing_boundary_is_inclusive() {
        // 3 of 5 correct = 60%, which passes a passing_score of 60.
        let keys: Vec<AnswerKey> = (1..=5)
            .map(|i| key(i, "multiple_choice", Some("a"), 10))
            .collect();
        let submitted = answers(&[(1, "a"), (2, "a"), (3, "a"), (4, "x"), (5, "x")]);
        let (_, _, percentage) = grade(&keys, &submitted);
        assert_eq!(percentage, 60.0);
        assert!(percentage >= 60.0);

        // One fewer correct answer lands at 40% and fails the same threshold.
        let submitted = answers(&[(1, "a"), (2, "a"), (3, "x"), (4, "x"), (5, "x")]);
        let (_, _, percentage) = grade(&keys, &submitted);
        assert!(percentage < 60.0);
    }
}
