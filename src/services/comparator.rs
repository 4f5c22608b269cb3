// src/services/comparator.rs

use crate::models::question::QuestionType;

/// Grades a single answer against the stored correct answer.
///
/// * Absent input on either side is never correct.
/// * Choice and true/false answers match by trimmed, case-sensitive equality.
/// * Scale answers match by integer equality; unparseable values never match.
/// * Open-text answers are never auto-graded correct: they require human
///   review, so their points never count toward the automatic pass/fail.
/// * Unknown type tags fall back to trimmed equality.
pub fn compare(user: Option<&str>, correct: Option<&str>, question_type: QuestionType) -> bool {
    let (Some(user), Some(correct)) = (user, correct) else {
        return false;
    };

    match question_type {
        QuestionType::OpenText => false,
        QuestionType::Scale => {
            match (user.trim().parse::<i64>(), correct.trim().parse::<i64>()) {
                (Ok(u), Ok(c)) => u == c,
                _ => false,
            }
        }
        QuestionType::MultipleChoice | QuestionType::TrueFalse | QuestionType::Unknown => {
            user.trim() == correct.trim()
        }
    }
}
