// src/services/unlock.rs

use std::collections::HashSet;

/// One lesson in the course's flattened order (module-order then
/// lesson-order), with the published evaluations attached to it.
#[derive(Debug, Clone)]
pub struct LessonGate {
    pub lesson_id: i64,
    pub evaluation_ids: Vec<i64>,
}

/// Computes the per-lesson locked flag for one user.
///
/// Lessons unlock strictly sequentially: the first lesson is never locked;
/// every later lesson is locked until its immediate predecessor is completed
/// AND every evaluation attached to that predecessor has a passing
/// submission. Lock state is derived on every read and never persisted.
pub fn compute_lock_state(
    lessons: &[LessonGate],
    completed_lessons: &HashSet<i64>,
    passed_evaluations: &HashSet<i64>,
) -> Vec<bool> {
    lessons
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if i == 0 {
                return false;
            }
            let prev = &lessons[i - 1];
            if !completed_lessons.contains(&prev.lesson_id) {
                return true;
            }
            // Partial completion does not unlock: all gates must be passed.
            !prev.evaluation_ids
                .iter()
                .all(|id| passed_evaluations.contains(id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate(lesson_id: i64, evaluation_ids: &[i64]) -> LessonGate {
        LessonGate {
            lesson_id,
            evaluation_ids: evaluation_ids.to_vec(),
        }
    }

    fn ids(values: &[i64]) -> HashSet<i64> {
        values.iter().copied().collect()
    }

    #[test]
    fn first_lesson_is_never_locked() {
        let lessons = vec![gate(1, &[9])];
        let locks = compute_lock_state(&lessons, &ids(&[]), &ids(&[]));
        assert_eq!(locks, vec![false]);
    }

    #[test]
    fn locked_while_predecessor_incomplete() {
        let lessons = vec![gate(1, &[]), gate(2, &[])];
        let locks = compute_lock_state(&lessons, &ids(&[]), &ids(&[]));
        assert_eq!(locks, vec![false, true]);
    }

    #[test]
    fn unlocked_when_predecessor_complete_without_evaluations() {
        let lessons = vec![gate(1, &[]), gate(2, &[])];
        let locks = compute_lock_state(&lessons, &ids(&[1]), &ids(&[]));
        assert_eq!(locks, vec![false, false]);
    }

    #[test]
    fn locked_by_unpassed_evaluation_on_predecessor() {
        let lessons = vec![gate(1, &[9]), gate(2, &[])];
        let locks = compute_lock_state(&lessons, &ids(&[1]), &ids(&[]));
        assert_eq!(locks, vec![false, true]);
    }

    #[test]
    fn partial_evaluation_passes_do_not_unlock() {
        let lessons = vec![gate(1, &[9, 10]), gate(2, &[])];
        let locks = compute_lock_state(&lessons, &ids(&[1]), &ids(&[9]));
        assert_eq!(locks, vec![false, true]);

        let locks = compute_lock_state(&lessons, &ids(&[1]), &ids(&[9, 10]));
        assert_eq!(locks, vec![false, false]);
    }

    #[test]
    fn chain_is_strictly_linear() {
        // Lesson 3 stays locked even though lesson 1 is done, because
        // lesson 2 is not.
        let lessons = vec![gate(1, &[]), gate(2, &[]), gate(3, &[])];
        let locks = compute_lock_state(&lessons, &ids(&[1]), &ids(&[]));
        assert_eq!(locks, vec![false, false, true]);

        // Completing only a later lesson does not unlock anything behind it.
        let locks = compute_lock_state(&lessons, &ids(&[3]), &ids(&[]));
        assert_eq!(locks, vec![false, true, true]);
    }

    #[test]
    fn own_evaluations_do_not_gate_the_lesson_itself() {
        // An evaluation on lesson 2 gates lesson 3, not lesson 2.
        let lessons = vec![gate(1, &[]), gate(2, &[9]), gate(3, &[])];
        let locks = compute_lock_state(&lessons, &ids(&[1, 2]), &ids(&[]));
        assert_eq!(locks, vec![false, false, true]);
    }
}
