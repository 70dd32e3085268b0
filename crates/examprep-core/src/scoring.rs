//! Answer evaluation.
//!
//! Marking scheme:
//!
//! | Kind | Correct | Wrong | Partial |
//! |------|---------|-------|---------|
//! | single correct | +4 | -1 | - |
//! | multiple correct | +4 | -2 | +3 / +2 / +1 by fraction of correct options picked |
//! | numerical | +4 | 0 | - |

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use crate::model::{AnswerKey, Question, SubmittedAnswer};

/// Points for a fully correct answer of any kind.
pub const CORRECT_SCORE: i32 = 4;
/// Points for a wrong single-correct answer.
pub const SINGLE_WRONG_PENALTY: i32 = -1;
/// Points when any wrong option is picked on a multiple-correct question.
pub const MULTIPLE_WRONG_PENALTY: i32 = -2;
/// Highest score a single question can award.
pub const MAX_SCORE: i32 = CORRECT_SCORE;

/// Absolute floor of the numerical tolerance.
const TOLERANCE_FLOOR: f64 = 0.001;
/// Relative tolerance (0.1% of the reference magnitude).
const TOLERANCE_RELATIVE: f64 = 0.001;

/// The verdict on one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub is_correct: bool,
    pub score: i32,
}

impl Evaluation {
    fn correct() -> Self {
        Self {
            is_correct: true,
            score: CORRECT_SCORE,
        }
    }

    fn incorrect(score: i32) -> Self {
        Self {
            is_correct: false,
            score,
        }
    }
}

/// Evaluate a submitted answer against a question's answer key.
///
/// The question is validated first, so a broken answer key surfaces as
/// `MalformedQuestion` rather than as a wrong answer.
pub fn evaluate(question: &Question, submitted: &SubmittedAnswer) -> Result<Evaluation, ScoringError> {
    question.validate()?;

    match (&question.answer_key, submitted) {
        (AnswerKey::SingleCorrect(correct), SubmittedAnswer::Single(selected)) => {
            check_option_range(question, std::iter::once(*selected))?;
            Ok(if selected == correct {
                Evaluation::correct()
            } else {
                Evaluation::incorrect(SINGLE_WRONG_PENALTY)
            })
        }
        (AnswerKey::MultipleCorrect(correct), SubmittedAnswer::Multiple(selected)) => {
            check_option_range(question, selected.iter().copied())?;
            Ok(evaluate_multiple(correct, selected))
        }
        (AnswerKey::Numerical(reference), SubmittedAnswer::Numerical(raw)) => {
            let value = parse_numeric(&question.id, raw)?;
            Ok(if (value - reference).abs() <= numerical_tolerance(*reference) {
                Evaluation::correct()
            } else {
                Evaluation::incorrect(0)
            })
        }
        (key, answer) => Err(ScoringError::invalid_answer(
            &question.id,
            format!(
                "{} answer submitted for a {} question",
                answer.kind(),
                key.kind()
            ),
        )),
    }
}

/// Greater of the absolute floor and 0.1% of the reference magnitude.
pub fn numerical_tolerance(reference: f64) -> f64 {
    (reference.abs() * TOLERANCE_RELATIVE).max(TOLERANCE_FLOOR)
}

/// Partial-credit tier for `hit` of `correct_len` options picked with no
/// wrong picks. Boundaries are strict: exactly 75% earns +2, not +3.
pub fn partial_credit(hit: usize, correct_len: usize) -> i32 {
    if hit == 0 || correct_len == 0 {
        return 0;
    }
    // Integer comparisons keep the boundaries exact.
    if 4 * hit > 3 * correct_len {
        3
    } else if 2 * hit > correct_len {
        2
    } else {
        1
    }
}

fn evaluate_multiple(correct: &BTreeSet<u32>, selected: &BTreeSet<u32>) -> Evaluation {
    if selected == correct {
        return Evaluation::correct();
    }

    let hit = selected.intersection(correct).count();
    let miss = selected.difference(correct).count();

    if miss > 0 {
        Evaluation::incorrect(MULTIPLE_WRONG_PENALTY)
    } else {
        Evaluation::incorrect(partial_credit(hit, correct.len()))
    }
}

fn check_option_range(
    question: &Question,
    selected: impl IntoIterator<Item = u32>,
) -> Result<(), ScoringError> {
    let option_count = question.options.len() as u32;
    for index in selected {
        if index == 0 || index > option_count {
            return Err(ScoringError::invalid_answer(
                &question.id,
                format!("option {index} outside 1..={option_count}"),
            ));
        }
    }
    Ok(())
}

fn parse_numeric(question_id: &str, raw: &str) -> Result<f64, ScoringError> {
    let trimmed = raw.trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| ScoringError::invalid_answer(question_id, format!("not a number: {trimmed:?}")))?;
    if !value.is_finite() {
        return Err(ScoringError::invalid_answer(
            question_id,
            format!("not a finite number: {trimmed:?}"),
        ));
    }
    Ok(value)
}

/// Map a summed session score onto a 0–100 scale.
///
/// Negative totals clamp to 0.
pub fn normalize_score(total_score: i32, question_count: usize) -> f64 {
    if question_count == 0 {
        return 0.0;
    }
    let max = (MAX_SCORE as f64) * question_count as f64;
    ((total_score as f64) / max * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("option {i}")).collect()
    }

    fn single(correct: u32) -> Question {
        Question::new("s1", "", options(4), AnswerKey::SingleCorrect(correct), 3).unwrap()
    }

    fn multiple(correct: &[u32]) -> Question {
        Question::new(
            "m1",
            "",
            options(4),
            AnswerKey::MultipleCorrect(correct.iter().copied().collect()),
            6,
        )
        .unwrap()
    }

    fn numerical(reference: f64) -> Question {
        Question::new("n1", "", vec![], AnswerKey::Numerical(reference), 7).unwrap()
    }

    fn picks(indices: &[u32]) -> SubmittedAnswer {
        SubmittedAnswer::Multiple(indices.iter().copied().collect())
    }

    fn num(raw: &str) -> SubmittedAnswer {
        SubmittedAnswer::Numerical(raw.into())
    }

    #[test]
    fn single_correct() {
        let eval = evaluate(&single(2), &SubmittedAnswer::Single(2)).unwrap();
        assert_eq!(eval, Evaluation { is_correct: true, score: 4 });
    }

    #[test]
    fn single_wrong() {
        let eval = evaluate(&single(2), &SubmittedAnswer::Single(1)).unwrap();
        assert_eq!(eval, Evaluation { is_correct: false, score: -1 });
    }

    #[test]
    fn single_out_of_range_is_invalid() {
        let err = evaluate(&single(2), &SubmittedAnswer::Single(9)).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidAnswerFormat { .. }));
    }

    #[test]
    fn multiple_exact_match() {
        let eval = evaluate(&multiple(&[1, 3]), &picks(&[1, 3])).unwrap();
        assert_eq!(eval, Evaluation { is_correct: true, score: 4 });
    }

    #[test]
    fn multiple_three_of_four_is_not_above_three_quarters() {
        let eval = evaluate(&multiple(&[1, 2, 3, 4]), &picks(&[1, 2, 3])).unwrap();
        assert_eq!(eval, Evaluation { is_correct: false, score: 2 });
    }

    #[test]
    fn multiple_any_wrong_pick_is_penalized() {
        let eval = evaluate(&multiple(&[1, 2]), &picks(&[1, 3])).unwrap();
        assert_eq!(eval, Evaluation { is_correct: false, score: -2 });

        let eval = evaluate(&multiple(&[1, 2, 3]), &picks(&[1, 2, 3, 4])).unwrap();
        assert_eq!(eval.score, -2);
    }

    #[test]
    fn multiple_partial_tiers() {
        assert_eq!(evaluate(&multiple(&[1, 2]), &picks(&[2])).unwrap().score, 1);
        assert_eq!(evaluate(&multiple(&[1, 2, 3]), &picks(&[1, 3])).unwrap().score, 2);
        assert_eq!(evaluate(&multiple(&[1, 2, 3, 4]), &picks(&[4])).unwrap().score, 1);
        assert_eq!(evaluate(&multiple(&[1, 2, 3, 4]), &picks(&[1, 4])).unwrap().score, 1);
    }

    #[test]
    fn multiple_empty_selection_scores_zero() {
        let eval = evaluate(&multiple(&[1, 2]), &picks(&[])).unwrap();
        assert_eq!(eval, Evaluation { is_correct: false, score: 0 });
    }

    #[test]
    fn partial_credit_boundaries() {
        assert_eq!(partial_credit(3, 4), 2);
        assert_eq!(partial_credit(4, 5), 3);
        assert_eq!(partial_credit(2, 4), 1);
        assert_eq!(partial_credit(5, 8), 2);
        assert_eq!(partial_credit(7, 9), 3);
        assert_eq!(partial_credit(0, 4), 0);
    }

    #[test]
    fn partial_credit_is_monotonic() {
        for n in 1..=12 {
            let mut previous = 0;
            for hit in 1..n {
                let credit = partial_credit(hit, n);
                assert!(credit >= previous, "hit={hit} n={n}");
                previous = credit;
            }
        }
    }

    #[test]
    fn numerical_within_relative_tolerance() {
        let eval = evaluate(&numerical(100.0), &num("100.05")).unwrap();
        assert_eq!(eval, Evaluation { is_correct: true, score: 4 });
        let eval = evaluate(&numerical(100.0), &num("100.2")).unwrap();
        assert_eq!(eval, Evaluation { is_correct: false, score: 0 });
    }

    #[test]
    fn numerical_absolute_floor_for_small_references() {
        assert_eq!(numerical_tolerance(0.0), 0.001);
        assert!((numerical_tolerance(-2000.0) - 2.0).abs() < 1e-12);
        assert!(evaluate(&numerical(0.0), &num("0.0009")).unwrap().is_correct);
        assert!(!evaluate(&numerical(0.0), &num("0.01")).unwrap().is_correct);
    }

    #[test]
    fn numerical_unparseable_is_invalid() {
        for raw in ["abc", "", "1.2.3", "NaN", "inf"] {
            let err = evaluate(&numerical(1.0), &num(raw)).unwrap_err();
            assert!(
                matches!(err, ScoringError::InvalidAnswerFormat { .. }),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn shape_mismatch_is_invalid() {
        let err = evaluate(&single(1), &picks(&[1])).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidAnswerFormat { .. }));
        let err = evaluate(&numerical(1.0), &SubmittedAnswer::Single(1)).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidAnswerFormat { .. }));
    }

    #[test]
    fn malformed_question_is_reported_before_evaluation() {
        let broken = Question {
            id: "bad".into(),
            text: String::new(),
            options: options(2),
            answer_key: AnswerKey::SingleCorrect(0),
            difficulty_level: 1,
        };
        let err = evaluate(&broken, &SubmittedAnswer::Single(1)).unwrap_err();
        assert!(matches!(err, ScoringError::MalformedQuestion { .. }));
    }

    #[test]
    fn scores_stay_within_bounds() {
        let q = multiple(&[1, 3]);
        let allowed = [-2, 0, 1, 2, 3, 4];
        for mask in 0u32..16 {
            let selected: BTreeSet<u32> = (1..=4).filter(|i| mask & (1 << (i - 1)) != 0).collect();
            let answer = SubmittedAnswer::Multiple(selected);
            let eval = evaluate(&q, &answer).unwrap();
            assert!(allowed.contains(&eval.score), "mask {mask}: {}", eval.score);
            assert_eq!(eval, evaluate(&q, &answer).unwrap());
        }
        for selected in 1..=4 {
            let score = evaluate(&single(3), &SubmittedAnswer::Single(selected)).unwrap().score;
            assert!(score == -1 || score == 4);
        }
    }

    #[test]
    fn normalize_score_clamps() {
        assert_eq!(normalize_score(40, 10), 100.0);
        assert_eq!(normalize_score(20, 10), 50.0);
        assert_eq!(normalize_score(-5, 10), 0.0);
        assert_eq!(normalize_score(7, 0), 0.0);
    }
}
