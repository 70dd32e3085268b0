//! Scoring error types.
//!
//! These errors signal upstream data or input problems. They are never
//! turned into a silent "incorrect" verdict; the caller decides how to
//! present them.

use thiserror::Error;

/// Errors raised while validating questions or evaluating answers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    /// The submitted answer does not fit the question's expected shape.
    #[error("invalid answer for question {question_id}: {reason}")]
    InvalidAnswerFormat { question_id: String, reason: String },

    /// The question's answer key violates its invariants.
    #[error("malformed question {question_id}: {reason}")]
    MalformedQuestion { question_id: String, reason: String },

    /// Nothing was selected or entered.
    #[error("no answer given for question {question_id}")]
    NoAnswer { question_id: String },
}

impl ScoringError {
    pub(crate) fn invalid_answer(question_id: &str, reason: impl Into<String>) -> Self {
        ScoringError::InvalidAnswerFormat {
            question_id: question_id.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(question_id: &str, reason: impl Into<String>) -> Self {
        ScoringError::MalformedQuestion {
            question_id: question_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if the error points at bad catalog data rather than
    /// at what the user submitted.
    pub fn is_data_error(&self) -> bool {
        matches!(self, ScoringError::MalformedQuestion { .. })
    }

    /// The question the error refers to.
    pub fn question_id(&self) -> &str {
        match self {
            ScoringError::InvalidAnswerFormat { question_id, .. }
            | ScoringError::MalformedQuestion { question_id, .. }
            | ScoringError::NoAnswer { question_id } => question_id,
        }
    }
}
