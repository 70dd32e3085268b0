//! Core data model types for examprep.
//!
//! Questions come from the external question bank, submitted answers come
//! from the user, and attempt records are what gets persisted after a
//! submission has been scored.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScoringError;

/// The three question formats the product supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleCorrect,
    MultipleCorrect,
    Numerical,
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionKind::SingleCorrect => write!(f, "single_correct"),
            QuestionKind::MultipleCorrect => write!(f, "multiple_correct"),
            QuestionKind::Numerical => write!(f, "numerical"),
        }
    }
}

impl FromStr for QuestionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "single_correct" | "single" => Ok(QuestionKind::SingleCorrect),
            "multiple_correct" | "multiple" => Ok(QuestionKind::MultipleCorrect),
            "numerical" | "numeric" | "integer" => Ok(QuestionKind::Numerical),
            other => Err(format!("unknown question kind: {other}")),
        }
    }
}

/// The correct answer of a question.
///
/// Option indices are 1-based, as in the question bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerKey {
    SingleCorrect(u32),
    MultipleCorrect(BTreeSet<u32>),
    Numerical(f64),
}

impl AnswerKey {
    pub fn kind(&self) -> QuestionKind {
        match self {
            AnswerKey::SingleCorrect(_) => QuestionKind::SingleCorrect,
            AnswerKey::MultipleCorrect(_) => QuestionKind::MultipleCorrect,
            AnswerKey::Numerical(_) => QuestionKind::Numerical,
        }
    }
}

/// A question as served by the question bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    /// Identifier, unique within a chapter.
    pub id: String,
    /// Question text.
    #[serde(default)]
    pub text: String,
    /// Option texts, in display order. Empty for numerical questions.
    #[serde(default)]
    pub options: Vec<String>,
    /// The answer key; also determines the question kind.
    pub answer_key: AnswerKey,
    /// Difficulty from 1 to 10. Informational only.
    #[serde(default = "default_difficulty")]
    pub difficulty_level: u8,
}

fn default_difficulty() -> u8 {
    5
}

impl Question {
    /// Build a question, checking the answer key against the options.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        options: Vec<String>,
        answer_key: AnswerKey,
        difficulty_level: u8,
    ) -> Result<Self, ScoringError> {
        let question = Self {
            id: id.into(),
            text: text.into(),
            options,
            answer_key,
            difficulty_level,
        };
        question.validate()?;
        Ok(question)
    }

    pub fn kind(&self) -> QuestionKind {
        self.answer_key.kind()
    }

    /// Check the answer-key invariants.
    pub fn validate(&self) -> Result<(), ScoringError> {
        let option_count = self.options.len() as u32;
        match &self.answer_key {
            AnswerKey::SingleCorrect(index) => {
                if *index == 0 || *index > option_count {
                    return Err(ScoringError::malformed(
                        &self.id,
                        format!("correct option {index} outside 1..={option_count}"),
                    ));
                }
            }
            AnswerKey::MultipleCorrect(indices) => {
                if indices.is_empty() {
                    return Err(ScoringError::malformed(
                        &self.id,
                        "multiple-correct question has no correct options",
                    ));
                }
                if let Some(bad) = indices.iter().find(|&&i| i == 0 || i > option_count) {
                    return Err(ScoringError::malformed(
                        &self.id,
                        format!("correct option {bad} outside 1..={option_count}"),
                    ));
                }
            }
            AnswerKey::Numerical(value) => {
                if !value.is_finite() {
                    return Err(ScoringError::malformed(
                        &self.id,
                        format!("reference value {value} is not finite"),
                    ));
                }
                if !self.options.is_empty() {
                    return Err(ScoringError::malformed(
                        &self.id,
                        "numerical question must not have options",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// What the user submitted, shaped by question kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum SubmittedAnswer {
    Single(u32),
    Multiple(BTreeSet<u32>),
    Numerical(String),
}

impl SubmittedAnswer {
    /// Parse raw user input for a question of the given kind.
    ///
    /// Option answers are 1-based indices separated by commas or spaces.
    /// Blank input is `NoAnswer`: submission must stay disabled until
    /// something is selected.
    pub fn parse(question_id: &str, kind: QuestionKind, raw: &str) -> Result<Self, ScoringError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ScoringError::NoAnswer {
                question_id: question_id.to_string(),
            });
        }

        if kind == QuestionKind::Numerical {
            return Ok(SubmittedAnswer::Numerical(trimmed.to_string()));
        }

        let indices = trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(|t| {
                t.parse::<u32>().map_err(|_| {
                    ScoringError::invalid_answer(question_id, format!("not an option index: {t}"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if indices.is_empty() {
            return Err(ScoringError::NoAnswer {
                question_id: question_id.to_string(),
            });
        }

        match kind {
            QuestionKind::SingleCorrect => {
                if indices.len() != 1 {
                    return Err(ScoringError::invalid_answer(
                        question_id,
                        format!("expected exactly one option, got {}", indices.len()),
                    ));
                }
                Ok(SubmittedAnswer::Single(indices[0]))
            }
            _ => Ok(SubmittedAnswer::Multiple(indices.into_iter().collect())),
        }
    }

    pub fn kind(&self) -> QuestionKind {
        match self {
            SubmittedAnswer::Single(_) => QuestionKind::SingleCorrect,
            SubmittedAnswer::Multiple(_) => QuestionKind::MultipleCorrect,
            SubmittedAnswer::Numerical(_) => QuestionKind::Numerical,
        }
    }

    /// The form stored on an attempt record.
    pub fn normalized(&self) -> NormalizedAnswer {
        match self {
            SubmittedAnswer::Single(index) => NormalizedAnswer::Options(vec![*index]),
            SubmittedAnswer::Multiple(indices) => {
                NormalizedAnswer::Options(indices.iter().copied().collect())
            }
            SubmittedAnswer::Numerical(value) => NormalizedAnswer::Numeric(value.trim().to_string()),
        }
    }
}

/// Persisted answer: sorted option indices or the numeric string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NormalizedAnswer {
    Options(Vec<u32>),
    Numeric(String),
}

impl fmt::Display for NormalizedAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedAnswer::Options(indices) => {
                let joined: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
                write!(f, "{}", joined.join(","))
            }
            NormalizedAnswer::Numeric(value) => write!(f, "{value}"),
        }
    }
}

/// Where a question sits in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogPosition {
    pub exam_type: String,
    pub subject: String,
    pub chapter: String,
}

impl fmt::Display for CatalogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {}", self.exam_type, self.subject, self.chapter)
    }
}

/// The questions of one chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionBank {
    pub position: CatalogPosition,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuestionBank {
    pub fn question(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

/// One scored submission. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    #[serde(default)]
    pub id: Uuid,
    pub question_id: String,
    #[serde(default)]
    pub exam_type: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub chapter: Option<String>,
    pub user_id: String,
    pub submitted_answer: NormalizedAnswer,
    pub is_correct: bool,
    pub score: i32,
    #[serde(default)]
    pub time_spent_seconds: Option<u64>,
    #[serde(default = "default_attempt_count")]
    pub attempt_count: u32,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

fn default_attempt_count() -> u32 {
    1
}

impl AttemptRecord {
    /// Time spent in seconds; a missing value counts as zero.
    pub fn time_spent(&self) -> u64 {
        self.time_spent_seconds.unwrap_or(0)
    }

    fn question_key(&self) -> (&str, &str, Option<&str>, Option<&str>, Option<&str>) {
        (
            self.user_id.as_str(),
            self.question_id.as_str(),
            self.exam_type.as_deref(),
            self.subject.as_deref(),
            self.chapter.as_deref(),
        )
    }

    /// Whether this record is an attempt at the given question.
    pub fn is_for(&self, user_id: &str, position: &CatalogPosition, question_id: &str) -> bool {
        self.user_id == user_id
            && self.question_id == question_id
            && self.exam_type.as_deref() == Some(position.exam_type.as_str())
            && self.subject.as_deref() == Some(position.subject.as_str())
            && self.chapter.as_deref() == Some(position.chapter.as_str())
    }
}

/// Which attempts count when a question was answered more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptPolicy {
    /// Every submission counts.
    #[default]
    All,
    /// Only the first submission per question counts.
    First,
    /// Only the most recent submission per question counts.
    Latest,
}

impl fmt::Display for AttemptPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptPolicy::All => write!(f, "all"),
            AttemptPolicy::First => write!(f, "first"),
            AttemptPolicy::Latest => write!(f, "latest"),
        }
    }
}

impl FromStr for AttemptPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(AttemptPolicy::All),
            "first" => Ok(AttemptPolicy::First),
            "latest" | "last" => Ok(AttemptPolicy::Latest),
            other => Err(format!("unknown attempt policy: {other}")),
        }
    }
}

impl AttemptPolicy {
    /// Select the records this policy counts, preserving input order.
    pub fn select(&self, records: &[AttemptRecord]) -> Vec<AttemptRecord> {
        if *self == AttemptPolicy::All {
            return records.to_vec();
        }

        let mut chosen: HashMap<_, usize> = HashMap::new();
        for (i, record) in records.iter().enumerate() {
            let slot = chosen.entry(record.question_key()).or_insert(i);
            let current = &records[*slot];
            let rank = (record.attempt_count, record.submitted_at);
            let current_rank = (current.attempt_count, current.submitted_at);
            let replace = match self {
                AttemptPolicy::First => rank < current_rank,
                AttemptPolicy::Latest => rank > current_rank,
                AttemptPolicy::All => false,
            };
            if replace {
                *slot = i;
            }
        }

        let mut indices: Vec<usize> = chosen.into_values().collect();
        indices.sort_unstable();
        indices.into_iter().map(|i| records[i].clone()).collect()
    }
}

/// Restricts records to part of the catalog. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    #[serde(default)]
    pub exam_type: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub chapter: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &AttemptRecord) -> bool {
        fn field_ok(wanted: &Option<String>, actual: &Option<String>) -> bool {
            match wanted {
                Some(w) => actual.as_deref() == Some(w.as_str()),
                None => true,
            }
        }
        field_ok(&self.exam_type, &record.exam_type)
            && field_ok(&self.subject, &record.subject)
            && field_ok(&self.chapter, &record.chapter)
    }

    pub fn is_empty(&self) -> bool {
        self.exam_type.is_none() && self.subject.is_none() && self.chapter.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(question_id: &str, attempt_count: u32, correct: bool) -> AttemptRecord {
        AttemptRecord {
            id: Uuid::nil(),
            question_id: question_id.into(),
            exam_type: Some("JEE".into()),
            subject: Some("Physics".into()),
            chapter: Some("Mechanics".into()),
            user_id: "u1".into(),
            submitted_answer: NormalizedAnswer::Options(vec![1]),
            is_correct: correct,
            score: if correct { 4 } else { -1 },
            time_spent_seconds: Some(40),
            attempt_count,
            submitted_at: Some(
                Utc.with_ymd_and_hms(2024, 3, 1, 10, attempt_count, 0)
                    .unwrap(),
            ),
        }
    }

    #[test]
    fn kind_display_and_parse() {
        assert_eq!(QuestionKind::SingleCorrect.to_string(), "single_correct");
        assert_eq!(
            "multiple".parse::<QuestionKind>().unwrap(),
            QuestionKind::MultipleCorrect
        );
        assert_eq!(
            "Single-Correct".parse::<QuestionKind>().unwrap(),
            QuestionKind::SingleCorrect
        );
        assert_eq!(
            "integer".parse::<QuestionKind>().unwrap(),
            QuestionKind::Numerical
        );
        assert!("essay".parse::<QuestionKind>().is_err());
    }

    #[test]
    fn single_key_out_of_range_is_malformed() {
        let err = Question::new(
            "q1",
            "",
            vec!["a".into(), "b".into()],
            AnswerKey::SingleCorrect(3),
            4,
        )
        .unwrap_err();
        assert!(matches!(err, ScoringError::MalformedQuestion { .. }));
    }

    #[test]
    fn empty_multiple_key_is_malformed() {
        let err = Question::new(
            "q1",
            "",
            vec!["a".into(), "b".into()],
            AnswerKey::MultipleCorrect(BTreeSet::new()),
            4,
        )
        .unwrap_err();
        assert!(err.is_data_error());
    }

    #[test]
    fn numerical_with_options_is_malformed() {
        assert!(Question::new("q1", "", vec!["a".into()], AnswerKey::Numerical(1.0), 4).is_err());
        assert!(Question::new("q1", "", vec![], AnswerKey::Numerical(f64::NAN), 4).is_err());
        assert!(Question::new("q1", "", vec![], AnswerKey::Numerical(9.81), 4).is_ok());
    }

    #[test]
    fn parse_single_answer() {
        assert_eq!(
            SubmittedAnswer::parse("q", QuestionKind::SingleCorrect, " 2 ").unwrap(),
            SubmittedAnswer::Single(2)
        );
        assert!(matches!(
            SubmittedAnswer::parse("q", QuestionKind::SingleCorrect, "1,2"),
            Err(ScoringError::InvalidAnswerFormat { .. })
        ));
        assert!(matches!(
            SubmittedAnswer::parse("q", QuestionKind::SingleCorrect, "b"),
            Err(ScoringError::InvalidAnswerFormat { .. })
        ));
    }

    #[test]
    fn parse_multiple_answer_collapses_duplicates() {
        let answer = SubmittedAnswer::parse("q", QuestionKind::MultipleCorrect, "3, 1 3").unwrap();
        assert_eq!(answer, SubmittedAnswer::Multiple(BTreeSet::from([1, 3])));
        assert_eq!(answer.normalized(), NormalizedAnswer::Options(vec![1, 3]));
    }

    #[test]
    fn parse_blank_is_no_answer() {
        for kind in [
            QuestionKind::SingleCorrect,
            QuestionKind::MultipleCorrect,
            QuestionKind::Numerical,
        ] {
            assert!(matches!(
                SubmittedAnswer::parse("q", kind, "   "),
                Err(ScoringError::NoAnswer { .. })
            ));
        }
        assert!(matches!(
            SubmittedAnswer::parse("q", QuestionKind::MultipleCorrect, " , ,"),
            Err(ScoringError::NoAnswer { .. })
        ));
    }

    #[test]
    fn normalized_answer_serializes_untagged() {
        let options = serde_json::to_string(&NormalizedAnswer::Options(vec![1, 3])).unwrap();
        assert_eq!(options, "[1,3]");
        let numeric: NormalizedAnswer = serde_json::from_str("\"100.05\"").unwrap();
        assert_eq!(numeric, NormalizedAnswer::Numeric("100.05".into()));
    }

    #[test]
    fn record_with_missing_optional_fields_deserializes() {
        let json = r#"{
            "question_id": "q1",
            "user_id": "u1",
            "submitted_answer": [2],
            "is_correct": true,
            "score": 4
        }"#;
        let record: AttemptRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.time_spent(), 0);
        assert_eq!(record.attempt_count, 1);
        assert!(record.chapter.is_none());
        assert!(record.submitted_at.is_none());
    }

    #[test]
    fn policy_first_and_latest() {
        let records = vec![
            record("q1", 1, false),
            record("q2", 1, true),
            record("q1", 2, true),
            record("q1", 3, false),
        ];

        assert_eq!(AttemptPolicy::All.select(&records).len(), 4);

        let first = AttemptPolicy::First.select(&records);
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].question_id, "q1");
        assert_eq!(first[0].attempt_count, 1);
        assert_eq!(first[1].question_id, "q2");

        let latest = AttemptPolicy::Latest.select(&records);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].question_id, "q2");
        assert_eq!(latest[1].attempt_count, 3);
    }

    #[test]
    fn filter_excludes_records_missing_the_field() {
        let mut r = record("q1", 1, true);
        let filter = RecordFilter {
            subject: Some("Physics".into()),
            ..Default::default()
        };
        assert!(filter.matches(&r));
        r.subject = None;
        assert!(!filter.matches(&r));
        assert!(RecordFilter::default().matches(&r));
    }
}
