//! TOML question-bank parser.
//!
//! Loads question banks from TOML files and directories, and validates them.
//! Answer keys arrive loosely typed (a bare index, an index array, a float,
//! or a numeric string); they are converted here into `AnswerKey` according
//! to the declared question kind.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::ScoringError;
use crate::model::{AnswerKey, CatalogPosition, Question, QuestionBank, QuestionKind};

/// Intermediate TOML structure for parsing bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    exam_type: String,
    subject: String,
    chapter: String,
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    kind: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    options: Vec<String>,
    answer_key: RawAnswerKey,
    #[serde(default = "default_difficulty")]
    difficulty_level: u8,
}

fn default_difficulty() -> u8 {
    5
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAnswerKey {
    Index(i64),
    Indices(Vec<i64>),
    Value(f64),
    Text(String),
}

fn to_index(question_id: &str, raw: i64) -> Result<u32, ScoringError> {
    u32::try_from(raw)
        .ok()
        .filter(|&i| i >= 1)
        .ok_or_else(|| ScoringError::malformed(question_id, format!("invalid option index {raw}")))
}

fn parse_index_list(question_id: &str, text: &str) -> Result<Vec<u32>, ScoringError> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| {
            let raw: i64 = t.parse().map_err(|_| {
                ScoringError::malformed(question_id, format!("invalid option index {t:?}"))
            })?;
            to_index(question_id, raw)
        })
        .collect()
}

fn answer_key_from_raw(
    question_id: &str,
    kind: QuestionKind,
    raw: RawAnswerKey,
) -> Result<AnswerKey, ScoringError> {
    let mismatch = |shape: &str| {
        ScoringError::malformed(question_id, format!("{shape} answer key for a {kind} question"))
    };

    match kind {
        QuestionKind::SingleCorrect => {
            let indices = match raw {
                RawAnswerKey::Index(i) => vec![to_index(question_id, i)?],
                RawAnswerKey::Indices(v) => v
                    .into_iter()
                    .map(|i| to_index(question_id, i))
                    .collect::<Result<_, _>>()?,
                RawAnswerKey::Text(s) => parse_index_list(question_id, &s)?,
                RawAnswerKey::Value(_) => return Err(mismatch("decimal")),
            };
            match indices.as_slice() {
                [only] => Ok(AnswerKey::SingleCorrect(*only)),
                other => Err(ScoringError::malformed(
                    question_id,
                    format!(
                        "single-correct key needs exactly one option, got {}",
                        other.len()
                    ),
                )),
            }
        }
        QuestionKind::MultipleCorrect => {
            let indices = match raw {
                RawAnswerKey::Index(i) => vec![to_index(question_id, i)?],
                RawAnswerKey::Indices(v) => v
                    .into_iter()
                    .map(|i| to_index(question_id, i))
                    .collect::<Result<_, _>>()?,
                RawAnswerKey::Text(s) => parse_index_list(question_id, &s)?,
                RawAnswerKey::Value(_) => return Err(mismatch("decimal")),
            };
            let set: BTreeSet<u32> = indices.iter().copied().collect();
            if set.len() != indices.len() {
                return Err(ScoringError::malformed(
                    question_id,
                    "multiple-correct key lists an option twice",
                ));
            }
            Ok(AnswerKey::MultipleCorrect(set))
        }
        QuestionKind::Numerical => match raw {
            RawAnswerKey::Value(v) => Ok(AnswerKey::Numerical(v)),
            RawAnswerKey::Index(i) => Ok(AnswerKey::Numerical(i as f64)),
            RawAnswerKey::Text(s) => s.trim().parse::<f64>().map(AnswerKey::Numerical).map_err(|_| {
                ScoringError::malformed(question_id, format!("reference value {s:?} is not a number"))
            }),
            RawAnswerKey::Indices(_) => Err(mismatch("list")),
        },
    }
}

/// Parse a single TOML file into a `QuestionBank`.
pub fn parse_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse a TOML string into a `QuestionBank` (useful for testing).
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| {
            let kind: QuestionKind = q
                .kind
                .parse()
                .map_err(|e: String| anyhow::anyhow!("question {}: {}", q.id, e))?;
            let answer_key = answer_key_from_raw(&q.id, kind, q.answer_key)?;
            let question = Question::new(q.id, q.text, q.options, answer_key, q.difficulty_level)?;
            Ok(question)
        })
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("invalid question in {}", source_path.display()))?;

    Ok(QuestionBank {
        position: CatalogPosition {
            exam_type: parsed.bank.exam_type,
            subject: parsed.bank.subject,
            chapter: parsed.bank.chapter,
        },
        questions,
    })
}

/// Recursively load all `.toml` question banks from a directory.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();

    for path in paths {
        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// A warning from question-bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The question ID (if applicable).
    pub question_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a question bank for issues that do not block scoring.
pub fn validate_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if bank.questions.is_empty() {
        warnings.push(ValidationWarning {
            question_id: None,
            message: "bank has no questions".into(),
        });
    }

    // Ids only need to be unique within the chapter
    let mut seen_ids = std::collections::HashSet::new();
    for q in &bank.questions {
        if !seen_ids.insert(&q.id) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: format!("duplicate question ID: {}", q.id),
            });
        }
    }

    for q in &bank.questions {
        if !(1..=10).contains(&q.difficulty_level) {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: format!("difficulty_level {} outside 1-10", q.difficulty_level),
            });
        }

        if q.text.trim().is_empty() {
            warnings.push(ValidationWarning {
                question_id: Some(q.id.clone()),
                message: "question text is empty".into(),
            });
        }

        match &q.answer_key {
            AnswerKey::SingleCorrect(_) | AnswerKey::MultipleCorrect(_) if q.options.len() < 2 => {
                warnings.push(ValidationWarning {
                    question_id: Some(q.id.clone()),
                    message: format!("only {} option(s)", q.options.len()),
                });
            }
            AnswerKey::MultipleCorrect(correct) if correct.len() == q.options.len() => {
                warnings.push(ValidationWarning {
                    question_id: Some(q.id.clone()),
                    message: "every option is marked correct".into(),
                });
            }
            _ => {}
        }
    }

    warnings
}
