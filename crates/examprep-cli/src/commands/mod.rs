pub mod compare;
pub mod init;
pub mod progress;
pub mod score;
pub mod submit;
pub mod validate;

use std::path::Path;

use anyhow::Result;

use examprep_core::model::{Question, QuestionBank};
use examprep_core::parser::parse_bank;

/// Load a bank and look up one of its questions.
pub(crate) fn load_question(bank_path: &Path, question_id: &str) -> Result<(QuestionBank, Question)> {
    let bank = parse_bank(bank_path)?;
    let question = bank.question(question_id).cloned().ok_or_else(|| {
        anyhow::anyhow!(
            "question '{question_id}' not found in {}",
            bank_path.display()
        )
    })?;
    Ok((bank, question))
}
