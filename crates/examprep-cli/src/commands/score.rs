//! The `examprep score` command.

use std::path::PathBuf;

use anyhow::Result;

use examprep_core::model::SubmittedAnswer;
use examprep_core::scoring::{evaluate, MAX_SCORE};

use super::load_question;

pub fn execute(bank_path: PathBuf, question_id: String, raw_answer: String) -> Result<()> {
    let (bank, question) = load_question(&bank_path, &question_id)?;
    let answer = SubmittedAnswer::parse(&question.id, question.kind(), &raw_answer)?;
    let evaluation = evaluate(&question, &answer)?;

    println!("{} [{}] ({})", question.id, question.kind(), bank.position);
    println!("Answer:  {}", answer.normalized());
    println!(
        "Result:  {}",
        if evaluation.is_correct {
            "correct"
        } else {
            "incorrect"
        }
    );
    println!("Score:   {:+} / {MAX_SCORE}", evaluation.score);

    Ok(())
}
