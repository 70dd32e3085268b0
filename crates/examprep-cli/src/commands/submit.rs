//! The `examprep submit` command.

use std::path::PathBuf;

use anyhow::Result;

use examprep_core::engine::{SubmissionService, SubmitRequest};
use examprep_core::model::RecordFilter;
use examprep_core::scoring::MAX_SCORE;
use examprep_store::{create_store, load_config_from};

use super::load_question;

pub async fn execute(
    bank_path: PathBuf,
    question_id: String,
    raw_answer: String,
    time_spent: Option<u64>,
    user: Option<String>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let user_id = user.unwrap_or_else(|| config.default_user.clone());
    anyhow::ensure!(!user_id.trim().is_empty(), "user id must not be empty");

    let (bank, question) = load_question(&bank_path, &question_id)?;

    let store = create_store(&config.store);
    let service = SubmissionService::new(store, config.service_config()?);

    let record = service
        .submit(SubmitRequest {
            user_id: &user_id,
            position: &bank.position,
            question: &question,
            raw_answer: &raw_answer,
            time_spent_seconds: time_spent,
        })
        .await?;

    println!(
        "{} {} ({:+} / {MAX_SCORE}), attempt {}",
        record.question_id,
        if record.is_correct {
            "correct"
        } else {
            "incorrect"
        },
        record.score,
        record.attempt_count
    );

    let chapter = RecordFilter {
        exam_type: Some(bank.position.exam_type.clone()),
        subject: Some(bank.position.subject.clone()),
        chapter: Some(bank.position.chapter.clone()),
    };
    let report = service.progress(&user_id, &chapter).await?;
    let tally = report.summary.tally;
    println!(
        "{}: {}/{} correct ({:.1}%)",
        bank.position,
        tally.correct,
        tally.total,
        tally.accuracy()
    );

    Ok(())
}
