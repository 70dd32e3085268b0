//! The `examprep progress` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examprep_core::engine::SubmissionService;
use examprep_core::model::{AttemptPolicy, RecordFilter};
use examprep_core::report::ProgressReport;
use examprep_core::statistics::BucketStats;
use examprep_store::{create_store, load_config_from};

pub async fn execute(
    user: Option<String>,
    filter: RecordFilter,
    policy: Option<String>,
    format: String,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let user_id = user.unwrap_or_else(|| config.default_user.clone());
    let policy = match policy {
        Some(p) => p.parse::<AttemptPolicy>().map_err(anyhow::Error::msg)?,
        None => config.attempt_policy,
    };
    let output = output.unwrap_or_else(|| config.output_dir.clone());

    let store = create_store(&config.store);
    let service = SubmissionService::new(store, config.service_config()?);
    tracing::debug!(
        user = %user_id,
        %policy,
        store = service.store_name(),
        "building progress report"
    );
    let report = service
        .progress_at(&user_id, &filter, policy, chrono::Utc::now())
        .await?;

    let formats: Vec<&str> = if format == "all" {
        vec!["text", "json", "html"]
    } else {
        format.split(',').map(str::trim).collect()
    };

    let timestamp = report.created_at.format("%Y-%m-%dT%H%M%S");
    for fmt in &formats {
        match *fmt {
            "text" => print_text(&report),
            "markdown" | "md" => println!("{}", report.to_markdown()),
            "json" => {
                let path = output.join(format!("progress-{timestamp}.json"));
                report.save_json(&path)?;
                eprintln!("Report saved to: {}", path.display());
            }
            "html" => {
                let path = output.join(format!("progress-{timestamp}.html"));
                examprep_report::write_html_report(&report, &path)?;
                eprintln!("HTML report: {}", path.display());
            }
            other => anyhow::bail!("unknown format: {other}"),
        }
    }

    Ok(())
}

fn print_text(report: &ProgressReport) {
    let tally = report.summary.tally;
    println!(
        "Progress for {} (policy: {}): {} attempts, {} correct ({:.1}%), score {}",
        report.user_id,
        report.policy,
        tally.total,
        tally.correct,
        tally.accuracy(),
        report.total_score
    );
    println!(
        "Streak: {} day(s), longest {} day(s)",
        report.current_streak, report.longest_streak
    );

    if tally.total == 0 {
        println!("No attempts yet.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["Exam", "Subject", "Chapter", "Attempts", "Correct", "Accuracy"]);
    for (exam, subject, chapter, t) in report.summary.chapters() {
        table.add_row(vec![
            Cell::new(exam),
            Cell::new(subject),
            Cell::new(chapter),
            Cell::new(t.total),
            Cell::new(t.correct),
            Cell::new(format!("{:.1}%", t.accuracy())),
        ]);
    }
    println!("\n{table}");

    if !report.time_series.is_empty() {
        let mut daily = Table::new();
        daily.set_header(vec!["Date", "Attempts", "Accuracy", "Minutes"]);
        for p in &report.time_series {
            daily.add_row(vec![
                Cell::new(p.date),
                Cell::new(p.total_attempts),
                Cell::new(format!("{:.1}%", p.accuracy_percent)),
                Cell::new(format!("{:.1}", p.time_spent_minutes)),
            ]);
        }
        println!("\n{daily}");
    }

    println!("\n{}", bucket_table("Time per question", &report.time_spent));
    println!("\n{}", bucket_table("Attempt", &report.attempt_counts));
    println!("\n{}", bucket_table("Day", &report.day_of_week));
}

fn bucket_table(header: &str, buckets: &[BucketStats]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header, "Attempts", "Accuracy"]);
    for b in buckets {
        table.add_row(vec![
            Cell::new(&b.label),
            Cell::new(b.tally.total),
            Cell::new(format!("{:.1}%", b.accuracy())),
        ]);
    }
    table
}
