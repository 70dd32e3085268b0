//! HTML report generator.
//!
//! Produces a self-contained HTML file with all CSS inlined.

use anyhow::{Context, Result};
use std::path::Path;

use examprep_core::report::ProgressReport;
use examprep_core::statistics::{BucketStats, SubjectProgress};

/// Escape a string for safe HTML insertion.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AccuracyBand {
    Good,
    Fair,
    Poor,
}

impl AccuracyBand {
    fn of(accuracy: f64) -> Self {
        if accuracy >= 80.0 {
            AccuracyBand::Good
        } else if accuracy >= 50.0 {
            AccuracyBand::Fair
        } else {
            AccuracyBand::Poor
        }
    }

    fn class(self) -> &'static str {
        match self {
            AccuracyBand::Good => "good",
            AccuracyBand::Fair => "fair",
            AccuracyBand::Poor => "poor",
        }
    }

    fn color(self) -> &'static str {
        match self {
            AccuracyBand::Good => "#22c55e",
            AccuracyBand::Fair => "#eab308",
            AccuracyBand::Poor => "#ef4444",
        }
    }
}

fn accuracy_class(accuracy: f64) -> &'static str {
    AccuracyBand::of(accuracy).class()
}

fn accuracy_color(accuracy: f64) -> &'static str {
    AccuracyBand::of(accuracy).color()
}

/// Generate an HTML page from a progress report.
pub fn generate_html(report: &ProgressReport) -> String {
    let mut html = String::new();
    let summary = &report.summary;

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!(
        "<title>examprep progress: {}</title>\n",
        html_escape(&report.user_id)
    ));
    html.push_str("<style>\n");
    html.push_str(CSS);
    html.push_str("</style>\n");
    html.push_str("</head>\n<body>\n");

    html.push_str("<header>\n");
    html.push_str("<h1>examprep progress</h1>\n");
    html.push_str(&format!(
        "<p class=\"meta\">User: <strong>{}</strong> | {} attempts | {:.1}% correct | policy: {} | {}</p>\n",
        html_escape(&report.user_id),
        summary.tally.total,
        summary.tally.accuracy(),
        report.policy,
        report.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    html.push_str(&format!(
        "<p class=\"meta\">Total score: {} | Current streak: {} days | Longest streak: {} days</p>\n",
        report.total_score, report.current_streak, report.longest_streak
    ));
    html.push_str("</header>\n");

    // Catalog breakdown
    html.push_str("<section class=\"catalog\">\n");
    html.push_str("<h2>By exam, subject and chapter</h2>\n");
    if summary.exams.is_empty() {
        html.push_str("<p>No attempts yet.</p>\n");
    }
    for (exam, exam_progress) in &summary.exams {
        html.push_str(&format!(
            "<h3>{} <span class=\"meta\">{}/{} correct</span></h3>\n",
            html_escape(exam),
            exam_progress.tally.correct,
            exam_progress.tally.total
        ));
        html.push_str("<table>\n");
        html.push_str("<thead><tr><th>Subject</th><th>Chapter</th><th>Attempts</th><th>Correct</th><th>Accuracy</th></tr></thead>\n");
        html.push_str("<tbody>\n");
        for (subject, subject_progress) in &exam_progress.subjects {
            for (chapter, tally) in &subject_progress.chapters {
                let accuracy = tally.accuracy();
                html.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td class=\"{}\">{:.1}%</td></tr>\n",
                    html_escape(subject),
                    html_escape(chapter),
                    tally.total,
                    tally.correct,
                    accuracy_class(accuracy),
                    accuracy
                ));
            }
        }
        html.push_str("</tbody></table>\n");

        for (subject, subject_progress) in &exam_progress.subjects {
            if !subject_progress.chapters.is_empty() {
                html.push_str(&format!("<h4>{}</h4>\n", html_escape(subject)));
                html.push_str(&generate_bar_chart(subject_progress));
            }
        }
    }
    html.push_str("</section>\n");

    // Daily activity
    html.push_str("<section class=\"timeline\">\n");
    html.push_str("<h2>Daily activity</h2>\n");
    html.push_str("<table>\n");
    html.push_str("<thead><tr><th>Date</th><th>Attempts</th><th>Correct</th><th>Accuracy</th><th>Minutes</th></tr></thead>\n");
    html.push_str("<tbody>\n");
    for point in &report.time_series {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"{}\">{:.1}%</td><td>{:.1}</td></tr>\n",
            point.date,
            point.total_attempts,
            point.correct_attempts,
            accuracy_class(point.accuracy_percent),
            point.accuracy_percent,
            point.time_spent_minutes
        ));
    }
    html.push_str("</tbody></table>\n");
    html.push_str("</section>\n");

    html.push_str("<section class=\"buckets\">\n");
    html.push_str(&bucket_table("Time per question", &report.time_spent));
    html.push_str(&bucket_table("Attempt number", &report.attempt_counts));
    html.push_str(&bucket_table("Day of week", &report.day_of_week));
    html.push_str(&bucket_table("Hour of day", &report.hour_of_day));
    html.push_str("</section>\n");

    html.push_str("<section class=\"buckets\">\n");
    html.push_str("<h2>Daily score distribution</h2>\n");
    html.push_str("<table>\n<thead><tr><th>Score</th><th>Days</th></tr></thead>\n<tbody>\n");
    for b in &report.score_distribution {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td></tr>\n",
            html_escape(&b.label),
            b.tally.total
        ));
    }
    html.push_str("</tbody></table>\n</section>\n");

    // Raw JSON
    html.push_str("<section class=\"raw-data\">\n");
    html.push_str("<details>\n<summary>Raw JSON Data</summary>\n");
    html.push_str("<pre><code>");
    html.push_str(&html_escape(
        &serde_json::to_string_pretty(report).unwrap_or_default(),
    ));
    html.push_str("</code></pre>\n");
    html.push_str("</details>\n</section>\n");

    html.push_str("</body>\n</html>");
    html
}

/// Write an HTML report to a file.
pub fn write_html_report(report: &ProgressReport, path: &Path) -> Result<()> {
    let html = generate_html(report);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, html)
        .with_context(|| format!("failed to write HTML report to {}", path.display()))?;
    Ok(())
}

fn bucket_table(title: &str, buckets: &[BucketStats]) -> String {
    let mut table = format!("<h2>{}</h2>\n<table>\n", html_escape(title));
    table.push_str("<thead><tr><th>Bucket</th><th>Attempts</th><th>Correct</th><th>Accuracy</th></tr></thead>\n<tbody>\n");
    for b in buckets.iter().filter(|b| b.tally.total > 0) {
        table.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{:.1}%</td></tr>\n",
            html_escape(&b.label),
            b.tally.total,
            b.tally.correct,
            b.accuracy()
        ));
    }
    table.push_str("</tbody></table>\n");
    table
}

/// Horizontal accuracy bars, one per chapter of a subject.
fn generate_bar_chart(subject: &SubjectProgress) -> String {
    let bar_height = 24;
    let max_width = 400;
    let padding = 8;
    let label_width = 220;

    let total_height = subject.chapters.len() * (bar_height + padding) + padding;

    let mut svg = format!(
        "<svg width=\"{}\" height=\"{}\" xmlns=\"http://www.w3.org/2000/svg\">\n",
        label_width + max_width + 60,
        total_height
    );

    for (i, (chapter, tally)) in subject.chapters.iter().enumerate() {
        let y = i * (bar_height + padding) + padding;
        let accuracy = tally.accuracy();
        let width = (accuracy / 100.0 * max_width as f64) as usize;

        let color = accuracy_color(accuracy);

        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"13\" fill=\"currentColor\" text-anchor=\"end\" dominant-baseline=\"middle\">{}</text>\n",
            label_width - 10,
            y + bar_height / 2,
            html_escape(chapter)
        ));
        svg.push_str(&format!(
            "  <rect x=\"{}\" y=\"{}\" width=\"{}\" height=\"{}\" fill=\"{}\" rx=\"4\"/>\n",
            label_width, y, width, bar_height, color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" font-size=\"12\" fill=\"currentColor\" dominant-baseline=\"middle\">{:.1}%</text>\n",
            label_width + width + 8,
            y + bar_height / 2,
            accuracy
        ));
    }

    svg.push_str("</svg>\n");
    svg
}

const CSS: &str = r#"
:root { --bg: #fff; --fg: #1a1a1a; --border: #e5e7eb; --good: #dcfce7; --fair: #fef9c3; --poor: #fde2e2; }
@media (prefers-color-scheme: dark) {
  :root { --bg: #111827; --fg: #f9fafb; --border: #374151; --good: #064e3b; --fair: #713f12; --poor: #7f1d1d; }
}
body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; margin: 0; padding: 2rem; background: var(--bg); color: var(--fg); }
h1, h2 { margin-top: 2rem; }
.meta { color: #6b7280; font-weight: normal; }
table { border-collapse: collapse; width: 100%; margin: 1rem 0; }
th, td { border: 1px solid var(--border); padding: 0.5rem 1rem; text-align: left; }
th { background: var(--border); }
.good { background: var(--good); }
.fair { background: var(--fair); }
.poor { background: var(--poor); }
pre { overflow-x: auto; padding: 1rem; background: var(--border); border-radius: 8px; }
code { font-family: 'JetBrains Mono', 'Fira Code', monospace; font-size: 0.85rem; }
details { margin: 1rem 0; }
summary { cursor: pointer; font-weight: bold; }
svg { margin: 0.5rem 0; }
"#;
