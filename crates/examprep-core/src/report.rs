//! Progress report types with JSON persistence and regression detection.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{AttemptPolicy, AttemptRecord, RecordFilter};
use crate::scoring::normalize_score;
use crate::statistics::{
    bucket_by_attempt_count, bucket_by_day_of_week, bucket_by_hour_of_day, bucket_by_time_spent,
    current_streak, longest_streak, score_distribution, summarize, time_series, BucketStats,
    DailyPoint, ProgressSummary,
};

/// A complete progress report for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Unique report identifier.
    pub id: Uuid,
    /// When the report was created.
    pub created_at: DateTime<Utc>,
    /// Whose attempts were aggregated.
    pub user_id: String,
    /// Which attempts counted.
    pub policy: AttemptPolicy,
    /// Catalog restriction applied before aggregation.
    #[serde(default)]
    pub filter: RecordFilter,
    /// Zone used for day and hour grouping, in minutes east of UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Exam / subject / chapter roll-up.
    pub summary: ProgressSummary,
    /// One point per active day.
    pub time_series: Vec<DailyPoint>,
    pub time_spent: Vec<BucketStats>,
    pub attempt_counts: Vec<BucketStats>,
    pub hour_of_day: Vec<BucketStats>,
    pub day_of_week: Vec<BucketStats>,
    /// Distribution of daily scores on a 0–100 scale.
    pub score_distribution: Vec<BucketStats>,
    /// Sum of all awarded points.
    pub total_score: i64,
    pub longest_streak: u32,
    pub current_streak: u32,
}

impl ProgressReport {
    /// Aggregate a snapshot of records that has already been filtered and
    /// reduced by `policy`.
    pub fn build(
        user_id: &str,
        policy: AttemptPolicy,
        filter: RecordFilter,
        records: &[AttemptRecord],
        offset: FixedOffset,
        now: DateTime<Utc>,
    ) -> Self {
        let today = now.with_timezone(&offset).date_naive();

        ProgressReport {
            id: Uuid::new_v4(),
            created_at: now,
            user_id: user_id.to_string(),
            policy,
            filter,
            utc_offset_minutes: offset.local_minus_utc() / 60,
            summary: summarize(records),
            time_series: time_series(records, offset),
            time_spent: bucket_by_time_spent(records),
            attempt_counts: bucket_by_attempt_count(records),
            hour_of_day: bucket_by_hour_of_day(records, offset),
            day_of_week: bucket_by_day_of_week(records, offset),
            score_distribution: score_distribution(&daily_scores(records, offset)),
            total_score: records.iter().map(|r| r.score as i64).sum(),
            longest_streak: longest_streak(records, offset),
            current_streak: current_streak(records, today, offset),
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: ProgressReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the catalog breakdown and daily activity as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let tally = self.summary.tally;

        md.push_str(&format!("## Progress for {}\n\n", self.user_id));
        md.push_str(&format!(
            "**Summary:** {} attempts, {} correct ({:.1}%), score {}, streak {} (best {})\n\n",
            tally.total,
            tally.correct,
            tally.accuracy(),
            self.total_score,
            self.current_streak,
            self.longest_streak
        ));

        if tally.total == 0 {
            md.push_str("No attempts yet.\n");
            return md;
        }

        md.push_str("| Exam | Subject | Chapter | Attempts | Accuracy |\n");
        md.push_str("|------|---------|---------|----------|----------|\n");
        for (exam, subject, chapter, t) in self.summary.chapters() {
            md.push_str(&format!(
                "| {exam} | {subject} | {chapter} | {} | {:.1}% |\n",
                t.total,
                t.accuracy()
            ));
        }

        if !self.time_series.is_empty() {
            md.push_str("\n### Daily activity\n\n");
            md.push_str("| Date | Attempts | Accuracy | Minutes |\n");
            md.push_str("|------|----------|----------|---------|\n");
            for p in &self.time_series {
                md.push_str(&format!(
                    "| {} | {} | {:.1}% | {:.1} |\n",
                    p.date, p.total_attempts, p.accuracy_percent, p.time_spent_minutes
                ));
            }
        }

        md
    }

    /// Compare chapter accuracy against a baseline report.
    ///
    /// `threshold` is a fraction: 0.05 flags changes of more than five
    /// percentage points.
    pub fn compare(&self, baseline: &ProgressReport, threshold: f64) -> RegressionReport {
        let accuracy_map = |report: &ProgressReport| -> HashMap<ChapterKey, f64> {
            report
                .summary
                .chapters()
                .map(|(exam, subject, chapter, tally)| {
                    let key = ChapterKey {
                        exam_type: exam.to_string(),
                        subject: subject.to_string(),
                        chapter: chapter.to_string(),
                    };
                    (key, tally.accuracy() / 100.0)
                })
                .collect()
        };

        let baseline_scores = accuracy_map(baseline);
        let current_scores = accuracy_map(self);

        let mut regressions = Vec::new();
        let mut improvements = Vec::new();
        let mut unchanged = 0usize;
        let mut new_chapters = 0usize;

        for (key, &current) in &current_scores {
            if let Some(&baseline_val) = baseline_scores.get(key) {
                let delta = current - baseline_val;
                let change = ChapterChange {
                    chapter: key.clone(),
                    baseline_accuracy: baseline_val,
                    current_accuracy: current,
                    delta,
                };
                if delta < -threshold {
                    regressions.push(change);
                } else if delta > threshold {
                    improvements.push(change);
                } else {
                    unchanged += 1;
                }
            } else {
                new_chapters += 1;
            }
        }

        let removed_chapters = baseline_scores
            .keys()
            .filter(|k| !current_scores.contains_key(k))
            .count();

        regressions.sort_by(|a, b| a.chapter.cmp(&b.chapter));
        improvements.sort_by(|a, b| a.chapter.cmp(&b.chapter));

        RegressionReport {
            regressions,
            improvements,
            unchanged,
            new_chapters,
            removed_chapters,
        }
    }
}

/// Normalized score of each active day, in date order.
fn daily_scores(records: &[AttemptRecord], offset: FixedOffset) -> Vec<f64> {
    let mut days: BTreeMap<_, (i32, usize)> = BTreeMap::new();
    for r in records {
        let Some(ts) = &r.submitted_at else { continue };
        let (score, count) = days.entry(ts.with_timezone(&offset).date_naive()).or_default();
        *score += r.score;
        *count += 1;
    }
    days.into_values()
        .map(|(score, count)| normalize_score(score, count))
        .collect()
}

/// Identifies a chapter across reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChapterKey {
    pub exam_type: String,
    pub subject: String,
    pub chapter: String,
}

impl std::fmt::Display for ChapterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} / {} / {}", self.exam_type, self.subject, self.chapter)
    }
}

/// Result of comparing two reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionReport {
    /// Chapters where accuracy went down.
    pub regressions: Vec<ChapterChange>,
    /// Chapters where accuracy went up.
    pub improvements: Vec<ChapterChange>,
    /// Chapters with no significant change.
    pub unchanged: usize,
    /// Chapters in current but not baseline.
    pub new_chapters: usize,
    /// Chapters in baseline but not current.
    pub removed_chapters: usize,
}

/// An accuracy change in one chapter. Accuracies are fractions 0–1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterChange {
    pub chapter: ChapterKey,
    pub baseline_accuracy: f64,
    pub current_accuracy: f64,
    pub delta: f64,
}

impl RegressionReport {
    /// Format the regression report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!(
            "**Summary:** {} regressions, {} improvements, {} unchanged\n\n",
            self.regressions.len(),
            self.improvements.len(),
            self.unchanged
        ));

        for (title, changes) in [
            ("Regressions", &self.regressions),
            ("Improvements", &self.improvements),
        ] {
            if changes.is_empty() {
                continue;
            }
            md.push_str(&format!("### {title}\n\n"));
            md.push_str("| Chapter | Baseline | Current | Delta |\n");
            md.push_str("|---------|----------|---------|-------|\n");
            for c in changes {
                md.push_str(&format!(
                    "| {} | {:.1}% | {:.1}% | {:+.1}% |\n",
                    c.chapter,
                    c.baseline_accuracy * 100.0,
                    c.current_accuracy * 100.0,
                    c.delta * 100.0
                ));
            }
            md.push('\n');
        }

        md
    }

    /// Returns true if there are any regressions.
    pub fn has_regressions(&self) -> bool {
        !self.regressions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NormalizedAnswer;
    use chrono::TimeZone;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 8, 18, 0, 0).unwrap()
    }

    fn attempt(chapter: &str, correct: bool, day: u32) -> AttemptRecord {
        AttemptRecord {
            id: Uuid::nil(),
            question_id: format!("{chapter}-q"),
            exam_type: Some("JEE Main".into()),
            subject: Some("Physics".into()),
            chapter: Some(chapter.into()),
            user_id: "u1".into(),
            submitted_answer: NormalizedAnswer::Options(vec![1]),
            is_correct: correct,
            score: if correct { 4 } else { -1 },
            time_spent_seconds: Some(90),
            attempt_count: 1,
            submitted_at: Some(Utc.with_ymd_and_hms(2024, 5, day, 9, 0, 0).unwrap()),
        }
    }

    fn make_report(records: &[AttemptRecord]) -> ProgressReport {
        ProgressReport::build("u1", AttemptPolicy::All, RecordFilter::default(), records, utc(), now())
    }

    #[test]
    fn build_from_empty_records() {
        let report = make_report(&[]);
        assert_eq!(report.summary.tally.total, 0);
        assert!(report.time_series.is_empty());
        assert_eq!(report.time_spent.len(), 5);
        assert_eq!(report.score_distribution.len(), 5);
        assert_eq!(report.longest_streak, 0);
        assert_eq!(report.current_streak, 0);
        assert_eq!(report.total_score, 0);
    }

    #[test]
    fn build_fills_every_section() {
        let records = vec![
            attempt("Mechanics", true, 7),
            attempt("Mechanics", false, 7),
            attempt("Optics", true, 8),
        ];
        let report = make_report(&records);
        assert_eq!(report.summary.tally.total, 3);
        assert_eq!(report.time_series.len(), 2);
        assert_eq!(report.total_score, 7);
        assert_eq!(report.longest_streak, 2);
        assert_eq!(report.current_streak, 2);
        // Day 7 scores 3/8 = 37.5, day 8 scores 4/4 = 100.
        let totals: Vec<u64> = report.score_distribution.iter().map(|b| b.tally.total).collect();
        assert_eq!(totals, vec![0, 1, 0, 0, 1]);
    }

    #[test]
    fn compare_identical_reports() {
        let records = vec![attempt("Mechanics", true, 7)];
        let baseline = make_report(&records);
        let current = make_report(&records);

        let report = current.compare(&baseline, 0.05);
        assert!(report.regressions.is_empty());
        assert!(report.improvements.is_empty());
        assert_eq!(report.unchanged, 1);
    }

    #[test]
    fn compare_with_regression_and_improvement() {
        let baseline = make_report(&[attempt("Mechanics", true, 7), attempt("Optics", false, 7)]);
        let current = make_report(&[attempt("Mechanics", false, 8), attempt("Optics", true, 8)]);

        let report = current.compare(&baseline, 0.05);
        assert_eq!(report.regressions.len(), 1);
        assert_eq!(report.regressions[0].chapter.chapter, "Mechanics");
        assert!((report.regressions[0].delta + 1.0).abs() < 1e-9);
        assert_eq!(report.improvements.len(), 1);
        assert!(report.has_regressions());
    }

    #[test]
    fn compare_with_new_and_removed() {
        let baseline = make_report(&[attempt("Waves", true, 7)]);
        let current = make_report(&[attempt("Optics", true, 7)]);

        let report = current.compare(&baseline, 0.05);
        assert_eq!(report.new_chapters, 1);
        assert_eq!(report.removed_chapters, 1);
    }

    #[test]
    fn json_roundtrip() {
        let report = make_report(&[attempt("Mechanics", true, 7)]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/report.json");

        report.save_json(&path).unwrap();
        let loaded = ProgressReport::load_json(&path).unwrap();

        assert_eq!(loaded.user_id, "u1");
        assert_eq!(loaded.summary, report.summary);
        assert_eq!(loaded.time_series, report.time_series);
    }

    #[test]
    fn progress_markdown() {
        let report = make_report(&[attempt("Mechanics", true, 7), attempt("Optics", false, 8)]);
        let md = report.to_markdown();
        assert!(md.contains("2 attempts, 1 correct (50.0%)"));
        assert!(md.contains("| JEE Main | Physics | Optics | 1 | 0.0% |"));
        assert!(md.contains("| 2024-05-07 | 1 | 100.0% | 1.5 |"));

        assert!(make_report(&[]).to_markdown().contains("No attempts yet."));
    }

    #[test]
    fn markdown_output() {
        let baseline = make_report(&[attempt("Mechanics", true, 7)]);
        let current = make_report(&[attempt("Mechanics", false, 7)]);

        let md = current.compare(&baseline, 0.05).to_markdown();
        assert!(md.contains("Regressions"));
        assert!(md.contains("JEE Main / Physics / Mechanics"));
        assert!(md.contains("-100.0%"));
    }
}
