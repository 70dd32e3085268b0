//! Progress aggregation over attempt records.
//!
//! Every function here is total over the empty input: no records means
//! zero tallies and zero-filled buckets, never an error. Accuracy is kept
//! as an unrounded percentage; rounding happens where it is displayed.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::model::AttemptRecord;

/// A count of attempts and how many were correct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub total: u64,
    pub correct: u64,
}

impl Tally {
    pub fn record(&mut self, is_correct: bool) {
        self.total += 1;
        if is_correct {
            self.correct += 1;
        }
    }

    /// Correct share as a percentage, 0 when there are no attempts.
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64 * 100.0
        }
    }
}

impl std::ops::Add for Tally {
    type Output = Tally;

    fn add(self, other: Tally) -> Tally {
        Tally {
            total: self.total + other.total,
            correct: self.correct + other.correct,
        }
    }
}

impl std::iter::Sum for Tally {
    fn sum<I: Iterator<Item = Tally>>(iter: I) -> Tally {
        iter.fold(Tally::default(), |acc, t| acc + t)
    }
}

// ---------------------------------------------------------------------------
// Catalog summary
// ---------------------------------------------------------------------------

/// Progress within one subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectProgress {
    #[serde(flatten)]
    pub tally: Tally,
    pub chapters: BTreeMap<String, Tally>,
}

/// Progress within one exam.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamProgress {
    #[serde(flatten)]
    pub tally: Tally,
    pub subjects: BTreeMap<String, SubjectProgress>,
}

/// Exam → subject → chapter roll-up of a set of attempts.
///
/// `tally` counts every record. A record missing its exam type is left
/// out of `exams`; one missing its subject or chapter stops at the level
/// above.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    #[serde(flatten)]
    pub tally: Tally,
    pub exams: BTreeMap<String, ExamProgress>,
}

impl ProgressSummary {
    /// Completion percentage at exam, subject, or chapter granularity.
    ///
    /// Computed from the summed counts at that level, so chapters weigh in
    /// by how many questions were attempted. Unknown keys yield 0.
    pub fn completion(&self, exam: &str, subject: Option<&str>, chapter: Option<&str>) -> f64 {
        self.tally_at(exam, subject, chapter)
            .map(|t| t.accuracy())
            .unwrap_or(0.0)
    }

    /// The tally at a given catalog position, if any attempts landed there.
    pub fn tally_at(&self, exam: &str, subject: Option<&str>, chapter: Option<&str>) -> Option<Tally> {
        let exam_progress = self.exams.get(exam)?;
        let Some(subject) = subject else {
            return Some(exam_progress.tally);
        };
        let subject_progress = exam_progress.subjects.get(subject)?;
        match chapter {
            Some(chapter) => subject_progress.chapters.get(chapter).copied(),
            None => Some(subject_progress.tally),
        }
    }

    /// Iterate `(exam, subject, chapter, tally)` over every chapter.
    pub fn chapters(&self) -> impl Iterator<Item = (&str, &str, &str, &Tally)> {
        self.exams.iter().flat_map(|(exam, e)| {
            e.subjects.iter().flat_map(move |(subject, s)| {
                s.chapters
                    .iter()
                    .map(move |(chapter, t)| (exam.as_str(), subject.as_str(), chapter.as_str(), t))
            })
        })
    }
}

/// Build the exam → subject → chapter summary.
pub fn summarize(records: &[AttemptRecord]) -> ProgressSummary {
    let mut summary = ProgressSummary::default();

    for r in records {
        summary.tally.record(r.is_correct);

        let Some(exam) = &r.exam_type else { continue };
        let exam_progress = summary.exams.entry(exam.clone()).or_default();
        exam_progress.tally.record(r.is_correct);

        let Some(subject) = &r.subject else { continue };
        let subject_progress = exam_progress.subjects.entry(subject.clone()).or_default();
        subject_progress.tally.record(r.is_correct);

        let Some(chapter) = &r.chapter else { continue };
        subject_progress
            .chapters
            .entry(chapter.clone())
            .or_default()
            .record(r.is_correct);
    }

    summary
}

// ---------------------------------------------------------------------------
// Time series and streaks
// ---------------------------------------------------------------------------

/// Attempts on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub total_attempts: u64,
    pub correct_attempts: u64,
    pub accuracy_percent: f64,
    pub time_spent_minutes: f64,
}

fn local_date(ts: &DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    ts.with_timezone(&offset).date_naive()
}

/// Daily buckets in ascending date order. Days without attempts are
/// omitted, so consecutive points need not be consecutive days.
pub fn time_series(records: &[AttemptRecord], offset: FixedOffset) -> Vec<DailyPoint> {
    let mut days: BTreeMap<NaiveDate, (Tally, u64)> = BTreeMap::new();

    for r in records {
        let Some(ts) = &r.submitted_at else { continue };
        let (tally, seconds) = days.entry(local_date(ts, offset)).or_default();
        tally.record(r.is_correct);
        *seconds += r.time_spent();
    }

    days.into_iter()
        .map(|(date, (tally, seconds))| DailyPoint {
            date,
            total_attempts: tally.total,
            correct_attempts: tally.correct,
            accuracy_percent: tally.accuracy(),
            time_spent_minutes: seconds as f64 / 60.0,
        })
        .collect()
}

fn active_days(records: &[AttemptRecord], offset: FixedOffset) -> BTreeSet<NaiveDate> {
    records
        .iter()
        .filter_map(|r| r.submitted_at.as_ref())
        .map(|ts| local_date(ts, offset))
        .collect()
}

/// Longest run of consecutive calendar days with at least one attempt.
pub fn longest_streak(records: &[AttemptRecord], offset: FixedOffset) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for day in active_days(records, offset) {
        run = match previous {
            Some(prev) if (day - prev).num_days() == 1 => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }

    longest
}

/// Length of the run ending today, or yesterday if nothing was attempted
/// today yet. Zero when neither day has attempts.
pub fn current_streak(records: &[AttemptRecord], today: NaiveDate, offset: FixedOffset) -> u32 {
    let days = active_days(records, offset);
    let mut cursor = if days.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        match cursor.pred_opt() {
            Some(prev) => cursor = prev,
            None => break,
        }
    }
    streak
}

// ---------------------------------------------------------------------------
// Buckets
// ---------------------------------------------------------------------------

/// One labelled bucket of a grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketStats {
    pub label: String,
    #[serde(flatten)]
    pub tally: Tally,
}

impl BucketStats {
    fn empty(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tally: Tally::default(),
        }
    }

    pub fn accuracy(&self) -> f64 {
        self.tally.accuracy()
    }
}

/// Find a bucket by label.
pub fn bucket<'a>(buckets: &'a [BucketStats], label: &str) -> Option<&'a BucketStats> {
    buckets.iter().find(|b| b.label == label)
}

/// How long a question took to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeSpentBucket {
    Quick,
    Short,
    Medium,
    Long,
    VeryLong,
}

impl TimeSpentBucket {
    pub const ALL: [TimeSpentBucket; 5] = [
        TimeSpentBucket::Quick,
        TimeSpentBucket::Short,
        TimeSpentBucket::Medium,
        TimeSpentBucket::Long,
        TimeSpentBucket::VeryLong,
    ];

    pub fn for_seconds(seconds: u64) -> Self {
        match seconds {
            0..=29 => TimeSpentBucket::Quick,
            30..=59 => TimeSpentBucket::Short,
            60..=119 => TimeSpentBucket::Medium,
            120..=299 => TimeSpentBucket::Long,
            _ => TimeSpentBucket::VeryLong,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeSpentBucket::Quick => "Quick (<30 sec)",
            TimeSpentBucket::Short => "Short (30-60 sec)",
            TimeSpentBucket::Medium => "Medium (1-2 min)",
            TimeSpentBucket::Long => "Long (2-5 min)",
            TimeSpentBucket::VeryLong => "Very Long (>5 min)",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Which attempt at a question a record was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptBucket {
    One,
    Two,
    Three,
    FourPlus,
}

impl AttemptBucket {
    pub const ALL: [AttemptBucket; 4] = [
        AttemptBucket::One,
        AttemptBucket::Two,
        AttemptBucket::Three,
        AttemptBucket::FourPlus,
    ];

    /// Attempt counts below 1 are treated as a first attempt.
    pub fn for_count(attempt_count: u32) -> Self {
        match attempt_count {
            0 | 1 => AttemptBucket::One,
            2 => AttemptBucket::Two,
            3 => AttemptBucket::Three,
            _ => AttemptBucket::FourPlus,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AttemptBucket::One => "1 Attempt",
            AttemptBucket::Two => "2 Attempts",
            AttemptBucket::Three => "3 Attempts",
            AttemptBucket::FourPlus => "4+ Attempts",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Inclusive 0–100 score ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreBucket {
    UpTo20,
    UpTo40,
    UpTo60,
    UpTo80,
    UpTo100,
}

impl ScoreBucket {
    pub const ALL: [ScoreBucket; 5] = [
        ScoreBucket::UpTo20,
        ScoreBucket::UpTo40,
        ScoreBucket::UpTo60,
        ScoreBucket::UpTo80,
        ScoreBucket::UpTo100,
    ];

    /// Values outside 0–100 fall into the nearest end bucket.
    pub fn for_score(score: f64) -> Self {
        if score <= 20.0 {
            ScoreBucket::UpTo20
        } else if score <= 40.0 {
            ScoreBucket::UpTo40
        } else if score <= 60.0 {
            ScoreBucket::UpTo60
        } else if score <= 80.0 {
            ScoreBucket::UpTo80
        } else {
            ScoreBucket::UpTo100
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreBucket::UpTo20 => "0-20",
            ScoreBucket::UpTo40 => "21-40",
            ScoreBucket::UpTo60 => "41-60",
            ScoreBucket::UpTo80 => "61-80",
            ScoreBucket::UpTo100 => "81-100",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

const WEEKDAYS: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

fn tally_into(buckets: &mut [BucketStats], index: usize, is_correct: bool) {
    buckets[index].tally.record(is_correct);
}

/// Group attempts by how long they took. Missing times count as 0 seconds.
pub fn bucket_by_time_spent(records: &[AttemptRecord]) -> Vec<BucketStats> {
    let mut buckets: Vec<BucketStats> = TimeSpentBucket::ALL
        .iter()
        .map(|b| BucketStats::empty(b.label()))
        .collect();
    for r in records {
        let index = TimeSpentBucket::for_seconds(r.time_spent()).index();
        tally_into(&mut buckets, index, r.is_correct);
    }
    buckets
}

/// Group attempts by attempt number.
pub fn bucket_by_attempt_count(records: &[AttemptRecord]) -> Vec<BucketStats> {
    let mut buckets: Vec<BucketStats> = AttemptBucket::ALL
        .iter()
        .map(|b| BucketStats::empty(b.label()))
        .collect();
    for r in records {
        let index = AttemptBucket::for_count(r.attempt_count).index();
        tally_into(&mut buckets, index, r.is_correct);
    }
    buckets
}

/// Group attempts by local hour of submission, labelled `00:00`..`23:00`.
pub fn bucket_by_hour_of_day(records: &[AttemptRecord], offset: FixedOffset) -> Vec<BucketStats> {
    let mut buckets: Vec<BucketStats> = (0..24)
        .map(|h| BucketStats::empty(format!("{h:02}:00")))
        .collect();
    for r in records {
        let Some(ts) = &r.submitted_at else { continue };
        let hour = ts.with_timezone(&offset).hour() as usize;
        tally_into(&mut buckets, hour, r.is_correct);
    }
    buckets
}

/// Group attempts by local day of week, Monday first.
pub fn bucket_by_day_of_week(records: &[AttemptRecord], offset: FixedOffset) -> Vec<BucketStats> {
    let mut buckets: Vec<BucketStats> = WEEKDAYS.iter().map(|d| BucketStats::empty(*d)).collect();
    for r in records {
        let Some(ts) = &r.submitted_at else { continue };
        let day = ts.with_timezone(&offset).weekday().num_days_from_monday() as usize;
        tally_into(&mut buckets, day, r.is_correct);
    }
    buckets
}

/// Count scores already normalized to 0–100 into the five score ranges.
/// Only `total` is meaningful here.
pub fn score_distribution(scores: &[f64]) -> Vec<BucketStats> {
    let mut buckets: Vec<BucketStats> = ScoreBucket::ALL
        .iter()
        .map(|b| BucketStats::empty(b.label()))
        .collect();
    for &score in scores {
        buckets[ScoreBucket::for_score(score).index()].tally.total += 1;
    }
    buckets
}
