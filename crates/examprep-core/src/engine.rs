//! Submission service.
//!
//! Scores answers, persists attempt records, and builds progress reports
//! from a per-user snapshot cache.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cache::TtlCache;
use crate::model::{
    AttemptPolicy, AttemptRecord, CatalogPosition, Question, RecordFilter, SubmittedAnswer,
};
use crate::report::ProgressReport;
use crate::scoring::evaluate;
use crate::traits::AttemptStore;

/// Configuration for the submission service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// How long a user's record snapshot is served from cache.
    pub cache_ttl: Duration,
    /// Zone used for day and hour grouping.
    pub utc_offset: FixedOffset,
    /// Which attempts count towards progress.
    pub attempt_policy: AttemptPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::seconds(60),
            utc_offset: Utc.fix(),
            attempt_policy: AttemptPolicy::All,
        }
    }
}

/// One answer to score and record.
#[derive(Debug, Clone)]
pub struct SubmitRequest<'a> {
    pub user_id: &'a str,
    pub position: &'a CatalogPosition,
    pub question: &'a Question,
    /// Answer as typed, e.g. `"2"`, `"1,3"` or `"9.81"`.
    pub raw_answer: &'a str,
    pub time_spent_seconds: Option<u64>,
}

/// Scores submissions and aggregates progress over an [`AttemptStore`].
pub struct SubmissionService {
    store: Arc<dyn AttemptStore>,
    cache: Mutex<TtlCache<String, Vec<AttemptRecord>>>,
    /// Serializes submits per user so attempt counts stay sequential.
    submit_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    config: ServiceConfig,
}

impl SubmissionService {
    pub fn new(store: Arc<dyn AttemptStore>, config: ServiceConfig) -> Self {
        let cache = Mutex::new(TtlCache::new(config.cache_ttl));
        Self {
            store,
            cache,
            submit_locks: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Score one answer and append the resulting record.
    ///
    /// Nothing is written when the answer or question is rejected.
    pub async fn submit(&self, request: SubmitRequest<'_>) -> Result<AttemptRecord> {
        let question = request.question;
        let answer = SubmittedAnswer::parse(&question.id, question.kind(), request.raw_answer)?;
        let evaluation = evaluate(question, &answer)?;

        // Held from counting through cache invalidation.
        let user_lock = self.submit_lock(request.user_id).await;
        let _guard = user_lock.lock().await;

        let previous = self
            .records(request.user_id)
            .await?
            .iter()
            .filter(|r| r.is_for(request.user_id, request.position, &question.id))
            .count();

        let record = AttemptRecord {
            id: Uuid::new_v4(),
            question_id: question.id.clone(),
            exam_type: Some(request.position.exam_type.clone()),
            subject: Some(request.position.subject.clone()),
            chapter: Some(request.position.chapter.clone()),
            user_id: request.user_id.to_string(),
            submitted_answer: answer.normalized(),
            is_correct: evaluation.is_correct,
            score: evaluation.score,
            time_spent_seconds: request.time_spent_seconds,
            attempt_count: previous as u32 + 1,
            submitted_at: Some(Utc::now()),
        };

        self.store
            .append(&record)
            .await
            .with_context(|| format!("failed to record attempt at '{}'", question.id))?;
        self.cache.lock().await.invalidate(&record.user_id);

        tracing::info!(
            user = %record.user_id,
            question = %record.question_id,
            correct = record.is_correct,
            score = record.score,
            attempt = record.attempt_count,
            "attempt recorded"
        );

        Ok(record)
    }

    async fn submit_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.submit_locks
            .lock()
            .await
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }

    /// All records for a user, served from cache while fresh.
    pub async fn records(&self, user_id: &str) -> Result<Vec<AttemptRecord>> {
        let now = Utc::now();
        let mut cache = self.cache.lock().await;
        if let Some(records) = cache.get(&user_id.to_string(), now) {
            tracing::debug!(user = user_id, count = records.len(), "record cache hit");
            return Ok(records);
        }

        let records = self
            .store
            .list_for_user(user_id)
            .await
            .with_context(|| format!("failed to load attempts for '{user_id}'"))?;
        cache.purge_expired(now);
        cache.insert(user_id.to_string(), records.clone(), now);
        tracing::debug!(user = user_id, count = records.len(), "loaded records from store");
        Ok(records)
    }

    /// Build a progress report for a user as of now.
    pub async fn progress(&self, user_id: &str, filter: &RecordFilter) -> Result<ProgressReport> {
        self.progress_at(user_id, filter, self.config.attempt_policy, Utc::now())
            .await
    }

    /// Build a progress report with an explicit policy and reference time.
    pub async fn progress_at(
        &self,
        user_id: &str,
        filter: &RecordFilter,
        policy: AttemptPolicy,
        now: DateTime<Utc>,
    ) -> Result<ProgressReport> {
        let records: Vec<AttemptRecord> = self
            .records(user_id)
            .await?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        let selected = policy.select(&records);

        Ok(ProgressReport::build(
            user_id,
            policy,
            filter.clone(),
            &selected,
            self.config.utc_offset,
            now,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScoringError;
    use crate::model::AnswerKey;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct VecStore {
        records: std::sync::Mutex<Vec<AttemptRecord>>,
        loads: AtomicUsize,
    }

    #[async_trait]
    impl AttemptStore for VecStore {
        fn name(&self) -> &str {
            "vec"
        }

        async fn append(&self, record: &AttemptRecord) -> Result<()> {
            tokio::task::yield_now().await;
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn list_for_user(&self, user_id: &str) -> Result<Vec<AttemptRecord>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.user_id == user_id)
                .cloned()
                .collect())
        }
    }

    fn position() -> CatalogPosition {
        CatalogPosition {
            exam_type: "JEE Main".into(),
            subject: "Physics".into(),
            chapter: "Mechanics".into(),
        }
    }

    fn single_question() -> Question {
        Question::new(
            "mech-001",
            "Unit of force?",
            vec!["Newton".into(), "Joule".into(), "Watt".into(), "Pascal".into()],
            AnswerKey::SingleCorrect(1),
            5,
        )
        .unwrap()
    }

    fn service(store: Arc<VecStore>) -> SubmissionService {
        SubmissionService::new(store, ServiceConfig::default())
    }

    fn request<'a>(
        position: &'a CatalogPosition,
        question: &'a Question,
        raw_answer: &'a str,
    ) -> SubmitRequest<'a> {
        SubmitRequest {
            user_id: "u1",
            position,
            question,
            raw_answer,
            time_spent_seconds: Some(42),
        }
    }

    #[tokio::test]
    async fn submit_scores_and_persists() {
        let store = Arc::new(VecStore::default());
        let svc = service(store.clone());
        let (pos, q) = (position(), single_question());

        let record = svc.submit(request(&pos, &q, "1")).await.unwrap();
        assert!(record.is_correct);
        assert_eq!(record.score, 4);
        assert_eq!(record.attempt_count, 1);
        assert_eq!(record.chapter.as_deref(), Some("Mechanics"));
        assert!(record.submitted_at.is_some());
        assert_eq!(store.records.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn attempt_count_increments_per_question() {
        let store = Arc::new(VecStore::default());
        let svc = service(store);
        let (pos, q) = (position(), single_question());

        svc.submit(request(&pos, &q, "2")).await.unwrap();
        let second = svc.submit(request(&pos, &q, "1")).await.unwrap();
        assert_eq!(second.attempt_count, 2);
        assert_eq!(svc.records("u1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn concurrent_submits_get_distinct_attempt_counts() {
        let store = Arc::new(VecStore::default());
        let svc = service(store.clone());
        let (pos, q) = (position(), single_question());

        let (a, b) = tokio::join!(
            svc.submit(request(&pos, &q, "2")),
            svc.submit(request(&pos, &q, "1"))
        );
        let mut counts = vec![a.unwrap().attempt_count, b.unwrap().attempt_count];
        counts.sort_unstable();
        assert_eq!(counts, vec![1, 2]);

        let mut stored: Vec<u32> = store
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.attempt_count)
            .collect();
        stored.sort_unstable();
        assert_eq!(stored, vec![1, 2]);
    }

    #[tokio::test]
    async fn rejected_answer_writes_nothing() {
        let store = Arc::new(VecStore::default());
        let svc = service(store.clone());
        let (pos, q) = (position(), single_question());

        let err = svc.submit(request(&pos, &q, "abc")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScoringError>(),
            Some(ScoringError::InvalidAnswerFormat { .. })
        ));

        let err = svc.submit(request(&pos, &q, "  ")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScoringError>(),
            Some(ScoringError::NoAnswer { .. })
        ));
        assert!(store.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn records_are_cached_until_submit() {
        let store = Arc::new(VecStore::default());
        let svc = service(store.clone());
        let (pos, q) = (position(), single_question());

        svc.records("u1").await.unwrap();
        svc.records("u1").await.unwrap();
        assert_eq!(store.loads.load(Ordering::SeqCst), 1);

        // The attempt count comes from the cached snapshot; the write drops it.
        svc.submit(request(&pos, &q, "1")).await.unwrap();
        let records = svc.records("u1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(store.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn progress_applies_filter_and_policy() {
        let store = Arc::new(VecStore::default());
        let svc = service(store);
        let (pos, q) = (position(), single_question());

        svc.submit(request(&pos, &q, "2")).await.unwrap();
        svc.submit(request(&pos, &q, "1")).await.unwrap();

        let all = svc.progress("u1", &RecordFilter::default()).await.unwrap();
        assert_eq!(all.summary.tally.total, 2);
        assert_eq!(all.summary.tally.correct, 1);

        let first = svc
            .progress_at("u1", &RecordFilter::default(), AttemptPolicy::First, Utc::now())
            .await
            .unwrap();
        assert_eq!(first.summary.tally.total, 1);
        assert_eq!(first.summary.tally.correct, 0);

        let latest = svc
            .progress_at("u1", &RecordFilter::default(), AttemptPolicy::Latest, Utc::now())
            .await
            .unwrap();
        assert_eq!(latest.summary.tally.correct, 1);

        let other = RecordFilter {
            subject: Some("Chemistry".into()),
            ..Default::default()
        };
        let none = svc.progress("u1", &other).await.unwrap();
        assert_eq!(none.summary.tally.total, 0);
    }
}
