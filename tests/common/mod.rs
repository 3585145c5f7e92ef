#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use url::Url;

use specdoc::application::docs::{DocumentFormatter, DocumentationGenerator, GenerationSettings};
use specdoc::application::fetch::{FetchError, SpecFetcher};
use specdoc::application::genai::{GenAiClient, GenAiError, GenerationRequest, GenerationResponse};
use specdoc::application::jobs::{ExecuteJobTask, Pipeline, TaskExecutor};
use specdoc::application::repos::{
    JobHistoryFilter, JobStore, JobTransition, RepoError, TransitionOutcome,
};
use specdoc::domain::entities::{JobProgress, JobRecord};
use specdoc::domain::types::JobStatus;
use time::OffsetDateTime;
use uuid::Uuid;
use specdoc::application::retry::RetryPolicy;
use specdoc::application::service::{JobService, SubmissionLimits};
use specdoc::application::tracker::StatusTracker;
use specdoc::domain::entities::INITIAL_ESTIMATE;
use specdoc::infra::memory::{MemoryJobStore, MemoryTaskQueue};

pub const SECTION_BODY: &str = "The ledger service records balanced journal entries.\n\n\
- `GET /entries` lists entries for an account.\n\
- Each entry carries an amount and a currency.\n\n\
```json\n{\"amount\": 100, \"currency\": \"EUR\"}\n```\n";

/// GenAI stand-in that replays queued failures before answering with fixed content.
#[derive(Default)]
pub struct ScriptedGenAi {
    failures: Mutex<VecDeque<GenAiError>>,
    calls: AtomicUsize,
    /// Flag every active job for cancellation on the first call.
    cancel_on_first_call: Option<Arc<MemoryJobStore>>,
}

impl ScriptedGenAi {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing_with(failures: impl IntoIterator<Item = GenAiError>) -> Self {
        Self {
            failures: Mutex::new(failures.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn cancelling(store: Arc<MemoryJobStore>) -> Self {
        Self {
            cancel_on_first_call: Some(store),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenAiClient for ScriptedGenAi {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenAiError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            if let Some(store) = self.cancel_on_first_call.as_ref() {
                for job in store.list_active().await.expect("active jobs") {
                    store.request_cancel(job.id).await.expect("request cancel");
                }
            }
        }
        if let Some(err) = self.failures.lock().await.pop_front() {
            return Err(err);
        }
        Ok(GenerationResponse {
            content: SECTION_BODY.to_string(),
            tokens_used: request.max_tokens.min(120),
            model: Some(request.model),
            request_id: None,
        })
    }
}

pub struct StaticFetcher(pub Result<String, FetchError>);

#[async_trait]
impl SpecFetcher for StaticFetcher {
    async fn fetch(&self, _url: &Url) -> Result<String, FetchError> {
        self.0.clone()
    }
}

pub fn instant_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
        multiplier: 1.0,
    }
}

pub fn openapi_spec() -> Value {
    json!({
        "openapi": "3.0.0",
        "info": {"title": "Ledger", "version": "1.0.0", "description": "Double-entry ledger"},
        "paths": {
            "/entries": {
                "get": {
                    "summary": "List entries",
                    "parameters": [{"name": "account", "in": "query", "required": true}],
                    "responses": {"200": {"description": "ok"}}
                },
                "post": {
                    "summary": "Create entry",
                    "responses": {"201": {"description": "created"}}
                }
            }
        },
        "components": {
            "schemas": {
                "Entry": {"type": "object", "properties": {"amount": {"type": "integer"}}}
            }
        }
    })
}

/// Store, queue, service and executor wired the way the binaries wire them.
pub struct Harness {
    pub store: Arc<MemoryJobStore>,
    pub queue: Arc<MemoryTaskQueue>,
    pub service: Arc<JobService>,
    pub executor: Arc<TaskExecutor>,
}

impl Harness {
    pub fn new(genai: Arc<dyn GenAiClient>, retry: RetryPolicy) -> Self {
        Self::with_store(Arc::new(MemoryJobStore::new()), genai, retry)
    }

    pub fn with_store(
        store: Arc<MemoryJobStore>,
        genai: Arc<dyn GenAiClient>,
        retry: RetryPolicy,
    ) -> Self {
        let dyn_store: Arc<dyn JobStore> = store.clone();
        Self::wired(store, dyn_store, genai, retry)
    }

    /// Run everything through `dyn_store` while `store` stays available for inspection.
    pub fn wired(
        store: Arc<MemoryJobStore>,
        dyn_store: Arc<dyn JobStore>,
        genai: Arc<dyn GenAiClient>,
        retry: RetryPolicy,
    ) -> Self {
        let queue = Arc::new(MemoryTaskQueue::new());
        let tracker = Arc::new(StatusTracker::new(dyn_store.clone(), 2, INITIAL_ESTIMATE));

        let service = Arc::new(JobService::new(
            dyn_store.clone(),
            queue.clone(),
            Arc::new(StaticFetcher(Ok(
                "openapi: 3.0.0\ninfo:\n  title: Ledger\n  version: 1.0.0\npaths: {}\n".into(),
            ))),
            tracker.clone(),
            SubmissionLimits {
                delivery_attempts: 3,
            },
        ));

        let generator = Arc::new(DocumentationGenerator::new(
            genai,
            GenerationSettings {
                max_tokens: 3000,
                temperature: 0.2,
                model: "test-model".into(),
            },
            retry.clone(),
        ));
        let formatter = Arc::new(DocumentFormatter::new(Some("https://docs.example.com")));
        let pipeline = Pipeline::new(dyn_store.clone(), generator, formatter, retry);
        let executor = Arc::new(TaskExecutor::new(dyn_store, tracker, pipeline));

        Self {
            store,
            queue,
            service,
            executor,
        }
    }

    /// Job ids of every task handed to the queue since the last call.
    pub async fn drain_job_ids(&self) -> Vec<uuid::Uuid> {
        self.queue
            .drain()
            .await
            .into_iter()
            .map(|task| {
                serde_json::from_value::<ExecuteJobTask>(task.payload)
                    .expect("execute payload")
                    .job_id
            })
            .collect()
    }
}

/// Memory store whose progress writes time out a fixed number of times.
pub struct FlakyProgressStore {
    inner: Arc<MemoryJobStore>,
    failures_left: AtomicU32,
}

impl FlakyProgressStore {
    pub fn new(inner: Arc<MemoryJobStore>, failures: u32) -> Self {
        Self {
            inner,
            failures_left: AtomicU32::new(failures),
        }
    }
}

#[async_trait]
impl JobStore for FlakyProgressStore {
    async fn insert_job(&self, job: &JobRecord) -> Result<(), RepoError> {
        self.inner.insert_job(job).await
    }

    async fn find_job(&self, id: Uuid) -> Result<Option<JobRecord>, RepoError> {
        self.inner.find_job(id).await
    }

    async fn transition(&self, transition: JobTransition) -> Result<TransitionOutcome, RepoError> {
        self.inner.transition(transition).await
    }

    async fn update_progress(&self, id: Uuid, progress: &JobProgress) -> Result<bool, RepoError> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(RepoError::Timeout);
        }
        self.inner.update_progress(id, progress).await
    }

    async fn request_cancel(&self, id: Uuid) -> Result<bool, RepoError> {
        self.inner.request_cancel(id).await
    }

    async fn list_jobs(&self, filter: &JobHistoryFilter) -> Result<Vec<JobRecord>, RepoError> {
        self.inner.list_jobs(filter).await
    }

    async fn list_active(&self) -> Result<Vec<JobRecord>, RepoError> {
        self.inner.list_active().await
    }

    async fn list_created_since(
        &self,
        team_id: Option<&str>,
        since: OffsetDateTime,
    ) -> Result<Vec<JobRecord>, RepoError> {
        self.inner.list_created_since(team_id, since).await
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<u64, RepoError> {
        self.inner.count_by_status(status).await
    }

    async fn count_active_before(&self, created_at: OffsetDateTime) -> Result<u64, RepoError> {
        self.inner.count_active_before(created_at).await
    }

    async fn recent_processing_seconds(
        &self,
        since: OffsetDateTime,
        limit: u32,
    ) -> Result<Vec<f64>, RepoError> {
        self.inner.recent_processing_seconds(since, limit).await
    }

    async fn oldest_queued_at(&self) -> Result<Option<OffsetDateTime>, RepoError> {
        self.inner.oldest_queued_at().await
    }

    async fn purge_finished_before(&self, cutoff: OffsetDateTime) -> Result<u64, RepoError> {
        self.inner.purge_finished_before(cutoff).await
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        self.inner.health_check().await
    }
}
