//! Async job wrapper around the pipeline: spawn a run on its own task,
//! poll a status snapshot while it progresses, collect the result when
//! it finishes. One job per "create story" invocation; callers are
//! expected to serialize invocations per session.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::backend::{ImageBackend, TextBackend};
use crate::pipeline::{Pipeline, PipelineRun, ProgressEvent, StoryStage};

pub type JobId = String;

#[derive(Debug, Clone, Serialize)]
pub struct StoryJobStatus {
    pub job_id: String,
    pub style: String,
    pub scene_count: u8,
    pub stage: StoryStage,
    pub updated_at: String,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

pub fn now_iso() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

/// Shared registry of in-flight and finished runs.
#[derive(Default)]
pub struct JobBoard {
    statuses: Arc<DashMap<JobId, StoryJobStatus>>,
    results: Arc<DashMap<JobId, PipelineRun>>,
    handles: DashMap<JobId, JoinHandle<()>>,
}

impl JobBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns one pipeline run. Status snapshots are published into the
    /// board on every progress event; the finished run lands in the
    /// results map under the same job id.
    #[instrument(skip(self, pipeline, story), fields(style = %style_key, scenes = scene_count))]
    pub fn spawn<T, I>(
        &self,
        pipeline: Arc<Pipeline<T, I>>,
        story: String,
        style_key: String,
        scene_count: u8,
    ) -> JobId
    where
        T: TextBackend + 'static,
        I: ImageBackend + 'static,
    {
        let job_id = Uuid::new_v4().to_string();
        let mut status = StoryJobStatus {
            job_id: job_id.clone(),
            style: style_key.clone(),
            scene_count,
            stage: StoryStage::Queued,
            updated_at: now_iso(),
            warnings: Vec::new(),
            errors: Vec::new(),
        };
        self.statuses.insert(job_id.clone(), status.clone());
        info!(job_id = %job_id, "story job queued");

        let statuses = Arc::clone(&self.statuses);
        let results = Arc::clone(&self.results);
        let jid = job_id.clone();
        let handle = tokio::spawn(async move {
            let outcome = pipeline
                .run(&story, &style_key, scene_count, |event| {
                    match event {
                        ProgressEvent::Stage(stage) => status.stage = stage,
                        ProgressEvent::Warning { message, .. } => status.warnings.push(message),
                        ProgressEvent::Error { message, .. } => status.errors.push(message),
                    }
                    status.updated_at = now_iso();
                    statuses.insert(jid.clone(), status.clone());
                })
                .await;

            match outcome {
                Ok(run) => {
                    info!(job_id = %jid, scenes = run.scenes.len(), "story job finished");
                    results.insert(jid.clone(), run);
                }
                Err(e) => {
                    // The Failed stage was already published via events.
                    error!(job_id = %jid, error = %e, "story job failed");
                }
            }
        });
        self.handles.insert(job_id.clone(), handle);
        job_id
    }

    pub fn status(&self, job_id: &str) -> Option<StoryJobStatus> {
        self.statuses.get(job_id).map(|s| s.clone())
    }

    pub fn take_result(&self, job_id: &str) -> Option<PipelineRun> {
        self.results.remove(job_id).map(|(_, run)| run)
    }

    /// Waits for a spawned job to finish. No cancellation: a run always
    /// proceeds to completion or hard failure.
    pub async fn wait(&self, job_id: &str) {
        if let Some((_, handle)) = self.handles.remove(job_id) {
            let _ = handle.await;
        }
    }
}
