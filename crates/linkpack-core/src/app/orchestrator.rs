//! TaskOrchestrator - 受付制御・状態遷移・処理ジョブ起動
//!
//! 呼び出し側（REST 層）が使う操作はすべてここにある。
//! 同期パス（new_task / add_links_to_task）は I/O を待たない。
//! fetch / archive は ProcessingPool 上のジョブで非同期に行う。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::Instrument;

use super::admission::{AdmissionGate, AdmissionPermit};
use super::job::ProcessingJob;
use super::pool::ProcessingPool;
use super::status::{RuntimeStatus, TaskCounts};
use crate::config::{BundleConfig, ConfigError};
use crate::domain::{FileLink, ServiceError, Task, TaskId};
use crate::ports::{ArchiveLocation, Archiver, LinkFetcher, TaskStore};

pub struct TaskOrchestrator {
    links_per_task: usize,
    allowed_extensions: Vec<String>,
    store: Arc<dyn TaskStore>,
    fetcher: Arc<dyn LinkFetcher>,
    archiver: Arc<dyn Archiver>,
    gate: AdmissionGate,
    pool: ProcessingPool,
    /// Admission permits of tasks that have not been handed to a job yet.
    permits: Mutex<HashMap<TaskId, AdmissionPermit>>,
}

impl TaskOrchestrator {
    pub fn new(
        config: &BundleConfig,
        store: Arc<dyn TaskStore>,
        fetcher: Arc<dyn LinkFetcher>,
        archiver: Arc<dyn Archiver>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            links_per_task: config.links_per_task,
            allowed_extensions: config.normalized_extensions(),
            store,
            fetcher,
            archiver,
            gate: AdmissionGate::new(config.max_in_flight_tasks),
            pool: ProcessingPool::new(config.processing_workers()),
            permits: Mutex::new(HashMap::new()),
        })
    }

    /// Create an empty task if an admission slot is free.
    pub async fn new_task(&self) -> Result<TaskId, ServiceError> {
        tracing::debug!(op = "new_task", "start operation");

        let Some(permit) = self.gate.try_acquire() else {
            tracing::warn!(
                in_flight = self.gate.in_flight(),
                limit = self.gate.limit(),
                "admission ceiling reached"
            );
            return Err(ServiceError::ServiceBusy);
        };

        let id = self.store.create_task().await;
        self.permits.lock().await.insert(id, permit);

        tracing::info!(task_id = %id, "task created");
        Ok(id)
    }

    pub async fn get_all_tasks(&self) -> Vec<Task> {
        tracing::debug!(op = "get_all_tasks", "start operation");
        self.store.all_tasks().await
    }

    pub async fn get_task(&self, id: TaskId) -> Result<Task, ServiceError> {
        tracing::debug!(op = "get_task", task_id = %id, "start operation");
        Ok(self.store.get_task(id).await?)
    }

    /// Attach a batch of links; the batch that fills the task starts processing.
    pub async fn add_links_to_task(
        &self,
        id: TaskId,
        urls: Vec<String>,
    ) -> Result<Task, ServiceError> {
        tracing::debug!(op = "add_links_to_task", task_id = %id, count = urls.len(), "start operation");

        let task = self.store.get_task(id).await?;

        if urls.is_empty() {
            return Err(ServiceError::Validation("no links given".into()));
        }
        if urls.len() + task.link_count() > self.links_per_task {
            return Err(ServiceError::Validation(format!(
                "max links per task reached: task has {}, {} more requested, limit {}",
                task.link_count(),
                urls.len(),
                self.links_per_task
            )));
        }
        self.check_extensions(&urls)?;

        let batch = urls.len();
        let links = urls.into_iter().map(FileLink::new).collect();
        // 上限チェックは store のロック内でもう一度行われる（同時追加で超えないように）
        let task = self.store.add_links(id, links, self.links_per_task).await?;

        if task.link_count() == self.links_per_task {
            self.start_processing(id, batch).await?;
        }

        Ok(task)
    }

    /// Where the finished archive lives.
    pub async fn get_task_result(&self, id: TaskId) -> Result<ArchiveLocation, ServiceError> {
        tracing::debug!(op = "get_task_result", task_id = %id, "start operation");

        let task = self.store.get_task(id).await?;
        match &task.outcome {
            None => Err(ServiceError::ResultNotReady(id)),
            Some(outcome) if !outcome.has_archive() => Err(ServiceError::ResultUnavailable(id)),
            Some(_) => self
                .archiver
                .locate(id)
                .await
                .ok_or(ServiceError::ResultUnavailable(id)),
        }
    }

    pub async fn status(&self) -> RuntimeStatus {
        let tasks = self.store.all_tasks().await;
        RuntimeStatus {
            in_flight: self.gate.in_flight(),
            max_in_flight: self.gate.limit(),
            running_jobs: self.pool.busy(),
            tasks: TaskCounts::from_tasks(&tasks),
        }
    }

    /// Stop starting jobs and wait for the running ones.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let drained = self.pool.close_and_drain(timeout).await;
        if !drained {
            tracing::warn!("processing jobs still running at shutdown");
        }
        drained
    }

    fn check_extensions(&self, urls: &[String]) -> Result<(), ServiceError> {
        for url in urls {
            let lower = url.to_lowercase();
            if !self.allowed_extensions.iter().any(|ext| lower.ends_with(ext)) {
                let allowed: Vec<&str> = self
                    .allowed_extensions
                    .iter()
                    .map(|ext| ext.trim_start_matches('.'))
                    .collect();
                return Err(ServiceError::Validation(format!(
                    "link \"{url}\" extension not allowed, allowed extensions {}",
                    allowed.join(",")
                )));
            }
        }
        Ok(())
    }

    /// Hand the task to the pool; on saturation the last `batch` links are rolled back.
    async fn start_processing(&self, id: TaskId, batch: usize) -> Result<(), ServiceError> {
        let Some(slot) = self.pool.try_reserve() else {
            tracing::warn!(task_id = %id, batch, "processing pool saturated, rolling back links");
            self.store.remove_last_links(id, batch).await?;
            return Err(ServiceError::ServiceBusy);
        };

        let permit = self.permits.lock().await.remove(&id);
        if permit.is_none() {
            tracing::warn!(task_id = %id, "task has no admission permit");
        }

        let job = ProcessingJob::new(
            id,
            Arc::clone(&self.store),
            Arc::clone(&self.fetcher),
            Arc::clone(&self.archiver),
        );
        let span = tracing::info_span!("processing_job", task_id = %id);

        slot.spawn(
            async move {
                // permit はジョブの終了（成功・失敗・panic）と同時に返却される
                let _permit = permit;
                let outcome = job.run().await;
                tracing::info!(?outcome, "task processed");
            }
            .instrument(span),
        );

        tracing::info!(task_id = %id, "processing job started");
        Ok(())
    }
}
