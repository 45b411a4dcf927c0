//! OrchestratorBuilder - TaskOrchestrator の構築とワイヤリング
//!
//! # 設計原則
//! - 起動時検証（Fail-fast）: 設定の誤りは build() で BuildError になる
//! - 差し替えたいポートだけ指定し、残りは設定から既定実装を作る

use std::sync::Arc;

use super::orchestrator::TaskOrchestrator;
use crate::config::{BundleConfig, ConfigError};
use crate::domain::{ArchiveError, FetchError};
use crate::impls::{HttpLinkFetcher, InMemoryTaskStore, ZipArchiver};
use crate::ports::{Archiver, LinkFetcher, TaskStore};

/// # 使用例
/// ```ignore
/// let orchestrator = OrchestratorBuilder::new(config)
///     .fetcher(Arc::new(MyFetcher))
///     .build()?;
/// ```
pub struct OrchestratorBuilder {
    config: BundleConfig,
    store: Option<Arc<dyn TaskStore>>,
    fetcher: Option<Arc<dyn LinkFetcher>>,
    archiver: Option<Arc<dyn Archiver>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build link fetcher: {0}")]
    Fetcher(#[from] FetchError),

    #[error("failed to prepare archive directory: {0}")]
    Archiver(#[from] ArchiveError),
}

impl OrchestratorBuilder {
    pub fn new(config: BundleConfig) -> Self {
        Self {
            config,
            store: None,
            fetcher: None,
            archiver: None,
        }
    }

    pub fn store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn LinkFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn archiver(mut self, archiver: Arc<dyn Archiver>) -> Self {
        self.archiver = Some(archiver);
        self
    }

    /// Validate the configuration, then fill in default ports.
    pub fn build(self) -> Result<TaskOrchestrator, BuildError> {
        self.config.validate()?;

        let store = match self.store {
            Some(store) => store,
            None => Arc::new(InMemoryTaskStore::new()),
        };
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpLinkFetcher::new(
                self.config.fetch_workers(),
                self.config.fetch_timeout(),
            )?),
        };
        let archiver = match self.archiver {
            Some(archiver) => archiver,
            None => Arc::new(ZipArchiver::new(self.config.archive_dir.clone())?),
        };

        tracing::info!(
            max_in_flight_tasks = self.config.max_in_flight_tasks,
            links_per_task = self.config.links_per_task,
            fetch_workers = self.config.fetch_workers(),
            processing_workers = self.config.processing_workers(),
            archive_dir = %self.config.archive_dir.display(),
            "orchestrator configured"
        );

        Ok(TaskOrchestrator::new(&self.config, store, fetcher, archiver)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn build_with_defaults_creates_archive_dir() {
        let dir = tempfile::tempdir().unwrap();
        let archive_dir = dir.path().join("nested").join("archives");
        let config = BundleConfig {
            archive_dir: archive_dir.clone(),
            ..Default::default()
        };

        let orchestrator = OrchestratorBuilder::new(config).build();

        assert!(orchestrator.is_ok());
        assert!(archive_dir.is_dir());
    }

    #[tokio::test]
    async fn build_rejects_invalid_config_before_touching_disk() {
        let dir = tempfile::tempdir().unwrap();
        let archive_dir = dir.path().join("never");
        let config = BundleConfig {
            links_per_task: 0,
            archive_dir: archive_dir.clone(),
            ..Default::default()
        };

        let result = OrchestratorBuilder::new(config).build();

        assert!(matches!(
            result,
            Err(BuildError::Config(ConfigError::Zero("links_per_task")))
        ));
        assert!(!archive_dir.exists());
    }

    #[tokio::test]
    async fn build_fails_when_archive_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();
        let config = BundleConfig {
            archive_dir: blocker.join("archives"),
            ..Default::default()
        };

        let result = OrchestratorBuilder::new(config).build();

        assert!(matches!(result, Err(BuildError::Archiver(_))));
    }

    #[tokio::test]
    async fn overridden_store_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryTaskStore::new());
        let id = store.create_task().await;
        let config = BundleConfig {
            archive_dir: dir.path().to_path_buf(),
            ..Default::default()
        };

        let orchestrator = OrchestratorBuilder::new(config)
            .store(store)
            .build()
            .unwrap();

        assert!(orchestrator.get_task(id).await.is_ok());
    }
}
