//! Configuration consumed by the orchestrator.
//!
//! The binary fills this from flags / environment; tests build it directly.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be at least 1")]
    Zero(&'static str),

    #[error("allowed_extensions must not be empty")]
    NoExtensions,

    #[error("allowed_extensions contains a blank entry")]
    BlankExtension,
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleConfig {
    /// Admission ceiling for `new_task`.
    pub max_in_flight_tasks: usize,

    /// Link count that triggers processing (and the per-task maximum).
    pub links_per_task: usize,

    /// Suffixes a link must end with, e.g. `jpg` or `.jpg`.
    pub allowed_extensions: Vec<String>,

    /// Where archives are written.
    pub archive_dir: PathBuf,

    /// Simultaneous fetches across all jobs. Defaults to
    /// `max_in_flight_tasks * links_per_task`.
    #[serde(default)]
    pub fetch_workers: Option<usize>,

    /// Simultaneously processing tasks. Defaults to `max_in_flight_tasks`.
    #[serde(default)]
    pub processing_workers: Option<usize>,

    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            max_in_flight_tasks: 3,
            links_per_task: 3,
            allowed_extensions: vec!["jpg".into(), "png".into(), "pdf".into()],
            archive_dir: PathBuf::from("archives"),
            fetch_workers: None,
            processing_workers: None,
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl BundleConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight_tasks == 0 {
            return Err(ConfigError::Zero("max_in_flight_tasks"));
        }
        if self.links_per_task == 0 {
            return Err(ConfigError::Zero("links_per_task"));
        }
        if self.fetch_workers == Some(0) {
            return Err(ConfigError::Zero("fetch_workers"));
        }
        if self.processing_workers == Some(0) {
            return Err(ConfigError::Zero("processing_workers"));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Zero("fetch_timeout_secs"));
        }
        if self.allowed_extensions.is_empty() {
            return Err(ConfigError::NoExtensions);
        }
        if self
            .allowed_extensions
            .iter()
            .any(|ext| ext.trim().trim_start_matches('.').is_empty())
        {
            return Err(ConfigError::BlankExtension);
        }
        Ok(())
    }

    pub fn fetch_workers(&self) -> usize {
        self.fetch_workers
            .unwrap_or(self.max_in_flight_tasks * self.links_per_task)
    }

    pub fn processing_workers(&self) -> usize {
        self.processing_workers.unwrap_or(self.max_in_flight_tasks)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Extensions as lowercase `.ext` suffixes, in configured order.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.allowed_extensions
            .iter()
            .map(|ext| format!(".{}", ext.trim().trim_start_matches('.').to_lowercase()))
            .collect()
    }
}
