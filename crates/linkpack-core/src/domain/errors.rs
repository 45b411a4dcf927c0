//! Errors - レイヤーごとのエラー型
//!
//! - ServiceError: 呼び出し元（REST 層）に同期的に返すもの
//! - StoreError / ArchiveError / FetchError: 内部のポートが返すもの
//!
//! 処理ジョブ内のエラーは呼び出し元には返らず、ログと TaskOutcome に残る。

use std::path::PathBuf;

use thiserror::Error;

use super::ids::TaskId;

/// Errors surfaced synchronously by the orchestrator.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("service is busy")]
    ServiceBusy,

    #[error("result for {0} is not ready yet")]
    ResultNotReady(TaskId),

    #[error("no archive was produced for {0}")]
    ResultUnavailable(TaskId),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TaskNotFound(id) => ServiceError::TaskNotFound(id),
            StoreError::LimitExceeded { limit, requested } => ServiceError::Validation(format!(
                "task can hold at most {limit} links, {requested} requested"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("link limit exceeded: limit={limit} requested={requested}")]
    LimitExceeded { limit: usize, requested: usize },
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to create archive directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to create archive file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write archive entry {entry}: {source}")]
    WriteEntry {
        entry: String,
        source: std::io::Error,
    },

    #[error("failed to finish archive {path}: {source}")]
    Finish {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("archive worker stopped: {0}")]
    Join(String),
}

/// Per-link fetch failure. Logged by the fetcher, never returned to a caller.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to send request: {0}")]
    Transport(String),

    #[error("request failed with status code {0}")]
    Status(u16),

    #[error("failed to read response body: {0}")]
    Body(String),
}
