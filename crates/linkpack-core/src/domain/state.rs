//! State - タスクの状態と処理結果

use serde::{Deserialize, Serialize};

/// TaskState はタスクの粗い状態を表現
///
/// # 状態遷移
/// - open: リンク受付中
/// - processing: リンク数が閾値に達し、処理ジョブが起動済み
/// - completed: 処理ジョブ終了（終端、一度だけ到達）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Open,
    Processing,
    Completed,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed)
    }
}

/// TaskOutcome は処理ジョブの結果
///
/// バックグラウンドで起きた失敗はクライアントに返せないため、
/// ここに記録して `get_task` で見えるようにする。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Every link was fetched and archived.
    Succeeded,

    /// The archive exists but only holds part of the links.
    Degraded { archived: usize, failed: usize },

    /// No archive was produced.
    Failed { reason: String },
}

impl TaskOutcome {
    /// Classify a job that produced an archive.
    pub fn from_counts(archived: usize, total: usize) -> Self {
        if archived >= total {
            TaskOutcome::Succeeded
        } else {
            TaskOutcome::Degraded {
                archived,
                failed: total - archived,
            }
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        TaskOutcome::Failed {
            reason: reason.into(),
        }
    }

    /// Did the job leave an archive behind?
    pub fn has_archive(&self) -> bool {
        !matches!(self, TaskOutcome::Failed { .. })
    }
}
