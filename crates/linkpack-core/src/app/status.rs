//! Status - 実行状況のスナップショット
//!
//! バックグラウンドジョブの結果はクライアントに直接返らないため、
//! ここで集計して見えるようにする。

use serde::{Deserialize, Serialize};

use crate::domain::{Task, TaskOutcome, TaskState};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCounts {
    pub open: usize,
    pub processing: usize,
    pub succeeded: usize,
    pub degraded: usize,
    pub failed: usize,
}

impl TaskCounts {
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> Self {
        let mut counts = TaskCounts::default();
        for task in tasks {
            match (task.state, &task.outcome) {
                (TaskState::Open, _) => counts.open += 1,
                (TaskState::Processing, _) => counts.processing += 1,
                (TaskState::Completed, Some(TaskOutcome::Succeeded)) => counts.succeeded += 1,
                (TaskState::Completed, Some(TaskOutcome::Degraded { .. })) => counts.degraded += 1,
                (TaskState::Completed, Some(TaskOutcome::Failed { .. }) | None) => {
                    counts.failed += 1
                }
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.open + self.processing + self.succeeded + self.degraded + self.failed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeStatus {
    /// Tasks currently holding an admission slot.
    pub in_flight: usize,
    pub max_in_flight: usize,
    /// Processing jobs currently running.
    pub running_jobs: usize,
    pub tasks: TaskCounts,
}
