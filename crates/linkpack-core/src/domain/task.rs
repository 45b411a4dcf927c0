//! Task record: identifier + ordered links + lifecycle.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::TaskId;
use super::link::{FileLink, LinkStatus};
use super::state::{TaskOutcome, TaskState};

/// A bundle task.
///
/// Design:
/// - The store owns the record; callers only ever see clones.
/// - State transitions happen through methods, never through field access
///   from outside the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,

    /// Links in attachment order.
    pub files_link: Vec<FileLink>,

    pub state: TaskState,

    /// Set exactly once, when the processing job finishes.
    pub outcome: Option<TaskOutcome>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: TaskId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            files_link: Vec::new(),
            state: TaskState::Open,
            outcome: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn link_count(&self) -> usize {
        self.files_link.len()
    }

    /// URLs in attachment order.
    pub fn urls(&self) -> Vec<String> {
        self.files_link.iter().map(|l| l.link.clone()).collect()
    }

    pub fn push_links(&mut self, links: impl IntoIterator<Item = FileLink>, now: DateTime<Utc>) {
        self.files_link.extend(links);
        self.updated_at = now;
    }

    /// Drop the last `n` links (rollback of a batch that could not be scheduled).
    pub fn truncate_last(&mut self, n: usize, now: DateTime<Utc>) {
        let keep = self.files_link.len().saturating_sub(n);
        self.files_link.truncate(keep);
        self.updated_at = now;
    }

    /// Open -> Processing; every link New -> InProcess.
    pub fn mark_in_process(&mut self, now: DateTime<Utc>) {
        for link in &mut self.files_link {
            link.advance(LinkStatus::InProcess);
        }
        if self.state == TaskState::Open {
            self.state = TaskState::Processing;
        }
        self.updated_at = now;
    }

    /// -> Completed. Links in `succeeded` become Completed, all others Error.
    ///
    /// Returns false (and changes nothing) if the task was already completed.
    pub fn mark_completed(
        &mut self,
        succeeded: &HashSet<String>,
        outcome: TaskOutcome,
        now: DateTime<Utc>,
    ) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        for link in &mut self.files_link {
            let next = if succeeded.contains(&link.link) {
                LinkStatus::Completed
            } else {
                LinkStatus::Error
            };
            link.advance(next);
        }
        self.state = TaskState::Completed;
        self.outcome = Some(outcome);
        self.updated_at = now;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ulid::Ulid;

    fn task_with(urls: &[&str]) -> Task {
        let mut task = Task::new(TaskId::from_ulid(Ulid::new()), Utc::now());
        task.push_links(urls.iter().map(|u| FileLink::new(*u)), Utc::now());
        task
    }

    #[test]
    fn new_task_is_open_and_empty() {
        let task = task_with(&[]);
        assert_eq!(task.state, TaskState::Open);
        assert_eq!(task.link_count(), 0);
        assert!(task.outcome.is_none());
    }

    #[test]
    fn links_keep_attachment_order() {
        let task = task_with(&["b.jpg", "a.jpg", "c.jpg"]);
        assert_eq!(task.urls(), vec!["b.jpg", "a.jpg", "c.jpg"]);
    }

    #[test]
    fn truncate_last_drops_tail_only() {
        let mut task = task_with(&["a.jpg", "b.jpg", "c.jpg"]);
        task.truncate_last(2, Utc::now());
        assert_eq!(task.urls(), vec!["a.jpg"]);

        task.truncate_last(5, Utc::now());
        assert_eq!(task.link_count(), 0);
    }

    #[test]
    fn completion_marks_missing_links_as_error() {
        let mut task = task_with(&["a.jpg", "b.jpg"]);
        task.mark_in_process(Utc::now());
        assert_eq!(task.state, TaskState::Processing);

        let succeeded = HashSet::from(["a.jpg".to_string()]);
        let outcome = TaskOutcome::from_counts(1, 2);
        assert!(task.mark_completed(&succeeded, outcome.clone(), Utc::now()));

        assert_eq!(task.state, TaskState::Completed);
        assert_eq!(task.outcome, Some(outcome));
        assert_eq!(task.files_link[0].status, LinkStatus::Completed);
        assert_eq!(task.files_link[1].status, LinkStatus::Error);
    }

    #[test]
    fn completion_happens_once() {
        let mut task = task_with(&["a.jpg"]);
        task.mark_in_process(Utc::now());
        assert!(task.mark_completed(&HashSet::new(), TaskOutcome::failed("x"), Utc::now()));

        let all = HashSet::from(["a.jpg".to_string()]);
        assert!(!task.mark_completed(&all, TaskOutcome::Succeeded, Utc::now()));
        assert_eq!(task.files_link[0].status, LinkStatus::Error);
        assert_eq!(task.outcome, Some(TaskOutcome::failed("x")));
    }
}
