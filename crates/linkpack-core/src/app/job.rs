//! ProcessingJob - 閾値に達したタスク 1 件分の fetch -> archive -> 完了記録
//!
//! # フロー
//! 1. TaskStore::mark_in_process() で全リンクを InProcess に
//! 2. LinkFetcher::fetch_all() で全リンクを並行取得（ここだけ長時間ブロックする）
//! 3. 成功分を URL の basename でエントリ名にして Archiver::archive()
//! 4. TaskStore::mark_completed() で成功分を Completed、残りを Error に
//!
//! どの段階の失敗もここで吸収し、タスクは必ず Completed になる。
//! 結果は TaskOutcome として記録し、run() の戻り値としても返す。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;

use crate::domain::{FileLink, TaskId, TaskOutcome, unique_entry_name};
use crate::ports::{Archiver, LinkFetcher, TaskStore};

pub struct ProcessingJob {
    task_id: TaskId,
    store: Arc<dyn TaskStore>,
    fetcher: Arc<dyn LinkFetcher>,
    archiver: Arc<dyn Archiver>,
}

impl ProcessingJob {
    pub fn new(
        task_id: TaskId,
        store: Arc<dyn TaskStore>,
        fetcher: Arc<dyn LinkFetcher>,
        archiver: Arc<dyn Archiver>,
    ) -> Self {
        Self {
            task_id,
            store,
            fetcher,
            archiver,
        }
    }

    pub async fn run(self) -> TaskOutcome {
        let id = self.task_id;

        if let Err(err) = self.store.mark_in_process(id).await {
            tracing::error!(error = %err, "failed to update task status to in process");
            return self
                .complete(HashSet::new(), TaskOutcome::failed(err.to_string()))
                .await;
        }

        let task = match self.store.get_task(id).await {
            Ok(task) => task,
            Err(err) => {
                tracing::error!(error = %err, "failed to load task for processing");
                return self
                    .complete(HashSet::new(), TaskOutcome::failed(err.to_string()))
                    .await;
            }
        };

        let urls = task.urls();
        let contents = self.fetcher.fetch_all(&urls).await;
        let (entries, archived) = build_entries(&task.files_link, contents);
        let distinct = urls.iter().collect::<HashSet<_>>().len();

        match self.archiver.archive(id, entries).await {
            Ok(location) => {
                tracing::info!(
                    path = %location.path.display(),
                    archived = archived.len(),
                    total = distinct,
                    "task archived"
                );
                let outcome = TaskOutcome::from_counts(archived.len(), distinct);
                self.complete(archived, outcome).await
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to archive task");
                self.complete(HashSet::new(), TaskOutcome::failed(err.to_string()))
                    .await
            }
        }
    }

    /// Best effort: a failing store is logged, the outcome is still returned.
    async fn complete(&self, succeeded: HashSet<String>, outcome: TaskOutcome) -> TaskOutcome {
        if let Err(err) = self
            .store
            .mark_completed(self.task_id, succeeded, outcome.clone())
            .await
        {
            tracing::error!(error = %err, "failed to update task status to completed");
        }
        outcome
    }
}

/// Entry name (URL basename, made unique) -> bytes, plus the URLs that made it in.
///
/// Walks links in attachment order so name collisions resolve the same way
/// every time (`a.jpg`, then `a-1.jpg`).
fn build_entries(
    links: &[FileLink],
    mut contents: HashMap<String, Bytes>,
) -> (BTreeMap<String, Bytes>, HashSet<String>) {
    let mut entries = BTreeMap::new();
    let mut archived = HashSet::new();
    let mut used = HashSet::new();

    for link in links {
        if let Some(body) = contents.remove(&link.link) {
            let name = unique_entry_name(&link.file_name(), &mut used);
            entries.insert(name, body);
            archived.insert(link.link.clone());
        }
    }

    (entries, archived)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_named_by_basename() {
        let links = vec![
            FileLink::new("https://a.example/x/one.jpg"),
            FileLink::new("https://b.example/two.png?v=2"),
            FileLink::new("https://c.example/missing.pdf"),
        ];
        let contents = HashMap::from([
            (links[0].link.clone(), Bytes::from_static(b"1")),
            (links[1].link.clone(), Bytes::from_static(b"2")),
        ]);

        let (entries, archived) = build_entries(&links, contents);

        assert_eq!(
            entries.keys().cloned().collect::<Vec<_>>(),
            vec!["one.jpg", "two.png"]
        );
        assert_eq!(archived.len(), 2);
        assert!(!archived.contains(&links[2].link));
    }

    #[test]
    fn colliding_basenames_get_suffixes_in_link_order() {
        let links = vec![
            FileLink::new("https://a.example/pic.jpg"),
            FileLink::new("https://b.example/pic.jpg"),
        ];
        let contents = HashMap::from([
            (links[0].link.clone(), Bytes::from_static(b"a")),
            (links[1].link.clone(), Bytes::from_static(b"b")),
        ]);

        let (entries, _) = build_entries(&links, contents);

        assert_eq!(entries["pic.jpg"], Bytes::from_static(b"a"));
        assert_eq!(entries["pic-1.jpg"], Bytes::from_static(b"b"));
    }
}
