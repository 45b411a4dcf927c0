//! InMemoryTaskStore - 揮発性の TaskStore 実装
//!
//! # ロック設計
//! - 外側: `RwLock<HashMap<TaskId, Arc<Mutex<Task>>>>`。作成時だけ write、他は read で短く持つ
//! - 内側: タスクごとの `Mutex<Task>`。同じタスクへの変更はここで直列化される
//!
//! 外側のロックはレコードの `Arc` を取り出したらすぐ手放すので、
//! 別タスクへの操作同士はお互いを待たない。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{FileLink, StoreError, Task, TaskId, TaskOutcome};
use crate::ports::{Clock, IdGenerator, SystemClock, TaskStore, UlidGenerator};

type Shard = Arc<Mutex<Task>>;

pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<TaskId, Shard>>,
    ids: Box<dyn IdGenerator>,
    clock: Box<dyn Clock>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Timestamps and ID prefixes both follow `clock`.
    pub fn with_clock<C: Clock + Clone + 'static>(clock: C) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            ids: Box::new(UlidGenerator::new(clock.clone())),
            clock: Box::new(clock),
        }
    }

    /// Look up the per-task shard; the map lock is released before returning.
    async fn shard(&self, id: TaskId) -> Result<Shard, StoreError> {
        let tasks = self.tasks.read().await;
        tasks
            .get(&id)
            .cloned()
            .ok_or(StoreError::TaskNotFound(id))
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create_task(&self) -> TaskId {
        let mut tasks = self.tasks.write().await;
        // ULID の衝突は現実的には起きないが、再利用だけは絶対にしない
        let id = loop {
            let candidate = self.ids.generate_task_id();
            if !tasks.contains_key(&candidate) {
                break candidate;
            }
        };
        let task = Task::new(id, self.clock.now());
        tasks.insert(id, Arc::new(Mutex::new(task)));
        id
    }

    async fn all_tasks(&self) -> Vec<Task> {
        let shards: Vec<Shard> = {
            let tasks = self.tasks.read().await;
            tasks.values().cloned().collect()
        };

        let mut snapshot = Vec::with_capacity(shards.len());
        for shard in shards {
            snapshot.push(shard.lock().await.clone());
        }
        snapshot.sort_by_key(|task| task.id);
        snapshot
    }

    async fn get_task(&self, id: TaskId) -> Result<Task, StoreError> {
        let shard = self.shard(id).await?;
        let task = shard.lock().await;
        Ok(task.clone())
    }

    async fn add_links(
        &self,
        id: TaskId,
        links: Vec<FileLink>,
        limit: usize,
    ) -> Result<Task, StoreError> {
        let shard = self.shard(id).await?;
        let mut task = shard.lock().await;

        let requested = task.link_count() + links.len();
        if requested > limit {
            return Err(StoreError::LimitExceeded { limit, requested });
        }

        task.push_links(links, self.clock.now());
        Ok(task.clone())
    }

    async fn remove_last_links(&self, id: TaskId, count: usize) -> Result<(), StoreError> {
        let shard = self.shard(id).await?;
        let mut task = shard.lock().await;
        task.truncate_last(count, self.clock.now());
        Ok(())
    }

    async fn mark_in_process(&self, id: TaskId) -> Result<(), StoreError> {
        let shard = self.shard(id).await?;
        let mut task = shard.lock().await;
        task.mark_in_process(self.clock.now());
        Ok(())
    }

    async fn mark_completed(
        &self,
        id: TaskId,
        succeeded: HashSet<String>,
        outcome: TaskOutcome,
    ) -> Result<(), StoreError> {
        let shard = self.shard(id).await?;
        let mut task = shard.lock().await;
        if !task.mark_completed(&succeeded, outcome, self.clock.now()) {
            tracing::warn!(task_id = %id, "task already completed, ignoring second completion");
        }
        Ok(())
    }
}
