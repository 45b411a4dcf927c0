//! TaskStore port - タスクの正本（source of truth）
//!
//! TaskStore は以下を管理します：
//! - タスクとリンク一覧（追加順を保持）
//! - リンク単位・タスク単位の状態遷移
//! - 処理結果（TaskOutcome）
//!
//! # 実装
//! - `impls::InMemoryTaskStore`（揮発性、プロセス再起動で消える）

use std::collections::HashSet;

use async_trait::async_trait;

use crate::domain::{FileLink, StoreError, Task, TaskId, TaskOutcome};

/// TaskStore はタスクの作成・参照・追記・状態遷移を提供
///
/// # 設計原則
/// - 返す Task は常にスナップショット（clone）。呼び出し側は直接変更できない
/// - 同じタスクへの変更は直列化される。別タスク同士はお互いをブロックしない
/// - リンク数上限のチェックは追記と同じクリティカルセクション内で行う
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// 空のタスクを作成して ID を返す
    async fn create_task(&self) -> TaskId;

    /// 全タスクのスナップショット（作成順）
    async fn all_tasks(&self) -> Vec<Task>;

    async fn get_task(&self, id: TaskId) -> Result<Task, StoreError>;

    /// リンクを追記し、追記後のタスクを返す
    ///
    /// 追記後のリンク数が `limit` を超える場合は何も変更せず `LimitExceeded`。
    async fn add_links(
        &self,
        id: TaskId,
        links: Vec<FileLink>,
        limit: usize,
    ) -> Result<Task, StoreError>;

    /// 末尾 `count` 件のリンクを取り除く（ジョブ投入に失敗したバッチの巻き戻し）
    async fn remove_last_links(&self, id: TaskId, count: usize) -> Result<(), StoreError>;

    /// 全リンクを InProcess に、タスクを Processing にする
    async fn mark_in_process(&self, id: TaskId) -> Result<(), StoreError>;

    /// `succeeded` に含まれるリンクを Completed、それ以外を Error にし、
    /// タスクを Completed にして outcome を記録する
    async fn mark_completed(
        &self,
        id: TaskId,
        succeeded: HashSet<String>,
        outcome: TaskOutcome,
    ) -> Result<(), StoreError>;
}
