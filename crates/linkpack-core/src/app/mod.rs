//! App - アプリケーション層
//!
//! ports を組み合わせてタスクのライフサイクルを実装する。
//!
//! # 主要コンポーネント
//! - **OrchestratorBuilder**: 設定検証と既定ポートのワイヤリング
//! - **TaskOrchestrator**: 呼び出し側の全操作（作成・追加・参照・結果）
//! - **AdmissionGate**: 同時に扱うタスク数の上限
//! - **ProcessingPool**: 処理ジョブを走らせる有界プール
//! - **ProcessingJob**: fetch -> archive -> 完了記録

pub mod admission;
pub mod builder;
pub mod job;
pub mod orchestrator;
pub mod pool;
pub mod status;

pub use self::admission::{AdmissionGate, AdmissionPermit};
pub use self::builder::{BuildError, OrchestratorBuilder};
pub use self::job::ProcessingJob;
pub use self::orchestrator::TaskOrchestrator;
pub use self::pool::{PoolSlot, ProcessingPool};
pub use self::status::{RuntimeStatus, TaskCounts};
