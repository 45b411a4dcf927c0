//! linkpack-core
//!
//! リンクをタスク単位で集め、閾値に達したら取得して zip にまとめる。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, link, state, task, errors）
//! - **ports**: 抽象化レイヤー（TaskStore, LinkFetcher, Archiver, Clock, IdGenerator）
//! - **impls**: 実装（InMemoryTaskStore, HttpLinkFetcher, ZipArchiver）
//! - **app**: アプリケーションロジック（TaskOrchestrator, 受付制御, 処理プール）
//! - **config**: BundleConfig

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use self::app::{OrchestratorBuilder, RuntimeStatus, TaskOrchestrator};
pub use self::config::BundleConfig;
