//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryTaskStore**: プロセス内のタスク正本（タスク単位のロック）
//! - **HttpLinkFetcher**: reqwest による並列ダウンロード
//! - **ZipArchiver**: ローカルディレクトリへの zip 書き出し

pub mod http_fetcher;
pub mod inmem_store;
pub mod zip_archiver;

pub use self::http_fetcher::HttpLinkFetcher;
pub use self::inmem_store::InMemoryTaskStore;
pub use self::zip_archiver::ZipArchiver;
