//! Archiver port - 取得したファイル群を 1 つのアーカイブにまとめる
//!
//! # 実装
//! - `impls::ZipArchiver`（ローカルディレクトリに `<task-id>.zip`）

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::domain::{ArchiveError, TaskId};

/// アーカイブの場所と、ダウンロード時の推奨ファイル名
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveLocation {
    pub path: PathBuf,
    pub file_name: String,
}

/// Archiver はエントリ名 -> バイト列 の集合を TaskId をキーにした 1 アーティファクトにする
///
/// # 設計原則
/// - 保存先が無ければ作る
/// - 途中で失敗した書きかけのファイルを `locate` で見つかる名前に置かない
#[async_trait]
pub trait Archiver: Send + Sync {
    async fn archive(
        &self,
        id: TaskId,
        entries: BTreeMap<String, Bytes>,
    ) -> Result<ArchiveLocation, ArchiveError>;

    /// 完成済みのアーカイブがあれば返す
    async fn locate(&self, id: TaskId) -> Option<ArchiveLocation>;
}
