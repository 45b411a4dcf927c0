//! LinkFetcher port - リンク先コンテンツの並行取得
//!
//! # 実装
//! - `impls::HttpLinkFetcher`（reqwest + Semaphore）

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;

/// LinkFetcher は URL 一覧を並行に取得し、成功したものだけを返す
///
/// # 契約
/// - 全 URL の取得が成功 or 失敗で終わるまで戻らない（途中結果は返さない）
/// - 失敗（通信エラー・200 以外・本文読み取り失敗）はリトライせず、ログに残して捨てる
/// - ログは呼び出し側の tracing span（task_id 付き）の中で出る
#[async_trait]
pub trait LinkFetcher: Send + Sync {
    async fn fetch_all(&self, urls: &[String]) -> HashMap<String, Bytes>;
}
