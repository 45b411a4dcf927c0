//! HttpLinkFetcher - reqwest による LinkFetcher 実装
//!
//! - 1 インスタンスを全ジョブで共有する。Semaphore の許可数が
//!   プロセス全体の同時リクエスト数の上限になる
//! - タイムアウトは Client 側で設定する（ハングしたリクエストがジョブの枠を握り続けないように）

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Instrument, Span};

use crate::domain::FetchError;
use crate::ports::LinkFetcher;

pub struct HttpLinkFetcher {
    client: reqwest::Client,
    permits: Arc<Semaphore>,
}

impl HttpLinkFetcher {
    /// `max_parallel` 本まで同時に取得する。各リクエストは `timeout` で打ち切る。
    pub fn new(max_parallel: usize, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, max_parallel))
    }

    pub fn with_client(client: reqwest::Client, max_parallel: usize) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(max_parallel.max(1))),
        }
    }
}

async fn fetch_one(client: &reqwest::Client, url: &str) -> Result<Bytes, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(FetchError::Status(status.as_u16()));
    }

    response
        .bytes()
        .await
        .map_err(|e| FetchError::Body(e.to_string()))
}

#[async_trait]
impl LinkFetcher for HttpLinkFetcher {
    async fn fetch_all(&self, urls: &[String]) -> HashMap<String, Bytes> {
        let mut workers = JoinSet::new();
        let mut seen = HashSet::new();

        for url in urls {
            if !seen.insert(url.as_str()) {
                continue;
            }
            let client = self.client.clone();
            let permits = Arc::clone(&self.permits);
            let url = url.clone();

            // spawn すると span が切れるので、呼び出し側（task_id 付き）の span を引き継ぐ
            workers.spawn(
                async move {
                    let Ok(_permit) = permits.acquire_owned().await else {
                        return (url, Err(FetchError::Transport("fetch pool closed".into())));
                    };
                    let result = fetch_one(&client, &url).await;
                    (url, result)
                }
                .instrument(Span::current()),
            );
        }

        let mut contents = HashMap::with_capacity(seen.len());
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((url, Ok(body))) => {
                    tracing::debug!(link = %url, bytes = body.len(), "link fetched");
                    contents.insert(url, body);
                }
                Ok((url, Err(err))) => {
                    tracing::error!(link = %url, error = %err, "failed to fetch link");
                }
                Err(err) => {
                    tracing::error!(error = %err, "fetch worker stopped unexpectedly");
                }
            }
        }

        contents
    }
}
