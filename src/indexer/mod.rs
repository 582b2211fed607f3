//! 索引服务等待器。
//!
//! 链上已确认的变更要等链下索引层追上之后 UI 才能读到，这里轮询
//! 索引状态直到指定交易被处理完毕。

pub mod client;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::config::IndexerConfig;
use crate::types::TxHash;

pub use client::GraphqlIndexerClient;

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("索引服务请求失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("索引服务请求超时（{timeout_ms}ms）")]
    Timeout {
        timeout_ms: u64,
        #[source]
        source: reqwest::Error,
    },
    #[error("索引服务返回状态 {status}: {body}")]
    ApiStatus { status: u16, body: String },
    #[error("索引状态响应解析失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error("索引状态响应结构不符合预期: {0}")]
    Schema(String),
    #[error("等待索引超时: {hash}（已轮询 {attempts} 次）")]
    IndexingTimeout { hash: TxHash, attempts: u32 },
}

/// 索引状态查询入口。
#[async_trait]
pub trait IndexingStatusSource: Send + Sync {
    /// 指定交易是否已被索引层处理。
    async fn indexing_status(&self, hash: &TxHash) -> Result<bool, IndexerError>;
}

pub struct IndexingWaiter<S> {
    source: Arc<S>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl<S> IndexingWaiter<S>
where
    S: IndexingStatusSource,
{
    pub fn new(source: Arc<S>, config: &IndexerConfig) -> Self {
        Self {
            source,
            poll_interval: config.poll_interval(),
            max_attempts: config.max_attempts,
        }
    }

    /// 严格串行地轮询索引状态，查询失败计入尝试次数。耗尽预算后
    /// 返回 [`IndexerError::IndexingTimeout`]，之后不再发起任何轮询。
    pub async fn wait_until_indexed(&self, hash: &TxHash) -> Result<(), IndexerError> {
        for attempt in 1..=self.max_attempts {
            match self.source.indexing_status(hash).await {
                Ok(true) => {
                    debug!(
                        target: "indexer::wait",
                        tx_hash = %hash,
                        attempt,
                        "索引层已追上"
                    );
                    return Ok(());
                }
                Ok(false) => {
                    trace!(
                        target: "indexer::wait",
                        tx_hash = %hash,
                        attempt,
                        "交易尚未被索引"
                    );
                }
                Err(err) => {
                    warn!(
                        target: "indexer::wait",
                        tx_hash = %hash,
                        attempt,
                        error = %err,
                        "索引状态查询失败，继续轮询"
                    );
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Err(IndexerError::IndexingTimeout {
            hash: hash.clone(),
            attempts: self.max_attempts,
        })
    }
}

/// 把一次索引等待包装成可取消的后台任务。
///
/// UI 视图可能在等待途中被销毁（切换账户、关闭弹层），取消必须
/// 终止轮询循环本身而不是丢弃结果，否则残留的定时器会污染下一个
/// 会话。任务被丢弃时自动中止，回调不会再触发。
pub struct IndexingWaitTask {
    handle: JoinHandle<()>,
}

impl IndexingWaitTask {
    pub fn spawn<S, F>(waiter: IndexingWaiter<S>, hash: TxHash, on_done: F) -> Self
    where
        S: IndexingStatusSource + 'static,
        F: FnOnce(Result<(), IndexerError>) + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let result = waiter.wait_until_indexed(&hash).await;
            on_done(result);
        });
        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for IndexingWaitTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
