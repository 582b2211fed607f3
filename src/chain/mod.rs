//! 链访问层：余额读取、交易广播与回执轮询。
//!
//! 管道把链当作黑盒，只依赖这里的 [`ChainGateway`] 抽象；读客户端无状态，
//! 可在并发任务间共享。

pub mod receipt;
pub mod rpc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::types::{Address, ParseError, TxHash};

pub use receipt::ReceiptWatcher;
pub use rpc::RpcChainGateway;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("RPC 网络请求失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("RPC 响应解析失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error("RPC 节点返回错误 {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error(transparent)]
    Decode(#[from] ParseError),
    #[error("等待回执超时: {hash}（已轮询 {attempts} 次）")]
    ReceiptTimeout { hash: TxHash, attempts: u32 },
}

/// 交易回执的包含状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

#[derive(Debug, Clone)]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    pub status: ReceiptStatus,
}

impl TransactionReceipt {
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// 回执的 JSON-RPC 线上形态。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReceiptPayload {
    pub transaction_hash: TxHash,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ReceiptPayload {
    pub(crate) fn into_receipt(self) -> Result<TransactionReceipt, ChainError> {
        let block_number = self
            .block_number
            .as_deref()
            .map(crate::types::parse_quantity)
            .transpose()?
            .map(|value| value as u64);
        // 状态缺失的回执按成功处理（拜占庭之前的老节点行为）
        let status = match self.status.as_deref() {
            Some(raw) => {
                if crate::types::parse_quantity(raw)? == 0 {
                    ReceiptStatus::Reverted
                } else {
                    ReceiptStatus::Success
                }
            }
            None => ReceiptStatus::Success,
        };
        Ok(TransactionReceipt {
            transaction_hash: self.transaction_hash,
            block_number,
            status,
        })
    }
}

/// 链读写入口。实现必须可并发共享。
#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// 原生币余额，最小单位。
    async fn native_balance(&self, address: &Address) -> Result<u128, ChainError>;

    /// ERC-20 `balanceOf`，最小单位。
    async fn token_balance(&self, token: &Address, owner: &Address) -> Result<u128, ChainError>;

    /// 广播已签名交易，返回交易哈希。
    async fn broadcast(&self, raw_transaction: &str) -> Result<TxHash, ChainError>;

    /// 查询回执；交易尚未打包时返回 `None`。
    async fn transaction_receipt(
        &self,
        hash: &TxHash,
    ) -> Result<Option<TransactionReceipt>, ChainError>;
}
