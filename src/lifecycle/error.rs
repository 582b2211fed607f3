use thiserror::Error;

use crate::types::TxHash;
use crate::wallet::SignerError;

/// 生命周期终态错误。
///
/// 广播之后的超时（回执、索引）意味着结果未知而不是失败：交易可能
/// 已经上链，调用方不得自动重新广播，否则可能双花。
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("签名器连接的网络不符: 期望 {expected}，实际 {actual}")]
    WrongNetwork { expected: u64, actual: u64 },
    #[error("用户拒绝了签名请求")]
    UserRejected,
    #[error("交易广播失败: {0}")]
    BroadcastFailed(String),
    #[error("交易在链上回滚: {0}")]
    TransactionReverted(TxHash),
    #[error("等待回执超时: {0}，链上结果未知")]
    ReceiptTimeout(TxHash),
    #[error("等待索引超时: {0}，链上结果未知")]
    IndexingTimeout(TxHash),
}

impl LifecycleError {
    /// 指标与埋点用的稳定标签。
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::WrongNetwork { .. } => "wrong_network",
            LifecycleError::UserRejected => "user_rejected",
            LifecycleError::BroadcastFailed(_) => "broadcast_failed",
            LifecycleError::TransactionReverted(_) => "transaction_reverted",
            LifecycleError::ReceiptTimeout(_) => "receipt_timeout",
            LifecycleError::IndexingTimeout(_) => "indexing_timeout",
        }
    }

    /// 结果未知的终态：不能当作确定失败处理。
    pub fn is_unknown_outcome(&self) -> bool {
        matches!(
            self,
            LifecycleError::ReceiptTimeout(_) | LifecycleError::IndexingTimeout(_)
        )
    }
}

impl From<SignerError> for LifecycleError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::WrongNetwork { expected, actual } => {
                LifecycleError::WrongNetwork { expected, actual }
            }
            SignerError::UserRejected => LifecycleError::UserRejected,
            SignerError::Unavailable(reason) | SignerError::Broadcast(reason) => {
                LifecycleError::BroadcastFailed(reason)
            }
        }
    }
}
