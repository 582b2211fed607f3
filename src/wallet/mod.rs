//! 钱包签名器抽象与余额快照。
//!
//! 签名器不跨并发生命周期共享；同一账户同一时刻至多一笔未决广播，
//! 由 UI 层的单飞控制保证，这里不做锁。

pub mod balances;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::types::{TxHash, UnsignedTransaction};

pub use balances::{BalanceTracker, BalancesSnapshot};

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("签名器连接的网络不符: 期望 {expected}，实际 {actual}")]
    WrongNetwork { expected: u64, actual: u64 },
    #[error("用户拒绝了签名请求")]
    UserRejected,
    #[error("签名器不可用: {0}")]
    Unavailable(String),
    #[error("交易广播失败: {0}")]
    Broadcast(String),
}

/// 钱包侧能力：查询当前网络、请求切换、签名并广播。
#[async_trait]
pub trait WalletSigner: Send + Sync {
    async fn active_chain_id(&self) -> Result<u64, SignerError>;

    /// 请求钱包切换网络。用户拒绝返回 [`SignerError::UserRejected`]。
    async fn switch_chain(&self, chain_id: u64) -> Result<(), SignerError>;

    /// 签名并广播，返回交易哈希。
    async fn send_transaction(&self, tx: &UnsignedTransaction) -> Result<TxHash, SignerError>;
}

/// 网络闸门：签名器当前网络与目标不一致时先请求切换；拒绝或切换
/// 失败统一折叠为 [`SignerError::WrongNetwork`]，调用方据此放弃整个操作。
pub async fn ensure_chain<S>(signer: &S, expected: u64) -> Result<(), SignerError>
where
    S: WalletSigner + ?Sized,
{
    let actual = signer.active_chain_id().await?;
    if actual == expected {
        return Ok(());
    }

    info!(
        target: "wallet::network",
        expected,
        actual,
        "签名器网络不符，请求切换"
    );

    match signer.switch_chain(expected).await {
        Ok(()) => Ok(()),
        Err(err) => {
            warn!(
                target: "wallet::network",
                expected,
                actual,
                error = %err,
                "网络切换被拒绝或失败"
            );
            Err(SignerError::WrongNetwork { expected, actual })
        }
    }
}
