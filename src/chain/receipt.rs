//! 固定间隔、有限次数的回执轮询。

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::{ChainError, ChainGateway, TransactionReceipt};
use crate::config::ReceiptConfig;
use crate::types::TxHash;

pub struct ReceiptWatcher<G> {
    gateway: Arc<G>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl<G> ReceiptWatcher<G>
where
    G: ChainGateway,
{
    pub fn new(gateway: Arc<G>, config: &ReceiptConfig) -> Self {
        Self {
            gateway,
            poll_interval: config.poll_interval(),
            max_attempts: config.max_attempts,
        }
    }

    /// 轮询直到回执出现或尝试耗尽。轮询严格串行，单次失败不终止等待；
    /// 耗尽后返回 [`ChainError::ReceiptTimeout`]，调用方应视为结果未知。
    pub async fn wait_for_receipt(&self, hash: &TxHash) -> Result<TransactionReceipt, ChainError> {
        for attempt in 1..=self.max_attempts {
            match self.gateway.transaction_receipt(hash).await {
                Ok(Some(receipt)) => {
                    debug!(
                        target: "chain::receipt",
                        tx_hash = %hash,
                        attempt,
                        block = ?receipt.block_number,
                        success = receipt.is_success(),
                        "回执已确认"
                    );
                    return Ok(receipt);
                }
                Ok(None) => {
                    trace!(
                        target: "chain::receipt",
                        tx_hash = %hash,
                        attempt,
                        "交易尚未打包"
                    );
                }
                Err(err) => {
                    warn!(
                        target: "chain::receipt",
                        tx_hash = %hash,
                        attempt,
                        error = %err,
                        "回执查询失败，继续轮询"
                    );
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        Err(ChainError::ReceiptTimeout {
            hash: hash.clone(),
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::chain::ReceiptStatus;
    use crate::types::Address;

    struct ScriptedGateway {
        polls: AtomicU32,
        ready_after: u32,
    }

    #[async_trait]
    impl ChainGateway for ScriptedGateway {
        async fn native_balance(&self, _address: &Address) -> Result<u128, ChainError> {
            unreachable!("receipt watcher never reads balances")
        }

        async fn token_balance(
            &self,
            _token: &Address,
            _owner: &Address,
        ) -> Result<u128, ChainError> {
            unreachable!("receipt watcher never reads balances")
        }

        async fn broadcast(&self, _raw: &str) -> Result<TxHash, ChainError> {
            unreachable!("receipt watcher never broadcasts")
        }

        async fn transaction_receipt(
            &self,
            hash: &TxHash,
        ) -> Result<Option<TransactionReceipt>, ChainError> {
            let count = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            if count >= self.ready_after {
                Ok(Some(TransactionReceipt {
                    transaction_hash: hash.clone(),
                    block_number: Some(1),
                    status: ReceiptStatus::Success,
                }))
            } else {
                Ok(None)
            }
        }
    }

    fn config() -> ReceiptConfig {
        ReceiptConfig {
            poll_interval_ms: 1_000,
            max_attempts: 5,
        }
    }

    fn hash() -> TxHash {
        format!("0x{}", "cd".repeat(32)).parse().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_when_receipt_appears() {
        let gateway = Arc::new(ScriptedGateway {
            polls: AtomicU32::new(0),
            ready_after: 3,
        });
        let watcher = ReceiptWatcher::new(Arc::clone(&gateway), &config());

        let receipt = watcher.wait_for_receipt(&hash()).await.expect("receipt");
        assert!(receipt.is_success());
        assert_eq!(gateway.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_after_attempt_budget() {
        let gateway = Arc::new(ScriptedGateway {
            polls: AtomicU32::new(0),
            ready_after: u32::MAX,
        });
        let watcher = ReceiptWatcher::new(Arc::clone(&gateway), &config());

        let err = watcher.wait_for_receipt(&hash()).await.unwrap_err();
        assert!(matches!(
            err,
            ChainError::ReceiptTimeout { attempts: 5, .. }
        ));
        // 预算耗尽后不再发起任何轮询
        assert_eq!(gateway.polls.load(Ordering::SeqCst), 5);
    }
}
