//! 交易生命周期编排。
//!
//! 把变更层返回的结果归类为「已最终化」或「链上待确认」，驱动
//! 广播 → 回执 → 索引三段等待，并保证完成/失败回调恰好触发一次。

pub mod error;

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::chain::{ChainError, ChainGateway, ReceiptWatcher};
use crate::indexer::{IndexerError, IndexingStatusSource, IndexingWaiter};
use crate::monitoring::events;
use crate::types::{Intent, TxHash, UnsignedTransaction};
use crate::wallet::{self, WalletSigner};

pub use error::LifecycleError;

/// 变更层提交结果。显式和类型，穷尽性由编译器保证。
#[derive(Debug, Clone)]
pub enum MutationOutcome {
    /// 动作已完全生效（免 gas 或自托管账户），无需链上等待。
    Final,
    /// 还有一笔链上交易要走完确认流程。
    Pending(PendingTransaction),
}

#[derive(Debug, Clone)]
pub struct PendingTransaction {
    pub chain_id: u64,
    pub payload: PendingPayload,
    /// 由第三方代付。代付交易跳过用户签名，但仍要等回执与索引。
    pub sponsored: bool,
}

#[derive(Debug, Clone)]
pub enum PendingPayload {
    /// 需要签名器广播的未签名交易。
    Unsigned(UnsignedTransaction),
    /// 已在链上广播，只差确认。
    Hash(TxHash),
}

/// 单次生命周期的状态。归一个控制器调用独占，回调触发后销毁。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Submitted,
    Broadcasting,
    AwaitingReceipt,
    AwaitingIndex,
    Completed,
    Failed,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Submitted => "submitted",
            LifecycleState::Broadcasting => "broadcasting",
            LifecycleState::AwaitingReceipt => "awaiting_receipt",
            LifecycleState::AwaitingIndex => "awaiting_index",
            LifecycleState::Completed => "completed",
            LifecycleState::Failed => "failed",
        }
    }
}

/// 完成与失败回调。按值消费，类型上保证恰好触发一次。
pub struct LifecycleHandlers {
    on_completed: Box<dyn FnOnce(Option<TxHash>) + Send>,
    on_error: Box<dyn FnOnce(LifecycleError) + Send>,
}

impl LifecycleHandlers {
    pub fn new<C, E>(on_completed: C, on_error: E) -> Self
    where
        C: FnOnce(Option<TxHash>) + Send + 'static,
        E: FnOnce(LifecycleError) + Send + 'static,
    {
        Self {
            on_completed: Box::new(on_completed),
            on_error: Box::new(on_error),
        }
    }
}

pub struct TransactionLifecycleController<G, S, I> {
    signer: Arc<S>,
    receipt: ReceiptWatcher<G>,
    indexing: IndexingWaiter<I>,
}

impl<G, S, I> TransactionLifecycleController<G, S, I>
where
    G: ChainGateway,
    S: WalletSigner,
    I: IndexingStatusSource,
{
    pub fn new(signer: Arc<S>, receipt: ReceiptWatcher<G>, indexing: IndexingWaiter<I>) -> Self {
        Self {
            signer,
            receipt,
            indexing,
        }
    }

    /// 驱动一次生命周期。两个回调合计恰好触发一次，之后不再有任何
    /// 轮询。控制器自身不改写调用方缓存，缓存调和在 `on_completed`
    /// 里完成。
    pub async fn run(&self, intent: &Intent, outcome: MutationOutcome, handlers: LifecycleHandlers) {
        events::intent_submitted(intent);
        let started = Instant::now();

        match self.drive(intent, outcome).await {
            Ok(hash) => {
                events::lifecycle_state(intent, LifecycleState::Completed);
                let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
                events::lifecycle_completed(intent, hash.as_ref(), elapsed_ms);
                (handlers.on_completed)(hash);
            }
            Err(err) => {
                events::lifecycle_state(intent, LifecycleState::Failed);
                events::lifecycle_failed(intent, &err);
                (handlers.on_error)(err);
            }
        }
    }

    async fn drive(
        &self,
        intent: &Intent,
        outcome: MutationOutcome,
    ) -> Result<Option<TxHash>, LifecycleError> {
        events::lifecycle_state(intent, LifecycleState::Submitted);

        let pending = match outcome {
            // 已最终化：不触网，立即完成
            MutationOutcome::Final => return Ok(None),
            MutationOutcome::Pending(pending) => pending,
        };

        debug!(
            target: "lifecycle::run",
            intent_id = %intent.id,
            chain_id = pending.chain_id,
            sponsored = pending.sponsored,
            "进入链上确认流程"
        );

        let hash = match pending.payload {
            PendingPayload::Hash(hash) => hash,
            PendingPayload::Unsigned(tx) => {
                events::lifecycle_state(intent, LifecycleState::Broadcasting);
                // 广播前先过网络闸门，切换被拒则零广播退出
                wallet::ensure_chain(self.signer.as_ref(), pending.chain_id).await?;
                self.signer.send_transaction(&tx).await?
            }
        };

        events::lifecycle_state(intent, LifecycleState::AwaitingReceipt);
        let receipt = self
            .receipt
            .wait_for_receipt(&hash)
            .await
            .map_err(|err| match err {
                ChainError::ReceiptTimeout { hash, .. } => LifecycleError::ReceiptTimeout(hash),
                other => LifecycleError::BroadcastFailed(other.to_string()),
            })?;

        if !receipt.is_success() {
            return Err(LifecycleError::TransactionReverted(hash));
        }

        events::lifecycle_state(intent, LifecycleState::AwaitingIndex);
        self.indexing
            .wait_until_indexed(&hash)
            .await
            .map_err(|err| match err {
                IndexerError::IndexingTimeout { hash, .. } => {
                    LifecycleError::IndexingTimeout(hash)
                }
                _ => LifecycleError::IndexingTimeout(hash.clone()),
            })?;

        Ok(Some(hash))
    }
}
