//! 账户余额快照缓存。
//!
//! 快照只服务于按比例预设金额的展示，支出上限始终由链上校验，
//! 这里的数值过期也不影响正确性。

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::warn;

use crate::chain::ChainGateway;
use crate::monitoring::events;
use crate::types::Address;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BalancesSnapshot {
    /// 原生币余额，最小单位。
    pub native: u128,
    /// 代币余额，最小单位。
    pub token: u128,
}

pub struct BalanceTracker<G> {
    gateway: Arc<G>,
    snapshots: DashMap<(Address, Address), BalancesSnapshot>,
    refresh_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<G> BalanceTracker<G>
where
    G: ChainGateway + 'static,
{
    pub fn new(gateway: Arc<G>) -> Arc<Self> {
        Arc::new(Self {
            gateway,
            snapshots: DashMap::new(),
            refresh_handle: Mutex::new(None),
        })
    }

    pub fn get(&self, owner: &Address, token: &Address) -> Option<BalancesSnapshot> {
        self.snapshots
            .get(&(owner.clone(), token.clone()))
            .map(|entry| *entry)
    }

    /// 并发拉取原生币与代币余额并写入快照。
    pub async fn refresh(&self, owner: &Address, token: &Address) -> Result<BalancesSnapshot> {
        let (native, token_balance) = futures::try_join!(
            self.gateway.native_balance(owner),
            self.gateway.token_balance(token, owner),
        )
        .with_context(|| format!("刷新余额失败: owner={owner} token={token}"))?;

        let snapshot = BalancesSnapshot {
            native,
            token: token_balance,
        };
        self.snapshots
            .insert((owner.clone(), token.clone()), snapshot);
        events::balance_refresh_success(owner, token);
        Ok(snapshot)
    }

    /// 为一组 (账户, 代币) 启动定期刷新。重复调用会替换旧任务。
    pub fn start_refresh_loop(
        self: &Arc<Self>,
        owner: Address,
        token: Address,
        period: Duration,
    ) {
        let tracker = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // consume immediate tick
            loop {
                ticker.tick().await;
                if let Err(err) = tracker.refresh(&owner, &token).await {
                    events::balance_refresh_error(&owner);
                    warn!(
                        target: "wallet::balances",
                        owner = %owner,
                        token = %token,
                        error = %err,
                        "定期余额刷新失败"
                    );
                }
            }
        });
        if let Some(previous) = self.refresh_handle.lock().replace(handle) {
            previous.abort();
        }
    }
}

impl<G> Drop for BalanceTracker<G> {
    fn drop(&mut self) {
        if let Some(handle) = self.refresh_handle.lock().take() {
            handle.abort();
        }
    }
}
