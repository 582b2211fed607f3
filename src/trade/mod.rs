//! 交易执行：把 (方向, 金额, 代币, 账户) 组装成一笔换币并广播。
//!
//! 与其他链上动作不同，交易广播成功即视为完成，不等回执也不等
//! 索引，这一不对称是沿用的产品行为。

pub mod preset;

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::api::{SwapParams, TradeCallPayload, VenueApiClient, VenueError};
use crate::config::TradeConfig;
use crate::monitoring::events;
use crate::types::{Address, Side, TxHash, format_units, parse_units};
use crate::wallet::{self, BalancesSnapshot, SignerError, WalletSigner};

/// 原生币固定 18 位小数。
pub const NATIVE_UNIT_DECIMALS: u32 = 18;

#[derive(Debug, Error)]
pub enum TradeError {
    #[error("交易金额缺失或非正: {0}")]
    InvalidAmount(Decimal),
    #[error("签名器连接的网络不符: 期望 {expected}，实际 {actual}")]
    WrongNetwork { expected: u64, actual: u64 },
    #[error("用户拒绝了签名请求")]
    UserRejected,
    #[error("成交调用获取失败: {0}")]
    Venue(#[from] VenueError),
    #[error("交易广播失败: {0}")]
    Broadcast(String),
}

impl From<SignerError> for TradeError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::WrongNetwork { expected, actual } => {
                TradeError::WrongNetwork { expected, actual }
            }
            SignerError::UserRejected => TradeError::UserRejected,
            SignerError::Unavailable(reason) | SignerError::Broadcast(reason) => {
                TradeError::Broadcast(reason)
            }
        }
    }
}

/// 一笔买入或卖出。金额是展示单位：买入为原生币，卖出为代币。
#[derive(Debug, Clone)]
pub struct TradeOrder {
    pub side: Side,
    pub amount: Decimal,
    pub token: Address,
    pub sender: Address,
}

/// 成交调用来源，场所 API 的可替换缝。
#[async_trait]
pub trait TradeCallSource: Send + Sync {
    async fn trade_call(&self, params: &SwapParams) -> Result<TradeCallPayload, VenueError>;
}

#[async_trait]
impl TradeCallSource for VenueApiClient {
    async fn trade_call(&self, params: &SwapParams) -> Result<TradeCallPayload, VenueError> {
        VenueApiClient::trade_call(self, params).await
    }
}

pub struct TradeExecutor<S, V> {
    signer: Arc<S>,
    venue: Arc<V>,
    config: TradeConfig,
}

impl<S, V> TradeExecutor<S, V>
where
    S: WalletSigner,
    V: TradeCallSource,
{
    pub fn new(signer: Arc<S>, venue: Arc<V>, config: TradeConfig) -> Self {
        Self {
            signer,
            venue,
            config,
        }
    }

    /// 校验、过网络闸门、取成交调用、签名广播。广播成功即返回哈希。
    pub async fn execute(&self, order: &TradeOrder) -> Result<TxHash, TradeError> {
        if order.amount <= Decimal::ZERO {
            events::trade_rejected(order.side, "invalid_amount");
            return Err(TradeError::InvalidAmount(order.amount));
        }

        let unit_decimals = match order.side {
            Side::Buy => NATIVE_UNIT_DECIMALS,
            Side::Sell => self.config.token_unit_decimals,
        };
        let amount_in = parse_units(order.amount, unit_decimals).ok_or_else(|| {
            events::trade_rejected(order.side, "invalid_amount");
            TradeError::InvalidAmount(order.amount)
        })?;

        wallet::ensure_chain(self.signer.as_ref(), self.config.chain_id)
            .await
            .map_err(|err| {
                events::trade_rejected(order.side, "wrong_network");
                TradeError::from(err)
            })?;

        let params = SwapParams {
            side: order.side,
            amount_in,
            token: order.token.clone(),
            sender: order.sender.clone(),
            slippage_bps: self.config.slippage_bps,
        };

        debug!(
            target: "trade::execute",
            side = order.side.as_str(),
            amount_in,
            token = %order.token,
            slippage_bps = self.config.slippage_bps,
            "请求成交调用"
        );

        let call = self.venue.trade_call(&params).await?;
        let tx = call.into_unsigned(self.config.chain_id);
        let hash = self
            .signer
            .send_transaction(&tx)
            .await
            .map_err(TradeError::from)?;

        events::trade_submitted(order.side, &hash);
        Ok(hash)
    }

    /// 按余额比例换算预设金额。买入基于原生币余额，卖出基于代币余额。
    pub fn preset_amount(&self, side: Side, pct: u32, balances: &BalancesSnapshot) -> Decimal {
        match side {
            Side::Buy => preset::preset_amount(
                Side::Buy,
                pct,
                format_units(balances.native, NATIVE_UNIT_DECIMALS),
                self.config.native_preset_decimals,
                self.config.fee_reserve,
            ),
            Side::Sell => preset::preset_amount(
                Side::Sell,
                pct,
                format_units(balances.token, self.config.token_unit_decimals),
                self.config.token_preset_decimals,
                self.config.fee_reserve,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::types::UnsignedTransaction;

    struct MockSigner {
        chain_id: u64,
        accept_switch: bool,
        switch_calls: AtomicU32,
        broadcasts: AtomicU32,
    }

    #[async_trait]
    impl WalletSigner for MockSigner {
        async fn active_chain_id(&self) -> Result<u64, SignerError> {
            Ok(self.chain_id)
        }

        async fn switch_chain(&self, _chain_id: u64) -> Result<(), SignerError> {
            self.switch_calls.fetch_add(1, Ordering::SeqCst);
            if self.accept_switch {
                Ok(())
            } else {
                Err(SignerError::UserRejected)
            }
        }

        async fn send_transaction(
            &self,
            _tx: &UnsignedTransaction,
        ) -> Result<TxHash, SignerError> {
            self.broadcasts.fetch_add(1, Ordering::SeqCst);
            Ok(format!("0x{}", "bb".repeat(32)).parse().unwrap())
        }
    }

    struct MockVenue {
        calls: AtomicU32,
        last_params: Mutex<Option<SwapParams>>,
    }

    #[async_trait]
    impl TradeCallSource for MockVenue {
        async fn trade_call(&self, params: &SwapParams) -> Result<TradeCallPayload, VenueError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_params.lock() = Some(params.clone());
            Ok(TradeCallPayload {
                amount_out: 250_000,
                to: "0x5555555555555555555555555555555555555555".parse().unwrap(),
                data: "0xdeadbeef".to_string(),
                value: params.amount_in,
            })
        }
    }

    fn signer_on(chain_id: u64, accept_switch: bool) -> Arc<MockSigner> {
        Arc::new(MockSigner {
            chain_id,
            accept_switch,
            switch_calls: AtomicU32::new(0),
            broadcasts: AtomicU32::new(0),
        })
    }

    fn venue() -> Arc<MockVenue> {
        Arc::new(MockVenue {
            calls: AtomicU32::new(0),
            last_params: Mutex::new(None),
        })
    }

    fn order(side: Side, amount: &str) -> TradeOrder {
        TradeOrder {
            side,
            amount: amount.parse().unwrap(),
            token: "0x3333333333333333333333333333333333333333".parse().unwrap(),
            sender: "0x4444444444444444444444444444444444444444".parse().unwrap(),
        }
    }

    fn executor(
        signer: Arc<MockSigner>,
        venue: Arc<MockVenue>,
    ) -> TradeExecutor<MockSigner, MockVenue> {
        TradeExecutor::new(signer, venue, TradeConfig::default())
    }

    #[tokio::test]
    async fn non_positive_amount_rejected_before_any_network() {
        let signer = signer_on(8453, true);
        let venue_mock = venue();
        let exec = executor(Arc::clone(&signer), Arc::clone(&venue_mock));

        for amount in ["0", "-1"] {
            let err = exec.execute(&order(Side::Buy, amount)).await.unwrap_err();
            assert!(matches!(err, TradeError::InvalidAmount(_)));
        }
        assert_eq!(signer.switch_calls.load(Ordering::SeqCst), 0);
        assert_eq!(signer.broadcasts.load(Ordering::SeqCst), 0);
        assert_eq!(venue_mock.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn declined_switch_aborts_before_trade_call() {
        let signer = signer_on(1, false);
        let venue_mock = venue();
        let exec = executor(Arc::clone(&signer), Arc::clone(&venue_mock));

        let err = exec.execute(&order(Side::Buy, "0.5")).await.unwrap_err();
        assert!(matches!(err, TradeError::WrongNetwork { .. }));
        assert_eq!(venue_mock.calls.load(Ordering::SeqCst), 0);
        assert_eq!(signer.broadcasts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn buy_broadcasts_and_returns_without_confirmation_wait() {
        let signer = signer_on(8453, true);
        let venue_mock = venue();
        let exec = executor(Arc::clone(&signer), Arc::clone(&venue_mock));

        let hash = exec.execute(&order(Side::Buy, "0.5")).await.expect("hash");
        assert_eq!(hash.as_str().len(), 66);
        assert_eq!(signer.broadcasts.load(Ordering::SeqCst), 1);

        let params = venue_mock.last_params.lock().clone().expect("params");
        assert_eq!(params.side, Side::Buy);
        // 0.5 个原生币 → 5e17 最小单位
        assert_eq!(params.amount_in, 500_000_000_000_000_000);
        assert_eq!(params.slippage_bps, TradeConfig::default().slippage_bps);
    }

    #[tokio::test]
    async fn sell_uses_token_unit_decimals() {
        let signer = signer_on(8453, true);
        let venue_mock = venue();
        let exec = executor(Arc::clone(&signer), Arc::clone(&venue_mock));

        exec.execute(&order(Side::Sell, "12.5")).await.expect("hash");
        let params = venue_mock.last_params.lock().clone().expect("params");
        assert_eq!(params.amount_in, 12_500_000_000_000_000_000);
    }

    #[test]
    fn preset_amounts_follow_balance_snapshot() {
        let exec = executor(signer_on(8453, true), venue());
        let balances = BalancesSnapshot {
            native: 2_500_000_000_000_000_000, // 2.5
            token: 100_123_456_000_000_000_000, // 100.123456
        };

        assert_eq!(
            exec.preset_amount(Side::Buy, 50, &balances).to_string(),
            "1.250000"
        );
        assert_eq!(
            exec.preset_amount(Side::Sell, 25, &balances).to_string(),
            "25.031"
        );

        let tiny = BalancesSnapshot {
            native: 100_000_000_000_000, // 0.0001
            token: 0,
        };
        assert_eq!(
            exec.preset_amount(Side::Buy, 100, &tiny),
            Decimal::ZERO
        );
    }
}
