#![allow(dead_code)]

use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;

/// 管道顶层配置。所有核心常量（轮询间隔、尝试上限、滑点、手续费
/// 预留）都从这里注入，核心代码不自行推导。
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CassiniConfig {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub indexer: IndexerConfig,
    #[serde(default)]
    pub receipt: ReceiptConfig,
    #[serde(default)]
    pub venue: VenueConfig,
    #[serde(default)]
    pub quote_stream: QuoteStreamConfig,
    #[serde(default)]
    pub trade: TradeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// 链节点 JSON-RPC 接入。
#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "super::default_rpc_timeout_ms")]
    pub timeout_ms: u64,
}

impl RpcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_ms: super::default_rpc_timeout_ms(),
        }
    }
}

/// 索引服务（链下读取层）状态查询。
#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "super::default_indexer_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "super::default_indexing_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "super::default_indexing_max_attempts")]
    pub max_attempts: u32,
}

impl IndexerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_ms: super::default_indexer_timeout_ms(),
            poll_interval_ms: super::default_indexing_poll_interval_ms(),
            max_attempts: super::default_indexing_max_attempts(),
        }
    }
}

/// 交易回执轮询。
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptConfig {
    #[serde(default = "super::default_receipt_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "super::default_receipt_max_attempts")]
    pub max_attempts: u32,
}

impl ReceiptConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: super::default_receipt_poll_interval_ms(),
            max_attempts: super::default_receipt_max_attempts(),
        }
    }
}

/// 交易场所 API（报价 + 成交调用）。
#[derive(Debug, Clone, Deserialize)]
pub struct VenueConfig {
    #[serde(default)]
    pub quote_url: String,
    #[serde(default)]
    pub trade_url: String,
    #[serde(default = "super::default_quote_timeout_ms")]
    pub quote_timeout_ms: u64,
    #[serde(default = "super::default_trade_call_timeout_ms")]
    pub trade_timeout_ms: u64,
    #[serde(default = "super::default_slow_quote_warn_ms")]
    pub slow_quote_warn_ms: u64,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            quote_url: String::new(),
            trade_url: String::new(),
            quote_timeout_ms: super::default_quote_timeout_ms(),
            trade_timeout_ms: super::default_trade_call_timeout_ms(),
            slow_quote_warn_ms: super::default_slow_quote_warn_ms(),
        }
    }
}

/// 报价流节奏：防抖静默期 + 刷新间隔。
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct QuoteStreamConfig {
    #[serde(default = "super::default_quote_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "super::default_quote_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
}

impl QuoteStreamConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

impl Default for QuoteStreamConfig {
    fn default() -> Self {
        Self {
            debounce_ms: super::default_quote_debounce_ms(),
            refresh_interval_ms: super::default_quote_refresh_interval_ms(),
        }
    }
}

/// 交易执行参数。`fee_reserve` 只在 100% 买入预设时扣除。
#[derive(Debug, Clone, Deserialize)]
pub struct TradeConfig {
    #[serde(default = "super::default_trade_chain_id")]
    pub chain_id: u64,
    #[serde(default = "super::default_slippage_bps")]
    pub slippage_bps: u16,
    #[serde(
        default = "super::default_fee_reserve",
        deserialize_with = "super::deserialize_decimal"
    )]
    pub fee_reserve: Decimal,
    #[serde(default = "super::default_native_preset_decimals")]
    pub native_preset_decimals: u32,
    #[serde(default = "super::default_token_preset_decimals")]
    pub token_preset_decimals: u32,
    #[serde(default = "super::default_token_unit_decimals")]
    pub token_unit_decimals: u32,
    #[serde(default)]
    pub balance_refresh_interval_ms: Option<u64>,
}

impl TradeConfig {
    pub fn balance_refresh_interval(&self) -> Option<Duration> {
        self.balance_refresh_interval_ms.map(Duration::from_millis)
    }
}

impl Default for TradeConfig {
    fn default() -> Self {
        Self {
            chain_id: super::default_trade_chain_id(),
            slippage_bps: super::default_slippage_bps(),
            fee_reserve: super::default_fee_reserve(),
            native_preset_decimals: super::default_native_preset_decimals(),
            token_preset_decimals: super::default_token_preset_decimals(),
            token_unit_decimals: super::default_token_unit_decimals(),
            balance_refresh_interval_ms: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "super::default_logging_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: super::default_logging_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enable_prometheus: bool,
    #[serde(default = "super::default_prometheus_listen")]
    pub prometheus_listen: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enable_prometheus: false,
            prometheus_listen: super::default_prometheus_listen(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_core_constants() {
        let config = CassiniConfig::default();
        assert_eq!(config.quote_stream.debounce_ms, 300);
        assert_eq!(config.quote_stream.refresh_interval_ms, 8_000);
        assert_eq!(config.receipt.max_attempts, 30);
        assert_eq!(config.indexer.max_attempts, 60);
        assert_eq!(config.trade.slippage_bps, 1_000);
        assert_eq!(config.trade.fee_reserve.to_string(), "0.0002");
        assert_eq!(config.trade.native_preset_decimals, 6);
        assert_eq!(config.trade.token_preset_decimals, 3);
    }

    #[test]
    fn deserialize_partial_toml() {
        let raw = r#"
[rpc]
url = "https://mainnet.base.org"
timeout_ms = 3000

[trade]
slippage_bps = 50
fee_reserve = "0.001"

[quote_stream]
debounce_ms = 250
"#;
        let config: CassiniConfig = toml::from_str(raw).expect("parse toml");
        assert_eq!(config.rpc.url, "https://mainnet.base.org");
        assert_eq!(config.rpc.timeout_ms, 3_000);
        assert_eq!(config.trade.slippage_bps, 50);
        assert_eq!(config.trade.fee_reserve.to_string(), "0.001");
        assert_eq!(config.quote_stream.debounce_ms, 250);
        // 未出现的段落全部落在默认值
        assert_eq!(config.receipt.poll_interval_ms, 2_000);
    }
}
