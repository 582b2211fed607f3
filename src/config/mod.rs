use serde::Deserialize;

pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;

pub(crate) fn default_logging_level() -> String {
    "info".to_string()
}

pub(crate) fn default_rpc_timeout_ms() -> u64 {
    5_000
}

pub(crate) fn default_receipt_poll_interval_ms() -> u64 {
    2_000
}

pub(crate) fn default_receipt_max_attempts() -> u32 {
    30
}

pub(crate) fn default_indexing_poll_interval_ms() -> u64 {
    1_000
}

pub(crate) fn default_indexing_max_attempts() -> u32 {
    60
}

pub(crate) fn default_indexer_timeout_ms() -> u64 {
    5_000
}

pub(crate) fn default_quote_debounce_ms() -> u64 {
    300
}

pub(crate) fn default_quote_refresh_interval_ms() -> u64 {
    8_000
}

pub(crate) fn default_quote_timeout_ms() -> u64 {
    2_000
}

pub(crate) fn default_trade_call_timeout_ms() -> u64 {
    5_000
}

pub(crate) fn default_slow_quote_warn_ms() -> u64 {
    500
}

pub(crate) fn default_slippage_bps() -> u16 {
    1_000
}

pub(crate) fn default_fee_reserve() -> rust_decimal::Decimal {
    rust_decimal::Decimal::new(2, 4)
}

pub(crate) fn default_native_preset_decimals() -> u32 {
    6
}

pub(crate) fn default_token_preset_decimals() -> u32 {
    3
}

pub(crate) fn default_token_unit_decimals() -> u32 {
    18
}

pub(crate) fn default_trade_chain_id() -> u64 {
    8453
}

pub(crate) fn default_prometheus_listen() -> String {
    "0.0.0.0:9898".to_string()
}

pub(crate) fn deserialize_decimal<'de, D>(deserializer: D) -> Result<rust_decimal::Decimal, D::Error>
where
    D: serde::de::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.trim()
        .parse()
        .map_err(|err| serde::de::Error::custom(format!("非法的十进制数: {err}")))
}
