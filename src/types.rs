//! 管道共享的基础类型：地址、交易哈希、意图与金额换算。

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("地址格式非法: {0}")]
    Address(String),
    #[error("交易哈希格式非法: {0}")]
    TxHash(String),
    #[error("十六进制数量解析失败: {0}")]
    Quantity(String),
}

/// EVM 账户或合约地址，内部统一为小写 `0x` 前缀十六进制。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = ParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| ParseError::Address(trimmed.to_string()))?;
        if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseError::Address(trimmed.to_string()));
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }
}

impl TryFrom<String> for Address {
    type Error = ParseError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 链上交易哈希，小写 `0x` 前缀十六进制。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxHash(String);

impl TxHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TxHash {
    type Err = ParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| ParseError::TxHash(trimmed.to_string()))?;
        if hex.len() != 64 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseError::TxHash(trimmed.to_string()));
        }
        Ok(Self(format!("0x{}", hex.to_ascii_lowercase())))
    }
}

impl TryFrom<String> for TxHash {
    type Error = ParseError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<TxHash> for String {
    fn from(hash: TxHash) -> Self {
        hash.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 待签名交易，由变更层或交易场所返回，原样交给签名器广播。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
    pub to: Address,
    #[serde(with = "quantity")]
    pub value: u128,
    #[serde(default)]
    pub data: String,
    pub chain_id: u64,
}

/// JSON-RPC 风格的 `0x` 十六进制数量编解码。
pub mod quantity {
    use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

    pub fn serialize<S>(value: &u128, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        format!("{value:#x}").serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u128, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_quantity(&raw).map_err(|err| de::Error::custom(err.to_string()))
    }
}

pub fn parse_quantity(raw: &str) -> Result<u128, ParseError> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .ok_or_else(|| ParseError::Quantity(trimmed.to_string()))?;
    if hex.is_empty() {
        return Err(ParseError::Quantity(trimmed.to_string()));
    }
    u128::from_str_radix(hex, 16).map_err(|_| ParseError::Quantity(trimmed.to_string()))
}

pub fn format_quantity(value: u128) -> String {
    format!("{value:#x}")
}

/// 把最小单位余额换算为展示单位。余额只用于预设展示，超出
/// `Decimal` 表示范围时按上限截断。
pub fn format_units(amount: u128, decimals: u32) -> Decimal {
    match i128::try_from(amount) {
        Ok(value) => Decimal::try_from_i128_with_scale(value, decimals).unwrap_or(Decimal::MAX),
        Err(_) => Decimal::MAX,
    }
}

/// 把展示单位金额换算为最小单位。负数或超出表示范围返回 `None`。
pub fn parse_units(value: Decimal, decimals: u32) -> Option<u128> {
    if value.is_sign_negative() {
        return None;
    }
    let mut scaled = value;
    scaled.rescale(decimals);
    if scaled.scale() != decimals {
        // rescale 因溢出未能到位，金额超出可表示范围
        return None;
    }
    u128::try_from(scaled.mantissa()).ok()
}

/// 交易方向。买入花费原生币，卖出花费代币。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

/// 用户发起的链上动作种类，对应客户端里触发生命周期的各个入口。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Post,
    Repost,
    UndoRepost,
    Block,
    Unblock,
    Mute,
    Unmute,
    Report,
    NotInterested,
    ProfileUpdate,
    Signup,
    TradeBuy,
    TradeSell,
}

impl IntentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IntentKind::Post => "post",
            IntentKind::Repost => "repost",
            IntentKind::UndoRepost => "undo_repost",
            IntentKind::Block => "block",
            IntentKind::Unblock => "unblock",
            IntentKind::Mute => "mute",
            IntentKind::Unmute => "unmute",
            IntentKind::Report => "report",
            IntentKind::NotInterested => "not_interested",
            IntentKind::ProfileUpdate => "profile_update",
            IntentKind::Signup => "signup",
            IntentKind::TradeBuy => "trade_buy",
            IntentKind::TradeSell => "trade_sell",
        }
    }
}

/// 一次用户动作。创建后不可变，被一次生命周期消费。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub id: Uuid,
    pub kind: IntentKind,
    pub requester: Address,
}

impl Intent {
    pub fn new(kind: IntentKind, requester: Address) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            requester,
        }
    }
}
