//! 场所 API 的请求与响应线上形态。

use serde::{Deserialize, Serialize};

use super::serde_helpers::field_as_string;
use crate::types::{Address, Side, UnsignedTransaction};

/// 一次换币请求的完整参数。买入的 `amount_in` 是原生币最小单位，
/// 卖出是代币最小单位。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapParams {
    pub side: Side,
    #[serde(with = "field_as_string")]
    pub amount_in: u128,
    pub token: Address,
    pub sender: Address,
    pub slippage_bps: u16,
}

impl SwapParams {
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        vec![
            ("side".to_string(), self.side.as_str().to_string()),
            ("amountIn".to_string(), self.amount_in.to_string()),
            ("token".to_string(), self.token.to_string()),
            ("sender".to_string(), self.sender.to_string()),
            ("slippageBps".to_string(), self.slippage_bps.to_string()),
        ]
    }
}

/// `/quote` 响应体。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePayload {
    #[serde(with = "field_as_string")]
    pub amount_out: u128,
}

/// `/trade` 响应体：预估输出 + 可直接交给签名器的调用。
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeCallPayload {
    #[serde(with = "field_as_string")]
    pub amount_out: u128,
    pub to: Address,
    #[serde(default)]
    pub data: String,
    #[serde(with = "crate::types::quantity")]
    pub value: u128,
}

impl TradeCallPayload {
    pub fn into_unsigned(self, chain_id: u64) -> UnsignedTransaction {
        UnsignedTransaction {
            to: self.to,
            value: self.value,
            data: self.data,
            chain_id,
        }
    }
}
