//! 基于 reqwest 的 JSON-RPC 链网关实现。

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{trace, warn};

use super::{ChainError, ChainGateway, ReceiptPayload, TransactionReceipt};
use crate::config::RpcConfig;
use crate::types::{Address, TxHash, parse_quantity};

const BALANCE_OF_SELECTOR: &str = "70a08231";

pub struct RpcChainGateway {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    next_id: AtomicU64,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse<R> {
    result: Option<R>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl RpcChainGateway {
    pub fn new(client: reqwest::Client, config: &RpcConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
            timeout: config.timeout(),
            next_id: AtomicU64::new(1),
        }
    }

    /// 发起一次调用；`result: null` 映射为 `None`。
    async fn call<R>(&self, method: &str, params: Value) -> Result<Option<R>, ChainError>
    where
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        trace!(target: "chain::rpc", method, id, "发起 RPC 请求");

        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                warn!(
                    target: "chain::rpc",
                    method,
                    error = %err,
                    "RPC 请求发送失败"
                );
                ChainError::from(err)
            })?;

        let payload: RpcResponse<R> = response.json().await.map_err(|err| {
            warn!(
                target: "chain::rpc",
                method,
                error = %err,
                "RPC 响应读取失败"
            );
            ChainError::from(err)
        })?;

        if let Some(error) = payload.error {
            warn!(
                target: "chain::rpc",
                method,
                code = error.code,
                message = %error.message,
                "RPC 节点返回错误"
            );
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(payload.result)
    }

    async fn request<R>(&self, method: &str, params: Value) -> Result<R, ChainError>
    where
        R: DeserializeOwned,
    {
        self.call(method, params)
            .await?
            .ok_or_else(|| ChainError::Rpc {
                code: -1,
                message: format!("{method} 响应缺少 result 字段"),
            })
    }
}

/// `balanceOf(address)` 的调用数据：4 字节选择子 + 左填充到 32 字节的地址。
pub fn encode_balance_of(owner: &Address) -> String {
    let hex = owner.as_str().trim_start_matches("0x");
    format!("0x{BALANCE_OF_SELECTOR}{:0>64}", hex)
}

#[async_trait]
impl ChainGateway for RpcChainGateway {
    async fn native_balance(&self, address: &Address) -> Result<u128, ChainError> {
        let raw: String = self
            .request("eth_getBalance", json!([address.as_str(), "latest"]))
            .await?;
        Ok(parse_quantity(&raw)?)
    }

    async fn token_balance(&self, token: &Address, owner: &Address) -> Result<u128, ChainError> {
        let call = json!({
            "to": token.as_str(),
            "data": encode_balance_of(owner),
        });
        let raw: String = self.request("eth_call", json!([call, "latest"])).await?;
        if raw == "0x" {
            // 非合约地址或空返回，视作零余额
            return Ok(0);
        }
        Ok(parse_quantity(&raw)?)
    }

    async fn broadcast(&self, raw_transaction: &str) -> Result<TxHash, ChainError> {
        let raw: String = self
            .request("eth_sendRawTransaction", json!([raw_transaction]))
            .await?;
        Ok(raw.parse::<TxHash>().map_err(ChainError::Decode)?)
    }

    async fn transaction_receipt(
        &self,
        hash: &TxHash,
    ) -> Result<Option<TransactionReceipt>, ChainError> {
        let payload: Option<ReceiptPayload> = self
            .call("eth_getTransactionReceipt", json!([hash.as_str()]))
            .await?;
        payload.map(ReceiptPayload::into_receipt).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_of_calldata_layout() {
        let owner: Address = "0x00000000000000000000000000000000000000ff"
            .parse()
            .unwrap();
        let data = encode_balance_of(&owner);
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.starts_with("0x70a08231"));
        assert!(data.ends_with("00000000000000000000000000000000000000ff"));
    }
}
