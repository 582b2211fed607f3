//! 索引服务的 GraphQL 状态查询客户端。

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{trace, warn};

use super::{IndexerError, IndexingStatusSource};
use crate::config::IndexerConfig;
use crate::types::TxHash;

const STATUS_QUERY: &str = r#"query TransactionStatus($txHash: TxHash!) {
  transactionStatus(request: { txHash: $txHash }) {
    indexed
  }
}"#;

#[derive(Clone)]
pub struct GraphqlIndexerClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    #[serde(default)]
    data: Option<StatusData>,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    #[serde(rename = "transactionStatus")]
    transaction_status: Option<StatusPayload>,
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    indexed: bool,
}

impl GraphqlIndexerClient {
    pub fn new(client: reqwest::Client, config: &IndexerConfig) -> Self {
        Self {
            client,
            url: config.url.clone(),
            timeout: config.timeout(),
        }
    }
}

#[async_trait]
impl IndexingStatusSource for GraphqlIndexerClient {
    async fn indexing_status(&self, hash: &TxHash) -> Result<bool, IndexerError> {
        trace!(
            target: "indexer::client",
            tx_hash = %hash,
            "查询索引状态"
        );

        let body = json!({
            "query": STATUS_QUERY,
            "variables": { "txHash": hash.as_str() },
        });

        let response = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    let timeout_ms = self.timeout.as_millis() as u64;
                    warn!(
                        target: "indexer::client",
                        endpoint = %self.url,
                        timeout_ms,
                        "索引状态请求超时"
                    );
                    IndexerError::Timeout {
                        timeout_ms,
                        source: err,
                    }
                } else {
                    warn!(
                        target: "indexer::client",
                        endpoint = %self.url,
                        error = %err,
                        "索引状态请求发送失败"
                    );
                    IndexerError::from(err)
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(IndexerError::from)?;

        if !status.is_success() {
            let summary = summarize_error_body(text);
            warn!(
                target: "indexer::client",
                endpoint = %self.url,
                status = status.as_u16(),
                body = %summary,
                "索引服务返回非 200 状态"
            );
            return Err(IndexerError::ApiStatus {
                status: status.as_u16(),
                body: summary,
            });
        }

        let envelope: StatusEnvelope = serde_json::from_str(&text)?;
        let payload = envelope
            .data
            .and_then(|data| data.transaction_status)
            .ok_or_else(|| IndexerError::Schema("响应缺少 transactionStatus 字段".to_string()))?;

        Ok(payload.indexed)
    }
}

fn summarize_error_body(body: String) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "(empty response body)".to_string();
    }
    let mut single_line = trimmed.replace(['\n', '\r'], " ");
    const MAX_LEN: usize = 512;
    if single_line.len() > MAX_LEN {
        single_line.truncate(MAX_LEN);
        single_line.push('…');
    }
    single_line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_envelope_parses() {
        let raw = r#"{"data":{"transactionStatus":{"indexed":true}}}"#;
        let envelope: StatusEnvelope = serde_json::from_str(raw).unwrap();
        assert!(envelope.data.unwrap().transaction_status.unwrap().indexed);

        let missing = r#"{"data":{"transactionStatus":null}}"#;
        let envelope: StatusEnvelope = serde_json::from_str(missing).unwrap();
        assert!(envelope.data.unwrap().transaction_status.is_none());
    }

    #[test]
    fn error_body_is_summarized() {
        assert_eq!(summarize_error_body(String::new()), "(empty response body)");
        let long = "x".repeat(600);
        let summary = summarize_error_body(long);
        assert!(summary.chars().count() <= 513);
        assert!(summary.ends_with('…'));
    }
}
