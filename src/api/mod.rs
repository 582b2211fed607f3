//! 交易场所 API 封装：报价与成交调用。

pub mod serde_helpers;
pub mod swap;

use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::config::VenueConfig;
use crate::monitoring::metrics::prometheus_enabled;

pub use swap::{QuotePayload, SwapParams, TradeCallPayload};

#[derive(Debug, Error)]
pub enum VenueError {
    #[error("场所 API 请求失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("请求 {endpoint} 超时（{timeout_ms}ms）")]
    Timeout {
        endpoint: String,
        timeout_ms: u64,
        #[source]
        source: reqwest::Error,
    },
    #[error("响应解析失败: {0}")]
    Json(#[from] serde_json::Error),
    #[error("请求 {endpoint} 返回状态 {status}: {body}")]
    ApiStatus {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
    #[error("请求 {endpoint} 被限流，状态 {status}: {body}")]
    RateLimited {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
}

#[derive(Clone)]
pub struct VenueApiClient {
    client: reqwest::Client,
    quote_url: String,
    trade_url: String,
    quote_timeout: Duration,
    trade_timeout: Duration,
    slow_quote_warn_ms: u64,
}

impl VenueApiClient {
    pub fn new(client: reqwest::Client, config: &VenueConfig) -> Self {
        Self {
            client,
            quote_url: config.quote_url.clone(),
            trade_url: config.trade_url.clone(),
            quote_timeout: Duration::from_millis(config.quote_timeout_ms),
            trade_timeout: Duration::from_millis(config.trade_timeout_ms),
            slow_quote_warn_ms: config.slow_quote_warn_ms,
        }
    }

    /// 请求预估输出数量。报价只用于展示，失败由上层降级处理。
    pub async fn quote(&self, params: &SwapParams) -> Result<QuotePayload, VenueError> {
        let url = self.quote_url.clone();
        let started = Instant::now();

        trace!(
            target: "venue::quote",
            side = params.side.as_str(),
            amount_in = params.amount_in,
            token = %params.token,
            "开始请求报价"
        );

        let response = self
            .client
            .get(&url)
            .timeout(self.quote_timeout)
            .query(&params.to_query_params())
            .send()
            .await
            .map_err(|err| self.classify_send_error("quote", &url, self.quote_timeout, err))?;

        let payload: QuotePayload = self.decode_response("quote", url, response).await?;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
        if elapsed_ms > self.slow_quote_warn_ms as f64 {
            debug!(
                target: "venue::quote",
                elapsed_ms = format_args!("{elapsed_ms:.3}"),
                threshold_ms = self.slow_quote_warn_ms,
                "报价耗时较长"
            );
        } else {
            debug!(
                target: "venue::quote",
                elapsed_ms = format_args!("{elapsed_ms:.3}"),
                amount_out = payload.amount_out,
                "报价完成"
            );
        }

        self.record("quote", "success", Some(elapsed_ms));
        Ok(payload)
    }

    /// 请求成交调用，返回可广播的未签名交易。
    pub async fn trade_call(&self, params: &SwapParams) -> Result<TradeCallPayload, VenueError> {
        let url = self.trade_url.clone();
        let started = Instant::now();

        trace!(
            target: "venue::trade",
            side = params.side.as_str(),
            amount_in = params.amount_in,
            token = %params.token,
            slippage_bps = params.slippage_bps,
            "开始请求成交调用"
        );

        let response = self
            .client
            .post(&url)
            .timeout(self.trade_timeout)
            .json(params)
            .send()
            .await
            .map_err(|err| self.classify_send_error("trade", &url, self.trade_timeout, err))?;

        let payload: TradeCallPayload = self.decode_response("trade", url, response).await?;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
        debug!(
            target: "venue::trade",
            elapsed_ms = format_args!("{elapsed_ms:.3}"),
            amount_out = payload.amount_out,
            "成交调用已取得"
        );
        self.record("trade", "success", Some(elapsed_ms));
        Ok(payload)
    }

    fn classify_send_error(
        &self,
        stage: &'static str,
        endpoint: &str,
        timeout: Duration,
        err: reqwest::Error,
    ) -> VenueError {
        if err.is_timeout() {
            let timeout_ms = timeout.as_millis() as u64;
            self.record(stage, "timeout", None);
            warn!(
                target: "venue::api",
                stage,
                endpoint,
                timeout_ms,
                "场所 API 请求超时"
            );
            VenueError::Timeout {
                endpoint: endpoint.to_string(),
                timeout_ms,
                source: err,
            }
        } else {
            self.record(stage, "transport_error", None);
            warn!(
                target: "venue::api",
                stage,
                endpoint,
                error = %err,
                "场所 API 请求发送失败"
            );
            VenueError::from(err)
        }
    }

    async fn decode_response<T>(
        &self,
        stage: &'static str,
        endpoint: String,
        response: reqwest::Response,
    ) -> Result<T, VenueError>
    where
        T: serde::de::DeserializeOwned,
    {
        let status = response.status();
        let body = response.text().await.map_err(|err| {
            self.record(stage, "read_error", None);
            VenueError::from(err)
        })?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            let summary = summarize_error_body(body);
            self.record(stage, "rate_limited", None);
            warn!(
                target: "venue::api",
                stage,
                endpoint = %endpoint,
                status = status.as_u16(),
                body = %summary,
                "场所 API 命中限流"
            );
            return Err(VenueError::RateLimited {
                endpoint,
                status,
                body: summary,
            });
        }

        if !status.is_success() {
            let summary = summarize_error_body(body);
            self.record(stage, "http_error", None);
            warn!(
                target: "venue::api",
                stage,
                endpoint = %endpoint,
                status = status.as_u16(),
                body = %summary,
                "场所 API 返回非 200 状态"
            );
            return Err(VenueError::ApiStatus {
                endpoint,
                status,
                body: summary,
            });
        }

        serde_json::from_str(&body).map_err(|err| {
            self.record(stage, "decode_error", None);
            warn!(
                target: "venue::api",
                stage,
                endpoint = %endpoint,
                error = %err,
                "场所 API 响应解析失败"
            );
            VenueError::Json(err)
        })
    }

    fn record(&self, stage: &'static str, status: &'static str, elapsed_ms: Option<f64>) {
        if !prometheus_enabled() {
            return;
        }
        counter!(
            "cassini_venue_requests_total",
            "stage" => stage,
            "status" => status
        )
        .increment(1);
        if let Some(value) = elapsed_ms {
            histogram!(
                "cassini_venue_latency_ms",
                "stage" => stage
            )
            .record(value);
        }
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
