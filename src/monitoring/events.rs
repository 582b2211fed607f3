use tracing::{info, warn};

use metrics::{counter, histogram};

use super::metrics::prometheus_enabled;
use crate::lifecycle::{LifecycleError, LifecycleState};
use crate::types::{Address, Intent, Side, TxHash};

pub fn intent_submitted(intent: &Intent) {
    info!(
        target: "monitoring::lifecycle",
        event = "submitted",
        intent_id = %intent.id,
        kind = intent.kind.as_str(),
        requester = %intent.requester,
        "收到链上动作意图"
    );

    if prometheus_enabled() {
        counter!(
            "cassini_intent_submitted_total",
            "kind" => intent.kind.as_str()
        )
        .increment(1);
    }
}

pub fn lifecycle_state(intent: &Intent, state: LifecycleState) {
    info!(
        target: "monitoring::lifecycle",
        event = "state",
        intent_id = %intent.id,
        kind = intent.kind.as_str(),
        state = state.as_str(),
        "生命周期状态迁移"
    );
}

pub fn lifecycle_completed(intent: &Intent, hash: Option<&TxHash>, elapsed_ms: f64) {
    let hash_label = hash.map(TxHash::as_str).unwrap_or("<final>");
    info!(
        target: "monitoring::lifecycle",
        event = "completed",
        intent_id = %intent.id,
        kind = intent.kind.as_str(),
        tx_hash = hash_label,
        elapsed_ms = format_args!("{elapsed_ms:.1}"),
        "链上动作完成"
    );

    if prometheus_enabled() {
        counter!(
            "cassini_lifecycle_completed_total",
            "kind" => intent.kind.as_str()
        )
        .increment(1);
        histogram!(
            "cassini_lifecycle_elapsed_ms",
            "kind" => intent.kind.as_str()
        )
        .record(elapsed_ms);
    }
}

pub fn lifecycle_failed(intent: &Intent, error: &LifecycleError) {
    warn!(
        target: "monitoring::lifecycle",
        event = "failed",
        intent_id = %intent.id,
        kind = intent.kind.as_str(),
        reason = error.kind(),
        error = %error,
        "链上动作失败"
    );

    if prometheus_enabled() {
        counter!(
            "cassini_lifecycle_failed_total",
            "kind" => intent.kind.as_str(),
            "reason" => error.kind()
        )
        .increment(1);
    }
}

pub fn quote_fetch_failed(side: Side, error: &str) {
    warn!(
        target: "monitoring::quote",
        event = "fetch_failed",
        side = side.as_str(),
        error,
        "报价拉取失败，降级为无估算"
    );

    if prometheus_enabled() {
        counter!(
            "cassini_quote_fetch_failed_total",
            "side" => side.as_str()
        )
        .increment(1);
    }
}

pub fn quote_emitted(side: Side, elapsed_ms: f64) {
    if prometheus_enabled() {
        counter!(
            "cassini_quote_emitted_total",
            "side" => side.as_str()
        )
        .increment(1);
        histogram!(
            "cassini_quote_fetch_latency_ms",
            "side" => side.as_str()
        )
        .record(elapsed_ms);
    }
}

pub fn trade_submitted(side: Side, hash: &TxHash) {
    info!(
        target: "monitoring::trade",
        event = "submitted",
        side = side.as_str(),
        tx_hash = %hash,
        "交易已广播"
    );

    if prometheus_enabled() {
        counter!(
            "cassini_trade_submitted_total",
            "side" => side.as_str()
        )
        .increment(1);
    }
}

pub fn trade_rejected(side: Side, reason: &'static str) {
    warn!(
        target: "monitoring::trade",
        event = "rejected",
        side = side.as_str(),
        reason,
        "交易在广播前被拒绝"
    );

    if prometheus_enabled() {
        counter!(
            "cassini_trade_rejected_total",
            "side" => side.as_str(),
            "reason" => reason
        )
        .increment(1);
    }
}

pub fn balance_refresh_success(owner: &Address, token: &Address) {
    info!(
        target: "monitoring::wallet",
        event = "balance_refresh",
        owner = %owner,
        token = %token,
        "余额快照已刷新"
    );

    if prometheus_enabled() {
        counter!("cassini_balance_refresh_total", "result" => "success").increment(1);
    }
}

pub fn balance_refresh_error(owner: &Address) {
    warn!(
        target: "monitoring::wallet",
        event = "balance_refresh_error",
        owner = %owner,
        "余额快照刷新失败"
    );

    if prometheus_enabled() {
        counter!("cassini_balance_refresh_total", "result" => "error").increment(1);
    }
}
