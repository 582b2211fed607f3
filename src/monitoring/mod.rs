//! 进程级可观测性出口：事件埋点 + Prometheus 指标。
//!
//! 核心管道只通过这里上报，正确性不依赖任何埋点调用。

pub mod events;
pub mod metrics;

pub use metrics::{init_from_config, prometheus_enabled, try_init_prometheus};
