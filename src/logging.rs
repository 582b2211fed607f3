//! tracing 初始化，由宿主进程在启动时调用一次。

use tracing_subscriber::{EnvFilter, fmt};

use crate::config::LoggingConfig;

pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.json {
        fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(false)
            .with_span_list(false)
            .init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}
