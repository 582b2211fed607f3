//! 报价流：对变化中的 (方向, 金额) 输入维持一个新鲜的预估输出。
//!
//! 输入每次变化都会取代上一个请求：防抖静默期重新计时，在途拉取
//! 直接废弃。任何时刻最多一个存活请求，过期响应永远不会被发布
//! （last-request-wins，而不是 last-response-wins）。

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, trace};

use crate::api::{SwapParams, VenueApiClient};
use crate::config::QuoteStreamConfig;
use crate::monitoring::events;
use crate::types::{Address, Side};

/// 一次报价请求。任何字段变化都视为新请求。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub side: Side,
    /// 输入金额，最小单位：买入为原生币，卖出为代币。
    pub amount_in: u128,
    pub token: Address,
    pub sender: Address,
}

impl QuoteRequest {
    pub fn to_swap_params(&self, slippage_bps: u16) -> SwapParams {
        SwapParams {
            side: self.side,
            amount_in: self.amount_in,
            token: self.token.clone(),
            sender: self.sender.clone(),
            slippage_bps,
        }
    }
}

/// 报价结果，携带来源请求。只有来源仍是当前请求时才会被发布。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub amount_out: u128,
    pub request: QuoteRequest,
}

/// 报价来源。延迟与可用性均不可信，失败由流内部降级。
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch(&self, request: &QuoteRequest) -> anyhow::Result<u128>;
}

/// 场所 API 作为报价来源。
pub struct VenueQuoteSource {
    client: VenueApiClient,
    slippage_bps: u16,
}

impl VenueQuoteSource {
    pub fn new(client: VenueApiClient, slippage_bps: u16) -> Self {
        Self {
            client,
            slippage_bps,
        }
    }
}

#[async_trait]
impl QuoteSource for VenueQuoteSource {
    async fn fetch(&self, request: &QuoteRequest) -> anyhow::Result<u128> {
        let payload = self
            .client
            .quote(&request.to_swap_params(self.slippage_bps))
            .await?;
        Ok(payload.amount_out)
    }
}

/// 一个交易会话的报价流。丢弃即终止，之后不再有任何发布。
pub struct QuoteStream {
    input: watch::Sender<Option<QuoteRequest>>,
    output: watch::Receiver<Option<Quote>>,
    worker: JoinHandle<()>,
}

impl QuoteStream {
    pub fn spawn<S>(source: Arc<S>, config: QuoteStreamConfig) -> Self
    where
        S: QuoteSource + 'static,
    {
        let (input_tx, input_rx) = watch::channel(None);
        let (output_tx, output_rx) = watch::channel(None);
        let worker = tokio::spawn(run_stream(source, config, input_rx, output_tx));
        Self {
            input: input_tx,
            output: output_rx,
            worker,
        }
    }

    /// 替换当前请求。`None` 表示金额为空或没有发送者，立即清空估算。
    pub fn update(&self, request: Option<QuoteRequest>) {
        let _ = self.input.send(request);
    }

    pub fn quotes(&self) -> watch::Receiver<Option<Quote>> {
        self.output.clone()
    }

    pub fn subscribe(&self) -> WatchStream<Option<Quote>> {
        WatchStream::new(self.output.clone())
    }
}

impl Drop for QuoteStream {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

async fn run_stream<S>(
    source: Arc<S>,
    config: QuoteStreamConfig,
    mut input: watch::Receiver<Option<QuoteRequest>>,
    output: watch::Sender<Option<Quote>>,
) where
    S: QuoteSource,
{
    'idle: loop {
        if input.changed().await.is_err() {
            return;
        }
        'request: loop {
            let Some(request) = input.borrow_and_update().clone() else {
                // 空请求：立即清空估算并挂起拉取
                let _ = output.send(None);
                continue 'idle;
            };

            trace!(
                target: "quote::stream",
                side = request.side.as_str(),
                amount_in = request.amount_in,
                "进入防抖静默期"
            );

            // 防抖：静默期内的新输入重新计时
            tokio::select! {
                changed = input.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    continue 'request;
                }
                _ = tokio::time::sleep(config.debounce()) => {}
            }

            // 请求不变则按固定间隔刷新，第一个 tick 立即触发
            let mut ticker = tokio::time::interval(config.refresh_interval());
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    changed = input.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        continue 'request;
                    }
                    _ = ticker.tick() => {}
                }

                let started = Instant::now();
                let result = tokio::select! {
                    changed = input.changed() => {
                        if changed.is_err() {
                            return;
                        }
                        // 在途拉取废弃，后到的请求赢
                        continue 'request;
                    }
                    result = source.fetch(&request) => result,
                };

                // 兜底：响应落地时请求已被取代就不发布
                if input.borrow().as_ref() != Some(&request) {
                    continue 'request;
                }

                match result {
                    Ok(amount_out) => {
                        let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
                        debug!(
                            target: "quote::stream",
                            side = request.side.as_str(),
                            amount_in = request.amount_in,
                            amount_out,
                            elapsed_ms = format_args!("{elapsed_ms:.3}"),
                            "报价已更新"
                        );
                        events::quote_emitted(request.side, elapsed_ms);
                        let _ = output.send(Some(Quote {
                            amount_out,
                            request: request.clone(),
                        }));
                    }
                    Err(err) => {
                        // 报价只是参考值，失败降级为无估算而不是报错
                        events::quote_fetch_failed(request.side, &err.to_string());
                        let _ = output.send(None);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;

    struct ScriptedSource {
        fetches: AtomicU32,
        last_request: Mutex<Option<QuoteRequest>>,
        /// amount_in -> (延迟, 结果)
        behavior: HashMap<u128, (Duration, anyhow::Result<u128>)>,
    }

    impl ScriptedSource {
        fn immediate(pairs: &[(u128, u128)]) -> Self {
            let behavior = pairs
                .iter()
                .map(|(amount_in, amount_out)| {
                    (*amount_in, (Duration::from_millis(1), Ok(*amount_out)))
                })
                .collect();
            Self {
                fetches: AtomicU32::new(0),
                last_request: Mutex::new(None),
                behavior,
            }
        }
    }

    #[async_trait]
    impl QuoteSource for ScriptedSource {
        async fn fetch(&self, request: &QuoteRequest) -> anyhow::Result<u128> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock() = Some(request.clone());
            let (delay, result) = self
                .behavior
                .get(&request.amount_in)
                .map(|(delay, result)| {
                    let copied = match result {
                        Ok(value) => Ok(*value),
                        Err(err) => Err(anyhow::anyhow!("{err}")),
                    };
                    (*delay, copied)
                })
                .unwrap_or((Duration::from_millis(1), Ok(0)));
            tokio::time::sleep(delay).await;
            result
        }
    }

    fn request(amount_in: u128) -> QuoteRequest {
        QuoteRequest {
            side: Side::Buy,
            amount_in,
            token: "0x3333333333333333333333333333333333333333".parse().unwrap(),
            sender: "0x4444444444444444444444444444444444444444".parse().unwrap(),
        }
    }

    fn config() -> QuoteStreamConfig {
        QuoteStreamConfig {
            debounce_ms: 300,
            refresh_interval_ms: 8_000,
        }
    }

    async fn next_emission(
        quotes: &mut watch::Receiver<Option<Quote>>,
    ) -> Option<Quote> {
        quotes.changed().await.expect("stream alive");
        quotes.borrow_and_update().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_updates_issues_single_fetch_for_last_request() {
        let source = Arc::new(ScriptedSource::immediate(&[(1, 10), (2, 20), (3, 30)]));
        let stream = QuoteStream::spawn(Arc::clone(&source), config());
        let mut quotes = stream.quotes();

        stream.update(Some(request(1)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        stream.update(Some(request(2)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        stream.update(Some(request(3)));

        let quote = next_emission(&mut quotes).await.expect("quote");
        assert_eq!(quote.amount_out, 30);
        assert_eq!(quote.request, request(3));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(*source.last_request.lock(), Some(request(3)));
    }

    #[tokio::test(start_paused = true)]
    async fn newer_request_wins_over_slow_older_fetch() {
        let source = Arc::new(ScriptedSource {
            fetches: AtomicU32::new(0),
            last_request: Mutex::new(None),
            behavior: [
                (1u128, (Duration::from_secs(5), Ok(10u128))),
                (2u128, (Duration::from_millis(10), Ok(20u128))),
            ]
            .into_iter()
            .collect(),
        });
        let stream = QuoteStream::spawn(Arc::clone(&source), config());
        let mut quotes = stream.quotes();

        stream.update(Some(request(1)));
        // 让第一个请求渡过防抖并进入慢速拉取
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        stream.update(Some(request(2)));
        let quote = next_emission(&mut quotes).await.expect("quote");

        // 慢的旧响应从未被发布
        assert_eq!(quote.amount_out, 20);
        assert_eq!(quote.request, request(2));
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn null_request_emits_none_and_suspends_fetching() {
        let source = Arc::new(ScriptedSource::immediate(&[(1, 10)]));
        let stream = QuoteStream::spawn(Arc::clone(&source), config());
        let mut quotes = stream.quotes();

        stream.update(Some(request(1)));
        let quote = next_emission(&mut quotes).await;
        assert!(quote.is_some());

        stream.update(None);
        let cleared = next_emission(&mut quotes).await;
        assert!(cleared.is_none());

        let fetches_before = source.fetches.load(Ordering::SeqCst);
        // 挂起后刷新间隔不再触发拉取
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), fetches_before);
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_request_refreshes_on_interval() {
        let source = Arc::new(ScriptedSource::immediate(&[(1, 10)]));
        let stream = QuoteStream::spawn(Arc::clone(&source), config());
        let mut quotes = stream.quotes();

        stream.update(Some(request(1)));
        next_emission(&mut quotes).await.expect("first quote");
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        next_emission(&mut quotes).await.expect("refreshed quote");
        assert!(source.fetches.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_failure_degrades_to_none() {
        let source = Arc::new(ScriptedSource {
            fetches: AtomicU32::new(0),
            last_request: Mutex::new(None),
            behavior: [(1u128, (Duration::from_millis(1), Err(anyhow::anyhow!("boom"))))]
                .into_iter()
                .collect(),
        });
        let stream = QuoteStream::spawn(Arc::clone(&source), config());
        let mut quotes = stream.quotes();

        stream.update(Some(request(1)));
        let emission = next_emission(&mut quotes).await;
        assert!(emission.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_stops_fetching_and_emitting() {
        let source = Arc::new(ScriptedSource::immediate(&[(1, 10)]));
        let stream = QuoteStream::spawn(Arc::clone(&source), config());
        let mut quotes = stream.quotes();

        stream.update(Some(request(1)));
        next_emission(&mut quotes).await.expect("first quote");
        let fetches_before = source.fetches.load(Ordering::SeqCst);

        drop(stream);
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(source.fetches.load(Ordering::SeqCst), fetches_before);
        // 发送端随任务一起销毁，且没有残留的未读发布
        assert!(!quotes.has_changed().unwrap_or(false));
    }
}
