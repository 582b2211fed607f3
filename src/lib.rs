//! cassini — 社交客户端的链上动作执行管道。
//!
//! 页面、菜单和表单都只是索引器与钱包之上的薄视图，真正有状态的
//! 部分集中在这里：把一次用户意图变成免 gas 代付交易或自付链上
//! 交易，广播后等链上打包、再等链下索引追上，最后恰好一次地回调
//! 调用方；以及交易界面用的防抖、定期刷新、可取消的报价流。

pub mod api;
pub mod chain;
pub mod config;
pub mod indexer;
pub mod lifecycle;
pub mod logging;
pub mod monitoring;
pub mod quote;
pub mod trade;
pub mod types;
pub mod wallet;

pub use api::{SwapParams, VenueApiClient, VenueError};
pub use chain::{
    ChainError, ChainGateway, ReceiptStatus, ReceiptWatcher, RpcChainGateway, TransactionReceipt,
};
pub use config::{CassiniConfig, ConfigError, load_config};
pub use indexer::{
    GraphqlIndexerClient, IndexerError, IndexingStatusSource, IndexingWaitTask, IndexingWaiter,
};
pub use lifecycle::{
    LifecycleError, LifecycleHandlers, LifecycleState, MutationOutcome, PendingPayload,
    PendingTransaction, TransactionLifecycleController,
};
pub use quote::{Quote, QuoteRequest, QuoteSource, QuoteStream, VenueQuoteSource};
pub use trade::{TradeError, TradeExecutor, TradeOrder};
pub use types::{Address, Intent, IntentKind, Side, TxHash, UnsignedTransaction};
pub use wallet::{BalanceTracker, BalancesSnapshot, SignerError, WalletSigner, ensure_chain};
