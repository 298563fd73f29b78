//! 流程层（Workflow）
//!
//! - `TermContext` - 单个搜索词的上下文（传输、节奏、懒加载搜索页）
//! - `StrategyChain` - 单个搜索词的策略回退流程

pub mod strategy_chain;
pub mod term_ctx;

pub use strategy_chain::{ChainOutcome, PageStrategy, Strategy, StrategyChain};
pub use term_ctx::TermContext;
