//! # Storefront Price Resolver
//!
//! 从 Walmart México 和 Chedraui 检索商品价格的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（HTTP 客户端、定时器），只暴露能力
//! - `Fetcher` - 发请求，所有传输失败折叠成 `None`
//! - `Pacer` - 请求之间等待（带随机抖动）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个页面或单个 JSON 片段
//! - `parse_price` - 价格文本解析
//! - `normalizer` - 统一的字段查找和记录标准化
//! - `EmbeddedDataExtractor` / `SelectorSetExtractor` / `StructuralPathExtractor` / `HeuristicExtractor` - 页面提取能力
//! - `ResultWriter` - 写 json / csv / tsv 能力
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个搜索词"的完整解析流程
//! - `TermContext` - 上下文封装（搜索词 + 传输 + 懒加载搜索页）
//! - `StrategyChain` - 按优先级尝试策略，第一个有结果的策略胜出
//!
//! ### ④ 站点层（Sites）
//! - `sites/` - 每个站点一个 `SiteResolver` 实现，只决定策略链的组成和请求细节
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/search_orchestrator` - 串行遍历搜索词
//! - `orchestrator/merge` - 合并两条策略链的结果
//! - `orchestrator/app` - 应用入口，按站点调度并写盘
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod sites;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{Fetcher, FetchRequest, FetchResponse, Pacer};
pub use models::{ProductRecord, ResultSet, Site, SourceTag};
pub use orchestrator::{merge, resolve_terms, App};
pub use services::parse_price;
pub use sites::{build_resolver, ChainMode, SiteResolver, Transport};
pub use workflow::{StrategyChain, TermContext};
