//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责多个搜索词、多个站点的调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 加载搜索计划文件
//! - 为每个站点构建传输（Fetcher、Pacer）和解析器
//! - 按检索方式跑一条或两条策略链
//! - 持久化结果并输出统计信息
//!
//! ### `search_orchestrator` - 搜索编排器
//! - 串行遍历搜索词（`Vec<String>`）
//! - 每个搜索词调用一次解析器，结果写入 `ResultSet`
//! - 搜索词之间调用 Pacer 等待
//!
//! ### `merge` - 结果合并
//! - 合并 API 链和 HTML 链的结果集，按商品 ID 去重
//!
//! ## 层次关系
//!
//! ```text
//! app (处理 Vec<Site>)
//!     ↓
//! search_orchestrator (处理 Vec<String>)
//!     ↓
//! sites::SiteResolver (处理单个搜索词)
//!     ↓
//! workflow::StrategyChain (按优先级尝试策略)
//!     ↓
//! services (能力层：内嵌数据 / 选择器 / 结构路径 / 启发式 / 写盘)
//!     ↓
//! infrastructure (基础设施：Fetcher / Pacer)
//! ```

pub mod app;
pub mod merge;
pub mod search_orchestrator;

// 重新导出主要类型
pub use app::{App, SAMPLE_TERM};
pub use merge::merge;
pub use search_orchestrator::resolve_terms;
