//! 站点解析器
//!
//! 每个站点实现同一个能力接口 [`SiteResolver`]：给一个搜索词，返回标准化后的商品列表。
//! 站点之间不共享可变状态，差异只在策略链的组成和各接口的请求细节。

pub mod chedraui;
pub mod walmart;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{FetchRequest, Fetcher, Pacer};
use crate::models::{ProductRecord, Site};
use crate::workflow::{StrategyChain, TermContext};

pub use chedraui::ChedrauiResolver;
pub use walmart::WalmartResolver;

/// 策略链的组成方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainMode {
    /// 结构化接口优先，HTML 兜底
    Full,
    /// 只走搜索页 HTML 相关策略
    HtmlOnly,
}

/// 传输相关的共享资源
#[derive(Clone)]
pub struct Transport {
    pub fetcher: Arc<dyn Fetcher>,
    pub pacer: Arc<dyn Pacer>,
    /// 同一搜索词内连续请求之间的间隔
    pub pace: Duration,
}

impl Transport {
    pub fn new(fetcher: Arc<dyn Fetcher>, pacer: Arc<dyn Pacer>, pace: Duration) -> Self {
        Self {
            fetcher,
            pacer,
            pace,
        }
    }

    fn context(&self, term: &str, page_request: FetchRequest) -> TermContext<'_> {
        TermContext::new(
            term,
            self.fetcher.as_ref(),
            self.pacer.as_ref(),
            self.pace,
            page_request,
        )
    }

    fn document_context(&self, term: &str, page_url: &str, html: String) -> TermContext<'_> {
        TermContext::with_document(term, self.fetcher.as_ref(), self.pacer.as_ref(), page_url, html)
    }
}

/// 站点解析能力
#[async_trait]
pub trait SiteResolver: Send + Sync {
    fn site(&self) -> Site;

    fn chain(&self) -> &StrategyChain;

    fn transport(&self) -> &Transport;

    /// 搜索页请求（HTML 策略共用）
    fn search_page(&self, term: &str) -> FetchRequest;

    /// 解析一个搜索词，永远不会失败，全部策略落空时返回空列表
    async fn resolve(&self, term: &str) -> Vec<ProductRecord> {
        let ctx = self.transport().context(term, self.search_page(term));
        let outcome = self.chain().run(&ctx).await;
        match outcome.winner() {
            Some(tag) => info!(
                "[{}] 搜索词 '{}' 共 {} 条记录，来源 {}（{} 个请求）",
                self.site(),
                term,
                outcome.records.len(),
                tag,
                ctx.request_count()
            ),
            None => info!(
                "[{}] 搜索词 '{}' 没有记录（{} 个请求）",
                self.site(),
                term,
                ctx.request_count()
            ),
        }
        outcome.records
    }

    /// 对一份现成的 HTML 运行策略链（离线样本模式）
    async fn resolve_document(&self, term: &str, page_url: &str, html: String) -> Vec<ProductRecord> {
        let ctx = self.transport().document_context(term, page_url, html);
        self.chain().run(&ctx).await.records
    }
}

/// 按站点构建解析器
pub fn build_resolver(
    config: &Config,
    site: Site,
    mode: ChainMode,
    transport: Transport,
) -> AppResult<Box<dyn SiteResolver>> {
    let base_url = config.base_url(site);
    let resolver: Box<dyn SiteResolver> = match site {
        Site::Walmart => Box::new(WalmartResolver::new(base_url, mode, transport)?),
        Site::Chedraui => Box::new(ChedrauiResolver::new(base_url, mode, transport)?),
    };
    Ok(resolver)
}

/// `base + path`，带上查询参数；地址不合法时退回手工拼接
fn url_with_params(base_url: &str, path: &str, params: &[(&str, &str)]) -> String {
    let raw = format!("{}{}", base_url, path);
    match Url::parse_with_params(&raw, params) {
        Ok(url) => url.to_string(),
        Err(_) => {
            let query: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            format!("{}?{}", raw, query.join("&"))
        }
    }
}
