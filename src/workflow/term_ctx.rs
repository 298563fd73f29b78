//! 搜索词处理上下文
//!
//! 封装"我正在解析哪个搜索词"，以及这个搜索词内共享的资源：
//! 传输、节奏控制和懒加载的搜索页。

use std::fmt::Display;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::infrastructure::{FetchRequest, FetchResponse, Fetcher, Pacer};

pub struct TermContext<'a> {
    pub term: String,
    fetcher: &'a dyn Fetcher,
    pacer: &'a dyn Pacer,
    /// 同一搜索词内连续请求之间的间隔
    pace: Duration,
    page_url: String,
    /// 离线模式下为 None
    page_request: Option<FetchRequest>,
    /// 搜索页只请求一次，所有 HTML 策略共用
    page: OnceCell<Option<String>>,
    requests: AtomicUsize,
}

impl<'a> TermContext<'a> {
    pub fn new(
        term: impl Into<String>,
        fetcher: &'a dyn Fetcher,
        pacer: &'a dyn Pacer,
        pace: Duration,
        page_request: FetchRequest,
    ) -> Self {
        Self {
            term: term.into(),
            fetcher,
            pacer,
            pace,
            page_url: page_request.url.clone(),
            page_request: Some(page_request),
            page: OnceCell::new(),
            requests: AtomicUsize::new(0),
        }
    }

    /// 用本地 HTML 预置搜索页（离线样本模式）
    pub fn with_document(
        term: impl Into<String>,
        fetcher: &'a dyn Fetcher,
        pacer: &'a dyn Pacer,
        page_url: impl Into<String>,
        html: String,
    ) -> Self {
        Self {
            term: term.into(),
            fetcher,
            pacer,
            pace: Duration::ZERO,
            page_url: page_url.into(),
            page_request: None,
            page: OnceCell::from(Some(html)),
            requests: AtomicUsize::new(0),
        }
    }

    /// 发请求；除本搜索词的第一个请求外，每个请求前先等待
    pub async fn fetch(&self, request: FetchRequest) -> Option<FetchResponse> {
        if self.requests.fetch_add(1, Ordering::SeqCst) > 0 {
            self.pacer.pace(self.pace).await;
        }
        self.fetcher.fetch(request).await
    }

    /// 搜索页 HTML（第一次调用时才请求）
    pub async fn page(&self) -> Option<&str> {
        self.page
            .get_or_init(|| async {
                let request = self.page_request.clone()?;
                debug!("{} 请求搜索页 {}", self, request.url);
                self.fetch(request).await.map(|response| response.body)
            })
            .await
            .as_deref()
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    /// 本搜索词已经发出的请求数
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Display for TermContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[搜索词 {}]", self.term)
    }
}
