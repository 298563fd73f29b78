//! 策略链 - 流程层
//!
//! 核心职责：定义"一个搜索词"的完整解析流程
//!
//! 按优先级依次尝试各策略，第一个产出至少一条记录的策略即为结果；
//! 出错、panic 和零结果一视同仁，都推进到下一个策略。全部失败时返回空列表。

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{debug, info, warn};

use crate::models::{ProductRecord, SourceTag, StrategyAttempt};
use crate::services::{PageExtractor, PageInfo};
use crate::workflow::term_ctx::TermContext;

/// 一种检索方式
#[async_trait]
pub trait Strategy: Send + Sync {
    fn tag(&self) -> SourceTag;

    async fn attempt(&self, ctx: &TermContext<'_>) -> anyhow::Result<Vec<ProductRecord>>;
}

/// 把同步的搜索页提取器包装成策略：先拿到搜索页，再解析
pub struct PageStrategy<E> {
    extractor: E,
}

impl<E: PageExtractor> PageStrategy<E> {
    pub fn new(extractor: E) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl<E: PageExtractor> Strategy for PageStrategy<E> {
    fn tag(&self) -> SourceTag {
        self.extractor.tag()
    }

    async fn attempt(&self, ctx: &TermContext<'_>) -> anyhow::Result<Vec<ProductRecord>> {
        let html = ctx
            .page()
            .await
            .ok_or_else(|| anyhow::anyhow!("搜索页不可用: {}", ctx.page_url()))?;
        let page = PageInfo {
            term: &ctx.term,
            page_url: ctx.page_url(),
        };
        self.extractor.extract(html, &page)
    }
}

/// 一次解析的结果：最终记录 + 每一步的尝试记录
#[derive(Debug, Default)]
pub struct ChainOutcome {
    pub records: Vec<ProductRecord>,
    pub attempts: Vec<StrategyAttempt>,
}

impl ChainOutcome {
    /// 产出结果的策略
    pub fn winner(&self) -> Option<SourceTag> {
        self.attempts
            .iter()
            .find(|a| a.is_success())
            .map(|a| a.strategy)
    }
}

/// 有序策略链
pub struct StrategyChain {
    strategies: Vec<Box<dyn Strategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn Strategy>>) -> Self {
        Self { strategies }
    }

    pub fn tags(&self) -> Vec<SourceTag> {
        self.strategies.iter().map(|s| s.tag()).collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub async fn run(&self, ctx: &TermContext<'_>) -> ChainOutcome {
        let mut outcome = ChainOutcome::default();
        if self.is_empty() {
            warn!("{} ❌ 策略链为空", ctx);
            return outcome;
        }
        debug!("{} 策略链共 {} 个策略", ctx, self.len());

        for strategy in &self.strategies {
            let tag = strategy.tag();
            debug!("{} 尝试策略 {}", ctx, tag);

            let attempt = match AssertUnwindSafe(strategy.attempt(ctx)).catch_unwind().await {
                Ok(Ok(records)) => {
                    let records = records
                        .into_iter()
                        .map(|mut record| {
                            record.source = tag;
                            if record.query.is_empty() {
                                record.query = ctx.term.clone();
                            }
                            record
                        })
                        .collect();
                    StrategyAttempt::succeeded(tag, &ctx.term, records)
                }
                Ok(Err(e)) => StrategyAttempt::failed(tag, &ctx.term, format!("{:#}", e)),
                Err(panic) => StrategyAttempt::failed(tag, &ctx.term, panic_message(panic.as_ref())),
            };

            if attempt.is_success() {
                info!("{} ✓ 策略 {} 找到 {} 条记录", ctx, tag, attempt.records.len());
                outcome.records = attempt.records.clone();
                outcome.attempts.push(attempt);
                return outcome;
            }

            match &attempt.failure {
                Some(reason) => warn!("{} ⚠️ 策略 {} 失败: {}，尝试下一个", ctx, tag, reason),
                None => info!("{} 策略 {} 没有结果，尝试下一个", ctx, tag),
            }
            outcome.attempts.push(attempt);
        }

        warn!("{} ❌ 所有策略都没有找到商品", ctx);
        outcome
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {}", s)
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{FetchRequest, FetchResponse, Fetcher, Pacer};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct NoNetwork;

    #[async_trait]
    impl Fetcher for NoNetwork {
        async fn fetch(&self, _request: FetchRequest) -> Option<FetchResponse> {
            None
        }
    }

    struct NoWait;

    #[async_trait]
    impl Pacer for NoWait {
        async fn pace(&self, _duration: Duration) {}
    }

    enum Behavior {
        Empty,
        Fail,
        Panic,
        Yield(usize),
    }

    struct Counted {
        tag: SourceTag,
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Strategy for Counted {
        fn tag(&self) -> SourceTag {
            self.tag
        }

        async fn attempt(&self, ctx: &TermContext<'_>) -> anyhow::Result<Vec<ProductRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Empty => Ok(Vec::new()),
                Behavior::Fail => anyhow::bail!("接口被拦截"),
                Behavior::Panic => panic!("选择器崩溃"),
                Behavior::Yield(n) => Ok((0..n)
                    .map(|i| {
                        let mut r = ProductRecord::new("", SourceTag::PrimaryApi);
                        r.name = format!("{} {}", ctx.term, i);
                        r
                    })
                    .collect()),
            }
        }
    }

    fn chain(behaviors: Vec<Behavior>) -> (StrategyChain, Vec<Arc<AtomicUsize>>) {
        let mut counters = Vec::new();
        let strategies = behaviors
            .into_iter()
            .zip(SourceTag::ORDERED)
            .map(|(behavior, tag)| {
                let calls = Arc::new(AtomicUsize::new(0));
                counters.push(calls.clone());
                Box::new(Counted { tag, behavior, calls }) as Box<dyn Strategy>
            })
            .collect();
        (StrategyChain::new(strategies), counters)
    }

    fn ctx<'a>(fetcher: &'a NoNetwork, pacer: &'a NoWait) -> TermContext<'a> {
        TermContext::new(
            "manzana",
            fetcher,
            pacer,
            Duration::ZERO,
            FetchRequest::get("https://example.com/search?q=manzana"),
        )
    }

    #[tokio::test]
    async fn test_stops_at_first_non_empty_strategy() {
        let (chain, counters) = chain(vec![
            Behavior::Empty,
            Behavior::Empty,
            Behavior::Yield(1),
            Behavior::Yield(5),
            Behavior::Yield(5),
            Behavior::Yield(5),
        ]);
        let (fetcher, pacer) = (NoNetwork, NoWait);
        let outcome = chain.run(&ctx(&fetcher, &pacer)).await;

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].source, SourceTag::PageEmbedded);
        assert_eq!(outcome.records[0].query, "manzana");
        assert_eq!(outcome.winner(), Some(SourceTag::PageEmbedded));

        let calls: Vec<usize> = counters.iter().map(|c| c.load(Ordering::SeqCst)).collect();
        assert_eq!(calls, vec![1, 1, 1, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_errors_and_panics_advance_the_chain() {
        let (chain, counters) = chain(vec![Behavior::Fail, Behavior::Panic, Behavior::Yield(2)]);
        let (fetcher, pacer) = (NoNetwork, NoWait);
        let outcome = chain.run(&ctx(&fetcher, &pacer)).await;

        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.attempts.len(), 3);
        assert!(outcome.attempts[0].failure.as_deref().is_some_and(|f| f.contains("拦截")));
        assert!(outcome.attempts[1].failure.as_deref().is_some_and(|f| f.contains("panic")));
        assert!(counters.iter().all(|c| c.load(Ordering::SeqCst) == 1));
    }

    #[tokio::test]
    async fn test_exhaustion_returns_empty() {
        let (chain, _) = chain(vec![Behavior::Empty, Behavior::Fail]);
        let (fetcher, pacer) = (NoNetwork, NoWait);
        let outcome = chain.run(&ctx(&fetcher, &pacer)).await;
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.winner(), None);
        assert_eq!(outcome.attempts.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_chain_returns_empty() {
        let (chain, _) = chain(Vec::new());
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 0);

        let (fetcher, pacer) = (NoNetwork, NoWait);
        let outcome = chain.run(&ctx(&fetcher, &pacer)).await;
        assert!(outcome.records.is_empty());
        assert!(outcome.attempts.is_empty());
        assert_eq!(outcome.winner(), None);
    }

    #[tokio::test]
    async fn test_page_strategy_without_page_fails_softly() {
        struct Never;
        impl PageExtractor for Never {
            fn tag(&self) -> SourceTag {
                SourceTag::HtmlSelector
            }
            fn extract(&self, _html: &str, _page: &PageInfo<'_>) -> anyhow::Result<Vec<ProductRecord>> {
                unreachable!("没有搜索页时不应调用")
            }
        }

        let chain = StrategyChain::new(vec![Box::new(PageStrategy::new(Never))]);
        let (fetcher, pacer) = (NoNetwork, NoWait);
        let outcome = chain.run(&ctx(&fetcher, &pacer)).await;
        assert!(outcome.records.is_empty());
        assert!(outcome.attempts[0].failure.is_some());
    }
}
