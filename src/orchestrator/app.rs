//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：加载可选的搜索计划文件，覆盖环境变量配置
//! 2. **按站点调度**：为每个站点构建传输和解析器，按检索方式跑一条或两条策略链
//! 3. **结果持久化**：每个站点的结果集按配置的格式写盘
//! 4. **统计输出**：每个站点结束后打印摘要
//!
//! 站点之间串行执行，互不共享传输（各自持有 cookie jar）。

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{OfflineFetcher, Pacer, ReqwestFetcher, TokioPacer};
use crate::models::{load_sample_html, load_search_plan, ResultSet, SearchMethod, Site};
use crate::orchestrator::merge::merge;
use crate::orchestrator::search_orchestrator::resolve_terms;
use crate::services::ResultWriter;
use crate::sites::{build_resolver, ChainMode, Transport};
use crate::utils::logging;

/// 离线样本模式下使用的搜索词
pub const SAMPLE_TERM: &str = "sample";

/// 应用主结构
pub struct App {
    config: Config,
    writer: ResultWriter,
}

impl App {
    /// 初始化应用
    pub async fn initialize(mut config: Config) -> AppResult<Self> {
        if let Some(plan_file) = config.search_plan_file.clone() {
            let plan = load_search_plan(Path::new(&plan_file)).await?;
            config.apply_search_plan(plan)?;
        }

        logging::log_startup(&config);

        let writer = ResultWriter::new(&config.output_dir);
        Ok(Self { config, writer })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> AppResult<()> {
        for site in self.config.site_selection.sites() {
            let results = self.collect(site).await?;

            if results.total_records() == 0 {
                warn!("[{}] ⚠️ 没有找到任何商品", site);
            }

            self.writer
                .persist_all(site, &results, &self.config.output_formats)
                .await?;
            logging::print_summary(site, &results);
        }

        info!("✅ 全部站点处理完成");
        Ok(())
    }

    /// 一个站点的完整结果集（在线或离线样本）
    pub async fn collect(&self, site: Site) -> AppResult<ResultSet> {
        match &self.config.sample_html {
            Some(sample) => self.collect_sample(site, Path::new(sample)).await,
            None => self.collect_online(site).await,
        }
    }

    async fn collect_online(&self, site: Site) -> AppResult<ResultSet> {
        let terms = self.config.terms_for(site);
        logging::log_site_start(site, &terms, self.config.search_method);

        let pacer: Arc<dyn Pacer> = Arc::new(TokioPacer::new(self.config.request_jitter()));
        let transport = Transport::new(
            Arc::new(ReqwestFetcher::new(&self.config, site)?),
            pacer.clone(),
            self.config.request_pace(),
        );

        let results = match self.config.search_method {
            SearchMethod::Api => self.run_chain(site, ChainMode::Full, &transport, &terms).await?,
            SearchMethod::Html => self.run_chain(site, ChainMode::HtmlOnly, &transport, &terms).await?,
            SearchMethod::Both => {
                let primary = self.run_chain(site, ChainMode::Full, &transport, &terms).await?;
                info!("[{}] 🔁 API 链完成，开始 HTML 链做交叉验证", site);
                pacer.pace(self.config.request_delay()).await;
                let secondary = self
                    .run_chain(site, ChainMode::HtmlOnly, &transport, &terms)
                    .await?;
                merge(primary, secondary)
            }
        };
        Ok(results)
    }

    async fn run_chain(
        &self,
        site: Site,
        mode: ChainMode,
        transport: &Transport,
        terms: &[String],
    ) -> AppResult<ResultSet> {
        let resolver = build_resolver(&self.config, site, mode, transport.clone())?;
        Ok(resolve_terms(
            resolver.as_ref(),
            terms,
            transport.pacer.as_ref(),
            self.config.request_delay(),
        )
        .await)
    }

    /// 离线模式：只对本地 HTML 跑页面策略，不发任何请求
    async fn collect_sample(&self, site: Site, path: &Path) -> AppResult<ResultSet> {
        info!("[{}] 📄 离线样本模式: {}", site, path.display());
        let html = load_sample_html(path).await?;

        let transport = Transport::new(
            Arc::new(OfflineFetcher),
            Arc::new(TokioPacer::exact()),
            std::time::Duration::ZERO,
        );
        let resolver = build_resolver(&self.config, site, ChainMode::HtmlOnly, transport)?;
        let page_url = self.config.base_url(site).to_string();
        let records = resolver.resolve_document(SAMPLE_TERM, &page_url, html).await;

        let mut results = ResultSet::new();
        results.insert(SAMPLE_TERM, records);
        Ok(results)
    }
}
