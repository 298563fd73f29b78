/// 日志工具模块
///
/// 提供日志初始化、格式化和统计输出的辅助函数
use std::collections::BTreeMap;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::{ProductRecord, ResultSet, SearchMethod, Site, SourceTag};

/// 摘要里每个搜索词展示的记录数
const PREVIEW_LIMIT: usize = 5;

/// 初始化日志订阅者
///
/// `RUST_LOG` 优先；否则 `verbose` 为 true 时输出 debug 级别。
/// 重复调用不会报错（测试里可能多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 商品价格检索");
    info!(
        "🏪 站点: {}",
        config
            .site_selection
            .sites()
            .iter()
            .map(|s| s.name())
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!("🔧 检索方式: {:?}", config.search_method);
    info!(
        "💾 输出: {} ({})",
        config.output_dir,
        config
            .output_formats
            .iter()
            .map(|f| f.extension())
            .collect::<Vec<_>>()
            .join(", ")
    );
    if let Some(sample) = &config.sample_html {
        info!("📄 离线样本: {}", sample);
    }
    info!("{}", "=".repeat(60));
}

/// 记录站点开始信息
pub fn log_site_start(site: Site, terms: &[String], method: SearchMethod) {
    info!("\n{}", "=".repeat(60));
    info!("🏪 开始处理站点 {} ({:?})", site, method);
    info!("📋 搜索词 {} 个: {}", terms.len(), terms.join(", "));
    info!("{}", "=".repeat(60));
}

/// 各来源的记录数，按策略优先级排序
pub fn count_by_source(records: &[ProductRecord]) -> BTreeMap<usize, (SourceTag, usize)> {
    let mut counts: BTreeMap<usize, (SourceTag, usize)> = BTreeMap::new();
    for record in records {
        let rank = SourceTag::ORDERED
            .iter()
            .position(|t| *t == record.source)
            .unwrap_or(SourceTag::ORDERED.len());
        counts.entry(rank).or_insert((record.source, 0)).1 += 1;
    }
    counts
}

/// 打印站点统计信息
pub fn print_summary(site: Site, results: &ResultSet) {
    info!("\n{}", "=".repeat(60));
    info!("📊 站点 {} 处理完成统计", site);
    info!("完成时间: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    info!("{}", "=".repeat(60));

    for (term, records) in results.iter() {
        info!("🔍 '{}': {} 条记录", term, records.len());
        if records.is_empty() {
            continue;
        }

        let sources: Vec<String> = count_by_source(records)
            .values()
            .map(|(tag, n)| format!("{} {}", tag, n))
            .collect();
        info!("   来源: {}", sources.join(", "));

        for record in records.iter().take(PREVIEW_LIMIT) {
            info!("   - {}", preview_line(record));
        }
    }

    info!("{}", "─".repeat(60));
    info!(
        "✅ 共 {} 个搜索词 / {} 条记录",
        results.len(),
        results.total_records()
    );
    info!("{}", "=".repeat(60));
}

/// `名称: 价格文本 (来源)`
pub fn preview_line(record: &ProductRecord) -> String {
    let name = if record.has_name() { record.name.as_str() } else { "(无名称)" };
    format!("{}: {} ({})", truncate_text(name, 60), record.price_text, record.source)
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（按字符计）
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
