//! 搜索编排器 - 编排层
//!
//! 把一个站点解析器依次应用到一组搜索词上。搜索词严格串行处理，
//! 每个搜索词结束后等待一段时间再开始下一个。

use std::time::Duration;
use tracing::info;

use crate::infrastructure::Pacer;
use crate::models::ResultSet;
use crate::sites::SiteResolver;

/// 解析全部搜索词
///
/// 返回的结果集对每个搜索词都有一项，即使所有策略都失败（此时为空列表）。
pub async fn resolve_terms(
    resolver: &dyn SiteResolver,
    terms: &[String],
    pacer: &dyn Pacer,
    delay: Duration,
) -> ResultSet {
    let mut results = ResultSet::new();
    let total = terms.len();

    for (index, term) in terms.iter().enumerate() {
        info!("[{}] 🔍 ({}/{}) 搜索 '{}'", resolver.site(), index + 1, total, term);
        let records = resolver.resolve(term).await;
        results.insert(term.clone(), records);

        if index + 1 < total {
            pacer.pace(delay).await;
        }
    }

    results
}
