//! 结果合并 - 编排层
//!
//! 把两条独立策略链（API 优先链和纯 HTML 链）对同一组搜索词的结果合并。

use std::collections::HashSet;
use tracing::debug;

use crate::models::ResultSet;

/// 按搜索词合并，`secondary` 中商品 ID 已出现在 `primary` 里的记录被跳过
///
/// 没有商品 ID 的记录总是保留；记录保留各自的来源标记。
/// 只出现在 `secondary` 里的搜索词原样并入，顺序排在 `primary` 的搜索词之后。
pub fn merge(primary: ResultSet, secondary: ResultSet) -> ResultSet {
    let mut merged = primary;

    for (term, records) in secondary {
        let Some(existing) = merged.get(&term) else {
            merged.insert(term, records);
            continue;
        };

        let known: HashSet<&str> = existing
            .iter()
            .filter(|r| r.has_product_id())
            .map(|r| r.product_id.as_str())
            .collect();
        let before = records.len();
        let additions: Vec<_> = records
            .into_iter()
            .filter(|r| !r.has_product_id() || !known.contains(r.product_id.as_str()))
            .collect();
        debug!(
            "搜索词 '{}' 合并: 跳过 {} 条重复记录，新增 {} 条",
            term,
            before - additions.len(),
            additions.len()
        );

        let mut combined = existing.to_vec();
        combined.extend(additions);
        merged.insert(term, combined);
    }

    merged
}
