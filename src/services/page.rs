//! 搜索页提取能力的公共接口
//!
//! 提取器只接收已经下载好的 HTML 文本，同步解析，不碰网络。

use crate::models::{ProductRecord, SourceTag};

/// 当前搜索页的上下文信息
#[derive(Debug, Clone, Copy)]
pub struct PageInfo<'a> {
    pub term: &'a str,
    /// 搜索页地址（离线样本模式下为样本文件路径）
    pub page_url: &'a str,
}

/// 从搜索页 HTML 中提取商品
pub trait PageExtractor: Send + Sync {
    fn tag(&self) -> SourceTag;

    fn extract(&self, html: &str, page: &PageInfo<'_>) -> anyhow::Result<Vec<ProductRecord>>;
}
