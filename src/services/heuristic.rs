//! 通用启发式兜底 - 业务能力层
//!
//! 在整页里找"长得像价格"的元素，再向上最多走几层祖先去找名称。
//! 产出的每条记录都带低置信度备注。

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::AppResult;
use crate::models::{ProductRecord, SourceTag};
use crate::services::normalizer::{capitalize, compile_selector, element_text};
use crate::services::page::{PageExtractor, PageInfo};
use crate::services::price_parser::parse_price;

pub const HEURISTIC_NOTE: &str = "Extracted using general fallback method";

pub struct HeuristicExtractor {
    price: Selector,
    name: Selector,
    limit: usize,
    max_depth: usize,
}

impl HeuristicExtractor {
    pub fn new(price_selector: &str, name_selector: &str) -> AppResult<Self> {
        Ok(Self {
            price: compile_selector(price_selector)?,
            name: compile_selector(name_selector)?,
            limit: 10,
            max_depth: 5,
        })
    }

    /// 向上查找名称元素
    fn nearby_name(&self, price_element: ElementRef<'_>) -> Option<String> {
        price_element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take(self.max_depth)
            .find_map(|ancestor| ancestor.select(&self.name).next())
            .map(element_text)
    }
}

impl PageExtractor for HeuristicExtractor {
    fn tag(&self) -> SourceTag {
        SourceTag::HeuristicFallback
    }

    fn extract(&self, html: &str, page: &PageInfo<'_>) -> anyhow::Result<Vec<ProductRecord>> {
        let document = Html::parse_document(html);

        let records: Vec<ProductRecord> = document
            .select(&self.price)
            .take(self.limit)
            .enumerate()
            .map(|(i, element)| {
                let mut record =
                    ProductRecord::new(page.term, SourceTag::HeuristicFallback).with_note(HEURISTIC_NOTE);
                record.price_text = element_text(element);
                record.price = parse_price(Some(&record.price_text));
                record.name = self
                    .nearby_name(element)
                    .unwrap_or_else(|| format!("{} {}", capitalize(page.term), i + 1));
                if !page.page_url.is_empty() {
                    record.product_url = Some(page.page_url.to_string());
                }
                record
            })
            .collect();

        debug!("启发式兜底提取到 {} 条记录", records.len());
        Ok(records)
    }
}
