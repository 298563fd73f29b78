//! 选择器集合提取 - 业务能力层
//!
//! 站点历史上用过好几套互相冲突的 class 命名，每一套写成一个 [`SelectorSet`]。
//! 按顺序尝试各集合的容器选择器，第一个匹配到元素的容器独占本次提取，
//! 不跨集合合并。

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use crate::error::AppResult;
use crate::models::{ProductRecord, SourceTag};
use crate::services::normalizer::{
    absolute_url, compile_all, compile_selector, element_text, first_attr, first_text, IdPattern,
};
use crate::services::page::{PageExtractor, PageInfo};
use crate::services::price_parser::parse_price;

/// 一套声明式选择器配置
#[derive(Debug, Clone, Copy)]
pub struct SelectorSet {
    pub label: &'static str,
    /// 商品容器，按顺序尝试
    pub containers: &'static [&'static str],
    pub names: &'static [&'static str],
    /// 名称选择器都没命中时，取容器里第一个有文字的链接
    pub name_from_links: bool,
    pub prices: &'static [&'static str],
    pub brands: &'static [&'static str],
    pub list_prices: &'static [&'static str],
    pub links: &'static [&'static str],
    pub images: &'static [&'static str],
    pub image_attrs: &'static [&'static str],
    /// 商品 ID 正则（作用于补全后的商品链接）
    pub id_pattern: &'static str,
    pub id_trailing_digits: bool,
    /// 丢弃名称为空的记录
    pub require_name: bool,
}

struct CompiledSet {
    label: &'static str,
    containers: Vec<(&'static str, Selector)>,
    names: Vec<Selector>,
    name_from_links: bool,
    prices: Vec<Selector>,
    brands: Vec<Selector>,
    list_prices: Vec<Selector>,
    links: Vec<Selector>,
    images: Vec<Selector>,
    image_attrs: &'static [&'static str],
    id: IdPattern,
    require_name: bool,
}

impl CompiledSet {
    fn compile(set: &SelectorSet) -> AppResult<Self> {
        let containers = set
            .containers
            .iter()
            .map(|c| compile_selector(c).map(|s| (*c, s)))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(Self {
            label: set.label,
            containers,
            names: compile_all(set.names)?,
            name_from_links: set.name_from_links,
            prices: compile_all(set.prices)?,
            brands: compile_all(set.brands)?,
            list_prices: compile_all(set.list_prices)?,
            links: compile_all(set.links)?,
            images: compile_all(set.images)?,
            image_attrs: set.image_attrs,
            id: IdPattern::new(set.id_pattern, set.id_trailing_digits)?,
            require_name: set.require_name,
        })
    }

    fn record(&self, item: ElementRef<'_>, any_link: &Selector, base_url: &str, term: &str) -> ProductRecord {
        let mut record = ProductRecord::new(term, SourceTag::HtmlSelector);

        record.name = first_text(item, &self.names)
            .filter(|n| !n.is_empty())
            .or_else(|| {
                if self.name_from_links {
                    item.select(any_link)
                        .map(element_text)
                        .find(|t| !t.is_empty())
                } else {
                    None
                }
            })
            .unwrap_or_default();

        record.price_text = first_text(item, &self.prices).unwrap_or_default();
        record.price = parse_price(Some(&record.price_text));
        record.brand = first_text(item, &self.brands).filter(|b| !b.is_empty());
        record.list_price = first_text(item, &self.list_prices)
            .map(|t| parse_price(Some(&t)))
            .filter(|p| *p > 0.0);
        record.product_url = first_attr(item, &self.links, &["href"]).map(|href| absolute_url(base_url, &href));
        record.product_id = record
            .product_url
            .as_deref()
            .map(|url| self.id.extract(url))
            .unwrap_or_default();
        record.image_url = first_attr(item, &self.images, self.image_attrs);
        record
    }
}

pub struct SelectorSetExtractor {
    base_url: String,
    sets: Vec<CompiledSet>,
    any_link: Selector,
}

impl SelectorSetExtractor {
    pub fn new(base_url: impl Into<String>, sets: &[SelectorSet]) -> AppResult<Self> {
        Ok(Self {
            base_url: base_url.into(),
            sets: sets.iter().map(CompiledSet::compile).collect::<AppResult<_>>()?,
            any_link: compile_selector("a")?,
        })
    }
}

impl PageExtractor for SelectorSetExtractor {
    fn tag(&self) -> SourceTag {
        SourceTag::HtmlSelector
    }

    fn extract(&self, html: &str, page: &PageInfo<'_>) -> anyhow::Result<Vec<ProductRecord>> {
        let document = Html::parse_document(html);

        for set in &self.sets {
            for (raw, container) in &set.containers {
                let items: Vec<ElementRef<'_>> = document.select(container).collect();
                if items.is_empty() {
                    continue;
                }
                info!(
                    "🧩 选择器集合 [{}] 的容器 {} 匹配到 {} 个元素",
                    set.label,
                    raw,
                    items.len()
                );

                let total = items.len();
                let records: Vec<ProductRecord> = items
                    .into_iter()
                    .map(|item| set.record(item, &self.any_link, &self.base_url, page.term))
                    .filter(|record| !set.require_name || record.has_name())
                    .collect();
                if records.len() < total {
                    debug!("丢弃 {} 条没有名称的记录", total - records.len());
                }
                return Ok(records);
            }
        }

        debug!("没有任何选择器集合匹配到商品容器");
        Ok(Vec::new())
    }
}
