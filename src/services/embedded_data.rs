//! 内嵌数据提取 - 业务能力层
//!
//! 服务端渲染的搜索页会把首屏数据塞进 `<script type="application/json">`，
//! 结构和搜索接口基本一致。

use scraper::{Html, Selector};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::AppResult;
use crate::models::{ProductRecord, SourceTag};
use crate::services::normalizer::{array_at, compile_selector, normalize_json, JsonShape, UrlRule};
use crate::services::page::{PageExtractor, PageInfo};

const ITEM_STACKS_PATH: &str = "props.pageProps.initialState.search.searchResult.itemStacks";

const ITEM_SHAPE: JsonShape = JsonShape {
    name: "name",
    product_id: "usItemId",
    price: "priceInfo.currentPrice.price",
    price_text: Some("priceInfo.currentPrice.priceString"),
    derive_price_text: true,
    list_price: Some("priceInfo.wasPrice.price"),
    brand: Some("brand"),
    image: "imageInfo.thumbnailUrl",
    url: UrlRule::FieldOrId {
        path: "canonicalUrl",
        id_prefix: "/ip/",
    },
};

pub struct EmbeddedDataExtractor {
    base_url: String,
    script: Selector,
}

impl EmbeddedDataExtractor {
    pub fn new(base_url: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            base_url: base_url.into(),
            script: compile_selector(r#"script[type="application/json"]"#)?,
        })
    }
}

impl PageExtractor for EmbeddedDataExtractor {
    fn tag(&self) -> SourceTag {
        SourceTag::PageEmbedded
    }

    fn extract(&self, html: &str, page: &PageInfo<'_>) -> anyhow::Result<Vec<ProductRecord>> {
        let document = Html::parse_document(html);
        let mut records = Vec::new();

        for script in document.select(&self.script) {
            let raw: String = script.text().collect();
            let data: JsonValue = match serde_json::from_str(raw.trim()) {
                Ok(data) => data,
                Err(e) => {
                    debug!("跳过无法解析的 JSON 块: {}", e);
                    continue;
                }
            };

            for stack in array_at(&data, ITEM_STACKS_PATH) {
                for item in array_at(stack, "items") {
                    records.push(normalize_json(
                        item,
                        &ITEM_SHAPE,
                        &self.base_url,
                        page.term,
                        SourceTag::PageEmbedded,
                    ));
                }
            }
        }

        debug!("内嵌数据提取到 {} 条记录", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(term: &str) -> PageInfo<'_> {
        PageInfo {
            term,
            page_url: "https://super.walmart.com.mx/search?q=manzana",
        }
    }

    #[test]
    fn test_extracts_item_stacks() {
        let html = r#"<html><body>
            <script type="application/json">not json</script>
            <script type="application/json">{"props":{"pageProps":{"initialState":{"search":{"searchResult":{"itemStacks":[
                {"items":[
                    {"name":"Manzana Red Delicious","usItemId":"0001","canonicalUrl":"/ip/manzana-red/0001",
                     "priceInfo":{"currentPrice":{"price":42.5,"priceString":"$42.50"}},
                     "imageInfo":{"thumbnailUrl":"https://i5.walmartimages.com/m.jpg"}},
                    {"name":"Manzana Gala","usItemId":"0002","priceInfo":{"currentPrice":{"price":39}}}
                ]}
            ]}}}}}}</script>
        </body></html>"#;

        let extractor = EmbeddedDataExtractor::new("https://super.walmart.com.mx").unwrap();
        let records = extractor.extract(html, &page("manzana")).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Manzana Red Delicious");
        assert_eq!(records[0].price, 42.5);
        assert_eq!(
            records[0].product_url.as_deref(),
            Some("https://super.walmart.com.mx/ip/manzana-red/0001")
        );
        assert_eq!(records[1].price_text, "$39");
        assert_eq!(
            records[1].product_url.as_deref(),
            Some("https://super.walmart.com.mx/ip/0002")
        );
        assert!(records.iter().all(|r| r.source == SourceTag::PageEmbedded));
    }

    #[test]
    fn test_page_without_data_yields_nothing() {
        let extractor = EmbeddedDataExtractor::new("https://super.walmart.com.mx").unwrap();
        let records = extractor
            .extract("<html><body><p>hola</p></body></html>", &page("x"))
            .unwrap();
        assert!(records.is_empty());
    }
}
