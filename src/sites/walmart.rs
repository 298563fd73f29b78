//! Walmart México 解析器
//!
//! 策略顺序：
//! 1. 自动补全接口 `GET /api/autocomplete/v2`
//! 2. GraphQL 搜索 `POST /orchestra/graphql/search`（POST 失败时改用 GET 再试一次）
//! 3. 搜索页内嵌 JSON
//! 4. 选择器集合
//! 5. 启发式兜底

use anyhow::Context;
use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use super::{url_with_params, ChainMode, SiteResolver, Transport};
use crate::error::AppResult;
use crate::infrastructure::FetchRequest;
use crate::models::{ProductRecord, Site, SourceTag};
use crate::services::normalizer::{array_at, normalize_json, opt_text_at, JsonShape, UrlRule};
use crate::services::{EmbeddedDataExtractor, HeuristicExtractor, SelectorSet, SelectorSetExtractor};
use crate::workflow::{PageStrategy, Strategy, StrategyChain, TermContext};

const AUTOCOMPLETE_PATH: &str = "/api/autocomplete/v2";
const GRAPHQL_PATH: &str = "/orchestra/graphql/search";
const GRAPHQL_PAGE_SIZE: u32 = 40;

const SEARCH_QUERY: &str = "query Search($query: String!, $page: Int, $facets: [String], $sort: String, $affinityOverride: AffinityOverride, $channel: String, $tenant: String, $skipGallery: Boolean! = false) { search(query: $query, page: $page, facets: $facets, sort: $sort, affinityOverride: $affinityOverride, channel: $channel, tenant: $tenant) { query products { ...ProductFragment } __typename } gallery @skip(if: $skipGallery) { layouts(ids: [\"Collection_Gallery_Visual\", \"Collection_Gallery_XL\", \"CMS_MODULE\"]) { id template data { __typename contentType ... on Collection_Gallery_DataType { products { ...ProductFragment } __typename } } __typename } __typename } } fragment ProductFragment on Product { id usItemId sponsoredProduct name canonicalUrl numberOfReviews averageRating availabilityStatus inventory { value displayValue } priceInfo { itemPrice { ... on FormatPrice { priceString price } __typename } wasPrice { ... on FormatPrice { priceString price } __typename } unitPrice { __typename } } badges { flags { __typename id key text } tags { __typename id key text } } imageInfo { thumbnailUrl size { width height } } fulfillmentBadge shelf { name aisleLocator { deep { aisle zone displayName } } } foundAt offerId geoItemClassification { displayValue } productClassification { displayValue } __typename }";

const SUGGESTION_SHAPE: JsonShape = JsonShape {
    name: "displayName",
    product_id: "productId",
    price: "priceInfo.price",
    price_text: Some("priceInfo.priceString"),
    derive_price_text: false,
    list_price: None,
    brand: None,
    image: "imageUrl",
    url: UrlRule::Field {
        path: "productId",
        prefix: "/ip/",
        suffix: "",
    },
};

const GRAPHQL_PRODUCT_SHAPE: JsonShape = JsonShape {
    name: "name",
    product_id: "id",
    price: "priceInfo.itemPrice.price",
    price_text: Some("priceInfo.itemPrice.priceString"),
    derive_price_text: false,
    list_price: Some("priceInfo.wasPrice.price"),
    brand: None,
    image: "imageInfo.thumbnailUrl",
    url: UrlRule::FieldOrId {
        path: "canonicalUrl",
        id_prefix: "/ip/",
    },
};

/// 搜索页改版过多次，每一代的标记都保留
const SELECTOR_SETS: [SelectorSet; 2] = [
    SelectorSet {
        label: "search-grid",
        containers: &[
            r#"div[data-automation-id="product"]"#,
            "div.product-card",
            "div.search-result-gridview-item",
            "div.Grid-col",
            r#"div[data-testid="list-view"]"#,
        ],
        names: &[
            r#"span[data-automation-id="product-title"]"#,
            "span.product-title-link",
            "a.product-title-link",
            "div.product-title-link",
            "div.product-name",
        ],
        name_from_links: true,
        prices: &[
            r#"div[data-automation-id="product-price"]"#,
            "span.price-main",
            "div.product-price",
            "span.price-characteristic",
        ],
        brands: &[],
        list_prices: &[],
        links: &["a"],
        images: &["img"],
        image_attrs: &["src", "data-src"],
        id_pattern: r"/ip/([^/]+)",
        id_trailing_digits: false,
        require_name: true,
    },
    SelectorSet {
        label: "product-card",
        containers: &["section.product-card"],
        names: &[
            r#"span[data-automation-id="product-title"]"#,
            "span.product-title",
            "div.product-title-text",
        ],
        name_from_links: false,
        prices: &[
            r#"div[data-automation-id="price"]"#,
            "div.product-price",
            "span.price-main",
        ],
        brands: &[
            r#"span[data-automation-id="product-brand"]"#,
            "span.product-brand",
            "div.product-brand",
        ],
        list_prices: &[r#"span[data-automation-id="was-price"]"#],
        links: &[r#"a[data-automation-id="product-link"]"#, "a.product-link", "a"],
        images: &[r#"img[data-automation-id="product-image"]"#, "img.product-image", "img"],
        image_attrs: &["src", "data-src"],
        id_pattern: r"/ip/(\d+)",
        id_trailing_digits: false,
        require_name: false,
    },
];

const HEURISTIC_PRICE: &str = r#"div[data-automation-id="product-price"], span.price-main, .price, .product-price"#;
const HEURISTIC_NAME: &str = r#"span[data-automation-id="product-title"], .product-name, h1, h2, h3"#;

fn search_page_url(base_url: &str, term: &str) -> String {
    url_with_params(base_url, "/search", &[("q", term)])
}

// ========== 策略 1：自动补全 ==========

pub struct AutocompleteStrategy {
    base_url: String,
}

impl AutocompleteStrategy {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

/// 自动补全有两种返回格式：带商品信息的 `suggestions`，或只有关键词的数组
pub fn parse_autocomplete(data: &JsonValue, base_url: &str, term: &str) -> Vec<ProductRecord> {
    match data {
        JsonValue::Object(_) => array_at(data, "suggestions")
            .iter()
            .filter(|s| opt_text_at(s, "productId").is_some())
            .map(|s| normalize_json(s, &SUGGESTION_SHAPE, base_url, term, SourceTag::PrimaryApi))
            .collect(),
        JsonValue::Array(items) => items
            .iter()
            .filter_map(|item| opt_text_at(item, "term"))
            .map(|name| {
                let mut record = ProductRecord::new(term, SourceTag::PrimaryApi);
                record.product_url = Some(search_page_url(base_url, &name));
                record.name = name;
                record
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl Strategy for AutocompleteStrategy {
    fn tag(&self) -> SourceTag {
        SourceTag::PrimaryApi
    }

    async fn attempt(&self, ctx: &TermContext<'_>) -> anyhow::Result<Vec<ProductRecord>> {
        let url = url_with_params(
            &self.base_url,
            AUTOCOMPLETE_PATH,
            &[
                ("term", ctx.term.as_str()),
                ("termLimit", "10"),
                ("departmentLimit", "2"),
                ("tenant", "OD"),
            ],
        );
        debug!("自动补全接口: {}", url);

        let request = FetchRequest::get(url).header("referer", search_page_url(&self.base_url, &ctx.term));
        let response = ctx
            .fetch(request)
            .await
            .context("自动补全接口没有返回可用响应")?;
        let data = response.json().context("自动补全响应不是 JSON")?;
        Ok(parse_autocomplete(&data, &self.base_url, &ctx.term))
    }
}

// ========== 策略 2：GraphQL 搜索 ==========

pub struct GraphqlSearchStrategy {
    base_url: String,
}

impl GraphqlSearchStrategy {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, GRAPHQL_PATH)
    }

    fn post_request(&self, term: &str) -> FetchRequest {
        let body = json!({
            "query": SEARCH_QUERY,
            "variables": {
                "query": term,
                "page": 1,
                "sort": "best_match",
                "ps": GRAPHQL_PAGE_SIZE,
                "limit": GRAPHQL_PAGE_SIZE,
                "additionalQueryParams.isMoreOptionsTileEnabled": true,
                "additionalQueryParams.isGenAiEnabled": false,
                "tenant": "MX_GLASS",
                "enableMultiSave": true,
                "enableFacetCount": true,
                "ffAwareSearchOptOut": false,
                "fitmentFieldParams": "true_true_true"
            }
        });

        FetchRequest::post(self.endpoint(), body)
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .header("x-apollo-operation-name", "Search")
            .header("x-o-platform-version", "main-1.13.0-0eb8f0")
            .header("x-o-ccm", "server")
            .header("x-o-gql-query", "query Search")
            .header("referer", search_page_url(&self.base_url, term))
    }

    /// POST 被拒时把变量放进查询参数再试一次
    fn get_request(&self, term: &str) -> FetchRequest {
        let limit = GRAPHQL_PAGE_SIZE.to_string();
        let params = [
            ("query", term),
            ("page", "1"),
            ("prg", "desktop"),
            ("sort", "best_match"),
            ("ps", limit.as_str()),
            ("limit", limit.as_str()),
            ("additionalQueryParams.isMoreOptionsTileEnabled", "true"),
            ("additionalQueryParams.isGenAiEnabled", "false"),
            ("tenant", "MX_GLASS"),
            ("enableMultiSave", "true"),
            ("enableFacetCount", "true"),
            ("ffAwareSearchOptOut", "false"),
            ("fitmentFieldParams", "true_true_true"),
        ];
        params
            .iter()
            .fold(FetchRequest::get(self.endpoint()), |request, (k, v)| request.param(*k, *v))
            .header("referer", search_page_url(&self.base_url, term))
    }
}

pub fn parse_graphql_search(data: &JsonValue, base_url: &str, term: &str) -> Vec<ProductRecord> {
    array_at(data, "data.search.products")
        .iter()
        .map(|p| normalize_json(p, &GRAPHQL_PRODUCT_SHAPE, base_url, term, SourceTag::SecondaryApi))
        .collect()
}

#[async_trait]
impl Strategy for GraphqlSearchStrategy {
    fn tag(&self) -> SourceTag {
        SourceTag::SecondaryApi
    }

    async fn attempt(&self, ctx: &TermContext<'_>) -> anyhow::Result<Vec<ProductRecord>> {
        let response = match ctx.fetch(self.post_request(&ctx.term)).await {
            Some(response) => response,
            None => {
                warn!("{} GraphQL POST 失败，改用 GET 查询参数", ctx);
                ctx.fetch(self.get_request(&ctx.term))
                    .await
                    .context("GraphQL 的 POST 和 GET 请求都失败了")?
            }
        };
        let data = response.json().context("GraphQL 响应不是 JSON")?;
        Ok(parse_graphql_search(&data, &self.base_url, &ctx.term))
    }
}

// ========== 解析器 ==========

pub struct WalmartResolver {
    base_url: String,
    chain: StrategyChain,
    transport: Transport,
}

impl WalmartResolver {
    pub fn new(base_url: &str, mode: ChainMode, transport: Transport) -> AppResult<Self> {
        let mut strategies: Vec<Box<dyn Strategy>> = Vec::new();
        if mode == ChainMode::Full {
            strategies.push(Box::new(AutocompleteStrategy::new(base_url)));
            strategies.push(Box::new(GraphqlSearchStrategy::new(base_url)));
        }
        strategies.push(Box::new(PageStrategy::new(EmbeddedDataExtractor::new(base_url)?)));
        strategies.push(Box::new(PageStrategy::new(SelectorSetExtractor::new(
            base_url,
            &SELECTOR_SETS,
        )?)));
        strategies.push(Box::new(PageStrategy::new(HeuristicExtractor::new(
            HEURISTIC_PRICE,
            HEURISTIC_NAME,
        )?)));

        Ok(Self {
            base_url: base_url.to_string(),
            chain: StrategyChain::new(strategies),
            transport,
        })
    }
}

#[async_trait]
impl SiteResolver for WalmartResolver {
    fn site(&self) -> Site {
        Site::Walmart
    }

    fn chain(&self) -> &StrategyChain {
        &self.chain
    }

    fn transport(&self) -> &Transport {
        &self.transport
    }

    fn search_page(&self, term: &str) -> FetchRequest {
        FetchRequest::get(search_page_url(&self.base_url, term))
            .header("accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::infrastructure::{ReqwestFetcher, TokioPacer};
    use std::sync::Arc;
    use std::time::Duration;

    const BASE: &str = "https://super.walmart.com.mx";

    #[test]
    fn test_parse_autocomplete_suggestions() {
        let data = json!({"suggestions": [
            {"productId": "00750100", "displayName": "Plátano Tabasco por kilo",
             "priceInfo": {"priceString": "$24.50", "price": 24.5}, "imageUrl": "https://i5/p.jpg"},
            {"displayName": "sin id"}
        ]});
        let records = parse_autocomplete(&data, BASE, "platano");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].product_id, "00750100");
        assert_eq!(records[0].price, 24.5);
        assert_eq!(
            records[0].product_url.as_deref(),
            Some("https://super.walmart.com.mx/ip/00750100")
        );
    }

    #[test]
    fn test_parse_autocomplete_term_list() {
        let data = json!([{"term": "platano macho"}, {"term": ""}, "basura"]);
        let records = parse_autocomplete(&data, BASE, "platano");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "platano macho");
        assert_eq!(records[0].price, 0.0);
        assert_eq!(
            records[0].product_url.as_deref(),
            Some("https://super.walmart.com.mx/search?q=platano+macho")
        );
    }

    #[test]
    fn test_parse_graphql_products() {
        let data = json!({"data": {"search": {"products": [
            {"id": "abc", "name": "Manzana Gala", "canonicalUrl": "/ip/manzana-gala/abc",
             "priceInfo": {"itemPrice": {"priceString": "$45.00", "price": 45}, "wasPrice": {"price": 50}},
             "imageInfo": {"thumbnailUrl": "https://i5/m.jpg"}}
        ]}}});
        let records = parse_graphql_search(&data, BASE, "manzana");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price, 45.0);
        assert_eq!(records[0].list_price, Some(50.0));
        assert_eq!(records[0].source, SourceTag::SecondaryApi);
        assert!(parse_graphql_search(&json!({"errors": []}), BASE, "x").is_empty());
    }

    #[test]
    fn test_chain_composition() {
        let transport = Transport::new(
            Arc::new(ReqwestFetcher::new(&Config::default(), Site::Walmart).unwrap()),
            Arc::new(TokioPacer::exact()),
            Duration::ZERO,
        );
        let full = WalmartResolver::new(BASE, ChainMode::Full, transport.clone()).unwrap();
        assert_eq!(
            full.chain().tags(),
            vec![
                SourceTag::PrimaryApi,
                SourceTag::SecondaryApi,
                SourceTag::PageEmbedded,
                SourceTag::HtmlSelector,
                SourceTag::HeuristicFallback
            ]
        );
        let html = WalmartResolver::new(BASE, ChainMode::HtmlOnly, transport).unwrap();
        assert!(html.chain().tags().iter().all(|t| t.needs_page()));
    }

    #[tokio::test]
    #[ignore] // 需要网络，站点可能拦截
    async fn test_live_resolve() {
        let config = Config::default();
        let transport = Transport::new(
            Arc::new(ReqwestFetcher::new(&config, Site::Walmart).unwrap()),
            Arc::new(TokioPacer::new(config.request_jitter())),
            config.request_pace(),
        );
        let resolver = WalmartResolver::new(config.base_url(Site::Walmart), ChainMode::Full, transport).unwrap();
        let records = resolver.resolve("platano").await;
        println!("找到 {} 条记录", records.len());
        for record in records.iter().take(5) {
            println!("{} - {} ({})", record.name, record.price_text, record.source);
        }
    }
}
