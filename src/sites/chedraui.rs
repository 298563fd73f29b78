//! Chedraui 解析器（VTEX 店面）
//!
//! 策略顺序：
//! 1. `productSearchV3` 持久化查询
//! 2. 选择器集合
//! 3. 结构路径
//! 4. 启发式兜底

use anyhow::Context;
use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value as JsonValue};
use tracing::debug;
use url::Url;

use super::{url_with_params, ChainMode, SiteResolver, Transport};
use crate::error::AppResult;
use crate::infrastructure::FetchRequest;
use crate::models::{ProductRecord, Site, SourceTag};
use crate::services::normalizer::{array_at, normalize_json, JsonShape, UrlRule};
use crate::services::{
    HeuristicExtractor, SelectorSet, SelectorSetExtractor, StructuralPathExtractor, StructuralPlan,
};
use crate::workflow::{PageStrategy, Strategy, StrategyChain, TermContext};

const GRAPHQL_PATH: &str = "/_v/segment/graphql/v1";
const BINDING_ID: &str = "a3e3947d-516c-4136-ab89-f4a34339bbf4";
const PERSISTED_QUERY_HASH: &str = "9177ba6f883473505dc99fcf2b679a6e270af6320a157f0798b92efeab98d5d3";
const SEARCH_VARIANT: &str = "66844d747af2d50d0f2e2357-variantNull";
const PAGE_SIZE: u32 = 20;

const PRODUCT_SHAPE: JsonShape = JsonShape {
    name: "productName",
    product_id: "productId",
    price: "priceRange.sellingPrice.lowPrice",
    price_text: None,
    derive_price_text: true,
    list_price: Some("priceRange.listPrice.lowPrice"),
    brand: Some("brand"),
    image: "items.0.images.0.imageUrl",
    url: UrlRule::Field {
        path: "linkText",
        prefix: "/",
        suffix: "/p",
    },
};

const SELECTOR_SETS: [SelectorSet; 1] = [SelectorSet {
    label: "vtex-gallery",
    containers: &[
        "div.chedrauimx-search-result-3-x-galleryItem",
        "div.vtex-search-result-3-x-galleryItem",
        "section.vtex-product-summary-2-x-container",
    ],
    names: &["span.vtex-product-summary-2-x-productBrand"],
    name_from_links: false,
    prices: &[
        "div.vtex-product-price-1-x-sellingPriceContainer span.vtex-product-price-1-x-currencyContainer",
        "span.vtex-product-price-1-x-sellingPrice",
        "div.vtex-product-price-1-x-priceContainer",
        "div.chedrauimx-product-price-1-x-sellingPriceContainer span",
    ],
    brands: &[],
    list_prices: &[],
    links: &["a.vtex-product-summary-2-x-clearLink"],
    images: &["img.vtex-product-summary-2-x-imageNormal"],
    image_attrs: &["src"],
    id_pattern: r"/([^/]+)/p$",
    id_trailing_digits: true,
    require_name: true,
}];

const STRUCTURAL_PLAN: StructuralPlan = StructuralPlan {
    literal: "/html/body/div[2]/div/div[1]/div/div[4]/div/div",
    class_paths: &[
        r#"//div[contains(@class, "chedrauimx-search-result-3-x-galleryItem")]"#,
        r#"//section[contains(@class, "vtex-product-summary-2-x-container")]"#,
        r#"//div[contains(@class, "vtex-product-summary-2-x-element")]"#,
    ],
    price: r#".//span[contains(@class, "currencyContainer")]"#,
    name: r#".//span[contains(@class, "productBrand")]"#,
    image: ".//img",
    link: r#".//a[contains(@class, "clearLink")]"#,
    id_pattern: r"/([^/]+)/p$",
    id_trailing_digits: true,
    limit: 10,
};

const HEURISTIC_PRICE: &str = "span.vtex-product-price-1-x-currencyContainer, .price, .product-price";
const HEURISTIC_NAME: &str = ".product-name, .vtex-product-summary-2-x-productBrand, h1, h2, h3";

/// 全文搜索页：`{base}/{term}?_q={term}&map=ft`
fn search_page_url(base_url: &str, term: &str) -> String {
    let fallback = || format!("{}/{}?_q={}&map=ft", base_url, term, term);
    let Ok(mut url) = Url::parse(base_url) else {
        return fallback();
    };
    match url.path_segments_mut() {
        Ok(mut segments) => {
            segments.pop_if_empty().push(term);
        }
        Err(()) => return fallback(),
    }
    url.query_pairs_mut().append_pair("_q", term).append_pair("map", "ft");
    url.to_string()
}

// ========== 策略 1：productSearchV3 ==========

pub struct ProductSearchStrategy {
    base_url: String,
}

impl ProductSearchStrategy {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// 持久化查询的变量以 base64 形式放在 `extensions` 里
    fn extensions(term: &str) -> String {
        let variables = json!({
            "hideUnavailableItems": false,
            "skusFilter": "ALL",
            "simulationBehavior": "default",
            "installmentCriteria": "MAX_WITHOUT_INTEREST",
            "productOriginVtex": false,
            "map": "ft",
            "query": term,
            "orderBy": "OrderByScoreDESC",
            "from": 0,
            "to": PAGE_SIZE - 1,
            "selectedFacets": [{"key": "ft", "value": term}],
            "fullText": term,
            "facetsBehavior": "Static",
            "categoryTreeBehavior": "default",
            "withFacets": false,
            "variant": SEARCH_VARIANT,
            "advertisementOptions": {
                "showSponsored": true,
                "sponsoredCount": 3,
                "advertisementPlacement": "top_search",
                "repeatSponsoredProducts": true
            }
        });
        let encoded = base64::engine::general_purpose::STANDARD.encode(variables.to_string());

        json!({
            "persistedQuery": {
                "version": 1,
                "sha256Hash": PERSISTED_QUERY_HASH,
                "sender": "vtex.store-resources@0.x",
                "provider": "vtex.search-graphql@0.x"
            },
            "variables": encoded
        })
        .to_string()
    }

    fn request(&self, term: &str) -> FetchRequest {
        let url = url_with_params(
            &self.base_url,
            GRAPHQL_PATH,
            &[
                ("workspace", "master"),
                ("maxAge", "short"),
                ("appsEtag", "remove"),
                ("domain", "store"),
                ("locale", "es-MX"),
                ("__bindingId", BINDING_ID),
                ("operationName", "productSearchV3"),
                ("variables", "{}"),
                ("extensions", Self::extensions(term).as_str()),
            ],
        );
        FetchRequest::get(url).header("referer", search_page_url(&self.base_url, term))
    }
}

pub fn parse_product_search(data: &JsonValue, base_url: &str, term: &str) -> Vec<ProductRecord> {
    array_at(data, "data.productSearch.products")
        .iter()
        .map(|p| normalize_json(p, &PRODUCT_SHAPE, base_url, term, SourceTag::PrimaryApi))
        .collect()
}

#[async_trait]
impl Strategy for ProductSearchStrategy {
    fn tag(&self) -> SourceTag {
        SourceTag::PrimaryApi
    }

    async fn attempt(&self, ctx: &TermContext<'_>) -> anyhow::Result<Vec<ProductRecord>> {
        let request = self.request(&ctx.term);
        debug!("productSearchV3: {}", request.url);
        let response = ctx
            .fetch(request)
            .await
            .context("productSearchV3 没有返回可用响应")?;
        let data = response.json().context("productSearchV3 响应不是 JSON")?;
        Ok(parse_product_search(&data, &self.base_url, &ctx.term))
    }
}

// ========== 解析器 ==========

pub struct ChedrauiResolver {
    base_url: String,
    chain: StrategyChain,
    transport: Transport,
}

impl ChedrauiResolver {
    pub fn new(base_url: &str, mode: ChainMode, transport: Transport) -> AppResult<Self> {
        let mut strategies: Vec<Box<dyn Strategy>> = Vec::new();
        if mode == ChainMode::Full {
            strategies.push(Box::new(ProductSearchStrategy::new(base_url)));
        }
        strategies.push(Box::new(PageStrategy::new(SelectorSetExtractor::new(
            base_url,
            &SELECTOR_SETS,
        )?)));
        strategies.push(Box::new(PageStrategy::new(StructuralPathExtractor::new(
            base_url,
            &STRUCTURAL_PLAN,
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
impl SiteResolver for ChedrauiResolver {
    fn site(&self) -> Site {
        Site::Chedraui
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
