use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use storefront_price_resolver::config::Config;
use storefront_price_resolver::infrastructure::{Method, ReqwestFetcher, TokioPacer};
use storefront_price_resolver::models::{OutputFormat, SearchMethod};
use storefront_price_resolver::services::ResultWriter;
use storefront_price_resolver::sites::{ChedrauiResolver, WalmartResolver};
use storefront_price_resolver::{
    merge, resolve_terms, ChainMode, FetchRequest, FetchResponse, Fetcher, Pacer, ResultSet, Site,
    SiteResolver, SourceTag, Transport,
};

const WALMART: &str = "https://super.walmart.com.mx";
const CHEDRAUI: &str = "https://www.chedraui.com.mx";

/// 内存传输：按 (方法, URL 片段) 返回预置响应，并记录所有请求
#[derive(Default)]
struct FakeFetcher {
    routes: Vec<(Method, &'static str, String)>,
    seen: Mutex<Vec<(Method, String)>>,
}

impl FakeFetcher {
    fn route(mut self, method: Method, fragment: &'static str, body: impl Into<String>) -> Self {
        self.routes.push((method, fragment, body.into()));
        self
    }

    fn seen(&self) -> Vec<(Method, String)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: FetchRequest) -> Option<FetchResponse> {
        self.seen.lock().unwrap().push((request.method, request.url.clone()));
        self.routes
            .iter()
            .find(|(method, fragment, _)| *method == request.method && request.url.contains(fragment))
            .map(|(_, _, body)| FetchResponse {
                status: 200,
                body: body.clone(),
            })
    }
}

#[derive(Default)]
struct RecordingPacer {
    waits: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pace(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

fn transport(fetcher: Arc<FakeFetcher>, pacer: Arc<RecordingPacer>) -> Transport {
    Transport::new(fetcher, pacer, Duration::from_millis(1500))
}

const WALMART_GRID_HTML: &str = r#"<html><body>
  <div data-automation-id="product">
    <a href="/ip/platano-tabasco/00750">
      <span data-automation-id="product-title">Plátano Tabasco por kilo</span>
    </a>
    <div data-automation-id="product-price">$24.50/kgprecio actual $24.50/kg</div>
    <img data-src="https://i5.walmartimages.com/p.jpg">
  </div>
  <div data-automation-id="product">
    <div data-automation-id="product-price">$10.00</div>
  </div>
</body></html>"#;

#[tokio::test]
async fn test_every_term_keyed_when_all_strategies_fail() {
    let fetcher = Arc::new(FakeFetcher::default());
    let pacer = Arc::new(RecordingPacer::default());
    let resolver = WalmartResolver::new(WALMART, ChainMode::Full, transport(fetcher.clone(), pacer.clone())).unwrap();

    let terms = vec!["a".to_string(), "b".to_string()];
    let results = resolve_terms(&resolver, &terms, pacer.as_ref(), Duration::from_secs(1)).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results.get("a"), Some(&[][..]));
    assert_eq!(results.get("b"), Some(&[][..]));

    // 每个搜索词：自动补全、GraphQL POST、GraphQL GET、搜索页各一次
    assert_eq!(fetcher.seen().len(), 8);
    // 搜索词之间等待一次
    assert!(pacer.waits.lock().unwrap().contains(&Duration::from_secs(1)));
}

#[tokio::test]
async fn test_walmart_falls_through_to_selector_sets() {
    let fetcher = Arc::new(
        FakeFetcher::default()
            .route(Method::Get, "/api/autocomplete/v2", r#"{"suggestions": []}"#)
            .route(Method::Get, "/search?q=", WALMART_GRID_HTML),
    );
    let pacer = Arc::new(RecordingPacer::default());
    let resolver = WalmartResolver::new(WALMART, ChainMode::Full, transport(fetcher.clone(), pacer.clone())).unwrap();

    let records = resolver.resolve("platano").await;

    // 第二个卡片没有名称，被要求名称的集合丢弃
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.source, SourceTag::HtmlSelector);
    assert_eq!(record.name, "Plátano Tabasco por kilo");
    assert_eq!(record.price, 24.5);
    assert_eq!(record.product_id, "platano-tabasco");
    assert_eq!(record.query, "platano");
    assert_eq!(record.image_url.as_deref(), Some("https://i5.walmartimages.com/p.jpg"));

    let methods: Vec<Method> = fetcher.seen().into_iter().map(|(m, _)| m).collect();
    assert_eq!(methods, vec![Method::Get, Method::Post, Method::Get, Method::Get]);
    // 同一搜索词内第一个请求之后每个请求前都等待
    assert_eq!(pacer.waits.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_walmart_graphql_get_retry_wins() {
    let body = r#"{"data": {"search": {"products": [
        {"id": "111", "name": "Manzana Gala", "priceInfo": {"itemPrice": {"price": 45.0, "priceString": "$45.00"}}}
    ]}}}"#;
    let fetcher = Arc::new(FakeFetcher::default().route(Method::Get, "/orchestra/graphql/search", body));
    let pacer = Arc::new(RecordingPacer::default());
    let resolver = WalmartResolver::new(WALMART, ChainMode::Full, transport(fetcher.clone(), pacer)).unwrap();

    let records = resolver.resolve("manzana").await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, SourceTag::SecondaryApi);
    assert_eq!(records[0].product_url.as_deref(), Some("https://super.walmart.com.mx/ip/111"));
    // 没有请求搜索页
    assert!(fetcher.seen().iter().all(|(_, url)| !url.contains("/search?q=")));
}

#[tokio::test]
async fn test_walmart_embedded_data_beats_selectors() {
    let html = format!(
        r#"<html><body>
        <script type="application/json">{{"props":{{"pageProps":{{"initialState":{{"search":{{"searchResult":{{"itemStacks":[{{"items":[
            {{"name":"Aguacate Hass","usItemId":"0042","priceInfo":{{"currentPrice":{{"price":61.0}}}}}}
        ]}}]}}}}}}}}}}}}</script>
        {}
        </body></html>"#,
        WALMART_GRID_HTML
    );
    let fetcher = Arc::new(FakeFetcher::default());
    let pacer = Arc::new(RecordingPacer::default());
    let resolver = WalmartResolver::new(WALMART, ChainMode::HtmlOnly, transport(fetcher.clone(), pacer)).unwrap();

    let records = resolver.resolve_document("aguacate", "https://super.walmart.com.mx/search?q=aguacate", html).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, SourceTag::PageEmbedded);
    assert_eq!(records[0].price_text, "$61.0");
    assert!(fetcher.seen().is_empty());
}

#[test]
fn test_chedraui_structural_path_then_heuristic() {
    let fetcher = Arc::new(FakeFetcher::default());
    let pacer = Arc::new(RecordingPacer::default());
    let resolver = ChedrauiResolver::new(CHEDRAUI, ChainMode::HtmlOnly, transport(fetcher, pacer)).unwrap();

    let structural = r#"<html><body>
        <div class="vtex-product-summary-2-x-element">
          <span class="chedrauimx-productBrand">Manzana Red Delicious</span>
          <span class="chedrauimx-currencyContainer">$45.50</span>
          <a class="chedrauimx-clearLink" href="/manzana-red-delicious-3001/p">ver</a>
        </div>
    </body></html>"#;
    let records = tokio_test::block_on(resolver.resolve_document("manzana", CHEDRAUI, structural.to_string()));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, SourceTag::XpathFallback);
    assert_eq!(records[0].name, "Manzana Red Delicious");
    assert_eq!(records[0].price, 45.5);
    assert_eq!(records[0].product_id, "3001");

    let loose = r#"<html><body><div><h2>Jitomate bola</h2><div><span class="price">$32.00</span></div></div></body></html>"#;
    let records = tokio_test::block_on(resolver.resolve_document("jitomate", CHEDRAUI, loose.to_string()));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source, SourceTag::HeuristicFallback);
    assert_eq!(records[0].name, "Jitomate bola");
    assert!(records[0].note.is_some());
}

#[tokio::test]
async fn test_both_methods_merge_and_persist() {
    let api_body = r#"{"data": {"productSearch": {"products": [
        {"productId": "3108117", "productName": "Aguacate Hass", "linkText": "aguacate-hass-3108117",
         "priceRange": {"sellingPrice": {"lowPrice": 59.9}}}
    ]}}}"#;
    let page = r#"<html><body>
        <div class="vtex-search-result-3-x-galleryItem">
          <a class="vtex-product-summary-2-x-clearLink" href="/aguacate-hass-3108117/p">
            <span class="vtex-product-summary-2-x-productBrand">Aguacate Hass (HTML)</span>
            <span class="vtex-product-price-1-x-sellingPrice">$59.90</span>
          </a>
        </div>
        <div class="vtex-search-result-3-x-galleryItem">
          <a class="vtex-product-summary-2-x-clearLink" href="/aguacate-criollo-3108200/p">
            <span class="vtex-product-summary-2-x-productBrand">Aguacate Criollo</span>
            <span class="vtex-product-price-1-x-sellingPrice">$42.00</span>
          </a>
        </div>
    </body></html>"#;
    let fetcher = Arc::new(
        FakeFetcher::default()
            .route(Method::Get, "/_v/segment/graphql/v1", api_body)
            .route(Method::Get, "map=ft", page),
    );
    let pacer = Arc::new(RecordingPacer::default());
    let terms = vec!["aguacate".to_string()];

    let api = ChedrauiResolver::new(CHEDRAUI, ChainMode::Full, transport(fetcher.clone(), pacer.clone())).unwrap();
    let html = ChedrauiResolver::new(CHEDRAUI, ChainMode::HtmlOnly, transport(fetcher.clone(), pacer.clone())).unwrap();
    let primary = resolve_terms(&api, &terms, pacer.as_ref(), Duration::ZERO).await;
    let secondary = resolve_terms(&html, &terms, pacer.as_ref(), Duration::ZERO).await;

    let merged: ResultSet = merge(primary, secondary);
    let records = merged.get("aguacate").unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].source, SourceTag::PrimaryApi);
    assert_eq!(records[1].name, "Aguacate Criollo");
    assert_eq!(records[1].source, SourceTag::HtmlSelector);

    let dir = tempfile::tempdir().unwrap();
    let writer = ResultWriter::new(dir.path());
    let path = writer.persist(Site::Chedraui, &merged, OutputFormat::Csv).await.unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(&headers[0], "query");
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(&rows[1][0], "aguacate");
    assert_eq!(&rows[1][9], "html-selector");
}

#[tokio::test]
#[ignore] // 默认忽略，需要网络：cargo test -- --ignored
async fn test_live_both_sites() {
    let config = Config {
        search_method: SearchMethod::Api,
        ..Config::default()
    };
    for site in Site::ALL {
        let transport = Transport::new(
            Arc::new(ReqwestFetcher::new(&config, site).unwrap()),
            Arc::new(TokioPacer::new(config.request_jitter())),
            config.request_pace(),
        );
        let resolver: Box<dyn SiteResolver> = match site {
            Site::Walmart => Box::new(WalmartResolver::new(config.base_url(site), ChainMode::Full, transport).unwrap()),
            Site::Chedraui => Box::new(ChedrauiResolver::new(config.base_url(site), ChainMode::Full, transport).unwrap()),
        };
        let terms = config.terms_for(site);
        let results = resolve_terms(resolver.as_ref(), &terms, &TokioPacer::exact(), config.request_delay()).await;
        assert_eq!(results.len(), terms.len());
        println!("{}: {} 条记录", site, results.total_records());
    }
}
