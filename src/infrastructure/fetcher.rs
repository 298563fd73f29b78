//! HTTP 传输 - 基础设施层
//!
//! 唯一持有 HTTP 客户端（连接池、cookie jar）的地方，只暴露"发请求"的能力。
//! 所有传输失败（网络错误、超时、非 2xx、被拦截）都折叠成 `None`。

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, FetchError};
use crate::models::Site;

/// HTTP 方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// 一次请求的描述
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub method: Method,
    /// 覆盖默认请求头
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    /// POST 的 JSON 请求体
    pub body: Option<JsonValue>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: JsonValue) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Self::get(url)
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

/// 成功的响应（状态码一定是 2xx）
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    /// 把响应体解析成 JSON
    ///
    /// 有些接口把 JSON 再包一层字符串返回，这里会再解一次。
    pub fn json(&self) -> anyhow::Result<JsonValue> {
        let value: JsonValue = serde_json::from_str(&self.body)?;
        match value {
            JsonValue::String(inner) => Ok(serde_json::from_str(&inner)?),
            other => Ok(other),
        }
    }
}

/// 传输能力
///
/// 解析链只依赖这个 trait，测试时用内存实现替换。
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Option<FetchResponse>;
}

/// 基于 reqwest 的传输实现（每个站点一个实例）
pub struct ReqwestFetcher {
    site: Site,
    client: reqwest::Client,
    rate_limit_cooldown: Duration,
}

impl ReqwestFetcher {
    /// 按站点构建客户端：默认请求头、cookie jar、超时
    pub fn new(config: &Config, site: Site) -> AppResult<Self> {
        let base_url = config.base_url(site);
        let jar = Arc::new(Jar::default());
        if let Ok(url) = base_url.parse::<reqwest::Url>() {
            for cookie in default_cookies(site) {
                jar.add_cookie_str(&cookie, &url);
            }
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers(site, base_url, &config.user_agent)?)
            .cookie_provider(jar)
            .timeout(config.request_timeout())
            .build()
            .map_err(|source| AppError::Fetch(FetchError::ClientBuildFailed { source }))?;

        Ok(Self {
            site,
            client,
            rate_limit_cooldown: config.rate_limit_cooldown(),
        })
    }

    fn build(&self, request: &FetchRequest) -> reqwest::RequestBuilder {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if self.site == Site::Walmart {
            builder = builder.header(
                "x-o-correlation-id",
                format!("id-{}", chrono::Utc::now().timestamp_millis()),
            );
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: FetchRequest) -> Option<FetchResponse> {
        debug!("➡️ {:?} {} ({} 个参数)", request.method, request.url, request.query.len());

        let response = match self.build(&request).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("❌ 请求失败 {}: {}", request.url, e);
                return None;
            }
        };

        let status = response.status().as_u16();
        debug!("请求 {} 返回状态码 {}", request.url, status);

        match status {
            403 => {
                error!("🚫 {} 返回 403 Forbidden，站点可能在拦截请求", request.url);
                return None;
            }
            412 => {
                error!("🚫 {} 返回 412 Precondition Failed，请求头或 cookie 可能需要更新", request.url);
                return None;
            }
            429 => {
                error!(
                    "⏳ {} 返回 429 Too Many Requests，冷却 {:?}",
                    request.url, self.rate_limit_cooldown
                );
                tokio::time::sleep(self.rate_limit_cooldown).await;
                return None;
            }
            s if !(200..300).contains(&s) => {
                warn!("⚠️ {} 返回非成功状态码 {}", request.url, s);
                return None;
            }
            _ => {}
        }

        match response.text().await {
            Ok(body) => Some(FetchResponse { status, body }),
            Err(e) => {
                error!("❌ 读取响应体失败 {}: {}", request.url, e);
                None
            }
        }
    }
}

/// 离线传输：样本模式下不发任何请求
pub struct OfflineFetcher;

#[async_trait]
impl Fetcher for OfflineFetcher {
    async fn fetch(&self, request: FetchRequest) -> Option<FetchResponse> {
        debug!("离线模式，跳过请求 {}", request.url);
        None
    }
}

/// 模拟浏览器的默认请求头
fn default_headers(site: Site, base_url: &str, user_agent: &str) -> AppResult<HeaderMap> {
    let referer = format!("{}/", base_url);
    let mut pairs: Vec<(&str, &str)> = vec![
        ("user-agent", user_agent),
        ("content-type", "application/json"),
        ("referer", referer.as_str()),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-ch-ua-platform", "\"Windows\""),
        ("sec-fetch-dest", "empty"),
        ("sec-fetch-mode", "cors"),
        ("sec-fetch-site", "same-origin"),
    ];

    match site {
        Site::Walmart => pairs.extend([
            ("accept", "application/json, text/plain, */*"),
            ("accept-language", "es-MX,es;q=0.9,en-US;q=0.8,en;q=0.7"),
            (
                "sec-ch-ua",
                "\"Not(A:Brand\";v=\"99\", \"Google Chrome\";v=\"133\", \"Chromium\";v=\"133\"",
            ),
            ("x-o-bu", "WALMART-MX"),
            ("x-o-platform", "rweb"),
            ("x-o-segment", "oaoh"),
            ("x-o-vertical", "OD"),
            ("origin", base_url),
            ("dnt", "1"),
            ("pragma", "no-cache"),
            ("cache-control", "no-cache"),
            ("upgrade-insecure-requests", "1"),
        ]),
        Site::Chedraui => pairs.extend([
            ("accept", "*/*"),
            ("accept-language", "es-419,es;q=0.9"),
            ("sec-ch-ua", "\"Chromium\";v=\"134\", \"Not:A-Brand\";v=\"24\""),
        ]),
    }

    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            AppError::Fetch(FetchError::InvalidHeader {
                name: name.to_string(),
            })
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            AppError::Fetch(FetchError::InvalidHeader {
                name: name.to_string(),
            })
        })?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

/// 站点默认 cookie（Walmart 没有这些 cookie 时更容易被反爬拦截）
fn default_cookies(site: Site) -> Vec<String> {
    match site {
        Site::Walmart => {
            let now = chrono::Utc::now().timestamp_millis();
            vec![
                "vtex_segment=eyJjYW1paG9zdCI6Int9Iiwid29ya3NwYWNlIjoibWFzdGVyIiwiY2hhbm5lbCI6IjEifQ==".to_string(),
                format!("WM_QOS.CORRELATION_ID={}", now),
                "_gcl_au=1.1.1234567890.1234567890".to_string(),
                format!("DYN_USER_ID={}", now),
            ]
        }
        Site::Chedraui => Vec::new(),
    }
}
