use serde::{Deserialize, Serialize};

/// 记录来源标签：标明是哪一种检索策略产出的记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceTag {
    /// 主结构化接口（自动补全 / 直接搜索）
    PrimaryApi,
    /// 次结构化接口（GraphQL 搜索）
    SecondaryApi,
    /// 页面内嵌的 JSON 数据块
    PageEmbedded,
    /// CSS 选择器提取
    HtmlSelector,
    /// 结构路径提取
    XpathFallback,
    /// 通用启发式兜底
    HeuristicFallback,
}

impl SourceTag {
    /// 链中的优先级顺序
    pub const ORDERED: [SourceTag; 6] = [
        SourceTag::PrimaryApi,
        SourceTag::SecondaryApi,
        SourceTag::PageEmbedded,
        SourceTag::HtmlSelector,
        SourceTag::XpathFallback,
        SourceTag::HeuristicFallback,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceTag::PrimaryApi => "primary-api",
            SourceTag::SecondaryApi => "secondary-api",
            SourceTag::PageEmbedded => "page-embedded",
            SourceTag::HtmlSelector => "html-selector",
            SourceTag::XpathFallback => "xpath-fallback",
            SourceTag::HeuristicFallback => "heuristic-fallback",
        }
    }

    /// 是否需要请求搜索页 HTML
    pub fn needs_page(self) -> bool {
        !matches!(self, SourceTag::PrimaryApi | SourceTag::SecondaryApi)
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 标准化后的商品记录
///
/// 字段名对下游是稳定契约：`name, price, price_text, product_id, image_url,
/// product_url, query, source`，`brand / list_price / note` 视站点而定。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    pub price: f64,
    pub price_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_price: Option<f64>,
    pub product_id: String,
    pub image_url: Option<String>,
    pub product_url: Option<String>,
    pub query: String,
    pub source: SourceTag,
    /// 低置信度策略的附加说明
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ProductRecord {
    /// 创建一条空记录，所有字段取默认值
    pub fn new(query: impl Into<String>, source: SourceTag) -> Self {
        Self {
            name: String::new(),
            price: 0.0,
            price_text: String::new(),
            brand: None,
            list_price: None,
            product_id: String::new(),
            image_url: None,
            product_url: None,
            query: query.into(),
            source,
            note: None,
        }
    }

    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }

    pub fn has_product_id(&self) -> bool {
        !self.product_id.is_empty()
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_tag_serializes_kebab_case() {
        let json = serde_json::to_string(&SourceTag::HeuristicFallback).unwrap();
        assert_eq!(json, "\"heuristic-fallback\"");
        assert_eq!(SourceTag::PageEmbedded.to_string(), "page-embedded");
    }

    #[test]
    fn test_record_serialization_keeps_stable_fields() {
        let record = ProductRecord::new("aguacate", SourceTag::PrimaryApi);
        let value = serde_json::to_value(&record).unwrap();
        for key in [
            "name",
            "price",
            "price_text",
            "product_id",
            "image_url",
            "product_url",
            "query",
            "source",
        ] {
            assert!(value.get(key).is_some(), "缺少字段 {}", key);
        }
        assert!(value.get("note").is_none());
        assert!(value.get("brand").is_none());
    }

    #[test]
    fn test_empty_name_and_id() {
        let mut record = ProductRecord::new("x", SourceTag::HtmlSelector);
        assert!(!record.has_name());
        assert!(!record.has_product_id());
        record.name = "  ".to_string();
        assert!(!record.has_name());
    }
}
