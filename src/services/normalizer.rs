//! 记录标准化 - 业务能力层
//!
//! 把各策略的原始片段（JSON 对象或 HTML 元素）统一成 [`ProductRecord`]。
//! 所有字段都走同一套"取到就用，取不到就默认"的查找函数，
//! 某个键缺失、类型不对或为 null 只影响这一个字段。

use regex::Regex;
use scraper::{ElementRef, Selector};
use serde_json::Value as JsonValue;

use crate::error::{AppError, AppResult};
use crate::models::{ProductRecord, SourceTag};
use crate::services::price_parser::parse_price;

// ========== JSON 查找 ==========

/// 按点分路径查找 JSON 节点，数字段用作数组下标（`items.0.images.0.imageUrl`）
pub fn lookup<'a>(value: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |node, segment| match node {
        JsonValue::Object(map) => map.get(segment),
        JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
    .filter(|node| !node.is_null())
}

/// 取文本字段；数字会转成字符串，其它类型视为缺失
pub fn opt_text_at(value: &JsonValue, path: &str) -> Option<String> {
    match lookup(value, path)? {
        JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn text_at(value: &JsonValue, path: &str) -> String {
    opt_text_at(value, path).unwrap_or_default()
}

/// 取数值字段，接受数字或数字字符串
pub fn number_at(value: &JsonValue, path: &str) -> Option<f64> {
    match lookup(value, path)? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite() && *n >= 0.0)
}

/// 取数组字段，缺失时返回空切片
pub fn array_at<'a>(value: &'a JsonValue, path: &str) -> &'a [JsonValue] {
    lookup(value, path)
        .and_then(JsonValue::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

// ========== 声明式 JSON 形状 ==========

/// 商品链接的生成方式
#[derive(Debug, Clone, Copy)]
pub enum UrlRule {
    /// `base + prefix + 字段值 + suffix`，字段缺失时没有链接
    Field {
        path: &'static str,
        prefix: &'static str,
        suffix: &'static str,
    },
    /// `base + 字段值`，字段缺失时退回 `base + id_prefix + 商品 ID`
    FieldOrId {
        path: &'static str,
        id_prefix: &'static str,
    },
}

/// 一种接口响应里单个商品对象的字段路径
#[derive(Debug, Clone, Copy)]
pub struct JsonShape {
    pub name: &'static str,
    pub product_id: &'static str,
    pub price: &'static str,
    pub price_text: Option<&'static str>,
    /// 没有价格文本时是否用 `$` + 原始价格值合成
    pub derive_price_text: bool,
    pub list_price: Option<&'static str>,
    pub brand: Option<&'static str>,
    pub image: &'static str,
    pub url: UrlRule,
}

/// 按形状把一个 JSON 商品对象标准化
///
/// `price` 缺失时从 `price_text` 解析。
pub fn normalize_json(
    item: &JsonValue,
    shape: &JsonShape,
    base_url: &str,
    query: &str,
    source: SourceTag,
) -> ProductRecord {
    let mut record = ProductRecord::new(query, source);
    record.name = text_at(item, shape.name);
    record.product_id = text_at(item, shape.product_id);

    let price = number_at(item, shape.price);
    record.price_text = match shape.price_text.and_then(|path| opt_text_at(item, path)) {
        Some(text) => text,
        None if shape.derive_price_text => opt_text_at(item, shape.price)
            .map(|raw| format!("${}", raw))
            .unwrap_or_default(),
        None => String::new(),
    };
    record.price = price.unwrap_or_else(|| parse_price(Some(&record.price_text)));

    record.list_price = shape.list_price.and_then(|path| number_at(item, path));
    record.brand = shape.brand.and_then(|path| opt_text_at(item, path));
    record.image_url = opt_text_at(item, shape.image);
    record.product_url = match shape.url {
        UrlRule::Field {
            path,
            prefix,
            suffix,
        } => opt_text_at(item, path).map(|v| format!("{}{}{}{}", base_url, prefix, v, suffix)),
        UrlRule::FieldOrId { path, id_prefix } => match opt_text_at(item, path) {
            Some(v) => Some(absolute_url(base_url, &v)),
            None if record.has_product_id() => {
                Some(format!("{}{}{}", base_url, id_prefix, record.product_id))
            }
            None => None,
        },
    };
    record
}

// ========== HTML 查找 ==========

/// 编译 CSS 选择器
pub fn compile_selector(selector: &str) -> AppResult<Selector> {
    Selector::parse(selector).map_err(|_| AppError::invalid_selector(selector))
}

pub fn compile_all(selectors: &[&str]) -> AppResult<Vec<Selector>> {
    selectors.iter().map(|s| compile_selector(s)).collect()
}

/// 元素的可见文本，连续空白合并为一个空格
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 第一个能匹配到的选择器对应元素
pub fn first_match<'a>(scope: ElementRef<'a>, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors
        .iter()
        .find_map(|selector| scope.select(selector).next())
}

/// 第一个能匹配到的选择器对应元素的文本（元素存在但文本为空时返回空串）
pub fn first_text(scope: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    first_match(scope, selectors).map(element_text)
}

/// 在第一个匹配元素上依次读取属性，返回第一个非空值
pub fn first_attr(scope: ElementRef<'_>, selectors: &[Selector], attrs: &[&str]) -> Option<String> {
    let element = first_match(scope, selectors)?;
    attrs
        .iter()
        .filter_map(|attr| element.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// 把站内相对链接补全为绝对链接
pub fn absolute_url(base_url: &str, href: &str) -> String {
    let href = href.trim();
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", base_url, href)
    } else {
        format!("{}/{}", base_url, href)
    }
}

/// 从商品链接里提取商品 ID
#[derive(Debug, Clone)]
pub struct IdPattern {
    pattern: Regex,
    /// 只保留捕获结果末尾的数字（`aguacate-hass-3108117/p` → `3108117`）
    trailing_digits: Option<Regex>,
}

impl IdPattern {
    pub fn new(pattern: &str, trailing_digits: bool) -> AppResult<Self> {
        let compile = |p: &str| Regex::new(p).map_err(|_| AppError::invalid_selector(p));
        Ok(Self {
            pattern: compile(pattern)?,
            trailing_digits: if trailing_digits {
                Some(compile(r"(\d+)$")?)
            } else {
                None
            },
        })
    }

    pub fn extract(&self, url: &str) -> String {
        let Some(captured) = self.pattern.captures(url).and_then(|c| c.get(1)) else {
            return String::new();
        };
        match &self.trailing_digits {
            Some(digits) => digits
                .captures(captured.as_str())
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            None => captured.as_str().to_string(),
        }
    }
}

/// 首字母大写（用于合成名称 `Aguacate 1`）
pub fn capitalize(term: &str) -> String {
    let lower = term.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
