//! 结构路径提取 - 业务能力层
//!
//! 支持一个很小的 XPath 子集，足够描述搜索页上观察到的几种路径：
//!
//! - `/html/body/div[2]/div` 子元素 + 同名兄弟中的位置（从 1 开始）
//! - `//div[contains(@class, "galleryItem")]` 任意深度 + class 子串匹配
//! - `.//img` 相对于某个元素
//!
//! 字面路径优先；字面路径没有结果时跑全部 class 路径，每条路径最多取 10 个元素，
//! 各路径的记录按顺序拼接（不去重）。

use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, ParseError};
use crate::models::{ProductRecord, SourceTag};
use crate::services::normalizer::{absolute_url, capitalize, element_text, IdPattern};
use crate::services::page::{PageExtractor, PageInfo};
use crate::services::price_parser::parse_price;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    ClassContains(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    tag: String,
    predicate: Option<Predicate>,
}

impl Step {
    fn matches_tag(&self, element: &ElementRef<'_>) -> bool {
        self.tag == "*" || element.value().name().eq_ignore_ascii_case(&self.tag)
    }
}

/// 解析后的结构路径
#[derive(Debug, Clone)]
pub struct StructuralPath {
    raw: String,
    relative: bool,
    steps: Vec<Step>,
}

const STEP_PATTERN: &str = r"^([A-Za-z*][A-Za-z0-9_-]*)(?:\[(.+)\])?$";
const CLASS_CONTAINS_PATTERN: &str = r#"^contains\(\s*@class\s*,\s*["']([^"']*)["']\s*\)$"#;

impl StructuralPath {
    pub fn parse(path: &str) -> AppResult<Self> {
        let invalid = |reason: &str| {
            AppError::Parse(ParseError::InvalidStructuralPath {
                path: path.to_string(),
                reason: reason.to_string(),
            })
        };

        let step_re = Regex::new(STEP_PATTERN).map_err(|e| invalid(&e.to_string()))?;
        let class_re = Regex::new(CLASS_CONTAINS_PATTERN).map_err(|e| invalid(&e.to_string()))?;

        let trimmed = path.trim();
        let (relative, mut rest) = match trimmed.strip_prefix('.') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        if !rest.starts_with('/') {
            return Err(invalid("路径必须以 / 或 // 开头"));
        }

        let mut steps = Vec::new();
        while !rest.is_empty() {
            let (axis, after) = if let Some(after) = rest.strip_prefix("//") {
                (Axis::Descendant, after)
            } else if let Some(after) = rest.strip_prefix('/') {
                (Axis::Child, after)
            } else {
                return Err(invalid("步骤之间缺少 /"));
            };

            let end = step_end(after);
            let token = &after[..end];
            rest = &after[end..];

            let captures = step_re
                .captures(token)
                .ok_or_else(|| invalid(&format!("无法识别的步骤 '{}'", token)))?;
            let tag = captures
                .get(1)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let predicate = match captures.get(2).map(|m| m.as_str().trim()) {
                None => None,
                Some(p) => Some(parse_predicate(p, &class_re).ok_or_else(|| invalid(&format!("不支持的条件 '{}'", p)))?),
            };
            steps.push(Step {
                axis,
                tag,
                predicate,
            });
        }

        if steps.is_empty() {
            return Err(invalid("路径为空"));
        }
        Ok(Self {
            raw: trimmed.to_string(),
            relative,
            steps,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// 从文档根开始求值
    pub fn select_document<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        let root = document.root_element();
        let Some((first, rest)) = self.steps.split_first() else {
            return Vec::new();
        };
        // 文档节点只有一个子元素 <html>
        let initial: Vec<ElementRef<'a>> = match first.axis {
            Axis::Child => vec![root],
            Axis::Descendant => std::iter::once(root).chain(descendants(root)).collect(),
        };
        let initial = apply_predicate(first, initial.into_iter().filter(|e| first.matches_tag(e)).collect());
        evaluate(rest, initial)
    }

    /// 从某个元素开始求值（相对路径）
    pub fn select_from<'a>(&self, element: ElementRef<'a>) -> Vec<ElementRef<'a>> {
        evaluate(&self.steps, vec![element])
    }

    pub fn is_relative(&self) -> bool {
        self.relative
    }
}

/// 找到当前步骤的结束位置（方括号内的 / 不算分隔符）
fn step_end(s: &str) -> usize {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => return i,
            _ => {}
        }
    }
    s.len()
}

fn parse_predicate(p: &str, class_re: &Regex) -> Option<Predicate> {
    if let Ok(n) = p.parse::<usize>() {
        return (n > 0).then_some(Predicate::Position(n));
    }
    class_re
        .captures(p)
        .and_then(|c| c.get(1))
        .map(|m| Predicate::ClassContains(m.as_str().to_string()))
}

fn descendants<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.descendants().skip(1).filter_map(ElementRef::wrap)
}

fn children<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

fn apply_predicate<'a>(step: &Step, candidates: Vec<ElementRef<'a>>) -> Vec<ElementRef<'a>> {
    match &step.predicate {
        None => candidates,
        Some(Predicate::Position(n)) => candidates.into_iter().nth(n - 1).into_iter().collect(),
        Some(Predicate::ClassContains(needle)) => candidates
            .into_iter()
            .filter(|e| e.value().attr("class").is_some_and(|c| c.contains(needle.as_str())))
            .collect(),
    }
}

fn evaluate<'a>(steps: &[Step], mut current: Vec<ElementRef<'a>>) -> Vec<ElementRef<'a>> {
    for step in steps {
        let mut next = Vec::new();
        let mut seen = HashSet::new();
        for context in &current {
            let candidates: Vec<ElementRef<'a>> = match step.axis {
                Axis::Child => children(*context).filter(|e| step.matches_tag(e)).collect(),
                Axis::Descendant => descendants(*context).filter(|e| step.matches_tag(e)).collect(),
            };
            for element in apply_predicate(step, candidates) {
                if seen.insert(element.id()) {
                    next.push(element);
                }
            }
        }
        if next.is_empty() {
            return next;
        }
        current = next;
    }
    current
}

// ========== 提取器 ==========

/// 结构路径提取配置
#[derive(Debug, Clone, Copy)]
pub struct StructuralPlan {
    /// 以前观察到的完整路径，元素文本直接当作价格
    pub literal: &'static str,
    pub class_paths: &'static [&'static str],
    pub price: &'static str,
    pub name: &'static str,
    pub image: &'static str,
    pub link: &'static str,
    pub id_pattern: &'static str,
    pub id_trailing_digits: bool,
    pub limit: usize,
}

pub struct StructuralPathExtractor {
    base_url: String,
    literal: StructuralPath,
    class_paths: Vec<StructuralPath>,
    price: StructuralPath,
    name: StructuralPath,
    image: StructuralPath,
    link: StructuralPath,
    id: IdPattern,
    limit: usize,
}

impl StructuralPathExtractor {
    pub fn new(base_url: impl Into<String>, plan: &StructuralPlan) -> AppResult<Self> {
        // 字段路径都是在商品元素内部求值的
        let relative = |raw: &str| -> AppResult<StructuralPath> {
            let path = StructuralPath::parse(raw)?;
            if !path.is_relative() {
                return Err(AppError::Parse(ParseError::InvalidStructuralPath {
                    path: raw.to_string(),
                    reason: "字段路径必须以 . 开头".to_string(),
                }));
            }
            Ok(path)
        };

        Ok(Self {
            base_url: base_url.into(),
            literal: StructuralPath::parse(plan.literal)?,
            class_paths: plan
                .class_paths
                .iter()
                .map(|p| StructuralPath::parse(p))
                .collect::<AppResult<_>>()?,
            price: relative(plan.price)?,
            name: relative(plan.name)?,
            image: relative(plan.image)?,
            link: relative(plan.link)?,
            id: IdPattern::new(plan.id_pattern, plan.id_trailing_digits)?,
            limit: plan.limit,
        })
    }

    fn from_literal(&self, document: &Html, page: &PageInfo<'_>) -> Vec<ProductRecord> {
        let elements = self.literal.select_document(document);
        info!("字面路径匹配到 {} 个元素", elements.len());

        elements
            .into_iter()
            .take(self.limit)
            .enumerate()
            .filter_map(|(i, element)| {
                let text = element_text(element);
                if text.is_empty() {
                    return None;
                }
                let mut record = ProductRecord::new(page.term, SourceTag::XpathFallback)
                    .with_note("Extracted using original XPath");
                record.name = format!("{} {}", capitalize(page.term), i + 1);
                record.price = parse_price(Some(&text));
                record.price_text = text;
                record.product_url = non_empty(page.page_url);
                Some(record)
            })
            .collect()
    }

    fn from_class_path(&self, path: &StructuralPath, document: &Html, page: &PageInfo<'_>) -> Vec<ProductRecord> {
        let elements = path.select_document(document);
        info!("路径 {} 匹配到 {} 个元素", path.as_str(), elements.len());

        elements
            .into_iter()
            .take(self.limit)
            .enumerate()
            .filter_map(|(i, element)| {
                // 没有价格的元素不算商品
                let price_element = self.price.select_from(element).into_iter().next()?;
                let price_text = element_text(price_element);

                let mut record = ProductRecord::new(page.term, SourceTag::XpathFallback)
                    .with_note(format!("Extracted using XPath: {}", path.as_str()));
                record.name = self
                    .name
                    .select_from(element)
                    .into_iter()
                    .next()
                    .map(element_text)
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| format!("{} {}", capitalize(page.term), i + 1));
                record.price = parse_price(Some(&price_text));
                record.price_text = price_text;
                record.image_url = self
                    .image
                    .select_from(element)
                    .into_iter()
                    .find_map(|img| img.value().attr("src").and_then(non_empty));
                record.product_url = self
                    .link
                    .select_from(element)
                    .into_iter()
                    .find_map(|a| a.value().attr("href").and_then(non_empty))
                    .map(|href| absolute_url(&self.base_url, &href));
                record.product_id = record
                    .product_url
                    .as_deref()
                    .map(|url| self.id.extract(url))
                    .unwrap_or_default();
                Some(record)
            })
            .collect()
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

impl PageExtractor for StructuralPathExtractor {
    fn tag(&self) -> SourceTag {
        SourceTag::XpathFallback
    }

    fn extract(&self, html: &str, page: &PageInfo<'_>) -> anyhow::Result<Vec<ProductRecord>> {
        let document = Html::parse_document(html);

        let records = self.from_literal(&document, page);
        if !records.is_empty() {
            return Ok(records);
        }

        let records: Vec<ProductRecord> = self
            .class_paths
            .iter()
            .flat_map(|path| self.from_class_path(path, &document, page))
            .collect();
        if records.is_empty() {
            debug!("所有结构路径都没有产出记录");
        }
        Ok(records)
    }
}
