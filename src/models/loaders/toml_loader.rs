use crate::error::{AppError, AppResult, FileError};
use crate::models::site::SearchMethod;
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

/// 搜索计划文件（TOML）
///
/// ```toml
/// site = "chedraui"
/// method = "both"
/// terms = ["aguacate", "jitomate"]
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPlan {
    /// 站点名称，`all` 表示全部站点
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub method: Option<SearchMethod>,
    #[serde(default)]
    pub terms: Vec<String>,
}

/// 从 TOML 文件加载搜索计划
pub async fn load_search_plan(path: &Path) -> AppResult<SearchPlan> {
    let path_str = path.display().to_string();
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(&path_str, e))?;

    let mut plan: SearchPlan = toml::from_str(&content).map_err(|e| {
        AppError::File(FileError::TomlParseFailed {
            path: path_str.clone(),
            source: e,
        })
    })?;

    // 去掉空白搜索词
    plan.terms = plan
        .terms
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    tracing::info!("已加载搜索计划 {}: {} 个搜索词", path_str, plan.terms.len());
    Ok(plan)
}

/// 读取本地 HTML 样本文件（离线调试选择器用）
pub async fn load_sample_html(path: &Path) -> AppResult<String> {
    let path_str = path.display().to_string();
    let html = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(&path_str, e))?;
    tracing::info!("已读取样本文件 {} ({} 字节)", path_str, html.len());
    Ok(html)
}
