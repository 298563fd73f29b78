use crate::error::{AppError, AppResult};
use crate::models::{OutputFormat, SearchMethod, SearchPlan, Site, SiteSelection};
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 要抓取的站点
    pub site_selection: SiteSelection,
    /// 搜索词（为空时使用站点默认搜索词）
    pub search_terms: Vec<String>,
    /// 检索方式
    pub search_method: SearchMethod,
    /// 输出格式
    pub output_formats: Vec<OutputFormat>,
    /// 输出目录
    pub output_dir: String,
    /// 可选的 TOML 搜索计划文件
    pub search_plan_file: Option<String>,
    /// 可选的本地 HTML 样本（离线模式）
    pub sample_html: Option<String>,
    /// 搜索词之间的间隔（秒）
    pub request_delay_secs: f64,
    /// 同一搜索词内连续请求之间的间隔（秒）
    pub request_pace_secs: f64,
    /// 请求间隔的随机抖动上限（秒）
    pub request_jitter_secs: f64,
    /// 单个请求超时（秒）
    pub request_timeout_secs: u64,
    /// 收到 429 之后的冷却时间（秒）
    pub rate_limit_cooldown_secs: u64,
    pub user_agent: String,
    // --- 站点地址 ---
    pub walmart_base_url: String,
    pub chedraui_base_url: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_selection: SiteSelection::All,
            search_terms: Vec::new(),
            search_method: SearchMethod::Api,
            output_formats: vec![OutputFormat::Json, OutputFormat::Csv, OutputFormat::Tabular],
            output_dir: "data/processed".to_string(),
            search_plan_file: None,
            sample_html: None,
            request_delay_secs: 1.0,
            request_pace_secs: 1.5,
            request_jitter_secs: 1.5,
            request_timeout_secs: 15,
            rate_limit_cooldown_secs: 10,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/134.0.0.0 Safari/537.36".to_string(),
            walmart_base_url: Site::Walmart.default_base_url().to_string(),
            chedraui_base_url: Site::Chedraui.default_base_url().to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 通过任意查找函数构建配置（测试时不必修改进程环境变量）
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let default = Self::default();
        let number = |name: &str| lookup(name).and_then(|v| v.trim().parse::<f64>().ok());
        let integer = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());

        let site_selection = match lookup("SCRAPER_SITE") {
            Some(v) => SiteSelection::from_str(&v)
                .ok_or_else(|| AppError::env_parse_failed("SCRAPER_SITE", &v, "站点名称 (walmart|chedraui|all)"))?,
            None => default.site_selection,
        };
        let search_method = match lookup("SEARCH_METHOD") {
            Some(v) => SearchMethod::from_str(&v)
                .ok_or_else(|| AppError::env_parse_failed("SEARCH_METHOD", &v, "检索方式 (api|html|both)"))?,
            None => default.search_method,
        };
        let output_formats = match lookup("OUTPUT_FORMAT") {
            Some(v) => OutputFormat::parse_list(&v).ok_or_else(|| {
                AppError::env_parse_failed("OUTPUT_FORMAT", &v, "输出格式 (json|csv|tabular|all)")
            })?,
            None => default.output_formats,
        };

        Ok(Self {
            site_selection,
            search_terms: lookup("SEARCH_TERMS")
                .map(|v| split_terms(&v))
                .unwrap_or(default.search_terms),
            search_method,
            output_formats,
            output_dir: lookup("OUTPUT_DIR").unwrap_or(default.output_dir),
            search_plan_file: lookup("SEARCH_PLAN_FILE").or(default.search_plan_file),
            sample_html: lookup("SAMPLE_HTML").or(default.sample_html),
            request_delay_secs: number("REQUEST_DELAY_SECS").unwrap_or(default.request_delay_secs),
            request_pace_secs: number("REQUEST_PACE_SECS").unwrap_or(default.request_pace_secs),
            request_jitter_secs: number("REQUEST_JITTER_SECS").unwrap_or(default.request_jitter_secs),
            request_timeout_secs: integer("REQUEST_TIMEOUT_SECS").unwrap_or(default.request_timeout_secs),
            rate_limit_cooldown_secs: integer("RATE_LIMIT_COOLDOWN_SECS")
                .unwrap_or(default.rate_limit_cooldown_secs),
            user_agent: lookup("USER_AGENT").unwrap_or(default.user_agent),
            walmart_base_url: lookup("WALMART_BASE_URL").unwrap_or(default.walmart_base_url),
            chedraui_base_url: lookup("CHEDRAUI_BASE_URL").unwrap_or(default.chedraui_base_url),
            verbose_logging: lookup("VERBOSE_LOGGING")
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.verbose_logging),
        })
    }

    /// 用搜索计划文件覆盖站点、检索方式和搜索词
    pub fn apply_search_plan(&mut self, plan: SearchPlan) -> AppResult<()> {
        if let Some(site) = plan.site {
            self.site_selection = SiteSelection::from_str(&site)
                .ok_or_else(|| AppError::env_parse_failed("site", &site, "站点名称 (walmart|chedraui|all)"))?;
        }
        if let Some(method) = plan.method {
            self.search_method = method;
        }
        if !plan.terms.is_empty() {
            self.search_terms = plan.terms;
        }
        Ok(())
    }

    /// 某个站点实际使用的搜索词
    pub fn terms_for(&self, site: Site) -> Vec<String> {
        if self.search_terms.is_empty() {
            site.default_terms().iter().map(|t| t.to_string()).collect()
        } else {
            self.search_terms.clone()
        }
    }

    pub fn base_url(&self, site: Site) -> &str {
        let url = match site {
            Site::Walmart => &self.walmart_base_url,
            Site::Chedraui => &self.chedraui_base_url,
        };
        url.trim_end_matches('/')
    }

    pub fn request_delay(&self) -> Duration {
        secs(self.request_delay_secs)
    }

    pub fn request_pace(&self) -> Duration {
        secs(self.request_pace_secs)
    }

    pub fn request_jitter(&self) -> Duration {
        secs(self.request_jitter_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn rate_limit_cooldown(&self) -> Duration {
        Duration::from_secs(self.rate_limit_cooldown_secs)
    }
}

fn split_terms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// 负数和非有限值一律视为 0
fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.site_selection, SiteSelection::All);
        assert_eq!(config.search_method, SearchMethod::Api);
        assert_eq!(config.output_formats.len(), 3);
        assert_eq!(config.terms_for(Site::Walmart), vec!["platano", "manzana", "aguacate"]);
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("SCRAPER_SITE", "chedraui"),
            ("SEARCH_TERMS", "aguacate, ,jitomate"),
            ("SEARCH_METHOD", "both"),
            ("OUTPUT_FORMAT", "csv"),
            ("REQUEST_DELAY_SECS", "0.25"),
            ("REQUEST_TIMEOUT_SECS", "not-a-number"),
            ("CHEDRAUI_BASE_URL", "http://localhost:8080/"),
        ]))
        .unwrap();

        assert_eq!(config.site_selection, SiteSelection::One(Site::Chedraui));
        assert_eq!(config.terms_for(Site::Chedraui), vec!["aguacate", "jitomate"]);
        assert_eq!(config.search_method, SearchMethod::Both);
        assert_eq!(config.output_formats, vec![OutputFormat::Csv]);
        assert_eq!(config.request_delay(), Duration::from_millis(250));
        // 数值解析失败时回退到默认值
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.base_url(Site::Chedraui), "http://localhost:8080");
    }

    #[test]
    fn test_invalid_site_is_error() {
        let result = Config::from_lookup(lookup_from(&[("SCRAPER_SITE", "soriana")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_search_plan() {
        let mut config = Config::default();
        config
            .apply_search_plan(SearchPlan {
                site: Some("walmart".to_string()),
                method: Some(SearchMethod::Html),
                terms: vec!["platano".to_string()],
            })
            .unwrap();
        assert_eq!(config.site_selection, SiteSelection::One(Site::Walmart));
        assert_eq!(config.search_method, SearchMethod::Html);
        assert_eq!(config.terms_for(Site::Walmart), vec!["platano"]);
    }

    #[test]
    fn test_negative_delay_is_zero() {
        let config = Config::from_lookup(lookup_from(&[("REQUEST_PACE_SECS", "-3")])).unwrap();
        assert_eq!(config.request_pace(), Duration::ZERO);
    }
}
