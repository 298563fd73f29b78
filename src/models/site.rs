/// 站点枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    /// Walmart México（super.walmart.com.mx）
    Walmart,
    /// Chedraui（chedraui.com.mx）
    Chedraui,
}

impl Site {
    /// 所有支持的站点
    pub const ALL: [Site; 2] = [Site::Walmart, Site::Chedraui];

    /// 获取标准名称（也用作输出目录和文件名前缀）
    pub fn name(self) -> &'static str {
        match self {
            Site::Walmart => "walmart",
            Site::Chedraui => "chedraui",
        }
    }

    /// 默认站点地址
    pub fn default_base_url(self) -> &'static str {
        match self {
            Site::Walmart => "https://super.walmart.com.mx",
            Site::Chedraui => "https://www.chedraui.com.mx",
        }
    }

    /// 未指定搜索词时的默认搜索词
    pub fn default_terms(self) -> &'static [&'static str] {
        match self {
            Site::Walmart => &["platano", "manzana", "aguacate"],
            Site::Chedraui => &["aguacate", "jitomate", "manzana"],
        }
    }

    /// 尝试从字符串解析站点（不区分大小写）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "walmart" | "wm" => Some(Site::Walmart),
            "chedraui" | "ch" => Some(Site::Chedraui),
            _ => None,
        }
    }
}

impl std::fmt::Display for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 站点选择：单个站点或全部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteSelection {
    One(Site),
    All,
}

impl SiteSelection {
    pub fn from_str(s: &str) -> Option<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Some(SiteSelection::All);
        }
        Site::from_str(s).map(SiteSelection::One)
    }

    /// 展开为站点列表
    pub fn sites(self) -> Vec<Site> {
        match self {
            SiteSelection::One(site) => vec![site],
            SiteSelection::All => Site::ALL.to_vec(),
        }
    }
}

/// 检索方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    /// 完整策略链（API 优先，HTML 兜底）
    Api,
    /// 只走 HTML 策略
    Html,
    /// 两条链都跑，再合并去重
    Both,
}

impl SearchMethod {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "api" => Some(SearchMethod::Api),
            "html" => Some(SearchMethod::Html),
            "both" => Some(SearchMethod::Both),
            _ => None,
        }
    }
}

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Csv,
    /// 制表符分隔的表格（可直接导入电子表格）
    Tabular,
}

impl OutputFormat {
    /// 文件扩展名
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Tabular => "tsv",
        }
    }

    /// 解析输出格式，`all` 展开为全部三种
    pub fn parse_list(s: &str) -> Option<Vec<Self>> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(vec![OutputFormat::Json]),
            "csv" => Some(vec![OutputFormat::Csv]),
            "tabular" | "tsv" | "excel" => Some(vec![OutputFormat::Tabular]),
            "all" => Some(vec![
                OutputFormat::Json,
                OutputFormat::Csv,
                OutputFormat::Tabular,
            ]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_from_str() {
        assert_eq!(Site::from_str("Walmart"), Some(Site::Walmart));
        assert_eq!(Site::from_str(" chedraui "), Some(Site::Chedraui));
        assert_eq!(Site::from_str("soriana"), None);
    }

    #[test]
    fn test_site_selection_all_expands() {
        assert_eq!(
            SiteSelection::from_str("ALL").map(SiteSelection::sites),
            Some(vec![Site::Walmart, Site::Chedraui])
        );
    }

    #[test]
    fn test_output_format_all() {
        let formats = OutputFormat::parse_list("all").unwrap();
        assert_eq!(formats.len(), 3);
        assert_eq!(OutputFormat::parse_list("excel"), Some(vec![OutputFormat::Tabular]));
        assert_eq!(OutputFormat::parse_list("xml"), None);
    }
}
