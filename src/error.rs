use thiserror::Error;

/// 应用程序错误类型
///
/// 解析链内部的失败（网络、结构不匹配、价格解析）都在策略边界被吞掉，
/// 只有配置、搜索计划加载和结果持久化的错误会一路传到 `main`。
#[derive(Debug, Error)]
pub enum AppError {
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 请求相关错误
    #[error("请求错误: {0}")]
    Fetch(#[from] FetchError),
    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(#[from] ParseError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

/// 请求错误
#[derive(Debug, Error)]
pub enum FetchError {
    /// 构建 HTTP 客户端失败
    #[error("无法构建 HTTP 客户端: {source}")]
    ClientBuildFailed {
        #[source]
        source: reqwest::Error,
    },
    /// 请求头不合法
    #[error("请求头不合法: {name}")]
    InvalidHeader { name: String },
}

/// 解析错误
#[derive(Debug, Error)]
pub enum ParseError {
    /// CSS 选择器不合法
    #[error("CSS 选择器不合法: {selector}")]
    InvalidSelector { selector: String },
    /// 结构路径不合法
    #[error("结构路径不合法: {path} ({reason})")]
    InvalidStructuralPath { path: String, reason: String },
    /// JSON 解析失败
    #[error("JSON解析失败: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(ParseError::Json { source: err })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建环境变量解析错误
    pub fn env_parse_failed(
        var_name: impl Into<String>,
        value: impl Into<String>,
        expected_type: impl Into<String>,
    ) -> Self {
        AppError::Config(ConfigError::EnvVarParseFailed {
            var_name: var_name.into(),
            value: value.into(),
            expected_type: expected_type.into(),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建选择器错误
    pub fn invalid_selector(selector: impl Into<String>) -> Self {
        AppError::Parse(ParseError::InvalidSelector {
            selector: selector.into(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_parse_failed_message() {
        let err = AppError::env_parse_failed("SCRAPER_SITE", "amazon", "站点名称");
        let msg = err.to_string();
        assert!(msg.contains("SCRAPER_SITE"));
        assert!(msg.contains("amazon"));
    }

    #[test]
    fn test_json_error_converts_to_parse() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AppError = json_err.into();
        assert!(matches!(err, AppError::Parse(ParseError::Json { .. })));
    }
}
