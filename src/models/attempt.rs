use super::product::{ProductRecord, SourceTag};

/// 一次策略尝试的结果（只用于驱动回退决策和日志，不持久化）
#[derive(Debug, Clone)]
pub struct StrategyAttempt {
    pub strategy: SourceTag,
    pub term: String,
    pub records: Vec<ProductRecord>,
    pub failure: Option<String>,
}

impl StrategyAttempt {
    pub fn succeeded(strategy: SourceTag, term: &str, records: Vec<ProductRecord>) -> Self {
        Self {
            strategy,
            term: term.to_string(),
            records,
            failure: None,
        }
    }

    pub fn failed(strategy: SourceTag, term: &str, reason: impl Into<String>) -> Self {
        Self {
            strategy,
            term: term.to_string(),
            records: Vec::new(),
            failure: Some(reason.into()),
        }
    }

    /// 只要有一条记录就算成功，失败和零结果同样推进到下一个策略
    pub fn is_success(&self) -> bool {
        !self.records.is_empty()
    }
}
