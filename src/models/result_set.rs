//! 搜索结果集：搜索词 → 商品记录列表
//!
//! 保留搜索词的插入顺序，每个请求过的搜索词都必须有条目（可以为空列表）。

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::product::ProductRecord;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    entries: Vec<(String, Vec<ProductRecord>)>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入某个搜索词的结果；已存在时覆盖，顺序保持不变
    pub fn insert(&mut self, term: impl Into<String>, records: Vec<ProductRecord>) {
        let term = term.into();
        match self.entries.iter_mut().find(|(t, _)| *t == term) {
            Some((_, existing)) => *existing = records,
            None => self.entries.push((term, records)),
        }
    }

    pub fn get(&self, term: &str) -> Option<&[ProductRecord]> {
        self.entries
            .iter()
            .find(|(t, _)| t == term)
            .map(|(_, records)| records.as_slice())
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ProductRecord])> {
        self.entries
            .iter()
            .map(|(t, records)| (t.as_str(), records.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 所有搜索词下的记录总数
    pub fn total_records(&self) -> usize {
        self.entries.iter().map(|(_, records)| records.len()).sum()
    }

    /// 展平为记录列表，`query` 为空的记录补上所属搜索词
    pub fn flatten(&self) -> Vec<ProductRecord> {
        self.entries
            .iter()
            .flat_map(|(term, records)| {
                records.iter().cloned().map(move |mut record| {
                    if record.query.is_empty() {
                        record.query = term.clone();
                    }
                    record
                })
            })
            .collect()
    }
}

impl IntoIterator for ResultSet {
    type Item = (String, Vec<ProductRecord>);
    type IntoIter = std::vec::IntoIter<(String, Vec<ProductRecord>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (term, records) in &self.entries {
            map.serialize_entry(term, records)?;
        }
        map.end()
    }
}
