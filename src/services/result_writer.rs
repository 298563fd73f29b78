//! 结果持久化服务 - 业务能力层
//!
//! 只负责"把结果集写到磁盘"，文件名 `{站点}/{站点}_products_{时间戳}.{扩展名}`

use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{OutputFormat, ProductRecord, ResultSet, Site};

/// 表格输出的列顺序
const COLUMNS: [&str; 11] = [
    "query",
    "name",
    "price",
    "price_text",
    "brand",
    "list_price",
    "product_id",
    "image_url",
    "product_url",
    "source",
    "note",
];

/// 展平后的一行（所有可选列都保留，保证每行列数一致）
#[derive(Serialize)]
struct Row<'a> {
    query: &'a str,
    name: &'a str,
    price: f64,
    price_text: &'a str,
    brand: Option<&'a str>,
    list_price: Option<f64>,
    product_id: &'a str,
    image_url: Option<&'a str>,
    product_url: Option<&'a str>,
    source: &'static str,
    note: Option<&'a str>,
}

impl<'a> From<&'a ProductRecord> for Row<'a> {
    fn from(record: &'a ProductRecord) -> Self {
        Self {
            query: &record.query,
            name: &record.name,
            price: record.price,
            price_text: &record.price_text,
            brand: record.brand.as_deref(),
            list_price: record.list_price,
            product_id: &record.product_id,
            image_url: record.image_url.as_deref(),
            product_url: record.product_url.as_deref(),
            source: record.source.as_str(),
            note: record.note.as_deref(),
        }
    }
}

/// 结果写入服务
pub struct ResultWriter {
    output_dir: PathBuf,
}

impl ResultWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// 按所有格式写出，同一次调用共用一个时间戳
    pub async fn persist_all(
        &self,
        site: Site,
        results: &ResultSet,
        formats: &[OutputFormat],
    ) -> AppResult<Vec<PathBuf>> {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        let mut written = Vec::with_capacity(formats.len());
        for format in formats {
            written.push(self.write(site, results, *format, &stamp).await?);
        }
        Ok(written)
    }

    pub async fn persist(&self, site: Site, results: &ResultSet, format: OutputFormat) -> AppResult<PathBuf> {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        self.write(site, results, format, &stamp).await
    }

    fn path_for(&self, site: Site, format: OutputFormat, stamp: &str) -> PathBuf {
        self.output_dir.join(site.name()).join(format!(
            "{}_products_{}.{}",
            site.name(),
            stamp,
            format.extension()
        ))
    }

    async fn write(&self, site: Site, results: &ResultSet, format: OutputFormat, stamp: &str) -> AppResult<PathBuf> {
        let path = self.path_for(site, format, stamp);
        let path_str = path.display().to_string();

        let bytes = match format {
            OutputFormat::Json => serde_json::to_vec_pretty(results)?,
            OutputFormat::Csv => render_delimited(results, b',').map_err(|e| AppError::file_write_failed(&path_str, e))?,
            OutputFormat::Tabular => {
                render_delimited(results, b'\t').map_err(|e| AppError::file_write_failed(&path_str, e))?
            }
        };

        if let Some(parent) = path.parent() {
            ensure_dir(parent).await?;
        }
        fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::file_write_failed(&path_str, e))?;

        info!(
            "💾 已保存 {} 个搜索词 / {} 条记录到 {}",
            results.len(),
            results.total_records(),
            path_str
        );
        Ok(path)
    }
}

async fn ensure_dir(dir: &Path) -> AppResult<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::file_write_failed(dir.display().to_string(), e))
}

/// 展平为分隔符表格，空结果集也会写出表头
fn render_delimited(results: &ResultSet, delimiter: u8) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(COLUMNS)?;

    for record in results.flatten() {
        writer.serialize(Row::from(&record))?;
    }
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
