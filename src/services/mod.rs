//! 业务能力层（Services）
//!
//! 每个模块只描述"我能做什么"，只处理单个搜索词的单个片段，不关心回退顺序。

pub mod embedded_data;
pub mod heuristic;
pub mod normalizer;
pub mod page;
pub mod price_parser;
pub mod result_writer;
pub mod selector_sets;
pub mod structural_path;

pub use embedded_data::EmbeddedDataExtractor;
pub use heuristic::HeuristicExtractor;
pub use page::{PageExtractor, PageInfo};
pub use price_parser::parse_price;
pub use result_writer::ResultWriter;
pub use selector_sets::{SelectorSet, SelectorSetExtractor};
pub use structural_path::{StructuralPath, StructuralPathExtractor, StructuralPlan};
