pub mod toml_loader;

pub use toml_loader::{load_sample_html, load_search_plan, SearchPlan};
