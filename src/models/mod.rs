pub mod attempt;
pub mod loaders;
pub mod product;
pub mod result_set;
pub mod site;

pub use attempt::StrategyAttempt;
pub use loaders::{load_sample_html, load_search_plan, SearchPlan};
pub use product::{ProductRecord, SourceTag};
pub use result_set::ResultSet;
pub use site::{OutputFormat, SearchMethod, Site, SiteSelection};
