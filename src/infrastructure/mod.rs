//! 基础设施层（Infrastructure Layer）
//!
//! 持有稀缺资源（HTTP 客户端、定时器），只向上暴露能力：
//! - `Fetcher` - 发请求，失败一律返回 `None`
//! - `Pacer` - 在请求之间等待

pub mod fetcher;
pub mod pacer;

pub use fetcher::{Fetcher, FetchRequest, FetchResponse, Method, OfflineFetcher, ReqwestFetcher};
pub use pacer::{Pacer, TokioPacer};
