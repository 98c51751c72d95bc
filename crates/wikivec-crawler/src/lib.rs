//! Incremental wiki crawler: URL policy, content fingerprinting,
//! page fetching, frontier traversal and the crawl driver itself.

pub mod crawler;
pub mod fetch;
pub mod frontier;
pub mod hasher;
pub mod urls;

pub use crawler::Crawler;
pub use fetch::HttpFetcher;
pub use frontier::Frontier;
pub use urls::UrlPolicy;
