// src/ingest/providers/mod.rs
pub mod firecrawl;
pub mod fixture;

pub use firecrawl::FirecrawlClient;
pub use fixture::FixtureFetcher;
