//! Pipeline entry points for the chef stages.
//!
//! - `run_crawl`: toolkit site to crawled tree
//! - `run_scrape`: resolve and download every link
//! - `run_transform`: normalize documents to the portable format
//! - `run_load`: map to the publishable tree

pub mod crawl;
pub mod load;
#[allow(clippy::module_inception)]
pub mod pipeline;
pub mod scrape;
pub mod setup;
pub mod transform;

pub use crawl::{crawl, run_crawl};
pub use load::{load, run_load};
pub use pipeline::{PipelineContext, Step, run_pipeline};
pub use scrape::{ScrapeStats, Scraper, run_scrape};
pub use setup::run_setup;
pub use transform::{TransformStats, Transformer, run_transform};
