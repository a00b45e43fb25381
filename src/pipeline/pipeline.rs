// src/pipeline/pipeline.rs

use std::fmt;
use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::models::{Config, DataDirs};
use crate::services::VideoInfoSource;
use crate::storage::CheckpointStorage;
use crate::utils::http::HttpClient;
use crate::utils::progress;

use super::crawl::run_crawl;
use super::load::run_load;
use super::scrape::run_scrape;
use super::setup::run_setup;
use super::transform::run_transform;

/// A pipeline step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    Crawl,
    Scrape,
    Transform,
    Load,
}

impl Step {
    pub const ALL: [Step; 4] = [Step::Crawl, Step::Scrape, Step::Transform, Step::Load];
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Crawl => "crawl",
            Step::Scrape => "scrape",
            Step::Transform => "transform",
            Step::Load => "load",
        };
        f.write_str(name)
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Step::ALL
            .into_iter()
            .find(|step| step.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown step '{s}' (expected crawl, scrape, transform or load)"))
    }
}

/// Everything the stages need, constructed once at startup.
pub struct PipelineContext<'a> {
    pub config: &'a Config,
    pub dirs: &'a DataDirs,
    pub http: &'a HttpClient,
    pub storage: &'a dyn CheckpointStorage,
    pub videos: &'a dyn VideoInfoSource,
    /// Conversion service base URL
    pub service_url: &'a str,
    /// Shared-storage token; only the scrape step needs it
    pub box_token: Option<&'a str>,
}

impl PipelineContext<'_> {
    fn box_token(&self) -> Result<&str> {
        self.box_token.ok_or_else(|| {
            AppError::MissingCredential("the scrape step needs a shared-storage token".into())
        })
    }

    /// Run a single step. Each step re-reads its input checkpoint from disk.
    pub async fn run_step(&self, step: Step) -> Result<()> {
        run_setup(self.dirs).await?;
        match step {
            Step::Crawl => {
                run_crawl(self.config, self.http, self.storage).await?;
            }
            Step::Scrape => {
                run_scrape(
                    self.config,
                    self.dirs,
                    self.http,
                    self.box_token()?,
                    self.videos,
                    self.storage,
                )
                .await?;
            }
            Step::Transform => {
                run_transform(
                    self.config,
                    self.dirs,
                    self.http,
                    self.service_url,
                    self.storage,
                )
                .await?;
            }
            Step::Load => {
                run_load(self.config, self.storage).await?;
            }
        }
        Ok(())
    }
}

/// Run the full pipeline starting at `from`.
pub async fn run_pipeline(ctx: &PipelineContext<'_>, from: Step) -> Result<()> {
    progress::header("SHLS chef pipeline");

    let steps: Vec<Step> = Step::ALL.into_iter().filter(|s| *s >= from).collect();
    if steps.contains(&Step::Scrape) {
        ctx.box_token()?;
    }

    for (i, step) in steps.iter().enumerate() {
        progress::step(i + 1, steps.len(), &step.to_string());
        ctx.run_step(*step).await?;
    }

    log::info!("Pipeline complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_parsing_and_order() {
        assert_eq!("Transform".parse::<Step>(), Ok(Step::Transform));
        assert!("publish".parse::<Step>().is_err());
        assert!(Step::Crawl < Step::Load);
    }
}
