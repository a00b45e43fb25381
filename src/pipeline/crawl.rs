// src/pipeline/crawl.rs

//! Crawl stage: toolkit site HTML to the crawled resource tree.

use crate::error::{AppError, Result};
use crate::models::{Checkpoint, Config, ResourceNode, Stage, Topic};
use crate::services::ToolkitSite;
use crate::storage::CheckpointStorage;
use crate::utils::http::HttpClient;
use crate::utils::progress;

/// Title of the crawled tree's root.
pub const ROOT_TITLE: &str = "The SHLS web resource tree";

/// Walk the site from `site.start_url` and build the crawled tree.
///
/// The start page must be reachable; a topic page that cannot be fetched
/// leaves its subject empty.
pub async fn crawl(http: &HttpClient, config: &Config) -> Result<ResourceNode> {
    let site = ToolkitSite::new(&config.site, &config.providers.box_link_marker);
    let start_url = &config.site.start_url;

    let page = http
        .get_page(start_url)
        .await
        .ok_or_else(|| AppError::crawl(start_url, "start page unavailable"))?;
    let start = site.parse_start_page(&page)?;

    let mut children: Vec<ResourceNode> = start
        .brochures
        .into_iter()
        .map(ResourceNode::Link)
        .collect();

    for tile in start.tiles {
        log::info!("Crawling subject '{}' at {}", tile.title, tile.url);
        let sections = match http.get_page(&tile.url).await {
            Some(topic_page) => site.parse_topic_page(&topic_page)?,
            None => {
                log::warn!(
                    "Subject page unavailable, keeping '{}' empty: {}",
                    tile.title,
                    tile.url
                );
                Vec::new()
            }
        };
        progress::sub_item(&format!("{} sections", sections.len()));

        children.push(ResourceNode::Subject(Topic {
            title: tile.title,
            description: (!tile.description.is_empty()).then_some(tile.description),
            children: sections,
            ..Topic::default()
        }));
    }

    Ok(ResourceNode::Root(Topic::new(ROOT_TITLE).with_children(children)))
}

/// Run the crawl stage and write the crawled checkpoint.
pub async fn run_crawl(
    config: &Config,
    http: &HttpClient,
    storage: &dyn CheckpointStorage,
) -> Result<Checkpoint> {
    progress::header("Crawl - Building web resource tree");

    let tree = crawl(http, config).await?;
    let checkpoint = Checkpoint::new(Stage::Crawled, tree);
    let location = storage.write_checkpoint(&checkpoint).await?;

    let subjects = checkpoint
        .tree
        .children()
        .iter()
        .filter(|c| matches!(c, ResourceNode::Subject(_)))
        .count();
    progress::summary(
        "Crawl complete",
        &[
            ("Subjects", subjects.to_string()),
            ("Links", checkpoint.tree.links().len().to_string()),
            ("Nodes", checkpoint.tree.node_count().to_string()),
            ("Saved to", location.display().to_string()),
        ],
    );

    Ok(checkpoint)
}
