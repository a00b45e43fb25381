// src/models/checkpoint.rs

//! Versioned envelope for the trees passed between stages.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Locator, ResourceNode};

/// Bumped whenever the checkpoint layout changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

/// Pipeline stage that produced a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Crawled,
    Downloaded,
    Transformed,
}

impl Stage {
    /// Checkpoint file name for this stage's output.
    pub fn file_name(self) -> &'static str {
        match self {
            Stage::Crawled => "web_resource_tree.json",
            Stage::Downloaded => "downloaded_resources.json",
            Stage::Transformed => "transformed_resources.json",
        }
    }

    pub fn all() -> [Stage; 3] {
        [Stage::Crawled, Stage::Downloaded, Stage::Transformed]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Crawled => "crawled",
            Stage::Downloaded => "downloaded",
            Stage::Transformed => "transformed",
        };
        f.write_str(name)
    }
}

/// A persisted stage output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub schema_version: u32,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
    pub tree: ResourceNode,
}

impl Checkpoint {
    pub fn new(stage: Stage, tree: ResourceNode) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            stage,
            created_at: Utc::now(),
            tree,
        }
    }

    /// Check that this checkpoint is what `expected` stage output must look like.
    pub fn validate(&self, expected: Stage) -> Result<()> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(AppError::checkpoint(format!(
                "schema version {} is not supported (expected {})",
                self.schema_version, SCHEMA_VERSION
            )));
        }
        if self.stage != expected {
            return Err(AppError::checkpoint(format!(
                "expected a {expected} tree, found a {} tree",
                self.stage
            )));
        }
        if !matches!(self.tree, ResourceNode::Root(_)) {
            return Err(AppError::checkpoint(format!(
                "root node has kind '{}'",
                self.tree.kind()
            )));
        }
        validate_links(&self.tree, expected)
    }
}

/// Every link must carry exactly one locator, and the right one for the stage.
fn validate_links(tree: &ResourceNode, stage: Stage) -> Result<()> {
    for link in tree.links() {
        match (link.locator(), stage) {
            (None, _) => {
                return Err(AppError::checkpoint(format!(
                    "link '{}' must have exactly one of url or path",
                    link.title
                )));
            }
            (Some(Locator::Url(_)), Stage::Crawled) => {}
            (Some(Locator::Path(_)), Stage::Downloaded | Stage::Transformed) => {}
            (Some(Locator::Path(path)), Stage::Crawled) => {
                return Err(AppError::checkpoint(format!(
                    "link '{}' has a local path {} before scraping",
                    link.title,
                    path.display()
                )));
            }
            (Some(Locator::Url(url)), _) => {
                return Err(AppError::checkpoint(format!(
                    "link '{}' is still unresolved ({url}) in a {stage} tree",
                    link.title
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Link, Topic};

    fn root(children: Vec<ResourceNode>) -> ResourceNode {
        ResourceNode::Root(Topic {
            title: "root".into(),
            children,
            ..Topic::default()
        })
    }

    #[test]
    fn test_crawled_tree_accepts_urls() {
        let cp = Checkpoint::new(
            Stage::Crawled,
            root(vec![ResourceNode::Link(Link::remote("a", "https://x/a"))]),
        );
        assert!(cp.validate(Stage::Crawled).is_ok());
    }

    #[test]
    fn test_downloaded_tree_rejects_urls() {
        let cp = Checkpoint::new(
            Stage::Downloaded,
            root(vec![ResourceNode::Link(Link::remote("a", "https://x/a"))]),
        );
        assert!(matches!(
            cp.validate(Stage::Downloaded),
            Err(AppError::Checkpoint(_))
        ));
    }

    #[test]
    fn test_rejects_link_with_both_locators() {
        let mut link = Link::local("a", "downloaded/a.pdf", "box_file:1");
        link.url = Some("https://x/a".into());
        let cp = Checkpoint::new(Stage::Downloaded, root(vec![ResourceNode::Link(link)]));
        assert!(cp.validate(Stage::Downloaded).is_err());
    }

    #[test]
    fn test_rejects_stage_mismatch_and_version() {
        let mut cp = Checkpoint::new(Stage::Crawled, root(vec![]));
        assert!(cp.validate(Stage::Transformed).is_err());

        cp.schema_version = SCHEMA_VERSION + 1;
        assert!(cp.validate(Stage::Crawled).is_err());
    }

    #[test]
    fn test_rejects_non_root_tree() {
        let cp = Checkpoint::new(Stage::Crawled, ResourceNode::Subject(Topic::new("s")));
        assert!(cp.validate(Stage::Crawled).is_err());
    }

    #[test]
    fn test_stage_serialization() {
        let cp = Checkpoint::new(Stage::Transformed, root(vec![]));
        let json = serde_json::to_value(&cp).unwrap();
        assert_eq!(json["stage"], "transformed");
        assert_eq!(json["schema_version"], SCHEMA_VERSION);
        assert_eq!(json["tree"]["kind"], "root");
    }
}
