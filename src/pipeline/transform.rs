// src/pipeline/transform.rs

//! Transform stage: normalize every downloaded document to the portable format.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::{
    Checkpoint, Config, ConversionConfig, DataDirs, Link, Locator, ResourceNode, Stage,
};
use crate::services::DocumentConverter;
use crate::storage::CheckpointStorage;
use crate::utils::fs::{PathClaims, ensure_parent};
use crate::utils::http::HttpClient;
use crate::utils::progress;

/// Counters reported at the end of the stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformStats {
    pub copied: usize,
    pub converted: usize,
    pub reused: usize,
    pub dropped: usize,
    /// Outputs that landed on a path another document already used
    pub collisions: usize,
}

/// What to do with a downloaded file, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileAction {
    Copy,
    Convert,
    Skip,
}

/// Rewrites a downloaded tree into a transformed tree.
pub struct Transformer<'a> {
    converter: DocumentConverter<'a>,
    conversion: &'a ConversionConfig,
    downloaded_dir: PathBuf,
    transformed_dir: PathBuf,
    claims: PathClaims,
    stats: TransformStats,
}

impl<'a> Transformer<'a> {
    pub fn new(
        conversion: &'a ConversionConfig,
        http: &'a HttpClient,
        service_url: &str,
        downloaded_dir: impl Into<PathBuf>,
        transformed_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            converter: DocumentConverter::new(http, service_url, conversion),
            conversion,
            downloaded_dir: downloaded_dir.into(),
            transformed_dir: transformed_dir.into(),
            claims: PathClaims::default(),
            stats: TransformStats::default(),
        }
    }

    pub fn stats(&self) -> &TransformStats {
        &self.stats
    }

    /// Transform the subtree under a container node.
    pub async fn transform(&mut self, tree: &ResourceNode) -> Result<ResourceNode> {
        let topic = tree.topic().ok_or_else(|| {
            AppError::validation(format!("cannot transform a '{}' node as a tree", tree.kind()))
        })?;
        let children = self.transform_children(&topic.children).await?;
        Ok(tree.rebuild(topic.with_children(children)))
    }

    async fn transform_children(
        &mut self,
        children: &[ResourceNode],
    ) -> Result<Vec<ResourceNode>> {
        let mut transformed = Vec::with_capacity(children.len());

        for child in children {
            match child {
                ResourceNode::Link(link) => {
                    if let Some(link) = self.transform_link(link).await? {
                        transformed.push(ResourceNode::Link(link));
                    }
                }
                ResourceNode::Video(_) => transformed.push(child.clone()),
                ResourceNode::Root(topic)
                | ResourceNode::Subject(topic)
                | ResourceNode::Section(topic)
                | ResourceNode::Language(topic)
                | ResourceNode::Extras(topic)
                | ResourceNode::SharedFolder(topic)
                | ResourceNode::VideoPlaylist(topic) => {
                    let grandchildren =
                        Box::pin(self.transform_children(&topic.children)).await?;
                    transformed.push(child.rebuild(topic.with_children(grandchildren)));
                }
                ResourceNode::Unrecognized => {
                    log::warn!("Dropping node of unrecognized kind");
                    self.stats.dropped += 1;
                }
            }
        }

        Ok(transformed)
    }

    fn action_for(&self, path: &Path) -> FileAction {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if ext == self.conversion.portable_extension.to_lowercase() {
            FileAction::Copy
        } else if self
            .conversion
            .convertible_extensions
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&ext))
        {
            FileAction::Convert
        } else {
            FileAction::Skip
        }
    }

    fn record_output(&mut self, link: &Link, dest: &Path) {
        let owner = link.source_id.as_deref().unwrap_or(&link.title);
        if let Some(previous) = self.claims.claim(dest, owner) {
            log::warn!(
                "'{}' ({}) shares {} with {}",
                link.title,
                owner,
                dest.display(),
                previous
            );
            self.stats.collisions += 1;
        }
    }

    async fn transform_link(&mut self, link: &Link) -> Result<Option<Link>> {
        let Some(Locator::Path(path)) = link.locator() else {
            log::warn!("Dropping link '{}' without a local path", link.title);
            self.stats.dropped += 1;
            return Ok(None);
        };
        let Ok(relative) = path.strip_prefix(&self.downloaded_dir) else {
            log::warn!(
                "Dropping '{}': {} is outside {}",
                link.title,
                path.display(),
                self.downloaded_dir.display()
            );
            self.stats.dropped += 1;
            return Ok(None);
        };
        let dest = self.transformed_dir.join(relative);

        match self.action_for(path) {
            FileAction::Copy => {
                ensure_parent(&dest).await?;
                tokio::fs::copy(path, &dest).await?;
                log::info!("Copied {} -> {}", path.display(), dest.display());
                self.stats.copied += 1;
                self.record_output(link, &dest);
                Ok(Some(link.relocated(dest)))
            }
            FileAction::Convert => {
                let dest = dest.with_extension(&self.conversion.portable_extension);
                if tokio::fs::try_exists(&dest).await? {
                    log::info!("Reusing converted {}", dest.display());
                    self.stats.reused += 1;
                    self.record_output(link, &dest);
                    return Ok(Some(link.relocated(dest)));
                }
                match self.converter.convert(path, &dest).await {
                    Ok(()) => {
                        self.stats.converted += 1;
                        self.record_output(link, &dest);
                        Ok(Some(link.relocated(dest)))
                    }
                    Err(e) if e.is_skippable() => {
                        log::warn!("Dropping '{}': {}", link.title, e);
                        self.stats.dropped += 1;
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            }
            FileAction::Skip => {
                log::warn!("Skipping file '{}' path={}", link.title, path.display());
                self.stats.dropped += 1;
                Ok(None)
            }
        }
    }
}

/// Run the transform stage on the downloaded checkpoint and write the transformed one.
pub async fn run_transform(
    config: &Config,
    dirs: &DataDirs,
    http: &HttpClient,
    service_url: &str,
    storage: &dyn CheckpointStorage,
) -> Result<Checkpoint> {
    progress::header("Transform - Converting documents");

    let input = storage.read_checkpoint(Stage::Downloaded).await?;
    let mut transformer = Transformer::new(
        &config.conversion,
        http,
        service_url,
        &dirs.downloaded,
        &dirs.transformed,
    );
    let tree = transformer.transform(&input.tree).await?;

    let checkpoint = Checkpoint::new(Stage::Transformed, tree);
    let location = storage.write_checkpoint(&checkpoint).await?;

    let stats = transformer.stats();
    progress::summary(
        "Transform complete",
        &[
            ("Copied", stats.copied.to_string()),
            ("Converted", stats.converted.to_string()),
            ("Reused", stats.reused.to_string()),
            ("Dropped", stats.dropped.to_string()),
            ("Collisions", stats.collisions.to_string()),
            ("Saved to", location.display().to_string()),
        ],
    );

    Ok(checkpoint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HttpConfig;

    #[test]
    fn test_action_by_extension() {
        let http = HttpClient::new(&HttpConfig::default()).unwrap().with_cache(None);
        let conversion = ConversionConfig::default();
        let transformer =
            Transformer::new(&conversion, &http, "http://unused", "downloaded", "transformed");

        assert_eq!(transformer.action_for(Path::new("a/b.PDF")), FileAction::Copy);
        assert_eq!(transformer.action_for(Path::new("b.docx")), FileAction::Convert);
        assert_eq!(transformer.action_for(Path::new("b.pptx")), FileAction::Convert);
        assert_eq!(transformer.action_for(Path::new("b.zip")), FileAction::Skip);
        assert_eq!(transformer.action_for(Path::new("noext")), FileAction::Skip);
    }
}
