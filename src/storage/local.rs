//! Local filesystem storage implementation.
//!
//! Checkpoints are pretty-printed JSON written atomically (temp file, then
//! rename), so an interrupted stage never leaves a half-written tree behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{Checkpoint, PublishableTree, Stage};
use crate::storage::{CheckpointStorage, PUBLISHABLE_FILE};
use crate::utils::fs::{read_json, save_json};

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    /// Path of the checkpoint file for `stage`.
    pub fn checkpoint_path(&self, stage: Stage) -> PathBuf {
        self.root_dir.join(stage.file_name())
    }

    pub fn publishable_path(&self) -> PathBuf {
        self.root_dir.join(PUBLISHABLE_FILE)
    }
}

#[async_trait]
impl CheckpointStorage for LocalStorage {
    async fn write_checkpoint(&self, checkpoint: &Checkpoint) -> Result<PathBuf> {
        let path = self.checkpoint_path(checkpoint.stage);
        save_json(&path, checkpoint).await?;
        log::info!(
            "Saved {} tree ({} nodes) to {}",
            checkpoint.stage,
            checkpoint.tree.node_count(),
            path.display()
        );
        Ok(path)
    }

    async fn read_checkpoint(&self, stage: Stage) -> Result<Checkpoint> {
        let path = self.checkpoint_path(stage);
        let checkpoint = read_json::<Checkpoint>(&path)
            .await
            .map_err(|e| match e {
                AppError::Json(e) => {
                    AppError::checkpoint(format!("{} is malformed: {e}", path.display()))
                }
                other => other,
            })?
            .ok_or_else(|| {
                AppError::checkpoint(format!(
                    "{} not found; run the stage that produces the {stage} tree first",
                    path.display()
                ))
            })?;
        checkpoint.validate(stage)?;
        Ok(checkpoint)
    }

    async fn peek_checkpoint(&self, stage: Stage) -> Result<Option<Checkpoint>> {
        read_json(&self.checkpoint_path(stage)).await
    }

    async fn write_publishable(&self, tree: &PublishableTree) -> Result<PathBuf> {
        let path = self.publishable_path();
        save_json(&path, tree).await?;
        log::info!("Saved publishable tree to {}", path.display());
        Ok(path)
    }
}
