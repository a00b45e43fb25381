//! Storage abstractions for stage checkpoints.
//!
//! Each stage reads the previous stage's checkpoint and writes its own; the
//! load stage additionally writes the publishable tree.
//!
//! ## Directory Structure
//!
//! ```text
//! {trees_dir}/
//! ├── web_resource_tree.json       # crawled
//! ├── downloaded_resources.json    # downloaded
//! ├── transformed_resources.json   # transformed
//! └── ricecooker_json_tree.json    # publishable
//! ```

pub mod local;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Checkpoint, PublishableTree, Stage};

// Re-export for convenience
pub use local::LocalStorage;

/// File name of the publishable tree.
pub const PUBLISHABLE_FILE: &str = "ricecooker_json_tree.json";

/// Trait for checkpoint storage backends.
#[async_trait]
pub trait CheckpointStorage: Send + Sync {
    /// Persist a checkpoint under its stage's name, replacing any previous one.
    async fn write_checkpoint(&self, checkpoint: &Checkpoint) -> Result<PathBuf>;

    /// Load and validate the checkpoint of `stage`.
    ///
    /// A missing file, a malformed document, or a tree violating the stage's
    /// invariants is a `Checkpoint` error.
    async fn read_checkpoint(&self, stage: Stage) -> Result<Checkpoint>;

    /// Load the checkpoint of `stage` without validating it, `None` if absent.
    async fn peek_checkpoint(&self, stage: Stage) -> Result<Option<Checkpoint>>;

    /// Persist the publishable tree.
    async fn write_publishable(&self, tree: &PublishableTree) -> Result<PathBuf>;
}
