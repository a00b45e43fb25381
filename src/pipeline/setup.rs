// src/pipeline/setup.rs

use crate::error::Result;
use crate::models::DataDirs;
use crate::utils::fs::ensure_dir;

/// Create the working directories every stage expects.
pub async fn run_setup(dirs: &DataDirs) -> Result<()> {
    for dir in dirs.all() {
        ensure_dir(dir).await?;
        log::debug!("Directory ready: {}", dir.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PathsConfig;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_creates_all_dirs() {
        let tmp = TempDir::new().unwrap();
        let dirs = PathsConfig::default().resolve(&tmp.path().join("chefdata"));

        run_setup(&dirs).await.unwrap();
        // idempotent
        run_setup(&dirs).await.unwrap();

        assert!(dirs.trees.is_dir());
        assert!(dirs.downloaded.is_dir());
        assert!(dirs.transformed.is_dir());
    }
}
