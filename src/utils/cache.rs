// src/utils/cache.rs

//! On-disk response cache for page fetches.
//!
//! Each entry is two files named after the SHA-256 of the URL:
//! `{key}.body` holds the response text and `{key}.json` its validators.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::Result;

/// How long a cached response may be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Reuse without contacting the server.
    Forever,
    /// Revalidate with the server using the stored validators.
    Revalidate,
}

/// Validators and bookkeeping stored next to a cached body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub url: String,
    pub final_url: String,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    pub stored_at: DateTime<Utc>,
}

impl CacheMeta {
    pub fn has_validators(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some()
    }
}

/// A cached response.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedPage {
    pub meta: CacheMeta,
    pub body: String,
}

/// File-backed cache with per-host policy.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    dir: PathBuf,
    forever_hosts: Vec<String>,
}

impl ResponseCache {
    pub fn new(dir: impl Into<PathBuf>, forever_hosts: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            forever_hosts: forever_hosts
                .into_iter()
                .map(|h| h.to_lowercase())
                .collect(),
        }
    }

    /// Policy for a URL, decided by its host.
    pub fn policy_for(&self, url: &str) -> CachePolicy {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_lowercase));
        match host {
            Some(host) if self.forever_hosts.iter().any(|h| *h == host) => CachePolicy::Forever,
            _ => CachePolicy::Revalidate,
        }
    }

    fn key(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    fn paths(&self, url: &str) -> (PathBuf, PathBuf) {
        let key = Self::key(url);
        (
            self.dir.join(format!("{key}.body")),
            self.dir.join(format!("{key}.json")),
        )
    }

    /// Read an entry; a missing or unreadable entry is a miss.
    pub async fn get(&self, url: &str) -> Option<CachedPage> {
        let (body_path, meta_path) = self.paths(url);
        let meta_bytes = tokio::fs::read(&meta_path).await.ok()?;
        let meta: CacheMeta = serde_json::from_slice(&meta_bytes).ok()?;
        let body = tokio::fs::read_to_string(&body_path).await.ok()?;
        Some(CachedPage { meta, body })
    }

    /// Store an entry, replacing any previous one.
    pub async fn put(&self, meta: &CacheMeta, body: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let (body_path, meta_path) = self.paths(&meta.url);
        tokio::fs::write(&body_path, body).await?;
        tokio::fs::write(&meta_path, serde_json::to_vec_pretty(meta)?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn meta(url: &str, etag: Option<&str>) -> CacheMeta {
        CacheMeta {
            url: url.to_string(),
            final_url: url.to_string(),
            etag: etag.map(str::to_string),
            last_modified: None,
            stored_at: Utc::now(),
        }
    }

    #[test]
    fn test_policy_by_host() {
        let cache = ResponseCache::new("unused", vec!["SHLS.rescue.org".into()]);
        assert_eq!(
            cache.policy_for("http://shls.rescue.org/topic/"),
            CachePolicy::Forever
        );
        assert_eq!(
            cache.policy_for("https://example.com/"),
            CachePolicy::Revalidate
        );
        assert_eq!(cache.policy_for("not a url"), CachePolicy::Revalidate);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let tmp = TempDir::new().unwrap();
        let cache = ResponseCache::new(tmp.path().join("cache"), vec![]);
        let url = "https://example.com/page";

        assert!(cache.get(url).await.is_none());

        cache.put(&meta(url, Some("\"abc\"")), "<html/>").await.unwrap();
        let page = cache.get(url).await.unwrap();
        assert_eq!(page.body, "<html/>");
        assert!(page.meta.has_validators());
        assert!(cache.get("https://example.com/other").await.is_none());
    }
}
