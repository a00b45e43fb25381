// src/services/video.rs

//! Video-hosting metadata via an external extractor (`yt-dlp`).

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tokio::process::Command;

use crate::error::{AppError, Result};

const PROVIDER: &str = "video";

static TITLE_IN_DESCRIPTION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"This is "(?P<title>.*)" by .*"#).ok());

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Thumbnail {
    pub url: String,
}

/// Metadata of a video or playlist as reported by the extractor.
///
/// A playlist carries its videos in `entries`; a single video has none.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VideoInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnails: Vec<Thumbnail>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub entries: Option<Vec<VideoInfo>>,
}

impl VideoInfo {
    /// Videos of a playlist, or the video itself.
    pub fn into_videos(self) -> Vec<VideoInfo> {
        match self.entries {
            Some(entries) => entries,
            None => vec![self],
        }
    }

    /// Display title, recovered from the description when the host
    /// publishes it as `This is "<title>" by <author>`.
    pub fn display_title(&self) -> String {
        let recovered = self.description.as_deref().and_then(|desc| {
            let caps = TITLE_IN_DESCRIPTION.as_ref()?.captures(desc)?;
            caps.name("title").map(|m| m.as_str().to_string())
        });
        recovered.unwrap_or_else(|| self.title.clone())
    }

    /// First listed thumbnail URL.
    pub fn thumbnail_url(&self) -> Option<String> {
        self.thumbnails
            .first()
            .map(|t| t.url.clone())
            .or_else(|| self.thumbnail.clone())
    }
}

/// Source of video metadata.
#[async_trait]
pub trait VideoInfoSource: Send + Sync {
    async fn extract_info(&self, url: &str) -> Result<VideoInfo>;
}

/// Runs the extractor program and parses its JSON dump.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: String,
}

impl YtDlp {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl VideoInfoSource for YtDlp {
    async fn extract_info(&self, url: &str) -> Result<VideoInfo> {
        log::debug!("Running {} for {}", self.program, url);
        let output = Command::new(&self.program)
            .args(["-J", "--no-warnings", "--skip-download", url])
            .output()
            .await
            .map_err(|e| AppError::provider(PROVIDER, format!("cannot run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::provider(
                PROVIDER,
                format!("{} failed for {url}: {}", self.program, stderr.trim()),
            ));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| AppError::provider(PROVIDER, format!("bad metadata for {url}: {e}")))
    }
}

/// Language code implied by a playlist title suffix.
pub fn language_from_title(title: &str) -> Option<&'static str> {
    if title.ends_with("_ENGLISH") {
        Some("en")
    } else if title.ends_with("_ARABIC") {
        Some("ar")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, title: &str, description: Option<&str>) -> VideoInfo {
        VideoInfo {
            id: id.to_string(),
            title: title.to_string(),
            description: description.map(str::to_string),
            thumbnails: vec![],
            thumbnail: None,
            entries: None,
        }
    }

    #[test]
    fn test_display_title_from_description() {
        let video = entry(
            "1",
            "session_3_final_v2",
            Some("This is \"Session 3: Managing Stress\" by IRC Safe Healing"),
        );
        assert_eq!(video.display_title(), "Session 3: Managing Stress");

        let plain = entry("2", "Fallback title", Some("Just a description"));
        assert_eq!(plain.display_title(), "Fallback title");
    }

    #[test]
    fn test_playlist_json() {
        let json = r#"{
            "id": "9",
            "title": "Sessions_ARABIC",
            "entries": [
                {"id": "11", "title": "a", "thumbnails": [{"url": "https://i.vimeocdn.com/1.jpg"}, {"url": "x"}]},
                {"id": "12", "title": "b", "thumbnail": "https://i.vimeocdn.com/2.jpg"}
            ]
        }"#;
        let info: VideoInfo = serde_json::from_str(json).unwrap();
        assert_eq!(language_from_title(&info.title), Some("ar"));
        let videos = info.into_videos();
        assert_eq!(videos.len(), 2);
        assert_eq!(
            videos[0].thumbnail_url().as_deref(),
            Some("https://i.vimeocdn.com/1.jpg")
        );
        assert_eq!(
            videos[1].thumbnail_url().as_deref(),
            Some("https://i.vimeocdn.com/2.jpg")
        );
    }

    #[test]
    fn test_single_video_is_its_own_entry() {
        let videos = entry("5", "solo", None).into_videos();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].id, "5");
    }

    #[test]
    fn test_language_suffix() {
        assert_eq!(language_from_title("Videos_ENGLISH"), Some("en"));
        assert_eq!(language_from_title("Videos"), None);
    }

    #[tokio::test]
    async fn test_missing_extractor_is_provider_error() {
        let source = YtDlp::new("definitely-not-an-installed-extractor");
        let err = source.extract_info("https://vimeo.com/1").await.unwrap_err();
        assert!(err.is_skippable());
    }
}
