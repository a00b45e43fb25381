// src/pipeline/scrape.rs

//! Scrape stage: resolve every link against its content provider.
//!
//! Shared-storage links are downloaded (a folder becomes a `shared_folder`
//! node of downloaded files), video links become playlists of `video`
//! leaves, and anything else is dropped. The output tree has no `url` left
//! on any link.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::{
    Checkpoint, Config, DataDirs, Link, Locator, ProviderConfig, ResourceNode, Stage, Topic, Video,
};
use crate::services::box_api::ItemType;
use crate::services::video::language_from_title;
use crate::services::{BoxClient, VideoInfoSource};
use crate::storage::CheckpointStorage;
use crate::utils::fs::{PathClaims, ensure_dir};
use crate::utils::http::HttpClient;
use crate::utils::progress;

/// Counters reported at the end of the stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeStats {
    pub links_resolved: usize,
    pub files_downloaded: usize,
    pub folders: usize,
    pub playlists: usize,
    pub videos: usize,
    pub dropped: usize,
    /// Downloads that landed on a path another file already used
    pub collisions: usize,
}

/// Rewrites a crawled tree into a downloaded tree.
pub struct Scraper<'a> {
    providers: &'a ProviderConfig,
    boxes: BoxClient<'a>,
    videos: &'a dyn VideoInfoSource,
    downloaded_dir: PathBuf,
    claims: PathClaims,
    stats: ScrapeStats,
}

impl<'a> Scraper<'a> {
    pub fn new(
        providers: &'a ProviderConfig,
        http: &'a HttpClient,
        box_token: &str,
        videos: &'a dyn VideoInfoSource,
        downloaded_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            providers,
            boxes: BoxClient::new(
                http,
                &providers.box_api_base,
                box_token,
                providers.box_page_size,
            ),
            videos,
            downloaded_dir: downloaded_dir.into(),
            claims: PathClaims::default(),
            stats: ScrapeStats::default(),
        }
    }

    pub fn stats(&self) -> &ScrapeStats {
        &self.stats
    }

    /// Scrape the subtree under a container node.
    pub async fn scrape(&mut self, tree: &ResourceNode) -> Result<ResourceNode> {
        let topic = tree.topic().ok_or_else(|| {
            AppError::validation(format!("cannot scrape a '{}' node as a tree", tree.kind()))
        })?;
        ensure_dir(&self.downloaded_dir).await?;
        let children = self.scrape_children(&topic.children).await?;
        Ok(tree.rebuild(topic.with_children(children)))
    }

    async fn scrape_children(&mut self, children: &[ResourceNode]) -> Result<Vec<ResourceNode>> {
        let mut scraped = Vec::with_capacity(children.len());

        for child in children {
            log::info!("scraping {} title = {}", child.kind(), child.title());
            match child {
                ResourceNode::Link(link) => {
                    if let Some(node) = self.scrape_link(link).await? {
                        scraped.push(node);
                    }
                }
                ResourceNode::Video(_) => scraped.push(child.clone()),
                ResourceNode::Root(topic)
                | ResourceNode::Subject(topic)
                | ResourceNode::Section(topic)
                | ResourceNode::Language(topic)
                | ResourceNode::Extras(topic)
                | ResourceNode::SharedFolder(topic)
                | ResourceNode::VideoPlaylist(topic) => {
                    let grandchildren = Box::pin(self.scrape_children(&topic.children)).await?;
                    scraped.push(child.rebuild(topic.with_children(grandchildren)));
                }
                ResourceNode::Unrecognized => {
                    log::warn!("Dropping node of unrecognized kind");
                    self.stats.dropped += 1;
                }
            }
        }

        Ok(scraped)
    }

    async fn scrape_link(&mut self, link: &Link) -> Result<Option<ResourceNode>> {
        let url = match link.locator() {
            Some(Locator::Url(url)) => url,
            Some(Locator::Path(_)) => return Ok(Some(ResourceNode::Link(link.clone()))),
            None => {
                log::warn!("Dropping link '{}' without a single locator", link.title);
                self.stats.dropped += 1;
                return Ok(None);
            }
        };

        if link.title.contains(&self.providers.print_marker) {
            log::info!("Dropping print duplicate '{}' url={}", link.title, url);
            self.stats.dropped += 1;
            return Ok(None);
        }
        let title = link.title.replace(&self.providers.web_marker, "");

        let resolved = if url.contains(&self.providers.box_link_marker) {
            self.resolve_shared(link, &title, url).await
        } else if url.contains(&self.providers.video_link_marker) {
            self.resolve_video(link, &title, url).await
        } else {
            log::warn!("Skipping link '{}' with unknown pattern url={}", title, url);
            self.stats.dropped += 1;
            return Ok(None);
        };

        match resolved {
            Ok(node) => {
                self.stats.links_resolved += 1;
                Ok(Some(node))
            }
            Err(e) if e.is_skippable() => {
                log::warn!("Dropping link '{}' url={}: {}", title, url, e);
                self.stats.dropped += 1;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn resolve_shared(&mut self, link: &Link, title: &str, url: &str) -> Result<ResourceNode> {
        let item = self.boxes.shared_item(url).await?;
        match item.item_type {
            ItemType::File => {
                let path = self
                    .boxes
                    .download_file(&item.id, url, &self.downloaded_dir)
                    .await?;
                let source_id = format!("box_file:{}", item.id);
                self.record_download(&path, &source_id);
                Ok(ResourceNode::Link(Link {
                    language: link.language.clone(),
                    ..Link::local(title, path, source_id)
                }))
            }
            ItemType::Folder => {
                let folder = self.download_folder(link, &item.id, url).await?;
                self.stats.folders += 1;
                Ok(ResourceNode::SharedFolder(folder))
            }
            ItemType::Other => Err(AppError::provider(
                "box",
                format!("shared link {url} is neither a file nor a folder"),
            )),
        }
    }

    async fn download_folder(&mut self, link: &Link, folder_id: &str, url: &str) -> Result<Topic> {
        let name = self.boxes.folder_name(folder_id, url).await?;
        let folder_dir = self.downloaded_dir.join(safe_dir_name(&name));
        ensure_dir(&folder_dir).await?;

        let mut children = Vec::new();
        for entry in self.boxes.folder_entries(folder_id, url).await? {
            if entry.item_type != ItemType::File {
                log::info!("Skipping non-file entry '{}' in folder '{}'", entry.name, name);
                continue;
            }
            match self.boxes.download_file(&entry.id, url, &folder_dir).await {
                Ok(path) => {
                    let source_id = format!("box_file:{}", entry.id);
                    self.record_download(&path, &source_id);
                    let file_title = file_title(&path, &entry.name);
                    children.push(ResourceNode::Link(Link {
                        language: link.language.clone(),
                        ..Link::local(file_title, path, source_id)
                    }));
                }
                Err(e) if e.is_skippable() => {
                    log::warn!("Dropping file '{}' of folder '{}': {}", entry.name, name, e);
                    self.stats.dropped += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Topic {
            title: name,
            source_id: Some(format!("box_folder:{folder_id}")),
            language: link.language.clone(),
            children,
            ..Topic::default()
        })
    }

    fn record_download(&mut self, path: &Path, source_id: &str) {
        self.stats.files_downloaded += 1;
        if let Some(previous) = self.claims.claim(path, source_id) {
            log::warn!(
                "{} overwrote the file of {} at {}",
                source_id,
                previous,
                path.display()
            );
            self.stats.collisions += 1;
        }
    }

    async fn resolve_video(&mut self, link: &Link, title: &str, url: &str) -> Result<ResourceNode> {
        let info = self.videos.extract_info(url).await?;
        let language = language_from_title(title)
            .map(str::to_string)
            .or_else(|| link.language.clone());
        let playlist_id = info.id.clone();

        let videos: Vec<ResourceNode> = info
            .into_videos()
            .into_iter()
            .map(|entry| {
                ResourceNode::Video(Video {
                    title: entry.display_title(),
                    web_url: format!("{}{}", self.providers.video_web_base, entry.id),
                    thumbnail: entry.thumbnail_url(),
                    description: None,
                    language: language.clone(),
                })
            })
            .collect();
        self.stats.playlists += 1;
        self.stats.videos += videos.len();

        Ok(ResourceNode::VideoPlaylist(Topic {
            title: title.to_string(),
            source_id: Some(format!("vimeo_playlist:{playlist_id}")),
            language,
            children: videos,
            ..Topic::default()
        }))
    }
}

/// Folder names become directory names; path separators are not allowed.
fn safe_dir_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => "folder".to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// Title of a downloaded folder file: its saved name, else the listing name.
fn file_title(path: &Path, listed: &str) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| listed.to_string())
}

/// Run the scrape stage on the crawled checkpoint and write the downloaded one.
pub async fn run_scrape(
    config: &Config,
    dirs: &DataDirs,
    http: &HttpClient,
    box_token: &str,
    videos: &dyn VideoInfoSource,
    storage: &dyn CheckpointStorage,
) -> Result<Checkpoint> {
    progress::header("Scrape - Downloading resources");

    let input = storage.read_checkpoint(Stage::Crawled).await?;
    let mut scraper = Scraper::new(&config.providers, http, box_token, videos, &dirs.downloaded);
    let tree = scraper.scrape(&input.tree).await?;

    let checkpoint = Checkpoint::new(Stage::Downloaded, tree);
    let location = storage.write_checkpoint(&checkpoint).await?;

    let stats = scraper.stats();
    progress::summary(
        "Scrape complete",
        &[
            ("Links resolved", stats.links_resolved.to_string()),
            ("Files downloaded", stats.files_downloaded.to_string()),
            ("Folders", stats.folders.to_string()),
            ("Playlists", stats.playlists.to_string()),
            ("Videos", stats.videos.to_string()),
            ("Dropped", stats.dropped.to_string()),
            ("Collisions", stats.collisions.to_string()),
            ("Saved to", location.display().to_string()),
        ],
    );

    Ok(checkpoint)
}
