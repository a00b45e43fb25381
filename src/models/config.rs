//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{ChannelInfo, License};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP client, retry and caching behavior
    #[serde(default)]
    pub http: HttpConfig,

    /// Source website layout
    #[serde(default)]
    pub site: SiteConfig,

    /// Content provider endpoints and link classification
    #[serde(default)]
    pub providers: ProviderConfig,

    /// Working directories under the data directory
    #[serde(default)]
    pub paths: PathsConfig,

    /// Document conversion settings
    #[serde(default)]
    pub conversion: ConversionConfig,

    /// Channel metadata for the published tree
    #[serde(default)]
    pub channel: ChannelConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if self.http.max_retries == 0 {
            return Err(AppError::validation("http.max_retries must be > 0"));
        }
        url::Url::parse(&self.site.start_url)
            .map_err(|e| AppError::validation(format!("site.start_url: {e}")))?;
        url::Url::parse(&self.providers.box_api_base)
            .map_err(|e| AppError::validation(format!("providers.box_api_base: {e}")))?;
        if self.providers.box_page_size == 0 {
            return Err(AppError::validation("providers.box_page_size must be > 0"));
        }
        if self.providers.box_link_marker.is_empty() || self.providers.video_link_marker.is_empty()
        {
            return Err(AppError::validation("provider link markers must not be empty"));
        }
        if self.paths.downloaded_dir == self.paths.transformed_dir {
            return Err(AppError::validation(
                "paths.downloaded_dir and paths.transformed_dir must differ",
            ));
        }
        if self.conversion.convertible_extensions.is_empty() {
            return Err(AppError::validation(
                "conversion.convertible_extensions is empty",
            ));
        }
        if self.channel.title.trim().is_empty() || self.channel.source_id.trim().is_empty() {
            return Err(AppError::validation(
                "channel.title and channel.source_id are required",
            ));
        }
        Ok(())
    }
}

/// HTTP client and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Attempts before a connection-level failure is given up
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Base backoff; retry `n` waits `n * retry_backoff_ms`
    #[serde(default = "defaults::retry_backoff")]
    pub retry_backoff_ms: u64,

    /// Response cache directory (relative to the working directory).
    /// An empty string disables caching.
    #[serde(default = "defaults::cache_dir")]
    pub cache_dir: String,

    /// Hosts whose pages are cached forever once fetched
    #[serde(default = "defaults::cache_forever_hosts")]
    pub cache_forever_hosts: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            max_retries: defaults::max_retries(),
            retry_backoff_ms: defaults::retry_backoff(),
            cache_dir: defaults::cache_dir(),
            cache_forever_hosts: defaults::cache_forever_hosts(),
        }
    }
}

/// Layout of the toolkit website.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Home page listing the topic tiles
    #[serde(default = "defaults::start_url")]
    pub start_url: String,

    /// Tiles whose link contains this marker are skipped
    #[serde(default = "defaults::excluded_tile_marker")]
    pub excluded_tile_marker: String,

    /// Title given to the brochure links of the intro block
    #[serde(default = "defaults::brochure_title")]
    pub brochure_title: String,

    /// Language heading (as shown on the site) to language code
    #[serde(default = "defaults::languages")]
    pub languages: BTreeMap<String, String>,
}

impl SiteConfig {
    /// Language code for a heading such as "English", if known.
    pub fn language_code(&self, heading: &str) -> Option<String> {
        let heading = heading.trim();
        self.languages
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(heading))
            .map(|(_, code)| code.clone())
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            start_url: defaults::start_url(),
            excluded_tile_marker: defaults::excluded_tile_marker(),
            brochure_title: defaults::brochure_title(),
            languages: defaults::languages(),
        }
    }
}

/// Content provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Substring identifying shared-storage links
    #[serde(default = "defaults::box_link_marker")]
    pub box_link_marker: String,

    /// Shared-storage REST API base URL
    #[serde(default = "defaults::box_api_base")]
    pub box_api_base: String,

    /// Entries requested per folder listing page
    #[serde(default = "defaults::box_page_size")]
    pub box_page_size: u32,

    /// Substring identifying video-hosting links
    #[serde(default = "defaults::video_link_marker")]
    pub video_link_marker: String,

    /// Prefix joined with a video id to form its playback URL
    #[serde(default = "defaults::video_web_base")]
    pub video_web_base: String,

    /// Metadata extractor executable
    #[serde(default = "defaults::video_extractor")]
    pub video_extractor: String,

    /// Link titles containing this marker are print duplicates and dropped
    #[serde(default = "defaults::print_marker")]
    pub print_marker: String,

    /// Link titles containing this marker are web variants; the marker is stripped
    #[serde(default = "defaults::web_marker")]
    pub web_marker: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            box_link_marker: defaults::box_link_marker(),
            box_api_base: defaults::box_api_base(),
            box_page_size: defaults::box_page_size(),
            video_link_marker: defaults::video_link_marker(),
            video_web_base: defaults::video_web_base(),
            video_extractor: defaults::video_extractor(),
            print_marker: defaults::print_marker(),
            web_marker: defaults::web_marker(),
        }
    }
}

/// Working directories, relative to the data directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::trees_dir")]
    pub trees_dir: PathBuf,

    #[serde(default = "defaults::downloaded_dir")]
    pub downloaded_dir: PathBuf,

    #[serde(default = "defaults::transformed_dir")]
    pub transformed_dir: PathBuf,
}

/// Working directories resolved against a data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDirs {
    pub trees: PathBuf,
    pub downloaded: PathBuf,
    pub transformed: PathBuf,
}

impl DataDirs {
    pub fn all(&self) -> [&Path; 3] {
        [&self.trees, &self.downloaded, &self.transformed]
    }
}

impl PathsConfig {
    pub fn resolve(&self, data_dir: &Path) -> DataDirs {
        DataDirs {
            trees: data_dir.join(&self.trees_dir),
            downloaded: data_dir.join(&self.downloaded_dir),
            transformed: data_dir.join(&self.transformed_dir),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            trees_dir: defaults::trees_dir(),
            downloaded_dir: defaults::downloaded_dir(),
            transformed_dir: defaults::transformed_dir(),
        }
    }
}

/// Document conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Conversion service base URL; `UNOCONV_SERVICE_URL` takes precedence
    #[serde(default)]
    pub service_url: Option<String>,

    /// Timeout for a single conversion request
    #[serde(default = "defaults::conversion_timeout")]
    pub timeout_secs: u64,

    /// Extension of the format every document is normalized to
    #[serde(default = "defaults::portable_extension")]
    pub portable_extension: String,

    /// Extensions sent through the conversion service
    #[serde(default = "defaults::convertible_extensions")]
    pub convertible_extensions: Vec<String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            service_url: None,
            timeout_secs: defaults::conversion_timeout(),
            portable_extension: defaults::portable_extension(),
            convertible_extensions: defaults::convertible_extensions(),
        }
    }
}

/// Channel metadata and license.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "defaults::channel_title")]
    pub title: String,

    #[serde(default = "defaults::channel_domain")]
    pub source_domain: String,

    #[serde(default = "defaults::channel_source_id")]
    pub source_id: String,

    #[serde(default = "defaults::channel_language")]
    pub language: String,

    #[serde(default = "defaults::channel_thumbnail")]
    pub thumbnail: Option<String>,

    #[serde(default = "defaults::channel_description")]
    pub description: String,

    #[serde(default = "defaults::license")]
    pub license: License,
}

impl ChannelConfig {
    pub fn info(&self) -> ChannelInfo {
        ChannelInfo {
            title: self.title.clone(),
            source_domain: self.source_domain.clone(),
            source_id: self.source_id.clone(),
            language: self.language.clone(),
            thumbnail: self.thumbnail.clone(),
            description: self.description.clone(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            title: defaults::channel_title(),
            source_domain: defaults::channel_domain(),
            source_id: defaults::channel_source_id(),
            language: defaults::channel_language(),
            thumbnail: defaults::channel_thumbnail(),
            description: defaults::channel_description(),
            license: defaults::license(),
        }
    }
}

mod defaults {
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use crate::models::License;

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; shls-chef/0.1)".into()
    }
    pub fn timeout() -> u64 {
        60
    }
    pub fn max_retries() -> u32 {
        5
    }
    pub fn retry_backoff() -> u64 {
        1000
    }
    pub fn cache_dir() -> String {
        ".webcache".into()
    }
    pub fn cache_forever_hosts() -> Vec<String> {
        vec!["shls.rescue.org".into()]
    }

    // Site defaults
    pub fn start_url() -> String {
        "http://shls.rescue.org/".into()
    }
    pub fn excluded_tile_marker() -> String {
        "printing-guide".into()
    }
    pub fn brochure_title() -> String {
        "IRC SHLS Toolkit Brochure".into()
    }
    pub fn languages() -> BTreeMap<String, String> {
        [
            ("English", "en"),
            ("Arabic", "ar"),
            ("French", "fr"),
            ("Spanish", "es"),
            ("Kurdish", "ku"),
            ("Urdu", "ur"),
        ]
        .into_iter()
        .map(|(name, code)| (name.to_string(), code.to_string()))
        .collect()
    }

    // Provider defaults
    pub fn box_link_marker() -> String {
        "rescue.box.com".into()
    }
    pub fn box_api_base() -> String {
        "https://api.box.com/2.0".into()
    }
    pub fn box_page_size() -> u32 {
        1000
    }
    pub fn video_link_marker() -> String {
        "vimeo.com".into()
    }
    pub fn video_web_base() -> String {
        "https://vimeo.com/".into()
    }
    pub fn video_extractor() -> String {
        "yt-dlp".into()
    }
    pub fn print_marker() -> String {
        "for print".into()
    }
    pub fn web_marker() -> String {
        " for web".into()
    }

    // Path defaults
    pub fn trees_dir() -> PathBuf {
        "trees".into()
    }
    pub fn downloaded_dir() -> PathBuf {
        "downloaded".into()
    }
    pub fn transformed_dir() -> PathBuf {
        "transformed".into()
    }

    // Conversion defaults
    pub fn conversion_timeout() -> u64 {
        300
    }
    pub fn portable_extension() -> String {
        "pdf".into()
    }
    pub fn convertible_extensions() -> Vec<String> {
        vec!["docx".into(), "xlsx".into(), "pptx".into()]
    }

    // Channel defaults
    pub fn channel_title() -> String {
        "Safe Healing and Learning Spaces Toolkit".into()
    }
    pub fn channel_domain() -> String {
        "shls.rescue.org".into()
    }
    pub fn channel_source_id() -> String {
        "toolkit".into()
    }
    pub fn channel_language() -> String {
        "en".into()
    }
    pub fn channel_thumbnail() -> Option<String> {
        Some("chefdata/channel_thumbnail.png".into())
    }
    pub fn channel_description() -> String {
        "A Safe Healing and Learning Space (SHLS) is a secure, caring and predictable \
         place where children and adolescents living in conflict and crisis settings \
         can learn, develop and be protected. The SHLS Toolkit provides child \
         protection and education practitioners with all of the content needed to \
         initiate an SHLS program."
            .into()
    }
    pub fn license() -> License {
        License {
            license_id: "Public Domain".into(),
            copyright_holder: Some("USAID and International Rescue Committee".into()),
            description: None,
        }
    }
}
