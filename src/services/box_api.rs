// src/services/box_api.rs

//! Shared-file-storage (Box) API client.
//!
//! Every call carries the bearer token and the shared link the item was
//! published under; the API resolves items relative to that link.

use std::path::{Path, PathBuf};

use reqwest::RequestBuilder;
use reqwest::header::CONTENT_DISPOSITION;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, Result};
use crate::utils::fs::write_atomic;
use crate::utils::http::HttpClient;

const PROVIDER: &str = "box";

/// Type of a shared item or folder entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    File,
    Folder,
    #[serde(other)]
    Other,
}

/// What a shared link points at.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SharedItem {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub id: String,
}

/// One entry of a folder listing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FolderEntry {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct FolderDetails {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FolderItems {
    #[serde(default)]
    total_count: Option<u64>,
    #[serde(default)]
    entries: Vec<FolderEntry>,
}

/// Client for the shared-storage REST API.
pub struct BoxClient<'a> {
    http: &'a HttpClient,
    api_base: String,
    token: String,
    page_size: u32,
}

impl<'a> BoxClient<'a> {
    pub fn new(
        http: &'a HttpClient,
        api_base: &str,
        token: impl Into<String>,
        page_size: u32,
    ) -> Self {
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.into(),
            page_size: page_size.max(1),
        }
    }

    fn authorized(
        &self,
        client: &reqwest::Client,
        url: &str,
        shared_link: &str,
    ) -> RequestBuilder {
        client
            .get(url)
            .bearer_auth(&self.token)
            .header("BoxApi", format!("shared_link={shared_link}"))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, shared_link: &str) -> Result<T> {
        let response = self
            .http
            .send(url, |client| self.authorized(client, url, shared_link))
            .await
            .ok_or_else(|| AppError::unavailable(url))?;
        let body = response
            .text()
            .await
            .map_err(|e| AppError::unavailable(format!("{url}: {e}")))?;
        serde_json::from_str(&body).map_err(|e| AppError::provider(PROVIDER, format!("{url}: {e}")))
    }

    /// Resolve a shared link to the file or folder it points at.
    pub async fn shared_item(&self, shared_link: &str) -> Result<SharedItem> {
        let url = format!("{}/shared_items?fields=type,id", self.api_base);
        self.get_json(&url, shared_link).await
    }

    /// Download a file into `dest_dir`, named as the server's disposition header says.
    pub async fn download_file(
        &self,
        file_id: &str,
        shared_link: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let url = format!("{}/files/{}/content", self.api_base, file_id);
        let response = self
            .http
            .send(&url, |client| self.authorized(client, &url, shared_link))
            .await
            .ok_or_else(|| AppError::unavailable(&url))?;

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_disposition)
            .ok_or_else(|| {
                AppError::provider(PROVIDER, format!("no filename for file {file_id}"))
            })?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::unavailable(format!("{url}: {e}")))?;

        let out_path = dest_dir.join(&filename);
        write_atomic(&out_path, &bytes).await?;
        log::info!(
            "Saved file {} of size {:.2} MB",
            out_path.display(),
            bytes.len() as f64 / 1024.0 / 1024.0
        );
        Ok(out_path)
    }

    /// Name of a shared folder.
    pub async fn folder_name(&self, folder_id: &str, shared_link: &str) -> Result<String> {
        let url = format!("{}/folders/{}", self.api_base, folder_id);
        let details: FolderDetails = self.get_json(&url, shared_link).await?;
        Ok(details.name)
    }

    /// All entries of a folder (one level), following the listing's pages.
    pub async fn folder_entries(
        &self,
        folder_id: &str,
        shared_link: &str,
    ) -> Result<Vec<FolderEntry>> {
        let mut entries = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let url = format!(
                "{}/folders/{}/items?limit={}&offset={}",
                self.api_base, folder_id, self.page_size, offset
            );
            let page: FolderItems = self.get_json(&url, shared_link).await?;
            let received = page.entries.len() as u64;
            entries.extend(page.entries);
            offset += received;

            match page.total_count {
                Some(total) if received > 0 && offset < total => continue,
                _ => break,
            }
        }

        Ok(entries)
    }
}

/// Extract a safe file name from a `Content-Disposition` header value.
///
/// `filename*` (RFC 5987) wins over `filename`; directory components are
/// stripped so a hostile name cannot escape the destination directory.
pub fn parse_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in header_params(value).into_iter().skip(1) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let raw = unquote(raw.trim());
        match key.trim().to_ascii_lowercase().as_str() {
            "filename" => plain = Some(raw),
            "filename*" => {
                let encoded = raw.split_once("''").map_or(raw.as_str(), |(_, rest)| rest);
                extended = Some(percent_decode(encoded));
            }
            _ => {}
        }
    }

    let name = extended.or(plain)?;
    let name = name.rsplit(['/', '\\']).next().unwrap_or("").trim().to_string();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name)
    }
}

/// Split a header value on `;` outside quoted strings.
fn header_params(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                params.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&value[start..]);
    params
}

/// Strip surrounding quotes and undo `\` escapes of a quoted-string.
fn unquote(raw: &str) -> String {
    let Some(inner) = raw
        .strip_prefix('"')
        .map(|r| r.strip_suffix('"').unwrap_or(r))
    else {
        return raw.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Percent-decode without the form-encoding rule that turns `+` into a space.
fn percent_decode(encoded: &str) -> String {
    let query = format!("v={}", encoded.replace('+', "%2B"));
    url::form_urlencoded::parse(query.as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}
