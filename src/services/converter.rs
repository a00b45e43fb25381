// src/services/converter.rs

//! Client for the document conversion service (unoconv over HTTP).

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};

use crate::error::{AppError, Result};
use crate::models::ConversionConfig;
use crate::utils::fs::write_atomic;
use crate::utils::http::HttpClient;

/// Converts office documents to the portable format by uploading them.
pub struct DocumentConverter<'a> {
    http: &'a HttpClient,
    endpoint: String,
    timeout: Duration,
}

impl<'a> DocumentConverter<'a> {
    /// `service_url` is the service base URL without a trailing slash.
    pub fn new(http: &'a HttpClient, service_url: &str, config: &ConversionConfig) -> Self {
        Self {
            http,
            endpoint: format!(
                "{}/unoconv/{}",
                service_url.trim_end_matches('/'),
                config.portable_extension
            ),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Upload `source` as the multipart field `file` and write the reply to `dest`.
    pub async fn convert(&self, source: &Path, dest: &Path) -> Result<()> {
        let bytes = tokio::fs::read(source)
            .await
            .map_err(|e| AppError::conversion(source.display(), e))?;
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());

        let response = self
            .http
            .send_once(&self.endpoint, |client| {
                let part = Part::bytes(bytes).file_name(file_name);
                client
                    .post(&self.endpoint)
                    .multipart(Form::new().part("file", part))
                    .timeout(self.timeout)
            })
            .await
            .ok_or_else(|| AppError::conversion(source.display(), "conversion service failed"))?;

        let converted = response
            .bytes()
            .await
            .map_err(|e| AppError::conversion(source.display(), e))?;
        if converted.is_empty() {
            return Err(AppError::conversion(
                source.display(),
                "conversion service returned an empty document",
            ));
        }

        write_atomic(dest, &converted).await?;
        log::info!(
            "Converted {} -> {} ({} bytes)",
            source.display(),
            dest.display(),
            converted.len()
        );
        Ok(())
    }
}
