// src/config.rs

//! Configuration and credential loading.
//!
//! The TOML file tunes the pipeline; credentials and the conversion service
//! location come from the environment and are checked before any stage
//! touches the network.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::Config;

/// Environment variable holding the conversion service base URL.
pub const CONVERSION_URL_ENV: &str = "UNOCONV_SERVICE_URL";

/// Environment variable holding the shared-storage bearer token.
pub const BOX_TOKEN_ENV: &str = "BOX_ACCESS_TOKEN";

/// Fallback file for the shared-storage bearer token.
pub const BOX_TOKEN_FILE: &str = "credentials/box_com_access_token.txt";

/// Name of the configuration file inside the data directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Load `{data_dir}/config.toml`, falling back to defaults.
pub fn load_config(data_dir: &Path) -> Config {
    Config::load_or_default(data_dir.join(CONFIG_FILE))
}

/// Resolve the conversion service base URL from the environment or config.
pub fn conversion_service_url(config: &Config) -> Result<String> {
    resolve_conversion_url(std::env::var(CONVERSION_URL_ENV).ok(), config)
}

/// Resolve the conversion service URL from an explicit environment value.
pub fn resolve_conversion_url(env_value: Option<String>, config: &Config) -> Result<String> {
    env_value
        .filter(|v| !v.trim().is_empty())
        .or_else(|| config.conversion.service_url.clone())
        .map(|url| url.trim().trim_end_matches('/').to_string())
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            AppError::MissingCredential(format!(
                "set {CONVERSION_URL_ENV} to point to the document conversion service"
            ))
        })
}

/// Read the shared-storage bearer token from the environment or the token file.
pub fn box_token() -> Result<String> {
    resolve_box_token(std::env::var(BOX_TOKEN_ENV).ok(), Path::new(BOX_TOKEN_FILE))
}

/// Resolve the bearer token from an explicit environment value or `token_file`.
pub fn resolve_box_token(env_value: Option<String>, token_file: &Path) -> Result<String> {
    if let Some(token) = env_value.map(|t| t.trim().to_string()) {
        if !token.is_empty() {
            return Ok(token);
        }
    }

    let missing = |path: &PathBuf| {
        AppError::MissingCredential(format!(
            "set {BOX_TOKEN_ENV} or write a developer token to {}",
            path.display()
        ))
    };
    let path = token_file.to_path_buf();
    let content = std::fs::read_to_string(&path).map_err(|_| missing(&path))?;
    let token = content.lines().next().unwrap_or("").trim().to_string();
    if token.is_empty() {
        return Err(missing(&path));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_conversion_url_from_env_wins() {
        let mut config = Config::default();
        config.conversion.service_url = Some("http://config:8989".into());
        let url = resolve_conversion_url(Some("http://env:8989/".into()), &config).unwrap();
        assert_eq!(url, "http://env:8989");
    }

    #[test]
    fn test_conversion_url_from_config() {
        let mut config = Config::default();
        config.conversion.service_url = Some("http://config:8989//".into());
        let url = resolve_conversion_url(None, &config).unwrap();
        assert_eq!(url, "http://config:8989");
    }

    #[test]
    fn test_conversion_url_missing_is_fatal() {
        let err = resolve_conversion_url(Some("  ".into()), &Config::default()).unwrap_err();
        assert!(matches!(err, AppError::MissingCredential(_)));
    }

    #[test]
    fn test_box_token_from_file() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("token.txt");
        std::fs::write(&file, "abc123\n").unwrap();
        assert_eq!(resolve_box_token(None, &file).unwrap(), "abc123");
        assert_eq!(
            resolve_box_token(Some(" xyz ".into()), &file).unwrap(),
            "xyz"
        );
    }

    #[test]
    fn test_box_token_missing_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let err = resolve_box_token(None, &tmp.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, AppError::MissingCredential(_)));
    }
}
