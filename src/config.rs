use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::UploadError;

pub const DEFAULT_CONFIG_FILE: &str = "ipfs-upload.json";
pub const DEFAULT_CHUNK_SIZE: usize = 100;
pub const DEFAULT_URI_SCHEME: &str = "ipfs";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub uri_scheme: Option<String>,
    #[serde(default)]
    pub images_dir: Option<String>,
    #[serde(default)]
    pub metadata_dir: Option<String>,
    #[serde(default)]
    pub metadata_csv: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub chunk_size: usize,
    pub uri_scheme: String,
    pub images_dir: Utf8PathBuf,
    pub metadata_dir: Utf8PathBuf,
    pub metadata_csv: Utf8PathBuf,
    pub timeout: Duration,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
            uri_scheme: DEFAULT_URI_SCHEME.to_string(),
            images_dir: Utf8PathBuf::from("images"),
            metadata_dir: Utf8PathBuf::from("metadata"),
            metadata_csv: Utf8PathBuf::from("metadata.csv"),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicit path must exist; the default file is optional.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, UploadError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| UploadError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| UploadError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, UploadError> {
        let defaults = ResolvedConfig::default();

        let chunk_size = config.chunk_size.unwrap_or(defaults.chunk_size);
        if chunk_size == 0 {
            return Err(UploadError::InvalidConfig(
                "chunk_size must be at least 1".to_string(),
            ));
        }

        let uri_scheme = config.uri_scheme.unwrap_or(defaults.uri_scheme);
        let uri_scheme = uri_scheme.trim().trim_end_matches("://").to_string();
        if uri_scheme.is_empty() || uri_scheme.contains(['/', ':']) {
            return Err(UploadError::InvalidConfig(format!(
                "uri_scheme must be a bare scheme such as \"ipfs\", got {uri_scheme:?}"
            )));
        }

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(defaults.schema_version),
            chunk_size,
            uri_scheme,
            images_dir: config
                .images_dir
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.images_dir),
            metadata_dir: config
                .metadata_dir
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.metadata_dir),
            metadata_csv: config
                .metadata_csv
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.metadata_csv),
            timeout: config
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        })
    }
}
