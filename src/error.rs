use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum UploadError {
    #[error("invalid collection name: {0}")]
    InvalidCollectionName(String),

    #[error("invalid storage endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("folder {0} already exists in IPFS")]
    #[diagnostic(help("collection names must be unique on the remote store"))]
    DirectoryExists(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("storage request failed: {0}")]
    StorageHttp(String),

    #[error("storage returned status {status}: {message}")]
    StorageStatus { status: u16, message: String },

    #[error("unexpected storage response: {0}")]
    StorageResponse(String),

    #[error("not all files uploaded: only {uploaded}/{expected} files landed")]
    Incomplete { uploaded: u64, expected: u64 },

    #[error("number of images ({images}) is not equal to number of metadata files ({metadata})")]
    PairingMismatch { images: usize, metadata: usize },

    #[error("failed to read metadata file {path}: {message}")]
    MetadataRead { path: String, message: String },

    #[error("failed to parse metadata file {path}: {message}")]
    MetadataParse { path: String, message: String },

    #[error("failed to write metadata file {path}: {message}")]
    MetadataWrite { path: String, message: String },

    #[error("metadata file {0} is not a JSON object")]
    InvalidMetadata(String),

    #[error("failed to read metadata CSV {path}: {message}")]
    CsvRead { path: String, message: String },

    #[error("metadata CSV {0} needs at least the name, description and image columns")]
    MissingCsvHeader(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
