use std::fs;

use camino::Utf8Path;
use serde::Serialize;
use serde_json::Value;

use crate::app::{ProgressEvent, ProgressSink};
use crate::config::DEFAULT_URI_SCHEME;
use crate::domain::{UploadResult, content_uri};
use crate::error::UploadError;
use crate::fs_util::{list_files_sorted, write_bytes_atomic};

#[derive(Debug, Clone, Serialize)]
pub struct PatchReport {
    pub patched: usize,
}

/// Rewrites the `image` field of each metadata record to the content URI of
/// the image at the same sorted position.
pub struct MetadataPatcher {
    scheme: String,
}

impl Default for MetadataPatcher {
    fn default() -> Self {
        Self::new(DEFAULT_URI_SCHEME)
    }
}

impl MetadataPatcher {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
        }
    }

    pub fn patch(
        &self,
        images: &UploadResult,
        metadata_dir: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<PatchReport, UploadError> {
        let mut image_names = images.uploaded_filenames.clone();
        image_names.sort();
        let metadata_names = list_files_sorted(metadata_dir)?;

        if image_names.len() != metadata_names.len() {
            return Err(UploadError::PairingMismatch {
                images: image_names.len(),
                metadata: metadata_names.len(),
            });
        }
        if numeric_order_diverges(&metadata_names) {
            tracing::warn!(
                dir = %metadata_dir,
                "metadata file names are numeric but sort lexicographically; images are paired by sorted position"
            );
        }

        tracing::info!(records = metadata_names.len(), content_id = %images.content_id, "updating metadata image URIs");
        sink.event(ProgressEvent::PatchStarted {
            total: metadata_names.len(),
        });

        let total = metadata_names.len();
        for (index, (image_name, metadata_name)) in
            image_names.iter().zip(&metadata_names).enumerate()
        {
            let path = metadata_dir.join(metadata_name);
            let uri = content_uri(&self.scheme, &images.content_id, image_name);
            patch_record(&path, &uri)?;
            sink.event(ProgressEvent::RecordPatched {
                completed: index + 1,
                total,
                filename: metadata_name.clone(),
            });
        }

        Ok(PatchReport { patched: total })
    }
}

fn patch_record(path: &Utf8Path, uri: &str) -> Result<(), UploadError> {
    let content = fs::read(path.as_std_path()).map_err(|err| UploadError::MetadataRead {
        path: path.to_string(),
        message: err.to_string(),
    })?;
    let mut record: Value =
        serde_json::from_slice(&content).map_err(|err| UploadError::MetadataParse {
            path: path.to_string(),
            message: err.to_string(),
        })?;
    let Some(object) = record.as_object_mut() else {
        return Err(UploadError::InvalidMetadata(path.to_string()));
    };
    object.insert("image".to_string(), Value::String(uri.to_string()));

    let bytes = serde_json::to_vec_pretty(&record).map_err(|err| UploadError::MetadataWrite {
        path: path.to_string(),
        message: err.to_string(),
    })?;
    write_bytes_atomic(path, &bytes).map_err(|err| UploadError::MetadataWrite {
        path: path.to_string(),
        message: err.to_string(),
    })
}

/// True when every stem is an integer and lexicographic order differs from
/// numeric order, e.g. `10.json` sorting before `2.json`.
fn numeric_order_diverges(sorted_names: &[String]) -> bool {
    let numbers = sorted_names
        .iter()
        .map(|name| {
            let stem = name.split_once('.').map_or(name.as_str(), |(stem, _)| stem);
            stem.parse::<u64>().ok()
        })
        .collect::<Option<Vec<_>>>();
    match numbers {
        Some(numbers) => numbers.windows(2).any(|pair| pair[0] > pair[1]),
        None => false,
    }
}
