use std::fs;

use camino::Utf8Path;
use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink};
use crate::domain::{Attribute, MetadataRecord};
use crate::error::UploadError;
use crate::fs_util::{reset_dir, write_bytes_atomic};

#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    pub records: usize,
}

/// Regenerates `metadata_dir` from the metadata CSV.
///
/// The header row is `name,description,image,<trait>...`; data row `i`
/// (1-based) becomes `<i>.json`. Cells are split on `,` without quoting.
pub fn seed_metadata(
    csv_path: &Utf8Path,
    metadata_dir: &Utf8Path,
    sink: &dyn ProgressSink,
) -> Result<SeedReport, UploadError> {
    let content = fs::read_to_string(csv_path.as_std_path()).map_err(|err| UploadError::CsvRead {
        path: csv_path.to_string(),
        message: err.to_string(),
    })?;
    let records = parse_records(csv_path, &content)?;

    sink.event(ProgressEvent::SeedStarted {
        records: records.len(),
    });
    reset_dir(metadata_dir)?;

    for (index, record) in records.iter().enumerate() {
        let path = metadata_dir.join(format!("{}.json", index + 1));
        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|err| UploadError::Filesystem(err.to_string()))?;
        write_bytes_atomic(&path, &bytes)?;
    }

    tracing::info!(csv = %csv_path, records = records.len(), dir = %metadata_dir, "seeded metadata");
    Ok(SeedReport {
        records: records.len(),
    })
}

pub fn parse_records(csv_path: &Utf8Path, content: &str) -> Result<Vec<MetadataRecord>, UploadError> {
    let mut lines = content.lines().map(|line| line.trim_end_matches('\r'));
    let header = lines.next().map(split_row).unwrap_or_default();
    if header.len() < 3 {
        return Err(UploadError::MissingCsvHeader(csv_path.to_string()));
    }
    let traits = &header[3..];

    let records = lines
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let cells = split_row(line);
            let cell = |index: usize| cells.get(index).cloned().unwrap_or_default();
            MetadataRecord {
                name: cell(0),
                description: cell(1),
                image: cell(2),
                attributes: traits
                    .iter()
                    .enumerate()
                    .map(|(offset, trait_type)| Attribute {
                        trait_type: trait_type.clone(),
                        value: cell(3 + offset),
                    })
                    .collect(),
            }
        })
        .collect();
    Ok(records)
}

fn split_row(line: &str) -> Vec<String> {
    line.split(',').map(str::to_string).collect()
}
