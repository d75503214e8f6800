use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::domain::{CollectionName, ContentId, UploadResult, UploadTarget};
use crate::error::UploadError;
use crate::patcher::MetadataPatcher;
use crate::seed::seed_metadata;
use crate::storage::StorageClient;
use crate::uploader::{ChunkedUploader, verify_complete};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Seed,
    Prepare,
    UploadImages,
    Patch,
    UploadMetadata,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Seed => "Seed",
            Phase::Prepare => "Prepare",
            Phase::UploadImages => "Upload images",
            Phase::Patch => "Patch",
            Phase::UploadMetadata => "Upload metadata",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Phase {
        phase: Phase,
        message: String,
    },
    SeedStarted {
        records: usize,
    },
    UploadStarted {
        label: String,
        file_count: usize,
        batch_count: usize,
    },
    BatchCompleted {
        label: String,
        completed: usize,
        batch_count: usize,
    },
    UploadFinished {
        label: String,
        content_id: ContentId,
        block_count: u64,
    },
    PatchStarted {
        total: usize,
    },
    RecordPatched {
        completed: usize,
        total: usize,
        filename: String,
    },
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub collection: String,
    pub seeded_records: Option<usize>,
    pub images: UploadResult,
    pub patched_records: usize,
    pub metadata: UploadResult,
    pub completed_at: String,
}

/// Runs the upload-patch-upload sequence against an injected storage client.
pub struct Pipeline<S: StorageClient> {
    storage: S,
    config: ResolvedConfig,
}

impl<S: StorageClient> Pipeline<S> {
    pub fn new(storage: S, config: ResolvedConfig) -> Self {
        Self { storage, config }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn run(
        &self,
        collection: &CollectionName,
        sink: &dyn ProgressSink,
    ) -> Result<PipelineResult, UploadError> {
        let seeded_records = self.seed(sink)?;

        phase(sink, Phase::Prepare, format!("creating /{collection} in storage"));
        let root = collection.root();
        let images_remote = root.join("images");
        let metadata_remote = root.join("metadata");
        self.storage.make_directory(&root)?;
        self.storage.make_directory(&images_remote)?;
        self.storage.make_directory(&metadata_remote)?;

        let uploader = ChunkedUploader::with_chunk_size(&self.storage, self.config.chunk_size);

        phase(sink, Phase::UploadImages, format!("uploading {}", self.config.images_dir));
        let images_target = UploadTarget::new(self.config.images_dir.clone(), images_remote);
        let images = uploader.upload(&images_target, sink)?;
        verify_complete(&images, images.uploaded_filenames.len())?;
        tracing::info!(folder = %images_target.remote_dir, cid = %images.content_id, "images uploaded");

        phase(sink, Phase::Patch, format!("updating image URIs in {}", self.config.metadata_dir));
        let patcher = MetadataPatcher::new(self.config.uri_scheme.clone());
        let patch = patcher.patch(&images, &self.config.metadata_dir, sink)?;

        phase(sink, Phase::UploadMetadata, format!("uploading {}", self.config.metadata_dir));
        let metadata_target = UploadTarget::new(self.config.metadata_dir.clone(), metadata_remote);
        let metadata = uploader.upload(&metadata_target, sink)?;
        verify_complete(&metadata, metadata.uploaded_filenames.len())?;
        tracing::info!(folder = %metadata_target.remote_dir, cid = %metadata.content_id, "metadata uploaded");

        Ok(PipelineResult {
            collection: collection.to_string(),
            seeded_records,
            images,
            patched_records: patch.patched,
            metadata,
            completed_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    fn seed(&self, sink: &dyn ProgressSink) -> Result<Option<usize>, UploadError> {
        let csv = &self.config.metadata_csv;
        if !csv.as_std_path().exists() {
            tracing::info!(csv = %csv, "no metadata CSV found, using existing metadata files");
            return Ok(None);
        }
        phase(sink, Phase::Seed, format!("generating {} from {csv}", self.config.metadata_dir));
        let report = seed_metadata(csv, &self.config.metadata_dir, sink)?;
        Ok(Some(report.records))
    }
}

fn phase(sink: &dyn ProgressSink, phase: Phase, message: String) {
    tracing::info!(phase = phase.label(), "{message}");
    sink.event(ProgressEvent::Phase { phase, message });
}
