use std::fs;
use std::thread;

use camino::Utf8Path;

use crate::app::{ProgressEvent, ProgressSink};
use crate::config::DEFAULT_CHUNK_SIZE;
use crate::domain::{RemotePath, UploadResult, UploadTarget};
use crate::error::UploadError;
use crate::fs_util::list_files_sorted;
use crate::storage::StorageClient;

/// Uploads a directory in sequential batches of concurrent writes.
pub struct ChunkedUploader<'a, S: StorageClient> {
    storage: &'a S,
    chunk_size: usize,
}

impl<'a, S: StorageClient> ChunkedUploader<'a, S> {
    pub fn new(storage: &'a S) -> Self {
        Self::with_chunk_size(storage, DEFAULT_CHUNK_SIZE)
    }

    /// A zero chunk size is treated as one.
    pub fn with_chunk_size(storage: &'a S, chunk_size: usize) -> Self {
        Self {
            storage,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn upload(
        &self,
        target: &UploadTarget,
        sink: &dyn ProgressSink,
    ) -> Result<UploadResult, UploadError> {
        let filenames = list_files_sorted(&target.local_dir)?;
        let batch_count = batch_count(filenames.len(), self.chunk_size);
        let label = target.remote_dir.to_string();

        tracing::info!(
            local = %target.local_dir,
            remote = %target.remote_dir,
            files = filenames.len(),
            first = filenames.first().map(String::as_str).unwrap_or("-"),
            "uploading directory"
        );
        sink.event(ProgressEvent::UploadStarted {
            label: label.clone(),
            file_count: filenames.len(),
            batch_count,
        });

        if filenames.is_empty() {
            sink.event(ProgressEvent::BatchCompleted {
                label: label.clone(),
                completed: 1,
                batch_count,
            });
        }

        for (index, batch) in filenames.chunks(self.chunk_size).enumerate() {
            self.upload_batch(&target.local_dir, &target.remote_dir, batch)?;
            tracing::debug!(batch = index + 1, of = batch_count, files = batch.len(), "batch uploaded");
            sink.event(ProgressEvent::BatchCompleted {
                label: label.clone(),
                completed: index + 1,
                batch_count,
            });
        }

        let stat = self.storage.stat_directory(&target.remote_dir)?;
        sink.event(ProgressEvent::UploadFinished {
            label,
            content_id: stat.content_id.clone(),
            block_count: stat.block_count,
        });

        Ok(UploadResult {
            content_id: stat.content_id,
            block_count: stat.block_count,
            uploaded_filenames: filenames,
        })
    }

    /// Writes every file of `batch` concurrently and returns once all of them
    /// have finished. The first failure in batch order wins.
    fn upload_batch(
        &self,
        local_dir: &Utf8Path,
        remote_dir: &RemotePath,
        batch: &[String],
    ) -> Result<(), UploadError> {
        thread::scope(|scope| {
            let handles = batch
                .iter()
                .map(|filename| {
                    scope.spawn(move || {
                        let local_path = local_dir.join(filename);
                        let contents = fs::read(local_path.as_std_path()).map_err(|err| {
                            UploadError::Filesystem(format!("read {local_path}: {err}"))
                        })?;
                        self.storage
                            .write_file(&remote_dir.join(filename), contents)
                    })
                })
                .collect::<Vec<_>>();

            let mut first_error = None;
            for handle in handles {
                let outcome = handle.join().unwrap_or_else(|_| {
                    Err(UploadError::StorageHttp("upload worker panicked".to_string()))
                });
                if let Err(err) = outcome {
                    first_error.get_or_insert(err);
                }
            }
            first_error.map_or(Ok(()), Err)
        })
    }
}

/// Number of progress ticks for `file_count` files, never less than one.
pub fn batch_count(file_count: usize, chunk_size: usize) -> usize {
    file_count.div_ceil(chunk_size.max(1)).max(1)
}

pub fn verify_complete(result: &UploadResult, expected: usize) -> Result<(), UploadError> {
    let expected = expected as u64;
    if result.block_count != expected {
        tracing::error!(
            content_id = %result.content_id,
            uploaded = result.block_count,
            expected,
            "upload incomplete"
        );
        return Err(UploadError::Incomplete {
            uploaded: result.block_count,
            expected,
        });
    }
    Ok(())
}
