use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use camino::Utf8PathBuf;

use ipfs_collection_uploader::app::{ProgressEvent, ProgressSink};
use ipfs_collection_uploader::domain::{ContentId, DirectoryStat, RemotePath};
use ipfs_collection_uploader::error::UploadError;
use ipfs_collection_uploader::storage::StorageClient;

/// In-memory storage that records writes and the peak number of concurrent
/// writes.
#[allow(dead_code)]
#[derive(Default)]
pub struct MemoryStorage {
    pub directories: Mutex<BTreeSet<String>>,
    pub files: Mutex<BTreeMap<String, Vec<u8>>>,
    pub write_log: Mutex<Vec<String>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub fail_on: Option<String>,
    pub missing_blocks: u64,
    pub write_delay: Option<Duration>,
}

#[allow(dead_code)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing_directory(self, path: &str) -> Self {
        self.directories.lock().unwrap().insert(path.to_string());
        self
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.write_log.lock().unwrap().len()
    }

    pub fn cid_for(path: &str) -> ContentId {
        ContentId::new(format!("bafy{}", path.replace('/', "-")))
    }
}

impl StorageClient for MemoryStorage {
    fn make_directory(&self, path: &RemotePath) -> Result<(), UploadError> {
        let mut directories = self.directories.lock().unwrap();
        if !directories.insert(path.to_string()) {
            return Err(UploadError::DirectoryExists(path.to_string()));
        }
        Ok(())
    }

    fn write_file(&self, path: &RemotePath, contents: Vec<u8>) -> Result<(), UploadError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.write_delay {
            thread::sleep(delay);
        }
        self.write_log.lock().unwrap().push(path.to_string());
        let outcome = if self.fail_on.as_deref() == Some(path.as_str()) {
            Err(UploadError::StorageStatus {
                status: 500,
                message: format!("cannot write {path}"),
            })
        } else {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_string(), contents);
            Ok(())
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    fn stat_directory(&self, path: &RemotePath) -> Result<DirectoryStat, UploadError> {
        let prefix = format!("{path}/");
        let blocks = self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .count() as u64;
        Ok(DirectoryStat {
            content_id: Self::cid_for(path.as_str()),
            block_count: blocks.saturating_sub(self.missing_blocks),
        })
    }
}

#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<ProgressEvent>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn batch_ticks(&self, label: &str) -> Vec<usize> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                ProgressEvent::BatchCompleted {
                    label: event_label,
                    completed,
                    ..
                } if event_label == label => Some(*completed),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[allow(dead_code)]
pub fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

/// Creates `dir` holding `count` files named by `name`.
#[allow(dead_code)]
pub fn write_files(dir: &Utf8PathBuf, count: usize, name: impl Fn(usize) -> String) {
    std::fs::create_dir_all(dir).unwrap();
    for index in 0..count {
        let filename = name(index);
        std::fs::write(dir.join(&filename), filename.as_bytes()).unwrap();
    }
}

#[allow(dead_code)]
pub fn write_record(path: &Utf8PathBuf, name: &str) {
    let record = serde_json::json!({
        "name": name,
        "description": "test record",
        "image": "placeholder.png",
        "attributes": [{ "trait_type": "Background", "value": "Blue" }],
    });
    std::fs::write(path, serde_json::to_vec(&record).unwrap()).unwrap();
}
