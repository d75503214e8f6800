mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use assert_matches::assert_matches;

use common::{MemoryStorage, RecordingSink, temp_root, write_files};
use ipfs_collection_uploader::domain::{RemotePath, UploadTarget};
use ipfs_collection_uploader::error::UploadError;
use ipfs_collection_uploader::uploader::{ChunkedUploader, verify_complete};

fn remote() -> RemotePath {
    RemotePath::root().join("apes").join("images")
}

#[test]
fn small_directories_tick_exactly_once() {
    for count in [1, 7, 100] {
        let (_temp, root) = temp_root();
        let images = root.join("images");
        write_files(&images, count, |i| format!("{i:04}.png"));
        let storage = MemoryStorage::new();
        let sink = RecordingSink::default();

        let result = ChunkedUploader::new(&storage)
            .upload(&UploadTarget::new(images, remote()), &sink)
            .unwrap();

        assert_eq!(sink.batch_ticks("/apes/images"), vec![1], "count={count}");
        assert_eq!(result.block_count, count as u64);
    }
}

#[test]
fn empty_directory_still_ticks_once() {
    let (_temp, root) = temp_root();
    let images = root.join("images");
    std::fs::create_dir_all(&images).unwrap();
    let storage = MemoryStorage::new();
    let sink = RecordingSink::default();

    let result = ChunkedUploader::new(&storage)
        .upload(&UploadTarget::new(images, remote()), &sink)
        .unwrap();

    assert_eq!(sink.batch_ticks("/apes/images"), vec![1]);
    assert!(result.uploaded_filenames.is_empty());
    assert_eq!(storage.write_count(), 0);
}

#[test]
fn large_directories_tick_once_per_batch() {
    let (_temp, root) = temp_root();
    let images = root.join("images");
    write_files(&images, 250, |i| format!("{i:04}.png"));
    let storage = MemoryStorage::new();
    let sink = RecordingSink::default();

    let result = ChunkedUploader::new(&storage)
        .upload(&UploadTarget::new(images, remote()), &sink)
        .unwrap();

    assert_eq!(sink.batch_ticks("/apes/images"), vec![1, 2, 3]);
    assert_eq!(result.uploaded_filenames.len(), 250);
    assert_eq!(result.block_count, 250);
    assert_eq!(
        result.content_id,
        MemoryStorage::cid_for("/apes/images")
    );
    assert_eq!(
        storage.file("/apes/images/0249.png").as_deref(),
        Some(b"0249.png".as_slice())
    );
}

#[test]
fn filenames_are_returned_sorted() {
    let (_temp, root) = temp_root();
    let images = root.join("images");
    for name in ["c.png", "a.png", "b.png"] {
        write_files(&images, 1, |_| name.to_string());
    }
    let storage = MemoryStorage::new();

    let result = ChunkedUploader::new(&storage)
        .upload(&UploadTarget::new(images, remote()), &RecordingSink::default())
        .unwrap();

    assert_eq!(result.uploaded_filenames, vec!["a.png", "b.png", "c.png"]);
}

#[test]
fn concurrency_is_bounded_by_chunk_size() {
    let (_temp, root) = temp_root();
    let images = root.join("images");
    write_files(&images, 12, |i| format!("{i:02}.png"));
    let storage = MemoryStorage {
        write_delay: Some(Duration::from_millis(20)),
        ..MemoryStorage::default()
    };

    ChunkedUploader::with_chunk_size(&storage, 4)
        .upload(&UploadTarget::new(images, remote()), &RecordingSink::default())
        .unwrap();

    let peak = storage.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 4, "peak in-flight writes was {peak}");
    assert_eq!(storage.write_count(), 12);
}

#[test]
fn failed_write_stops_later_batches() {
    let (_temp, root) = temp_root();
    let images = root.join("images");
    write_files(&images, 10, |i| format!("{i:02}.png"));
    let storage = MemoryStorage {
        fail_on: Some("/apes/images/01.png".to_string()),
        ..MemoryStorage::default()
    };
    let sink = RecordingSink::default();

    let err = ChunkedUploader::with_chunk_size(&storage, 4)
        .upload(&UploadTarget::new(images, remote()), &sink)
        .unwrap_err();

    assert_matches!(err, UploadError::StorageStatus { status: 500, .. });
    assert_eq!(storage.write_count(), 4);
    assert!(sink.batch_ticks("/apes/images").is_empty());
}

#[test]
fn short_block_count_fails_verification() {
    let (_temp, root) = temp_root();
    let images = root.join("images");
    write_files(&images, 5, |i| format!("{i}.png"));
    let storage = MemoryStorage {
        missing_blocks: 2,
        ..MemoryStorage::default()
    };

    let result = ChunkedUploader::new(&storage)
        .upload(&UploadTarget::new(images, remote()), &RecordingSink::default())
        .unwrap();
    let err = verify_complete(&result, result.uploaded_filenames.len()).unwrap_err();

    assert_matches!(
        err,
        UploadError::Incomplete {
            uploaded: 3,
            expected: 5
        }
    );
}
