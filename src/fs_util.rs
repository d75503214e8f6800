use std::fs;
use std::io::Write;

use camino::Utf8Path;

use crate::error::UploadError;

/// Names of the regular files directly inside `dir`, sorted ascending.
///
/// Dot-files and sub-directories are skipped. The sort order is the pairing
/// key between the image and metadata directories, so it must not depend on
/// the order the filesystem returns entries in.
pub fn list_files_sorted(dir: &Utf8Path) -> Result<Vec<String>, UploadError> {
    let entries = dir
        .read_dir_utf8()
        .map_err(|err| UploadError::Filesystem(format!("read dir {dir}: {err}")))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| UploadError::Filesystem(format!("read dir {dir}: {err}")))?;
        let file_type = entry
            .file_type()
            .map_err(|err| UploadError::Filesystem(format!("stat {}: {err}", entry.path())))?;
        if !file_type.is_file() || entry.file_name().starts_with('.') {
            continue;
        }
        names.push(entry.file_name().to_string());
    }
    names.sort();
    Ok(names)
}

/// Replaces `path` with `content` through a temp file in the same directory.
pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), UploadError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    let mut temp = tempfile::Builder::new()
        .prefix(".ipfs-upload")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| UploadError::Filesystem(err.to_string()))?;
    temp.write_all(content)
        .map_err(|err| UploadError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| UploadError::Filesystem(err.to_string()))?;
    Ok(())
}

/// Creates `dir`, or empties the regular files of an existing one.
pub fn reset_dir(dir: &Utf8Path) -> Result<(), UploadError> {
    if !dir.as_std_path().exists() {
        return fs::create_dir_all(dir.as_std_path())
            .map_err(|err| UploadError::Filesystem(format!("create dir {dir}: {err}")));
    }
    for name in list_files_sorted(dir)? {
        let path = dir.join(&name);
        fs::remove_file(path.as_std_path())
            .map_err(|err| UploadError::Filesystem(format!("remove {path}: {err}")))?;
    }
    Ok(())
}
