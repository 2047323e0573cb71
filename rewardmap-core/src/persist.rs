//! Fail-closed file writes.
//!
//! Every artifact is written to a `.partial` sibling first and renamed into
//! place once complete, so a failed write never leaves a truncated file
//! under the final name.

use crate::error::CoreError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Sibling path used while `path` is being written.
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    path.with_file_name(name)
}

/// Writes `contents` to `path` through a staging file.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), CoreError> {
    let staging = staging_path(path);
    let result = (|| {
        let mut file = fs::File::create(&staging)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&staging, path)
    })();

    if let Err(source) = result {
        let _ = fs::remove_file(&staging);
        return Err(CoreError::io(path, source));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_path_keeps_directory() {
        let staged = staging_path(Path::new("/data/run/rewardlocations.csv"));
        assert_eq!(staged, Path::new("/data/run/rewardlocations.csv.partial"));
    }

    #[test]
    fn write_atomic_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.csv");
        write_atomic(&target, b"a,b\n").unwrap();

        assert_eq!(fs::read(&target).unwrap(), b"a,b\n");
        assert!(!staging_path(&target).exists());
    }

    #[test]
    fn write_atomic_into_missing_folder_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing").join("out.csv");
        let err = write_atomic(&target, b"x").unwrap_err();

        assert!(matches!(err, CoreError::Io { .. }));
        assert!(!target.exists());
    }
}
