//! File access shared by both stores.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreResult;

/// Map a file read-only.
pub fn map_file(path: &Path) -> StoreResult<Mmap> {
    let file = File::open(path)?;
    // SAFETY: the mapping is only read while decoding and is dropped before
    // this process writes to the same path.
    let map = unsafe { Mmap::map(&file)? };
    debug!(path = %path.display(), len = map.len(), "mapped file");
    Ok(map)
}

/// Bytes written and synced to a temporary file next to their target,
/// not yet visible at the target path.
#[derive(Debug)]
pub struct StagedFile {
    tmp: NamedTempFile,
    target: PathBuf,
    len: usize,
}

impl StagedFile {
    pub fn new(path: &Path, bytes: &[u8]) -> StoreResult<Self> {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        Ok(Self {
            tmp,
            target: path.to_path_buf(),
            len: bytes.len(),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Move the staged file over its target.
    pub fn persist(self) -> StoreResult<()> {
        self.tmp.persist(&self.target).map_err(|e| e.error)?;
        debug!(path = %self.target.display(), len = self.len, "wrote file");
        Ok(())
    }
}

/// Write `bytes` to a temporary file next to `path`, then move it into place.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    StagedFile::new(path, bytes)?.persist()
}

/// Stage every `(path, bytes)` pair before moving any into place. A
/// staging failure leaves all targets untouched.
pub fn write_all_atomic(files: &[(&Path, &[u8])]) -> StoreResult<()> {
    let staged = files
        .iter()
        .map(|(path, bytes)| StagedFile::new(path, bytes))
        .collect::<StoreResult<Vec<_>>>()?;
    for file in staged {
        file.persist()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_then_map() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(&map_file(&path).unwrap()[..], b"second");
        // only the target remains in the directory
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn staging_failure_touches_no_target() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.bin");
        write_atomic(&good, b"old").unwrap();
        let bad = dir.path().join("missing-dir").join("b.bin");
        assert!(write_all_atomic(&[(good.as_path(), &b"new"[..]), (bad.as_path(), &b"new"[..])]).is_err());
        assert_eq!(std::fs::read(&good).unwrap(), b"old");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        let other = dir.path().join("c.bin");
        write_all_atomic(&[(good.as_path(), &b"new"[..]), (other.as_path(), &b"c"[..])]).unwrap();
        assert_eq!(std::fs::read(&good).unwrap(), b"new");
        assert_eq!(std::fs::read(&other).unwrap(), b"c");
    }

    #[test]
    fn missing_file_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let err = map_file(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.class(), crate::ErrorClass::Io);
    }
}
