use std::path::Path;

use tempfile::NamedTempFile;

/// Suffix of the scratch container written by the converter
pub const SCRATCH_SUFFIX: &str = ".tif";

/// Temporary TIFF the converter overwrites on every run.
///
/// The file is removed when the value is dropped.
#[derive(Debug)]
pub struct ScratchFile {
    file: NamedTempFile,
}

impl ScratchFile {
    pub fn new() -> std::io::Result<Self> {
        let file = NamedTempFile::with_suffix(SCRATCH_SUFFIX)?;
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Current size on disk, 0 until the converter has written to it
    pub fn len(&self) -> std::io::Result<u64> {
        Ok(std::fs::metadata(self.path())?.len())
    }

    pub fn is_empty(&self) -> std::io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_file_lifecycle() {
        let scratch = ScratchFile::new().unwrap();
        let path = scratch.path().to_path_buf();

        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("tif"));
        assert!(scratch.is_empty().unwrap());

        drop(scratch);
        assert!(!path.exists());
    }

    #[test]
    fn test_scratch_files_are_distinct() {
        let a = ScratchFile::new().unwrap();
        let b = ScratchFile::new().unwrap();
        assert_ne!(a.path(), b.path());
    }
}
