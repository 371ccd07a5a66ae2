//! The scratch source/binary pair reused by every case.

use std::path::{Path, PathBuf};

use crate::ProbeError;

pub const SOURCE_FILE: &str = "cxxprobe_feature.cc";
pub const BINARY_STEM: &str = "cxxprobe_feature";

/// Fixed-name scratch files inside one directory. Overwritten once per case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scratch {
    dir: PathBuf,
    source: PathBuf,
    binary: PathBuf,
}

impl Scratch {
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        let binary_name = format!("{BINARY_STEM}{}", std::env::consts::EXE_SUFFIX);
        Self {
            dir: dir.to_path_buf(),
            source: dir.join(SOURCE_FILE),
            // Always contains a separator, so executing it never searches PATH.
            binary: dir.join(binary_name),
        }
    }

    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source
    }

    #[must_use]
    pub fn binary_path(&self) -> &Path {
        &self.binary
    }

    /// Overwrite the scratch source with `source`, creating the directory if needed.
    pub fn write_source(&self, source: &str) -> Result<(), ProbeError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| self.error(&self.dir, e))?;
        std::fs::write(&self.source, source).map_err(|e| self.error(&self.source, e))
    }

    /// Delete the scratch binary so a failed compile cannot leave a stale one behind.
    pub fn clear_binary(&self) -> Result<(), ProbeError> {
        remove_if_present(&self.binary).map_err(|e| self.error(&self.binary, e))
    }

    /// Delete both scratch files.
    pub fn remove(&self) -> Result<(), ProbeError> {
        remove_if_present(&self.source).map_err(|e| self.error(&self.source, e))?;
        self.clear_binary()
    }

    fn error(&self, path: &Path, source: std::io::Error) -> ProbeError {
        ProbeError::Scratch {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn remove_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_live_in_scratch_dir() {
        let scratch = Scratch::in_dir(Path::new("."));
        assert_eq!(scratch.source_path(), Path::new("./cxxprobe_feature.cc"));
        assert!(
            scratch
                .binary_path()
                .to_string_lossy()
                .starts_with("./cxxprobe_feature")
        );
    }

    #[test]
    fn write_creates_directory_and_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = Scratch::in_dir(&tmp.path().join("nested"));
        scratch.write_source("int main() { return 1; }").unwrap();
        scratch.write_source("int main() { return 0; }").unwrap();
        let body = std::fs::read_to_string(scratch.source_path()).unwrap();
        assert_eq!(body, "int main() { return 0; }");
    }

    #[test]
    fn clear_binary_tolerates_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = Scratch::in_dir(tmp.path());
        scratch.clear_binary().unwrap();

        std::fs::write(scratch.binary_path(), b"stale").unwrap();
        scratch.clear_binary().unwrap();
        assert!(!scratch.binary_path().exists());
    }

    #[test]
    fn remove_deletes_both_files() {
        let tmp = tempfile::tempdir().unwrap();
        let scratch = Scratch::in_dir(tmp.path());
        scratch.write_source("int main() {}").unwrap();
        std::fs::write(scratch.binary_path(), b"bin").unwrap();
        scratch.remove().unwrap();
        assert!(!scratch.source_path().exists());
        assert!(!scratch.binary_path().exists());
    }
}
