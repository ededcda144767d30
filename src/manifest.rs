//! Installed-file manifests.
//!
//! Directory structure: `<manifest_root>/<name>/files`, one installed path
//! per line.

use anyhow::Result;
use log::{debug, warn};
use std::path::PathBuf;

use crate::runtime::Runtime;

pub const MANIFEST_FILE: &str = "files";

pub struct FileManifestReader<'a, R: Runtime> {
    runtime: &'a R,
    manifest_root: PathBuf,
}

impl<'a, R: Runtime> FileManifestReader<'a, R> {
    pub fn new(runtime: &'a R, manifest_root: PathBuf) -> Self {
        Self {
            runtime,
            manifest_root,
        }
    }

    /// Path of the manifest for `name`.
    ///
    /// Returns `None` for names that would escape the manifest root.
    pub fn manifest_path(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return None;
        }
        Some(self.manifest_root.join(name).join(MANIFEST_FILE))
    }

    /// Non-empty lines of the manifest for `name`.
    ///
    /// A missing manifest is not an error and yields an empty list. Paths
    /// that are not valid UTF-8 are kept, with the offending bytes replaced.
    pub fn read_manifest(&self, name: &str) -> Result<Vec<String>> {
        let Some(path) = self.manifest_path(name) else {
            warn!("Refusing to read manifest for package name {:?}", name);
            return Ok(vec![]);
        };

        if !self.runtime.exists(&path) {
            debug!("No manifest at {:?}", path);
            return Ok(vec![]);
        }

        let content = self.runtime.read(&path)?;
        Ok(content
            .split(|&b| b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use mockall::predicate::eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_manifest_path() {
        let runtime = MockRuntime::new();
        let reader = FileManifestReader::new(&runtime, PathBuf::from("/var/lib/pkg/DB"));

        assert_eq!(
            reader.manifest_path("foo"),
            Some(PathBuf::from("/var/lib/pkg/DB/foo/files"))
        );
    }

    #[test]
    fn test_manifest_path_rejects_traversal() {
        let runtime = MockRuntime::new();
        let reader = FileManifestReader::new(&runtime, PathBuf::from("/db"));

        assert_eq!(reader.manifest_path(".."), None);
        assert_eq!(reader.manifest_path("."), None);
        assert_eq!(reader.manifest_path(""), None);
        assert_eq!(reader.manifest_path("../etc"), None);
    }

    #[test]
    fn test_read_manifest_drops_blank_lines() {
        let mut runtime = MockRuntime::new();
        let path = PathBuf::from("/db/foo/files");

        runtime
            .expect_exists()
            .with(eq(path.clone()))
            .returning(|_| true);
        runtime
            .expect_read()
            .with(eq(path))
            .returning(|_| Ok("/usr/bin/foo\n\n/usr/share/foo/data\n".into()));

        let reader = FileManifestReader::new(&runtime, PathBuf::from("/db"));
        let files = reader.read_manifest("foo").unwrap();

        assert_eq!(files, vec!["/usr/bin/foo", "/usr/share/foo/data"]);
    }

    #[test]
    fn test_read_manifest_keeps_duplicates() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read()
            .returning(|_| Ok("/usr/bin/foo\n/usr/bin/foo".into()));

        let reader = FileManifestReader::new(&runtime, PathBuf::from("/db"));
        assert_eq!(reader.read_manifest("foo").unwrap().len(), 2);
    }

    #[test]
    fn test_read_manifest_keeps_lines_with_invalid_utf8() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime.expect_read().returning(|_| {
            Ok(b"/usr/bin/foo\n/usr/share/caf\xE9\n/usr/share/foo\n".to_vec())
        });

        let reader = FileManifestReader::new(&runtime, PathBuf::from("/db"));
        let files = reader.read_manifest("foo").unwrap();

        assert_eq!(
            files,
            vec!["/usr/bin/foo", "/usr/share/caf\u{FFFD}", "/usr/share/foo"]
        );
    }

    #[test_log::test]
    fn test_read_manifest_missing_is_empty() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(PathBuf::from("/db/ghost/files")))
            .returning(|_| false);
        runtime.expect_read().never();

        let reader = FileManifestReader::new(&runtime, PathBuf::from("/db"));
        assert!(reader.read_manifest("ghost").unwrap().is_empty());
    }

    #[test]
    fn test_read_manifest_from_disk() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("foo")).unwrap();
        fs::write(
            dir.path().join("foo/files"),
            "usr/\nusr/bin/\r\nusr/bin/foo\n\n",
        )
        .unwrap();

        let reader = FileManifestReader::new(&RealRuntime, dir.path().to_path_buf());
        let files = reader.read_manifest("foo").unwrap();

        assert_eq!(files, vec!["usr/", "usr/bin/", "usr/bin/foo"]);
    }
}
