use anyhow::Result;
use std::path::Path;

use crate::runtime::Runtime;

/// Fields of one installed package, as stored in its `META` entry.
///
/// Each line of the entry starts with a one-character tag followed by the
/// value. Only the tags below are used; everything else is ignored.
///
/// | Tag | Field        |
/// |-----|--------------|
/// | `V` | version      |
/// | `r` | release      |
/// | `a` | architecture |
/// | `c` | collection   |
/// | `D` | description  |
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Meta {
    pub version: String,
    pub release: String,
    pub architecture: String,
    pub collection: String,
    pub description: String,
}

impl Meta {
    /// Read and parse the entry at `path`.
    ///
    /// Bytes that are not valid UTF-8 are replaced rather than rejected.
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        let content = runtime.read(path)?;
        Ok(Meta::parse(&String::from_utf8_lossy(&content)))
    }

    pub fn parse(content: &str) -> Self {
        let mut meta = Meta::default();

        for line in content.lines() {
            let mut chars = line.chars();
            let Some(tag) = chars.next() else {
                continue;
            };
            let value = chars.as_str().to_string();
            match tag {
                'V' => meta.version = value,
                'r' => meta.release = value,
                'a' => meta.architecture = value,
                'c' => meta.collection = value,
                'D' => meta.description = value,
                _ => {}
            }
        }

        meta
    }

    /// Version string reported for the package: `version-release`, or just
    /// `version` when no release is recorded.
    pub fn full_version(&self) -> String {
        if self.release.is_empty() {
            self.version.clone()
        } else {
            format!("{}-{}", self.version, self.release)
        }
    }
}
