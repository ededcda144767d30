use anyhow::{Result, bail};
use log::{debug, warn};
use std::collections::BTreeMap;
use std::path::Path;

use super::MetadataStore;
use crate::package::Meta;
use crate::runtime::Runtime;

pub const META_FILE: &str = "META";

/// In-memory snapshot of the installed package database.
///
/// Directory structure: `<root>/<name>/META`
#[derive(Debug, Clone, Default)]
pub struct PackageDatabase {
    packages: BTreeMap<String, Meta>,
}

impl PackageDatabase {
    /// Load every package entry found under `root`.
    ///
    /// Directories without a META entry are skipped, unreadable entries are
    /// skipped with a warning. Fails only when `root` itself is not a directory.
    #[tracing::instrument(skip(runtime, root))]
    pub fn load<R: Runtime>(runtime: &R, root: &Path) -> Result<Self> {
        if !runtime.is_dir(root) {
            bail!("Package database {} is not a directory", root.display());
        }

        let mut packages = BTreeMap::new();
        for entry in runtime.read_dir(root)? {
            if !runtime.is_dir(&entry) {
                continue;
            }
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            let meta_path = entry.join(META_FILE);
            if !runtime.exists(&meta_path) {
                debug!("Skipping {:?}: no {} entry", entry, META_FILE);
                continue;
            }

            match Meta::load(runtime, &meta_path) {
                Ok(meta) => {
                    packages.insert(name.to_string(), meta);
                }
                Err(e) => {
                    warn!("Failed to load metadata from {:?}: {}", meta_path, e);
                }
            }
        }

        debug!("Loaded {} package(s) from {:?}", packages.len(), root);
        Ok(Self { packages })
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Meta)>,
    {
        Self {
            packages: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    fn field(&self, name: &str, pick: impl Fn(&Meta) -> String) -> String {
        self.packages.get(name).map(pick).unwrap_or_default()
    }
}

impl MetadataStore for PackageDatabase {
    fn list_package_names(&self) -> Vec<String> {
        self.packages.keys().cloned().collect()
    }

    fn version(&self, name: &str) -> String {
        self.field(name, Meta::full_version)
    }

    fn architecture(&self, name: &str) -> String {
        self.field(name, |m| m.architecture.clone())
    }

    fn collection(&self, name: &str) -> String {
        self.field(name, |m| m.collection.clone())
    }

    fn description(&self, name: &str) -> String {
        self.field(name, |m| m.description.clone())
    }
}
