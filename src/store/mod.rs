//! Read-only access to the package metadata store.
//!
//! The [`MetadataStore`] trait is the seam between the resolver and whatever
//! package database backs it. [`PackageDatabase`] is the adapter over the
//! on-disk installed database.

mod database;

pub use database::{META_FILE, PackageDatabase};

/// Field lookups over the set of known packages.
///
/// Lookups are only defined for names returned by
/// [`list_package_names`](MetadataStore::list_package_names).
#[cfg_attr(test, mockall::automock)]
pub trait MetadataStore: Send + Sync {
    fn list_package_names(&self) -> Vec<String>;
    fn version(&self, name: &str) -> String;
    fn architecture(&self, name: &str) -> String;
    fn collection(&self, name: &str) -> String;
    fn description(&self, name: &str) -> String;
}
