//! Resolution of query tokens against the known packages.
//!
//! A token matches a package when it is a case-insensitive substring of one
//! of the package's fields, checked in the order collection, name,
//! description, version. The first field that contains the token decides;
//! the remaining fields are not looked up.

use log::debug;
use std::collections::BTreeMap;
use std::collections::btree_map;

use crate::job::CancellationToken;
use crate::package::PackageRecord;
use crate::store::MetadataStore;

/// Field through which a token matched a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedField {
    Collection,
    Name,
    Description,
    Version,
}

/// Resolved packages keyed by name.
///
/// Inserting a record whose name is already present replaces the previous
/// record. Iteration is in ascending name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    records: BTreeMap<String, PackageRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: PackageRecord) {
        self.records.insert(record.name.clone(), record);
    }

    /// Move every record of `other` into this set, overwriting by name.
    pub fn merge(&mut self, other: ResultSet) {
        self.records.extend(other.records);
    }

    pub fn get(&self, name: &str) -> Option<&PackageRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> btree_map::Values<'_, String, PackageRecord> {
        self.records.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.records.keys().map(String::as_str).collect()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a PackageRecord;
    type IntoIter = btree_map::Values<'a, String, PackageRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn normalize(s: &str) -> String {
    s.to_lowercase()
}

/// Find the first field of `name` containing `token`.
///
/// `token` must already be normalized with the same case mapping the
/// resolver uses.
pub fn match_field(store: &dyn MetadataStore, name: &str, token: &str) -> Option<MatchedField> {
    if normalize(&store.collection(name)).contains(token) {
        return Some(MatchedField::Collection);
    }
    if normalize(name).contains(token) {
        return Some(MatchedField::Name);
    }
    if normalize(&store.description(name)).contains(token) {
        return Some(MatchedField::Description);
    }
    if normalize(&store.version(name)).contains(token) {
        return Some(MatchedField::Version);
    }
    None
}

/// Match every token against every known name.
///
/// Stops as soon as `cancel` is observed, keeping what was found so far.
#[tracing::instrument(skip_all, fields(tokens = tokens.len(), names = names.len()))]
pub fn resolve<S: AsRef<str>>(
    tokens: &[S],
    names: &[String],
    store: &dyn MetadataStore,
    cancel: &CancellationToken,
) -> ResultSet {
    let mut result = ResultSet::new();

    for token in tokens {
        if cancel.is_cancelled() {
            break;
        }
        let needle = normalize(token.as_ref());

        for name in names {
            if cancel.is_cancelled() {
                debug!("Resolution cancelled with {} match(es)", result.len());
                return result;
            }
            if let Some(field) = match_field(store, name, &needle) {
                debug!("'{}' matched {} by {:?}", token.as_ref(), name, field);
                result.insert(PackageRecord::from_store(store, name));
            }
        }
    }

    result
}

/// Build a record for every known name.
#[tracing::instrument(skip_all, fields(names = names.len()))]
pub fn resolve_all(
    names: &[String],
    store: &dyn MetadataStore,
    cancel: &CancellationToken,
) -> ResultSet {
    let mut result = ResultSet::new();

    for name in names {
        if cancel.is_cancelled() {
            debug!("Listing cancelled after {} package(s)", result.len());
            break;
        }
        result.insert(PackageRecord::from_store(store, name));
    }

    result
}
