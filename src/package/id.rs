//! Wire package identifier shared with the host framework.

use anyhow::{Result, bail};
use std::fmt;
use std::str::FromStr;

use super::PackageRecord;

pub const ID_SEPARATOR: char = ';';

/// A parsed `name;version;architecture;collection` identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageId {
    pub name: String,
    pub version: String,
    pub architecture: String,
    pub collection: String,
}

impl From<&PackageRecord> for PackageId {
    fn from(record: &PackageRecord) -> Self {
        PackageId {
            name: record.name.clone(),
            version: record.version.clone(),
            architecture: record.architecture.clone(),
            collection: record.collection.clone(),
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}{sep}{}",
            self.name,
            self.version,
            self.architecture,
            self.collection,
            sep = ID_SEPARATOR
        )
    }
}

impl FromStr for PackageId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(ID_SEPARATOR).collect();
        if parts.len() != 4 {
            bail!(
                "Invalid package id '{}': expected 4 fields separated by '{}', found {}",
                s,
                ID_SEPARATOR,
                parts.len()
            );
        }
        if parts[0].is_empty() {
            bail!("Invalid package id '{}': empty package name", s);
        }

        Ok(PackageId {
            name: parts[0].to_string(),
            version: parts[1].to_string(),
            architecture: parts[2].to_string(),
            collection: parts[3].to_string(),
        })
    }
}
