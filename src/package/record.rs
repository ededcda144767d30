use serde::Serialize;

use super::PackageId;
use crate::store::MetadataStore;

/// One resolved package, as reported to the host.
#[derive(Serialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    pub architecture: String,
    pub collection: String,
    pub description: String,
}

impl PackageRecord {
    /// Build a record from the current field values of a known package.
    pub fn from_store(store: &dyn MetadataStore, name: &str) -> Self {
        PackageRecord {
            name: name.to_string(),
            version: store.version(name),
            architecture: store.architecture(name),
            collection: store.collection(name),
            description: store.description(name),
        }
    }

    /// The wire identifier of this record: `name;version;architecture;collection`.
    pub fn package_id(&self) -> String {
        PackageId::from(self).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockMetadataStore;
    use mockall::predicate::eq;

    #[test]
    fn test_from_store_copies_every_field() {
        let mut store = MockMetadataStore::new();
        store
            .expect_version()
            .with(eq("foo"))
            .returning(|_| "1.0-1".into());
        store
            .expect_architecture()
            .with(eq("foo"))
            .returning(|_| "x86_64".into());
        store
            .expect_collection()
            .with(eq("foo"))
            .returning(|_| "base".into());
        store
            .expect_description()
            .with(eq("foo"))
            .returning(|_| "The foo tool".into());

        let record = PackageRecord::from_store(&store, "foo");

        assert_eq!(
            record,
            PackageRecord {
                name: "foo".into(),
                version: "1.0-1".into(),
                architecture: "x86_64".into(),
                collection: "base".into(),
                description: "The foo tool".into(),
            }
        );
    }

    #[test]
    fn test_package_id() {
        let record = PackageRecord {
            name: "foo".into(),
            version: "1.0".into(),
            architecture: "x86_64".into(),
            collection: "core".into(),
            description: "ignored".into(),
        };

        assert_eq!(record.package_id(), "foo;1.0;x86_64;core");
    }

    #[test]
    fn test_package_id_keeps_empty_fields() {
        let record = PackageRecord {
            name: "foo".into(),
            ..Default::default()
        };

        assert_eq!(record.package_id(), "foo;;;");
    }
}
