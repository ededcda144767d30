//! Package records and their serialized forms
//!
//! This module provides the value type reported to the host for every
//! resolved package, the `;`-separated wire identifier, and the parser for
//! the per-package META entries of the installed database.

mod id;
mod meta;
mod record;

pub use id::{ID_SEPARATOR, PackageId};
pub use meta::Meta;
pub use record::PackageRecord;
