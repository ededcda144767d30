//! Per-job state: the opened package database, the resolved records and the
//! cancellation flag shared with the host.
//!
//! A job must be initialised with [`Job::init`] before it resolves or emits
//! anything. Resolution and emission loops check the cancellation flag on
//! every step and keep whatever was produced before it was raised.

mod control;

pub use control::{AbortHandle, CancellationToken, ChildProcess, JobControl};

use log::{debug, warn};
use std::sync::Arc;

use crate::config::BackendConfig;
use crate::filter::{FilterStrategy, Filters, PassAll};
use crate::host::{InfoState, JobSink, Status};
use crate::manifest::FileManifestReader;
use crate::package::{ID_SEPARATOR, PackageId, PackageRecord};
use crate::resolver::{ResultSet, resolve, resolve_all};
use crate::runtime::Runtime;
use crate::store::{MetadataStore, PackageDatabase};

pub struct Job<'a, R: Runtime> {
    runtime: &'a R,
    config: &'a BackendConfig,
    sink: Arc<dyn JobSink>,
    control: Arc<JobControl>,
    store: Option<Box<dyn MetadataStore>>,
    packages: ResultSet,
    filter: Box<dyn FilterStrategy>,
}

impl<'a, R: Runtime> Job<'a, R> {
    pub fn new(runtime: &'a R, config: &'a BackendConfig, sink: Arc<dyn JobSink>) -> Self {
        Self {
            runtime,
            config,
            control: Arc::new(JobControl::new(Arc::clone(&sink))),
            sink,
            store: None,
            packages: ResultSet::new(),
            filter: Box::new(PassAll),
        }
    }

    /// Replace the predicate deciding which packages pass the host's filters.
    pub fn with_filter_strategy(mut self, filter: Box<dyn FilterStrategy>) -> Self {
        self.filter = filter;
        self
    }

    /// Open the package database at the configured root.
    ///
    /// Returns false when the database cannot be read or lists no package;
    /// the caller must then abandon the job.
    #[tracing::instrument(skip(self), fields(db_root = ?self.config.db_root))]
    pub fn init(&mut self) -> bool {
        match PackageDatabase::load(self.runtime, &self.config.db_root) {
            Ok(db) => self.init_with_store(Box::new(db)),
            Err(e) => {
                warn!("Failed to open package database: {:#}", e);
                false
            }
        }
    }

    /// Attach an already opened store. Same success rule as [`Job::init`].
    pub fn init_with_store(&mut self, store: Box<dyn MetadataStore>) -> bool {
        if store.list_package_names().is_empty() {
            debug!("Package database lists no package");
            self.store = None;
            return false;
        }
        self.store = Some(store);
        true
    }

    pub fn is_initialized(&self) -> bool {
        self.store.is_some()
    }

    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn cancelled(&self) -> bool {
        self.control.is_cancelled()
    }

    /// Handle through which another thread can cancel this job.
    pub fn control(&self) -> Arc<JobControl> {
        Arc::clone(&self.control)
    }

    pub fn sink(&self) -> &Arc<dyn JobSink> {
        &self.sink
    }

    pub fn packages(&self) -> &ResultSet {
        &self.packages
    }

    /// Collect a record for every known package.
    #[tracing::instrument(skip(self))]
    pub fn resolve_packages(&mut self, filters: &Filters) {
        debug!("resolve packages (filters: {})", filters);
        self.sink.set_status(Status::Query);

        let Some(store) = self.store.as_deref() else {
            warn!("resolve_packages called on an uninitialised job");
            return;
        };

        let names = store.list_package_names();
        let found = resolve_all(&names, store, self.control.token());
        self.packages.merge(found);
    }

    /// Collect the packages matching any of `tokens`.
    #[tracing::instrument(skip(self, tokens), fields(token_count = tokens.len()))]
    pub fn resolve_package_ids<S: AsRef<str>>(&mut self, tokens: &[S], filters: &Filters) {
        debug!("resolve package ids (filters: {})", filters);
        self.sink.set_status(Status::Query);

        if tokens.is_empty() {
            return;
        }
        let Some(store) = self.store.as_deref() else {
            warn!("resolve_package_ids called on an uninitialised job");
            return;
        };

        let names = store.list_package_names();
        let found = resolve(tokens, &names, store, self.control.token());
        self.packages.merge(found);
    }

    pub fn build_package_id(&self, record: &PackageRecord) -> String {
        record.package_id()
    }

    pub fn matches_filters(&self, name: &str, filters: &Filters) -> bool {
        self.filter.matches(name, filters)
    }

    /// Report every collected record to the host, in name order.
    ///
    /// Records come from the installed database, so `InfoState::Unknown` is
    /// reported as `InfoState::Installed`. Records whose fields contain the
    /// identifier separator are skipped, since their identifier could not be
    /// parsed back.
    pub fn emit_packages(&self, filters: &Filters, info: InfoState, multiversion: bool) {
        debug!(
            "Emitting {} package(s) (filters: {}, multiversion: {})",
            self.packages.len(),
            filters,
            multiversion
        );
        let info = match info {
            InfoState::Unknown => InfoState::Installed,
            other => other,
        };

        for record in &self.packages {
            if self.cancelled() {
                break;
            }
            if !self.matches_filters(&record.name, filters) {
                continue;
            }
            let package_id = self.build_package_id(record);
            if package_id.matches(ID_SEPARATOR).count() != 3 {
                warn!(
                    "Skipping {}: '{}' in version, architecture or collection",
                    record.name, ID_SEPARATOR
                );
                continue;
            }
            self.sink.package(info, &package_id, &record.description);
        }
    }

    /// Report the installed files of the package named by `package_id`.
    ///
    /// Nothing is reported when the identifier is malformed or the package
    /// has no manifest.
    #[tracing::instrument(skip(self))]
    pub fn emit_package_files(&self, package_id: &str) {
        let id: PackageId = match package_id.parse() {
            Ok(id) => id,
            Err(e) => {
                warn!("{}", e);
                return;
            }
        };

        let reader = FileManifestReader::new(self.runtime, self.config.manifest_root.clone());
        match reader.read_manifest(&id.name) {
            Ok(files) if !files.is_empty() => self.sink.files(package_id, &files),
            Ok(_) => debug!("No files recorded for {}", id.name),
            Err(e) => warn!("Failed to read file list of {}: {:#}", id.name, e),
        }
    }

    pub fn refresh_cache(&self) {
        self.sink.set_status(Status::RefreshCache);
    }
}
