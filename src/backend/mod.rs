//! Host-facing entry points.
//!
//! The host identifies jobs by handle. [`Backend`] keeps one [`Job`] per live
//! handle, runs the declared roles against it and routes cancellation
//! requests to the job's [`JobControl`] without waiting for its worker.

mod sync;

pub use sync::{CacheSync, CommandSync, NoopSync};

#[cfg(test)]
pub use sync::MockCacheSync;

use log::{debug, error, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::BackendConfig;
use crate::filter::{Filter, Filters};
use crate::host::{Capabilities, Group, InfoState, JobSink, Role, Status};
use crate::job::{Job, JobControl};
use crate::runtime::Runtime;

pub type JobId = u64;

/// How a role ended. Never an error: failures are reported through this value
/// and the absence of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Cancelled,
    /// The package database is unreadable or lists no package.
    InitFailed,
    UnknownJob,
}

struct JobSlot<'a, R: Runtime> {
    job: Arc<Mutex<Job<'a, R>>>,
    control: Arc<JobControl>,
}

pub struct Backend<'a, R: Runtime> {
    runtime: &'a R,
    config: &'a BackendConfig,
    sync: Box<dyn CacheSync>,
    jobs: Mutex<HashMap<JobId, JobSlot<'a, R>>>,
}

impl<'a, R: Runtime> Backend<'a, R> {
    pub fn new(runtime: &'a R, config: &'a BackendConfig, sync: Box<dyn CacheSync>) -> Self {
        Self {
            runtime,
            config,
            sync,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    pub fn description(&self) -> &'static str {
        "Cards backend"
    }

    pub fn author(&self) -> &'static str {
        "Thierry Nuttens <tnut@nutyx.org>"
    }

    pub fn supports_parallelization(&self) -> bool {
        false
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            groups: vec![
                Group::Documentation,
                Group::DesktopKde,
                Group::DesktopXfce,
                Group::DesktopGnome,
                Group::DesktopOther,
            ],
            filters: vec![
                Filter::Basename,
                Filter::Gui,
                Filter::Application,
                Filter::Installed,
                Filter::NotInstalled,
                Filter::Development,
            ],
            roles: vec![
                Role::Cancel,
                Role::GetFiles,
                Role::GetPackages,
                Role::Resolve,
                Role::RefreshCache,
                Role::GetUpdates,
            ],
            mime_types: vec!["application/x-xz-compressed-tar".to_string()],
        }
    }

    fn lock_jobs(&self) -> MutexGuard<'_, HashMap<JobId, JobSlot<'a, R>>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create the private state of a new job.
    pub fn start_job(&self, id: JobId, sink: Arc<dyn JobSink>) {
        let job = Job::new(self.runtime, self.config, sink);
        let slot = JobSlot {
            control: job.control(),
            job: Arc::new(Mutex::new(job)),
        };
        if self.lock_jobs().insert(id, slot).is_some() {
            warn!("Job {} restarted, previous state dropped", id);
        }
    }

    /// Release the job's database snapshot and records.
    pub fn stop_job(&self, id: JobId) -> bool {
        let removed = self.lock_jobs().remove(&id).is_some();
        if !removed {
            debug!("Stopping unknown job {}", id);
        }
        removed
    }

    pub fn is_running(&self, id: JobId) -> bool {
        self.lock_jobs().contains_key(&id)
    }

    /// Request cancellation. Safe to call from any thread while a role runs.
    pub fn cancel(&self, id: JobId) {
        let control = self.lock_jobs().get(&id).map(|slot| Arc::clone(&slot.control));
        match control {
            Some(control) => control.cancel(),
            None => warn!("Cannot cancel unknown job {}", id),
        }
    }

    fn with_job<F>(&self, id: JobId, f: F) -> JobOutcome
    where
        F: FnOnce(&mut Job<'a, R>) -> JobOutcome,
    {
        let job = match self.lock_jobs().get(&id) {
            Some(slot) => Arc::clone(&slot.job),
            None => {
                warn!("Unknown job {}", id);
                return JobOutcome::UnknownJob;
            }
        };
        let mut job = job.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut job)
    }

    /// Resolve `tokens` and report every matching package.
    #[tracing::instrument(skip(self, tokens))]
    pub fn resolve<S: AsRef<str>>(&self, id: JobId, filters: &Filters, tokens: &[S]) -> JobOutcome {
        self.with_job(id, |job| {
            job.sink().set_allow_cancel(true);
            if !job.init() {
                debug!("Failed to initialize CARDS job");
                return init_failed(job);
            }
            job.resolve_package_ids(tokens, filters);
            job.emit_packages(filters, InfoState::Unknown, true);
            finish(job)
        })
    }

    /// Report every installed package.
    #[tracing::instrument(skip(self))]
    pub fn get_packages(&self, id: JobId, filters: &Filters) -> JobOutcome {
        self.with_job(id, |job| {
            job.sink().set_allow_cancel(true);
            if !job.init() {
                return init_failed(job);
            }
            job.resolve_packages(filters);
            job.emit_packages(filters, InfoState::Installed, false);
            finish(job)
        })
    }

    /// Report the installed files of each package in `package_ids`.
    #[tracing::instrument(skip(self, package_ids))]
    pub fn get_files<S: AsRef<str>>(&self, id: JobId, package_ids: &[S]) -> JobOutcome {
        self.with_job(id, |job| {
            if !job.init() {
                debug!("Failed to create cards cache");
                return init_failed(job);
            }
            job.sink().set_status(Status::Query);
            for package_id in package_ids {
                if job.cancelled() {
                    break;
                }
                job.emit_package_files(package_id.as_ref());
            }
            finish(job)
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn refresh_cache(&self, id: JobId, force: bool) -> JobOutcome {
        debug!("refresh cache (force: {})", force);
        self.with_job(id, |job| {
            job.refresh_cache();
            self.run_sync(job);
            finish(job)
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn get_updates(&self, id: JobId, filters: &Filters) -> JobOutcome {
        debug!("get updates (filters: {})", filters);
        self.with_job(id, |job| {
            job.sink().set_status(Status::Query);
            self.run_sync(job);
            finish(job)
        })
    }

    fn run_sync(&self, job: &Job<'a, R>) {
        job.sink().set_percentage(0);
        if let Err(e) = self.sync.run(&job.control()) {
            error!("Cache sync failed: {:#}", e);
        }
        job.sink().set_percentage(100);
    }
}

fn init_failed<R: Runtime>(job: &Job<'_, R>) -> JobOutcome {
    job.sink().finished();
    JobOutcome::InitFailed
}

fn finish<R: Runtime>(job: &Job<'_, R>) -> JobOutcome {
    job.sink().finished();
    if job.cancelled() {
        JobOutcome::Cancelled
    } else {
        JobOutcome::Completed
    }
}
