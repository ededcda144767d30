//! Boundary with the host package-management framework.
//!
//! The host owns job handles and consumes everything the backend reports:
//! status transitions, progress, resolved packages and file lists.

use serde::Serialize;
use std::fmt;

use crate::filter::Filter;

/// Status transitions reported while a job runs.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Query,
    RefreshCache,
    Cancel,
}

/// Installation state attached to each reported package.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum InfoState {
    Unknown,
    Installed,
    Available,
}

impl fmt::Display for InfoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InfoState::Unknown => "unknown",
            InfoState::Installed => "installed",
            InfoState::Available => "available",
        };
        f.write_str(s)
    }
}

/// Operations the backend declares to the host.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Cancel,
    GetFiles,
    GetPackages,
    GetUpdates,
    RefreshCache,
    Resolve,
}

/// Package groups the backend declares to the host.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Group {
    Documentation,
    DesktopKde,
    DesktopXfce,
    DesktopGnome,
    DesktopOther,
}

/// Everything the backend advertises before the host starts any job.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub groups: Vec<Group>,
    pub filters: Vec<Filter>,
    pub roles: Vec<Role>,
    pub mime_types: Vec<String>,
}

/// Per-job callbacks into the host.
#[cfg_attr(test, mockall::automock)]
pub trait JobSink: Send + Sync {
    fn set_status(&self, status: Status);
    fn set_percentage(&self, percentage: u32);
    fn set_allow_cancel(&self, allow: bool);

    /// Report one package with its wire identifier and one-line summary.
    fn package(&self, info: InfoState, package_id: &str, summary: &str);

    /// Report the installed files of one package.
    fn files(&self, package_id: &str, files: &[String]);

    fn finished(&self);
}
