//! Cooperative cancellation shared between a job's worker and its canceller.

use anyhow::Result;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::process::{Child, ExitStatus};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::host::{JobSink, Status};

/// Monotonic cancellation flag, cheap to clone and to poll from loops.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag. Returns true only for the call that performed the transition.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Aborts an operation running outside the backend process.
#[cfg_attr(test, mockall::automock)]
pub trait AbortHandle: Send + Sync {
    fn abort(&self) -> Result<()>;
}

/// An external process spawned on behalf of a job.
///
/// The process is only reaped through `try_wait`, under the same lock that
/// `abort` takes, so a signal never reaches a PID that was already released.
#[derive(Debug)]
pub struct ChildProcess {
    child: Mutex<Child>,
}

impl ChildProcess {
    pub fn new(child: Child) -> Self {
        Self {
            child: Mutex::new(child),
        }
    }

    pub fn id(&self) -> u32 {
        self.lock().id()
    }

    /// Exit status of the process, reaping it if it has exited.
    pub fn try_wait(&self) -> Result<Option<ExitStatus>> {
        Ok(self.lock().try_wait()?)
    }

    fn lock(&self) -> MutexGuard<'_, Child> {
        self.child.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AbortHandle for ChildProcess {
    #[cfg(unix)]
    fn abort(&self) -> Result<()> {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let mut child = self.lock();
        if child.try_wait()?.is_some() {
            return Ok(());
        }
        let pid = i32::try_from(child.id())?;
        kill(Pid::from_raw(pid), Signal::SIGTERM)?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn abort(&self) -> Result<()> {
        let mut child = self.lock();
        if child.try_wait()?.is_some() {
            return Ok(());
        }
        Ok(child.kill()?)
    }
}

/// Cancellation state of one job, shared with whoever may cancel it.
pub struct JobControl {
    token: CancellationToken,
    sink: Arc<dyn JobSink>,
    child: Mutex<Option<Arc<dyn AbortHandle>>>,
}

impl JobControl {
    pub fn new(sink: Arc<dyn JobSink>) -> Self {
        Self {
            token: CancellationToken::new(),
            sink,
            child: Mutex::new(None),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the job.
    ///
    /// The host sees `Status::Cancel` once, on the first call. An attached
    /// external process is signalled on every call.
    pub fn cancel(&self) {
        if self.token.cancel() {
            debug!("cancelling transaction");
            self.sink.set_status(Status::Cancel);
        }

        let child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = child.as_ref()
            && let Err(e) = handle.abort()
        {
            warn!("Failed to terminate external process: {}", e);
        }
    }

    /// Register the external process that `cancel` should terminate.
    ///
    /// If the job was cancelled before the process could be attached, the
    /// process is terminated right away.
    pub fn attach_child(&self, handle: Arc<dyn AbortHandle>) {
        let mut child = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        if self.token.is_cancelled()
            && let Err(e) = handle.abort()
        {
            warn!("Failed to terminate external process: {}", e);
        }
        *child = Some(handle);
    }

    pub fn detach_child(&self) {
        self.child
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}
