//! Cache refresh hooks.
//!
//! Refreshing the package cache is left to an external tool; the backend
//! only runs it and makes it cancellable.

use anyhow::{Context, Result, bail};
use log::{debug, info};
use std::process::{Command, ExitStatus};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::job::{ChildProcess, JobControl};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[cfg_attr(test, mockall::automock)]
pub trait CacheSync: Send + Sync {
    fn run(&self, control: &JobControl) -> Result<()>;
}

/// Does nothing. For hosts that refresh the cache by other means.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSync;

impl CacheSync for NoopSync {
    fn run(&self, _control: &JobControl) -> Result<()> {
        debug!("Cache sync disabled");
        Ok(())
    }
}

/// Runs an external program and waits for it.
///
/// While it runs, the program is attached to the job so that cancelling the
/// job terminates it.
#[derive(Debug, Clone)]
pub struct CommandSync {
    command: Vec<String>,
}

impl CommandSync {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl CacheSync for CommandSync {
    #[tracing::instrument(skip(self, control), fields(command = ?self.command))]
    fn run(&self, control: &JobControl) -> Result<()> {
        let Some((program, args)) = self.command.split_first() else {
            bail!("No sync command configured");
        };
        if control.is_cancelled() {
            debug!("Job cancelled before {} started", program);
            return Ok(());
        }

        info!("Running {}", self.command.join(" "));
        let child = Command::new(program)
            .args(args)
            .spawn()
            .with_context(|| format!("Failed to start {}", program))?;
        let process = Arc::new(ChildProcess::new(child));
        debug!("{} started with pid {}", program, process.id());

        control.attach_child(process.clone());
        let status = wait_for(&process);
        control.detach_child();

        let status = status.with_context(|| format!("Failed to wait for {}", program))?;
        if control.is_cancelled() {
            debug!("{} interrupted by cancellation", program);
            return Ok(());
        }
        if !status.success() {
            bail!("{} exited with {}", program, status);
        }
        Ok(())
    }
}

fn wait_for(process: &ChildProcess) -> Result<ExitStatus> {
    loop {
        if let Some(status) = process.try_wait()? {
            return Ok(status);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingSink;
    use std::time::Instant;

    fn control() -> JobControl {
        JobControl::new(Arc::new(RecordingSink::default()))
    }

    #[test]
    fn test_noop_sync() {
        assert!(NoopSync.run(&control()).is_ok());
    }

    #[test]
    fn test_empty_command_fails() {
        let err = CommandSync::new(vec![]).run(&control()).unwrap_err();
        assert!(err.to_string().contains("No sync command"));
    }

    #[test]
    fn test_missing_program_fails() {
        let sync = CommandSync::new(vec!["/nonexistent/cards-sync".into()]);
        assert!(sync.run(&control()).is_err());
    }

    #[test]
    fn test_cancelled_job_skips_command() {
        let control = control();
        control.cancel();

        let sync = CommandSync::new(vec!["/nonexistent/cards-sync".into()]);
        assert!(sync.run(&control).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_exit_status() {
        let ok = CommandSync::new(vec!["true".into()]);
        assert!(ok.run(&control()).is_ok());

        let failing = CommandSync::new(vec!["sh".into(), "-c".into(), "exit 3".into()]);
        let err = failing.run(&control()).unwrap_err();
        assert!(err.to_string().contains("sh exited with"));
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_terminates_running_command() {
        let control = Arc::new(control());
        let canceller = {
            let control = Arc::clone(&control);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(200));
                control.cancel();
            })
        };

        let started = Instant::now();
        let sync = CommandSync::new(vec!["sleep".into(), "30".into()]);
        assert!(sync.run(&control).is_ok());
        canceller.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(control.is_cancelled());
    }
}
