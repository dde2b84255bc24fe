//! Bounded-deadline process termination
//!
//! Some helper processes respawn themselves right after being killed, so a
//! single signal is not enough. This loop keeps terminating matching
//! processes until none remain or a deadline on the monotonic clock passes.

use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::config::{KILL_DEADLINE_MS, KILL_POLL_INTERVAL_MS};
use crate::process::manager::{ProcessError, ProcessManager};

/// Bounds for one termination attempt
#[derive(Debug, Clone, Copy)]
pub struct TerminateOptions {
    /// Give up once this much time has passed
    pub deadline: Duration,
    /// Pause between termination rounds
    pub poll_interval: Duration,
}

impl Default for TerminateOptions {
    fn default() -> Self {
        Self {
            deadline: Duration::from_millis(KILL_DEADLINE_MS),
            poll_interval: Duration::from_millis(KILL_POLL_INTERVAL_MS),
        }
    }
}

/// How a termination attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationOutcome {
    /// Nothing matched the pattern in the first place
    NotRunning,
    /// Matching processes were terminated and stayed gone
    Terminated,
    /// Matching processes were still present when the deadline passed
    DeadlineExceeded,
}

/// Terminate every process matching `pattern`, retrying until none remain
/// or the deadline passes.
///
/// A process that respawns between rounds is terminated again. Exceeding
/// the deadline is reported in the outcome, not as an error.
pub async fn terminate_with_deadline<M: ProcessManager + ?Sized>(
    manager: &M,
    pattern: &str,
    options: &TerminateOptions,
) -> Result<TerminationOutcome, ProcessError> {
    let deadline = Instant::now() + options.deadline;
    let mut terminated_any = false;

    loop {
        let mut names = manager.running(pattern).await?;

        if names.is_empty() {
            return Ok(if terminated_any {
                TerminationOutcome::Terminated
            } else {
                TerminationOutcome::NotRunning
            });
        }

        if Instant::now() >= deadline {
            warn!(
                "Gave up terminating processes matching {} after {:?}",
                pattern, options.deadline
            );
            return Ok(TerminationOutcome::DeadlineExceeded);
        }

        names.sort();
        names.dedup();

        for name in &names {
            debug!("Terminating process {}", name);
            if manager.terminate(name).await? {
                terminated_any = true;
            }
        }

        sleep(options.poll_interval).await;
    }
}
