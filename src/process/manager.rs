//! OS process enumeration and termination

use std::process::ExitStatus;

#[cfg(test)]
use mockall::automock;
use regex::Regex;
use tokio::process::Command;
use tracing::debug;

/// Error type for process-management operations
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The underlying OS tool could not be spawned
    #[error("Failed to run process tool: {0}")]
    Io(#[from] std::io::Error),

    /// The process-name pattern is not a valid regex
    #[error("Invalid process pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Enumerating processes exited non-zero
    #[error("Process listing exited with {status}")]
    ListFailed { status: ExitStatus },

    /// Termination exited with an unexpected status
    #[error("Terminating {name} exited with {status}")]
    TerminateFailed { name: String, status: ExitStatus },
}

/// Trait for enumerating and terminating running processes
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ProcessManager: Send + Sync {
    /// Names of running processes matching the given regex pattern
    async fn running(&self, pattern: &str) -> Result<Vec<String>, ProcessError>;

    /// Forcibly terminate all processes with the given name.
    ///
    /// Returns whether anything was actually signaled.
    async fn terminate(&self, name: &str) -> Result<bool, ProcessError>;
}

/// Process manager backed by the OS tools: `ps` for enumeration and
/// `pkill` for termination.
pub struct SystemProcessManager;

#[async_trait::async_trait]
impl ProcessManager for SystemProcessManager {
    async fn running(&self, pattern: &str) -> Result<Vec<String>, ProcessError> {
        let re = Regex::new(pattern)?;

        let output = Command::new("ps")
            .args(["-eo", "comm="])
            .output()
            .await?;

        if !output.status.success() {
            return Err(ProcessError::ListFailed {
                status: output.status,
            });
        }

        let names = filter_process_names(&String::from_utf8_lossy(&output.stdout), &re);
        debug!("{} running processes match pattern {}", names.len(), pattern);

        Ok(names)
    }

    async fn terminate(&self, name: &str) -> Result<bool, ProcessError> {
        let status = Command::new("pkill").args(["-x", name]).status().await?;

        // pkill: 0 = signaled something, 1 = nothing matched
        match status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => Err(ProcessError::TerminateFailed {
                name: name.to_string(),
                status,
            }),
        }
    }
}

/// Filter process-table lines down to the names matching the pattern.
fn filter_process_names(stdout: &str, re: &Regex) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|name| !name.is_empty() && re.is_match(name))
        .map(str::to_string)
        .collect()
}
