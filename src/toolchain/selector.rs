//! Toolchain selection via the external selector binary

use std::process::ExitStatus;

#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::debug;

/// Error type for selector invocations
#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    /// The selector binary could not be spawned
    #[error("Failed to run toolchain selector: {0}")]
    Io(#[from] std::io::Error),

    /// Listing installed toolchains exited non-zero
    #[error("Selector exited with {status} while listing installed toolchains")]
    ListFailed { status: ExitStatus },

    /// Switching the active toolchain exited non-zero
    #[error("Selector exited with {status} while switching to toolchain {version}")]
    SelectFailed { version: String, status: ExitStatus },
}

/// Trait for enumerating and switching installed toolchains
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ToolchainSelector: Send + Sync {
    /// Lists the toolchain versions installed on this machine
    async fn installed_versions(&self) -> Result<Vec<String>, SelectorError>;

    /// Makes the given toolchain version the active one
    async fn select(&self, version: &str) -> Result<(), SelectorError>;
}

/// Selector backed by the configured external binary.
///
/// Protocol: `<program> --list` prints one installed version per line;
/// `<program> --switch <version>` activates a version and exits zero on
/// success.
pub struct CommandSelector {
    program: String,
}

impl CommandSelector {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait::async_trait]
impl ToolchainSelector for CommandSelector {
    async fn installed_versions(&self) -> Result<Vec<String>, SelectorError> {
        let output = Command::new(&self.program).arg("--list").output().await?;

        if !output.status.success() {
            return Err(SelectorError::ListFailed {
                status: output.status,
            });
        }

        let versions = parse_version_list(&String::from_utf8_lossy(&output.stdout));
        debug!("Selector reports {} installed toolchains", versions.len());

        Ok(versions)
    }

    async fn select(&self, version: &str) -> Result<(), SelectorError> {
        debug!("Switching active toolchain to {}", version);

        let status = Command::new(&self.program)
            .arg("--switch")
            .arg(version)
            .status()
            .await?;

        if !status.success() {
            return Err(SelectorError::SelectFailed {
                version: version.to_string(),
                status,
            });
        }

        Ok(())
    }
}

/// Parse the selector's `--list` output: one version per line, blanks ignored.
fn parse_version_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
