//! Build-tool invocation

use std::process::ExitStatus;

#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::debug;

use crate::config::BuildAction;

/// One build invocation: the action, the target, the version pair picked
/// from the matrix, and the caller's pass-through arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub action: BuildAction,
    pub target: String,
    pub toolchain: String,
    pub sdk: String,
    pub extra_args: Vec<String>,
}

impl BuildRequest {
    /// Assemble the build tool's argument list for this request.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            self.action.as_str().to_string(),
            "-target".to_string(),
            self.target.clone(),
            "-toolchain".to_string(),
            self.toolchain.clone(),
            "-sdk".to_string(),
            self.sdk.clone(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Exit status of one build invocation, reduced to the code the wrapper
/// propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStatus {
    code: i32,
}

impl BuildStatus {
    pub fn new(code: i32) -> Self {
        Self { code }
    }

    /// Reduce a child exit status; death by signal maps to 128 + signal.
    pub fn from_exit(status: ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt as _;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal: Option<i32> = None;

        let code = match status.code() {
            Some(code) => code,
            None => signal.map(|s| 128 + s).unwrap_or(1),
        };

        Self { code }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    pub fn code(&self) -> i32 {
        self.code
    }
}

/// Error type for build invocations
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The build tool could not be spawned
    #[error("Failed to run build tool: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for invoking the build tool
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait BuildInvoker: Send + Sync {
    /// Run one build invocation to completion and report its exit status
    async fn invoke(&self, request: &BuildRequest) -> Result<BuildStatus, InvokeError>;
}

/// Invoker backed by the configured build tool binary. The child inherits
/// the wrapper's stdio so build output streams through unchanged.
pub struct CommandInvoker {
    program: String,
}

impl CommandInvoker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait::async_trait]
impl BuildInvoker for CommandInvoker {
    async fn invoke(&self, request: &BuildRequest) -> Result<BuildStatus, InvokeError> {
        let args = request.to_args();
        debug!("Invoking {} {}", self.program, args.join(" "));

        let status = Command::new(&self.program).args(&args).status().await?;

        Ok(BuildStatus::from_exit(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_args_places_version_pair_before_extra_args() {
        let request = BuildRequest {
            action: BuildAction::Test,
            target: "App".to_string(),
            toolchain: "9.1".to_string(),
            sdk: "11.1".to_string(),
            extra_args: vec!["-quiet".to_string(), "-parallel".to_string()],
        };

        assert_eq!(
            request.to_args(),
            vec![
                "test",
                "-target",
                "App",
                "-toolchain",
                "9.1",
                "-sdk",
                "11.1",
                "-quiet",
                "-parallel",
            ]
        );
    }

    #[test]
    fn to_args_without_extra_args_stops_at_the_sdk() {
        let request = BuildRequest {
            action: BuildAction::Build,
            target: "App".to_string(),
            toolchain: "8.3.3".to_string(),
            sdk: "10.3.1".to_string(),
            extra_args: vec![],
        };

        assert_eq!(request.to_args().len(), 7);
        assert_eq!(request.to_args()[0], "build");
    }

    #[cfg(unix)]
    #[test]
    fn build_status_from_exit_maps_codes_and_signals() {
        use std::os::unix::process::ExitStatusExt;

        let ok = BuildStatus::from_exit(ExitStatus::from_raw(0));
        assert!(ok.success());
        assert_eq!(ok.code(), 0);

        // wait status 0x100 is exit code 1
        let failed = BuildStatus::from_exit(ExitStatus::from_raw(0x100));
        assert!(!failed.success());
        assert_eq!(failed.code(), 1);

        // killed by SIGKILL
        let killed = BuildStatus::from_exit(ExitStatus::from_raw(9));
        assert!(!killed.success());
        assert_eq!(killed.code(), 137);
    }
}
