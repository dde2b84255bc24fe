//! The matrix loop
//!
//! Sweeps the filtered matrix in order: per entry, clear stale helper
//! processes, switch the active toolchain, invoke the build, and block on
//! completion. The first non-zero build exit aborts the whole sweep.

use tracing::{error, info, warn};

use crate::build::invoker::{BuildInvoker, BuildRequest, InvokeError};
use crate::config::RunConfig;
use crate::process::manager::{ProcessError, ProcessManager};
use crate::process::terminate::{TerminateOptions, TerminationOutcome, terminate_with_deadline};
use crate::toolchain::selector::{SelectorError, ToolchainSelector};
use crate::version::matrix::{BuildMatrix, MatrixEntry};
use crate::version::semver::{normalize, parse_version};

/// Error type for a sweep
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// A build invocation exited non-zero; its code becomes the wrapper's
    #[error("Build failed with exit code {code} (toolchain {toolchain}, SDK {sdk})")]
    BuildFailed {
        toolchain: String,
        sdk: String,
        code: i32,
    },

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// What a completed sweep did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Entries built successfully
    pub completed: usize,
    /// Entries below the configured minimum toolchain version
    pub skipped_below_minimum: usize,
    /// Entries whose toolchain the selector does not report as installed
    pub skipped_not_installed: usize,
}

/// Sweep the matrix. Returns the summary of a fully successful run, or the
/// first error; a failing build aborts immediately with its exit code.
pub async fn run_matrix<S, I, P>(
    config: &RunConfig,
    matrix: &BuildMatrix,
    selector: &S,
    invoker: &I,
    processes: &P,
) -> Result<RunSummary, RunError>
where
    S: ToolchainSelector + ?Sized,
    I: BuildInvoker + ?Sized,
    P: ProcessManager + ?Sized,
{
    let entries = match &config.min_toolchain {
        Some(min) => matrix.at_least(min),
        None => matrix.entries().to_vec(),
    };

    let mut summary = RunSummary {
        skipped_below_minimum: matrix.len() - entries.len(),
        ..RunSummary::default()
    };

    if let Some(min) = &config.min_toolchain {
        info!(
            "{} of {} matrix entries at or above toolchain {}",
            entries.len(),
            matrix.len(),
            min
        );
    }

    if entries.is_empty() {
        warn!("No matrix entries to build after filtering");
        return Ok(summary);
    }

    let installed = selector.installed_versions().await?;

    for entry in entries {
        if !is_installed(&entry, &installed) {
            info!(
                "Skipping toolchain {}: not installed on this machine",
                entry.toolchain
            );
            summary.skipped_not_installed += 1;
            continue;
        }

        if let Some(pattern) = &config.stale_process_pattern {
            clear_stale_processes(processes, pattern).await?;
        }

        selector.select(&entry.toolchain).await?;

        let request = BuildRequest {
            action: config.action,
            target: config.target.clone(),
            toolchain: entry.toolchain.clone(),
            sdk: entry.sdk.clone(),
            extra_args: config.extra_args.clone(),
        };

        info!(
            "Running {} for target {} with toolchain {} (key {}) / SDK {}",
            config.action.as_str(),
            config.target,
            entry.toolchain,
            normalize(&entry.toolchain),
            entry.sdk
        );

        let status = invoker.invoke(&request).await?;

        if !status.success() {
            error!(
                "Build failed with exit code {} (toolchain {}, SDK {})",
                status.code(),
                entry.toolchain,
                entry.sdk
            );
            return Err(RunError::BuildFailed {
                toolchain: entry.toolchain,
                sdk: entry.sdk,
                code: status.code(),
            });
        }

        summary.completed += 1;
    }

    info!(
        "Sweep finished: {} built, {} below minimum, {} not installed",
        summary.completed, summary.skipped_below_minimum, summary.skipped_not_installed
    );

    Ok(summary)
}

/// Match a matrix entry against the selector's installed list on parsed
/// versions, so "9.0" and "9.0.0" refer to the same toolchain.
fn is_installed(entry: &MatrixEntry, installed: &[String]) -> bool {
    let Some(wanted) = parse_version(&entry.toolchain) else {
        return false;
    };
    installed
        .iter()
        .any(|version| parse_version(version).is_some_and(|v| v == wanted))
}

async fn clear_stale_processes<P: ProcessManager + ?Sized>(
    processes: &P,
    pattern: &str,
) -> Result<(), ProcessError> {
    match terminate_with_deadline(processes, pattern, &TerminateOptions::default()).await? {
        TerminationOutcome::NotRunning => {}
        TerminationOutcome::Terminated => {
            info!("Terminated stale processes matching {}", pattern);
        }
        // best effort: a stuck helper should not fail the build itself
        TerminationOutcome::DeadlineExceeded => {
            warn!(
                "Stale processes matching {} survived cleanup; continuing",
                pattern
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::invoker::{BuildStatus, MockBuildInvoker};
    use crate::config::{BuildAction, RunConfig, ToolPaths};
    use crate::process::manager::MockProcessManager;
    use crate::toolchain::selector::MockToolchainSelector;
    use mockall::Sequence;
    use mockall::predicate::eq;

    fn config() -> RunConfig {
        RunConfig {
            action: BuildAction::Build,
            target: "App".to_string(),
            min_toolchain: None,
            verbose: false,
            matrix_path: None,
            extra_args: vec![],
            stale_process_pattern: None,
            tools: ToolPaths::default(),
        }
    }

    fn all_installed() -> MockToolchainSelector {
        let mut selector = MockToolchainSelector::new();
        selector.expect_installed_versions().returning(|| {
            Ok(vec![
                "8.3.3".to_string(),
                "9.0".to_string(),
                "9.1".to_string(),
                "9.2".to_string(),
            ])
        });
        selector.expect_select().returning(|_| Ok(()));
        selector
    }

    fn always_succeeds() -> MockBuildInvoker {
        let mut invoker = MockBuildInvoker::new();
        invoker
            .expect_invoke()
            .returning(|_| Ok(BuildStatus::new(0)));
        invoker
    }

    #[tokio::test]
    async fn sweeps_every_entry_in_matrix_order() {
        let mut selector = MockToolchainSelector::new();
        let mut seq = Sequence::new();
        selector.expect_installed_versions().returning(|| {
            Ok(vec![
                "8.3.3".to_string(),
                "9.0".to_string(),
                "9.1".to_string(),
                "9.2".to_string(),
            ])
        });
        for version in ["8.3.3", "9.0", "9.1", "9.2"] {
            selector
                .expect_select()
                .with(eq(version))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));
        }

        let invoker = always_succeeds();
        let processes = MockProcessManager::new();

        let summary = run_matrix(
            &config(),
            &BuildMatrix::default(),
            &selector,
            &invoker,
            &processes,
        )
        .await
        .unwrap();

        assert_eq!(summary.completed, 4);
        assert_eq!(summary.skipped_below_minimum, 0);
        assert_eq!(summary.skipped_not_installed, 0);
    }

    #[tokio::test]
    async fn aborts_on_first_failing_build_with_its_exit_code() {
        let selector = all_installed();
        let processes = MockProcessManager::new();

        let mut invoker = MockBuildInvoker::new();
        let mut seq = Sequence::new();
        invoker
            .expect_invoke()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(BuildStatus::new(0)));
        invoker
            .expect_invoke()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(BuildStatus::new(65)));
        // entries after the failure are never invoked

        let err = run_matrix(
            &config(),
            &BuildMatrix::default(),
            &selector,
            &invoker,
            &processes,
        )
        .await
        .unwrap_err();

        match err {
            RunError::BuildFailed {
                toolchain, code, ..
            } => {
                assert_eq!(toolchain, "9.0");
                assert_eq!(code, 65);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn filters_entries_below_the_minimum_toolchain() {
        let selector = all_installed();
        let invoker = always_succeeds();
        let processes = MockProcessManager::new();

        let mut config = config();
        config.min_toolchain = parse_version("9.1");

        let summary = run_matrix(
            &config,
            &BuildMatrix::default(),
            &selector,
            &invoker,
            &processes,
        )
        .await
        .unwrap();

        assert_eq!(summary.completed, 2);
        assert_eq!(summary.skipped_below_minimum, 2);
    }

    #[tokio::test]
    async fn returns_empty_summary_when_filter_removes_everything() {
        // collaborators must not be touched at all
        let selector = MockToolchainSelector::new();
        let invoker = MockBuildInvoker::new();
        let processes = MockProcessManager::new();

        let mut config = config();
        config.min_toolchain = parse_version("99");

        let summary = run_matrix(
            &config,
            &BuildMatrix::default(),
            &selector,
            &invoker,
            &processes,
        )
        .await
        .unwrap();

        assert_eq!(summary.completed, 0);
        assert_eq!(summary.skipped_below_minimum, 4);
    }

    #[tokio::test]
    async fn skips_toolchains_the_selector_does_not_report() {
        let mut selector = MockToolchainSelector::new();
        selector
            .expect_installed_versions()
            .returning(|| Ok(vec!["9.1".to_string(), "9.2".to_string()]));
        selector
            .expect_select()
            .times(2)
            .returning(|_| Ok(()));

        let invoker = always_succeeds();
        let processes = MockProcessManager::new();

        let summary = run_matrix(
            &config(),
            &BuildMatrix::default(),
            &selector,
            &invoker,
            &processes,
        )
        .await
        .unwrap();

        assert_eq!(summary.completed, 2);
        assert_eq!(summary.skipped_not_installed, 2);
    }

    #[tokio::test]
    async fn matches_installed_versions_on_parsed_components() {
        // selector reports fully padded versions, matrix uses partial ones
        let mut selector = MockToolchainSelector::new();
        selector
            .expect_installed_versions()
            .returning(|| Ok(vec!["9.0.0".to_string()]));
        selector
            .expect_select()
            .with(eq("9.0"))
            .times(1)
            .returning(|_| Ok(()));

        let invoker = always_succeeds();
        let processes = MockProcessManager::new();

        let matrix = BuildMatrix::from_json(r#"{"9.0": "11.0"}"#).unwrap();

        let summary = run_matrix(&config(), &matrix, &selector, &invoker, &processes)
            .await
            .unwrap();

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.skipped_not_installed, 0);
    }

    #[tokio::test]
    async fn passes_action_target_versions_and_extra_args_through() {
        let selector = all_installed();
        let processes = MockProcessManager::new();

        let mut invoker = MockBuildInvoker::new();
        invoker
            .expect_invoke()
            .withf(|request: &BuildRequest| {
                request.action == BuildAction::Test
                    && request.target == "App"
                    && request.toolchain == "9.2"
                    && request.sdk == "11.2"
                    && request.extra_args == ["-quiet".to_string()]
            })
            .times(1)
            .returning(|_| Ok(BuildStatus::new(0)));

        let mut config = config();
        config.action = BuildAction::Test;
        config.min_toolchain = parse_version("9.2");
        config.extra_args = vec!["-quiet".to_string()];

        run_matrix(
            &config,
            &BuildMatrix::default(),
            &selector,
            &invoker,
            &processes,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn clears_stale_processes_before_each_entry() {
        let selector = all_installed();
        let invoker = always_succeeds();

        let mut processes = MockProcessManager::new();
        processes
            .expect_running()
            .with(eq("^Simulator$"))
            .times(4)
            .returning(|_| Ok(vec![]));

        let mut config = config();
        config.stale_process_pattern = Some("^Simulator$".to_string());

        let summary = run_matrix(
            &config,
            &BuildMatrix::default(),
            &selector,
            &invoker,
            &processes,
        )
        .await
        .unwrap();

        assert_eq!(summary.completed, 4);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn propagates_selector_failures() {
        use std::os::unix::process::ExitStatusExt;

        let mut selector = MockToolchainSelector::new();
        selector
            .expect_installed_versions()
            .returning(|| Ok(vec!["8.3.3".to_string()]));
        selector.expect_select().returning(|version| {
            Err(SelectorError::SelectFailed {
                version: version.to_string(),
                status: std::process::ExitStatus::from_raw(0x100),
            })
        });

        let invoker = MockBuildInvoker::new();
        let processes = MockProcessManager::new();

        let err = run_matrix(
            &config(),
            &BuildMatrix::default(),
            &selector,
            &invoker,
            &processes,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RunError::Selector(_)));
    }
}
