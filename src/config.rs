use std::path::PathBuf;

use clap::ValueEnum;

// =============================================================================
// Time-related constants
// =============================================================================

/// Upper bound on how long stale-process cleanup may keep retrying (10 seconds)
pub const KILL_DEADLINE_MS: u64 = 10_000;

/// Interval between termination attempts while waiting for a process to die (500ms)
pub const KILL_POLL_INTERVAL_MS: u64 = 500;

// =============================================================================
// External tool defaults
// =============================================================================

/// Default toolchain selector binary, overridable via `BUILDSWEEP_SELECTOR`
pub const DEFAULT_SELECTOR_BIN: &str = "toolchain-select";

/// Default build tool binary, overridable via `BUILDSWEEP_BUILD_TOOL`
pub const DEFAULT_BUILD_TOOL_BIN: &str = "buildtool";

/// Action passed to the build tool for each matrix entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuildAction {
    Build,
    Test,
}

impl BuildAction {
    /// Returns the action name as the build tool expects it on its command line
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildAction::Build => "build",
            BuildAction::Test => "test",
        }
    }
}

/// Paths (or bare names, resolved via PATH) of the two external binaries
/// the wrapper drives.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolPaths {
    pub selector: String,
    pub build_tool: String,
}

impl ToolPaths {
    /// Resolve tool paths from the environment, falling back to the defaults.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("BUILDSWEEP_SELECTOR").ok(),
            std::env::var("BUILDSWEEP_BUILD_TOOL").ok(),
        )
    }

    fn from_vars(selector: Option<String>, build_tool: Option<String>) -> Self {
        Self {
            selector: selector.unwrap_or_else(|| DEFAULT_SELECTOR_BIN.to_string()),
            build_tool: build_tool.unwrap_or_else(|| DEFAULT_BUILD_TOOL_BIN.to_string()),
        }
    }
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self::from_vars(None, None)
    }
}

/// Everything one run needs, assembled in `main` from CLI flags and the
/// environment.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Action forwarded to the build tool
    pub action: BuildAction,
    /// Build target identifier forwarded to the build tool
    pub target: String,
    /// Lower bound: matrix entries with an older toolchain are skipped
    pub min_toolchain: Option<semver::Version>,
    /// Raise log verbosity to debug
    pub verbose: bool,
    /// Optional matrix file; the built-in table is used when absent
    pub matrix_path: Option<PathBuf>,
    /// Arguments passed through to the build tool unchanged
    pub extra_args: Vec<String>,
    /// Pattern of stale helper processes to terminate before each entry
    pub stale_process_pattern: Option<String>,
    /// External binaries to drive
    pub tools: ToolPaths,
}

/// Returns the path to the data directory for buildsweep.
/// Uses $XDG_DATA_HOME/buildsweep if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/buildsweep,
/// or ./buildsweep if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("buildsweep.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("buildsweep")
}
