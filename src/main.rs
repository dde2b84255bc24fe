use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use buildsweep::build::invoker::CommandInvoker;
use buildsweep::build::runner::{RunError, run_matrix};
use buildsweep::config::{BuildAction, RunConfig, ToolPaths};
use buildsweep::process::manager::SystemProcessManager;
use buildsweep::toolchain::selector::CommandSelector;
use buildsweep::version::error::VersionError;
use buildsweep::version::matrix::BuildMatrix;
use buildsweep::version::semver::parse_version;

#[derive(Parser)]
#[command(name = "buildsweep")]
#[command(version, about = "CI build wrapper that sweeps a toolchain/SDK version matrix")]
struct Cli {
    /// Action to forward to the build tool
    #[arg(value_enum)]
    action: BuildAction,

    /// Build target identifier
    target: String,

    /// Skip matrix entries with a toolchain older than this version
    #[arg(long, value_name = "VERSION")]
    min_toolchain: Option<String>,

    /// Load the sweep matrix from a JSON file instead of the built-in table
    #[arg(long, value_name = "FILE")]
    matrix: Option<PathBuf>,

    /// Terminate processes matching this pattern before each entry
    #[arg(long, value_name = "PATTERN")]
    kill: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Arguments after `--` are passed to the build tool unchanged
    #[arg(last = true)]
    extra_args: Vec<String>,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = config_from(cli)?;

    let _guard = init_tracing(config.verbose);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(config))
}

fn config_from(cli: Cli) -> anyhow::Result<RunConfig> {
    let min_toolchain = cli
        .min_toolchain
        .as_deref()
        .map(|raw| parse_version(raw).ok_or_else(|| VersionError::InvalidFormat(raw.to_string())))
        .transpose()?;

    Ok(RunConfig {
        action: cli.action,
        target: cli.target,
        min_toolchain,
        verbose: cli.verbose,
        matrix_path: cli.matrix,
        extra_args: cli.extra_args,
        stale_process_pattern: cli.kill,
        tools: ToolPaths::from_env(),
    })
}

/// Log to stderr, and additionally to the data-dir log file when that
/// directory is writable. The guard must stay alive for the run.
fn init_tracing(verbose: bool) -> Option<WorkerGuard> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_path = buildsweep::config::log_path();
    let file_writer = log_path.parent().and_then(|dir| {
        std::fs::create_dir_all(dir).ok()?;
        let file_name = log_path
            .file_name()
            .unwrap_or_else(|| OsStr::new("buildsweep.log"))
            .to_os_string();
        Some(tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name)))
    });

    match file_writer {
        Some((writer, guard)) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer.and(std::io::stderr))
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

async fn run(config: RunConfig) -> anyhow::Result<ExitCode> {
    let matrix = match &config.matrix_path {
        Some(path) => BuildMatrix::load(path)?,
        None => BuildMatrix::default(),
    };

    info!(
        "Sweeping {} matrix entries for target {}",
        matrix.len(),
        config.target
    );

    let selector = CommandSelector::new(config.tools.selector.clone());
    let invoker = CommandInvoker::new(config.tools.build_tool.clone());
    let processes = SystemProcessManager;

    match run_matrix(&config, &matrix, &selector, &invoker, &processes).await {
        Ok(_) => Ok(ExitCode::SUCCESS),
        // the failing build's exit code becomes ours
        Err(RunError::BuildFailed { code, .. }) => {
            error!("Aborting sweep after failed build");
            let code = u8::try_from(code).unwrap_or(1);
            Ok(ExitCode::from(if code == 0 { 1 } else { code }))
        }
        Err(e) => Err(e.into()),
    }
}
