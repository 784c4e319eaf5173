// crates/entitlements-cli/src/main.rs
// ============================================================================
// Module: Entitlements CLI Entry Point
// Description: Command dispatcher for the entitlements service binary.
// Purpose: Start the service, export the bundle registry, validate config.
// Dependencies: clap, entitlements-api, entitlements-config, entitlements-core,
// serde_json, thiserror, tokio, tracing, tracing-subscriber.
// ============================================================================

//! ## Overview
//! The `entitlements` binary reads its configuration from `ENT_` environment
//! variables. `serve` runs the HTTP service until it fails; `bundles` prints
//! the expanded bundle registry as JSON for the bundle-sync job; `config
//! check` loads and validates the environment without starting anything.
//!
//! Failures are written to stderr and reported as a non-zero exit code.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use entitlements_api::EntitlementsServer;
use entitlements_config::EntitlementsConfig;
use entitlements_core::BundleRegistry;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable overriding the log filter.
const LOG_FILTER_ENV: &str = "RUST_LOG";
/// Default log level.
const DEFAULT_LOG_LEVEL: &str = "info";
/// Log level when `ENT_DEBUG` is set.
const DEBUG_LOG_LEVEL: &str = "debug";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "entitlements", version, about = "Entitlements service")]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the entitlements HTTP service.
    Serve,
    /// Print the expanded bundle registry as JSON.
    Bundles(BundlesCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for the `bundles` command.
#[derive(Args, Debug)]
struct BundlesCommand {
    /// Bundle document to read instead of `ENT_BUNDLE_INFO_YAML`.
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
    /// Emit indented JSON.
    #[arg(long)]
    pretty: bool,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate the `ENT_` environment.
    Check,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying the message written to stderr.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve => command_serve().await,
        Commands::Bundles(command) => command_bundles(&command),
        Commands::Config {
            command: ConfigCommand::Check,
        } => command_config_check(),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve() -> CliResult<ExitCode> {
    let config = load_config()?;
    let env_filter = std::env::var(LOG_FILTER_ENV).ok();
    init_logging(&log_filter_directive(config.debug, env_filter.as_deref()))?;
    info!(
        port = config.port,
        subs_host = %config.subs_host,
        ams_mock = config.ams.mock,
        bop_mock = config.bop.mock,
        "starting entitlements service"
    );

    let server = tokio::task::spawn_blocking(move || EntitlementsServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("service init failed: init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("service init failed: {err}")))?;
    server.serve().await.map_err(|err| CliError::new(format!("service failed: {err}")))?;

    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Bundles Command
// ============================================================================

/// Executes the `bundles` command.
fn command_bundles(command: &BundlesCommand) -> CliResult<ExitCode> {
    let config = load_config()?;
    let path = command.file.clone().unwrap_or_else(|| config.bundle_info_yaml.clone());
    let registry =
        BundleRegistry::load(&path, &config.paid_feature_suffix, config.allow_empty_bundles)
            .map_err(|err| CliError::new(format!("bundle load failed: {err}")))?;
    let rendered = render_bundles(&registry, command.pretty)?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Serializes every registered bundle in ascending name order.
fn render_bundles(registry: &BundleRegistry, pretty: bool) -> CliResult<String> {
    let bundles: Vec<_> = registry.all().collect();
    let rendered = if pretty {
        serde_json::to_string_pretty(&bundles)
    } else {
        serde_json::to_string(&bundles)
    };
    rendered.map_err(|err| CliError::new(format!("bundle serialization failed: {err}")))
}

// ============================================================================
// SECTION: Config Command
// ============================================================================

/// Executes the `config check` command.
fn command_config_check() -> CliResult<ExitCode> {
    let config = load_config()?;
    write_stdout_line(&config_summary(&config))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Describes a validated configuration in one line.
fn config_summary(config: &EntitlementsConfig) -> String {
    format!(
        "configuration ok: port {}, bundles {}, ams {}, bop {}, compliance {}",
        config.port,
        config.bundle_info_yaml.display(),
        if config.ams.mock { "mock" } else { config.ams.host.as_str() },
        if config.bop.mock { "mock" } else { "http" },
        if config.compliance_host.is_empty() { "disabled" } else { "enabled" },
    )
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates the `ENT_` environment.
fn load_config() -> CliResult<EntitlementsConfig> {
    EntitlementsConfig::from_env().map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Chooses the log filter; a non-blank override wins over the debug flag.
fn log_filter_directive(debug: bool, env_filter: Option<&str>) -> String {
    match env_filter.map(str::trim).filter(|value| !value.is_empty()) {
        Some(directive) => directive.to_string(),
        None if debug => DEBUG_LOG_LEVEL.to_string(),
        None => DEFAULT_LOG_LEVEL.to_string(),
    }
}

/// Installs the global tracing subscriber.
fn init_logging(directive: &str) -> CliResult<()> {
    let filter = EnvFilter::try_new(directive)
        .map_err(|err| CliError::new(format!("invalid log filter {directive}: {err}")))?;
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|err| CliError::new(format!("logging init failed: {err}")))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output stream failure.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Writes an error message and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
