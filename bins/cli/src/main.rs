//! CLI binary entrypoint.

mod commands;
mod error;
mod format;

use clap::{Parser, Subcommand};
use commands::{RequestKind, run_config_show, run_list, run_smoke, run_status, run_validate};
use error::{CliError, ExitCode};
use format::OutputArgs;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "satori",
    version,
    about = "Code-intelligence core: readiness-gated semantic retrieval",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    /// Optional config file path (JSON/TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the effective configuration (secrets redacted).
    Config,
    /// Validate a tool request payload without executing it.
    Validate {
        /// Request kind to validate against.
        #[arg(long, value_enum)]
        kind: RequestKind,
        /// Inline JSON payload; reads stdin when omitted.
        #[arg(long)]
        request: Option<String>,
    },
    /// List tracked codebases from the snapshot file.
    List {
        /// Snapshot file path override.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Report the tracked state of one codebase.
    Status {
        /// Codebase path.
        #[arg(long)]
        path: PathBuf,
        /// Snapshot file path override.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Run an in-memory end-to-end smoke (index + search).
    Smoke,
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn process_env() -> BTreeMap<String, String> {
    std::env::vars().collect()
}

fn snapshot_path(
    explicit: Option<PathBuf>,
    config: Option<&PathBuf>,
    env: &BTreeMap<String, String>,
) -> Result<PathBuf, CliError> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    let validated =
        satori_config::load_config(config.map(PathBuf::as_path), env).map_err(CliError::from)?;
    Ok(validated
        .snapshot_path
        .unwrap_or_else(|| PathBuf::from(".satori/snapshot.json")))
}

async fn run(cli: Cli) -> Result<String, CliError> {
    let env = process_env();

    match cli.command {
        Commands::Config => run_config_show(cli.output, cli.config.as_deref(), &env),
        Commands::Validate { kind, request } => {
            let payload = match request {
                Some(payload) => payload,
                None => {
                    let mut buffer = String::new();
                    std::io::stdin().read_to_string(&mut buffer)?;
                    buffer
                },
            };
            run_validate(cli.output, kind, &payload)
        },
        Commands::List { snapshot } => {
            let path = snapshot_path(snapshot, cli.config.as_ref(), &env)?;
            run_list(cli.output, &path).await
        },
        Commands::Status { path, snapshot } => {
            let snapshot = snapshot_path(snapshot, cli.config.as_ref(), &env)?;
            run_status(cli.output, &snapshot, &path).await
        },
        Commands::Smoke => run_smoke(cli.output).await,
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(rendered) => {
            let mut stdout = std::io::stdout();
            if stdout.write_all(rendered.as_bytes()).is_err() {
                std::process::exit(ExitCode::Io.as_u8().into());
            }
            if !rendered.ends_with('\n') && stdout.write_all(b"\n").is_err() {
                std::process::exit(ExitCode::Io.as_u8().into());
            }
        },
        Err(error) => {
            tracing::error!(error = %error, "command failed");
            eprintln!("error: {error}");
            std::process::exit(error.exit_code().as_u8().into());
        },
    }
}
