//! CGI link program: one process per request.
//!
//! Command-line arguments become the `arg` block, the process environment
//! the `env` block and `CONTENT_LENGTH` bytes of stdin the `entity` block.
//! The backend's reply is copied to stdout unchanged for the web server to
//! parse. Settings come only from `INTERLINK_*` variables, since argv
//! belongs to the request.

mod error_page;
mod link;
mod request;

use anyhow::{Context, Result};
use clap::Parser;
use interlink_common::BackendArgs;
use interlink_core::Bridge;
use interlink_observability::{init_logging, LogFormat, LoggingConfig};
use std::process::ExitCode;
use tracing::error;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Settings {
    #[command(flatten)]
    backend: BackendArgs,

    /// Apply the location, script-name and redirect rewrites
    #[arg(long, default_value_t = false, env = "INTERLINK_REWRITE")]
    rewrite: bool,

    /// Log output format (plain or json)
    #[arg(long, default_value = "plain", env = "INTERLINK_LOG_FORMAT")]
    log_format: LogFormat,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let mut argv = std::env::args_os();
    let program = argv.next().unwrap_or_else(|| "interlink-cgi".into());

    let settings = match Settings::try_parse_from([program]) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_logging(&LoggingConfig::new(settings.log_format)) {
        eprintln!("logging unavailable: {e:#}");
    }

    match run(&settings, argv).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: &Settings, argv: std::env::ArgsOs) -> Result<()> {
    let config = settings
        .backend
        .to_config()
        .context("invalid backend configuration")?;
    let bridge = Bridge::from_config(&config, settings.rewrite)?;

    link::run_with(
        &bridge,
        argv,
        std::env::vars_os(),
        &mut tokio::io::stdin(),
        &mut tokio::io::stdout(),
    )
    .await
}
