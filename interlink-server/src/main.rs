use anyhow::{Context, Result};
use clap::Parser;
use interlink_common::{BackendArgs, DEFAULT_HTTP_BIND};
use interlink_http::{CgiEnvironment, FrontendConfig, HttpFrontend, LinkHandler};
use interlink_observability::{init_logging, LogFormat, LoggingConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address the HTTP front-end binds to
    #[arg(long, default_value = DEFAULT_HTTP_BIND, env = "INTERLINK_HTTP_BIND")]
    bind: SocketAddr,

    /// Directory serving the paths the bridge declines
    #[arg(long, env = "INTERLINK_DOCUMENT_ROOT")]
    document_root: Option<PathBuf>,

    /// Name reported to the backend as SERVER_NAME
    #[arg(long, env = "INTERLINK_SERVER_NAME")]
    server_name: Option<String>,

    /// Maximum concurrent client connections
    #[arg(long, default_value_t = 1024, env = "INTERLINK_MAX_CONNECTIONS")]
    max_connections: usize,

    /// Maximum request body size in bytes
    #[arg(long, default_value_t = 16 * 1024 * 1024, env = "INTERLINK_MAX_BODY")]
    max_body: usize,

    /// Log output format (plain or json)
    #[arg(long, default_value = "plain", env = "INTERLINK_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(flatten)]
    backend: BackendArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&LoggingConfig::new(args.log_format))?;

    info!("Starting Interlink server v{}", env!("CARGO_PKG_VERSION"));

    let config = args
        .backend
        .to_config()
        .context("invalid backend configuration")?;
    for (i, endpoint) in config.endpoints.iter().enumerate() {
        info!(%endpoint, backup = i > 0, "backend endpoint");
    }

    let mut env = CgiEnvironment::new(config.rewrite.script_name());
    if let Some(name) = &args.server_name {
        env = env.with_server_name(name.clone());
    }
    let handler = LinkHandler::new(&config)?.with_environment(env);

    let frontend = HttpFrontend::new(
        FrontendConfig {
            bind: args.bind,
            max_connections: args.max_connections,
            max_request_body: args.max_body,
            document_root: args.document_root,
        },
        handler,
    );
    frontend.start().await?;

    Ok(())
}
